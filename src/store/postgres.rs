//! PostgreSQL implementation of [`GateStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{GateStore, StoreError};
use crate::{
    db::DbPool,
    models::{
        account::Account,
        api_key::ApiKey,
        billing::{Bill, PrepaidCard, UsageScope},
        model::NewModelMapping,
    },
};

/// Store backed by the shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GateStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        let key = sqlx::query_as::<_, ApiKey>(
            "SELECT id, user_id, name, is_admin, is_active, revoked_at
             FROM api_keys
             WHERE key_hash = $1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $1 WHERE id = $2")
            .bind(at)
            .bind(key_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, is_disabled, daily_max_usage_micros FROM users WHERE id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn list_bills(&self, account_id: Uuid) -> Result<Vec<Bill>, StoreError> {
        let bills = sqlx::query_as::<_, Bill>(
            r#"
            SELECT remaining_quota_micros, daily_quota_micros,
                   is_enabled, status, period_start, period_end
            FROM bills
            WHERE user_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    async fn list_prepaid_cards(&self, account_id: Uuid) -> Result<Vec<PrepaidCard>, StoreError> {
        let cards = sqlx::query_as::<_, PrepaidCard>(
            r#"
            SELECT balance_micros, is_enabled, redeemed_at, expires_at
            FROM prepaid_cards
            WHERE user_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn sum_usage_since(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
        scope: UsageScope,
    ) -> Result<i64, StoreError> {
        // SUM over BIGINT yields NUMERIC in Postgres, hence the cast back.
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(cost_micros), 0)::BIGINT
            FROM usage_records
            WHERE user_id = $1
              AND requested_at >= $2
              AND is_failed = false
              AND ($3::TEXT IS NULL OR charged_to = $3)
            "#,
        )
        .bind(account_id)
        .bind(since)
        .bind(scope.charged_to())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn model_mapping_exists(
        &self,
        provider: &str,
        model_id: &str,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM model_mappings
                WHERE LOWER(provider) = LOWER($1)
                  AND (LOWER(source_model) = LOWER($2) OR LOWER(target_model) = LOWER($2))
            )
            "#,
        )
        .bind(provider)
        .bind(model_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_model_mapping(&self, mapping: &NewModelMapping) -> Result<bool, StoreError> {
        // A concurrent seeder may have inserted the same pair; the unique index wins.
        let result = sqlx::query(
            r#"
            INSERT INTO model_mappings (provider, source_model, target_model, is_enabled)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&mapping.provider)
        .bind(&mapping.source_model)
        .bind(&mapping.target_model)
        .bind(mapping.is_enabled)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
