//! Persistence surface the gatekeeper reads and writes.
//!
//! The gate, the entitlement evaluator and the seeding hook only talk to
//! storage through [`GateStore`]. Production uses [`postgres::PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    account::Account,
    api_key::ApiKey,
    billing::{Bill, PrepaidCard, UsageScope},
    model::NewModelMapping,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Storage failure. Always surfaced as an internal error by the gate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait GateStore: Send + Sync + 'static {
    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Look up a key by its SHA-256 hex digest, regardless of active/revoked state.
    async fn find_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError>;

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn list_bills(&self, account_id: Uuid) -> Result<Vec<Bill>, StoreError>;

    async fn list_prepaid_cards(&self, account_id: Uuid) -> Result<Vec<PrepaidCard>, StoreError>;

    /// Sum of non-failed usage cost since `since` within `scope`.
    async fn sum_usage_since(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
        scope: UsageScope,
    ) -> Result<i64, StoreError>;

    /// True if `provider` already has a mapping whose source or target equals
    /// `model_id`. Both comparisons are case-insensitive.
    async fn model_mapping_exists(&self, provider: &str, model_id: &str)
    -> Result<bool, StoreError>;

    /// Insert unless a row for the same (provider, source model) exists.
    /// Returns whether a row was written.
    async fn insert_model_mapping(&self, mapping: &NewModelMapping) -> Result<bool, StoreError>;
}
