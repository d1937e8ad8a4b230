//! In-memory [`GateStore`] for tests.
//!
//! Case-insensitive comparisons use Unicode lowercasing, the same folding as
//! Postgres `LOWER` on a UTF-8 database and as the model registry keys.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{GateStore, StoreError};
use crate::models::{
    account::Account,
    api_key::{ApiKey, hash_api_key},
    billing::{Bill, CHARGED_TO_PREPAID, PrepaidCard, UsageScope},
    model::NewModelMapping,
};

/// Which funding source paid for a usage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeSource {
    Bill,
    Prepaid,
}

impl ChargeSource {
    fn as_str(self) -> &'static str {
        match self {
            ChargeSource::Bill => "bill",
            ChargeSource::Prepaid => CHARGED_TO_PREPAID,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UsageEntry {
    pub user_id: Uuid,
    pub cost_micros: i64,
    pub charged_to: ChargeSource,
    pub is_failed: bool,
    pub requested_at: DateTime<Utc>,
}

/// A stored `model_mappings` row.
#[derive(Debug, Clone)]
pub struct MappingRow {
    pub provider: String,
    pub source_model: String,
    pub target_model: String,
    pub is_enabled: bool,
}

struct KeyRow {
    key_hash: String,
    last_used_at: Option<DateTime<Utc>>,
    key: ApiKey,
}

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    api_keys: Vec<KeyRow>,
    bills: Vec<(Uuid, Bill)>,
    prepaid_cards: Vec<(Uuid, PrepaidCard)>,
    usage: Vec<UsageEntry>,
    mappings: Vec<MappingRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: AtomicBool,
    failing_touch: AtomicBool,
    stale_mapping_reads: AtomicBool,
}

fn same_folded(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn outage() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the pool were exhausted.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only last-used updates fail.
    pub fn set_failing_touch(&self, failing: bool) {
        self.failing_touch.store(failing, Ordering::SeqCst);
    }

    /// Make `model_mapping_exists` always answer false, as when another writer
    /// inserts between the existence check and the insert.
    pub fn set_stale_mapping_reads(&self, stale: bool) {
        self.stale_mapping_reads.store(stale, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(())
    }

    pub fn add_account(&self, disabled: bool, daily_max_usage_micros: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().accounts.push(Account {
            id,
            is_disabled: disabled,
            daily_max_usage_micros,
        });
        id
    }

    pub fn set_account_disabled(&self, account_id: Uuid, disabled: bool) {
        let mut tables = self.tables.lock();
        if let Some(account) = tables.accounts.iter_mut().find(|a| a.id == account_id) {
            account.is_disabled = disabled;
        }
    }

    /// Register a raw token and return the key id.
    pub fn add_api_key(&self, raw: &str, user_id: Option<Uuid>, is_admin: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().api_keys.push(KeyRow {
            key_hash: hash_api_key(raw),
            last_used_at: None,
            key: ApiKey {
                id,
                user_id,
                name: format!("key-{raw}"),
                is_admin,
                is_active: true,
                revoked_at: None,
            },
        });
        id
    }

    pub fn revoke_api_key(&self, key_id: Uuid) {
        self.update_key(key_id, |key| key.revoked_at = Some(Utc::now()));
    }

    pub fn deactivate_api_key(&self, key_id: Uuid) {
        self.update_key(key_id, |key| key.is_active = false);
    }

    fn update_key(&self, key_id: Uuid, update: impl FnOnce(&mut ApiKey)) {
        let mut tables = self.tables.lock();
        if let Some(row) = tables.api_keys.iter_mut().find(|r| r.key.id == key_id) {
            update(&mut row.key);
        }
    }

    pub fn last_used(&self, key_id: Uuid) -> Option<DateTime<Utc>> {
        self.tables
            .lock()
            .api_keys
            .iter()
            .find(|r| r.key.id == key_id)
            .and_then(|r| r.last_used_at)
    }

    pub fn add_bill(&self, account_id: Uuid, bill: Bill) {
        self.tables.lock().bills.push((account_id, bill));
    }

    pub fn add_prepaid_card(&self, account_id: Uuid, card: PrepaidCard) {
        self.tables.lock().prepaid_cards.push((account_id, card));
    }

    pub fn add_usage(&self, entry: UsageEntry) {
        self.tables.lock().usage.push(entry);
    }

    pub fn add_mapping(&self, provider: &str, source: &str, target: &str) {
        self.tables.lock().mappings.push(MappingRow {
            provider: provider.to_string(),
            source_model: source.to_string(),
            target_model: target.to_string(),
            is_enabled: true,
        });
    }

    pub fn mappings(&self) -> Vec<MappingRow> {
        self.tables.lock().mappings.clone()
    }
}

#[async_trait]
impl GateStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn find_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .api_keys
            .iter()
            .find(|r| r.key_hash == key_hash)
            .map(|r| r.key.clone()))
    }

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check()?;
        if self.failing_touch.load(Ordering::SeqCst) {
            return Err(outage());
        }
        let mut tables = self.tables.lock();
        if let Some(row) = tables.api_keys.iter_mut().find(|r| r.key.id == key_id) {
            row.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned())
    }

    async fn list_bills(&self, account_id: Uuid) -> Result<Vec<Bill>, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .bills
            .iter()
            .filter(|(owner, _)| *owner == account_id)
            .map(|(_, bill)| bill.clone())
            .collect())
    }

    async fn list_prepaid_cards(&self, account_id: Uuid) -> Result<Vec<PrepaidCard>, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .prepaid_cards
            .iter()
            .filter(|(owner, _)| *owner == account_id)
            .map(|(_, card)| card.clone())
            .collect())
    }

    async fn sum_usage_since(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
        scope: UsageScope,
    ) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self
            .tables
            .lock()
            .usage
            .iter()
            .filter(|u| u.user_id == account_id && u.requested_at >= since && !u.is_failed)
            .filter(|u| scope.charged_to().is_none_or(|source| u.charged_to.as_str() == source))
            .map(|u| u.cost_micros)
            .sum())
    }

    async fn model_mapping_exists(
        &self,
        provider: &str,
        model_id: &str,
    ) -> Result<bool, StoreError> {
        self.check()?;
        if self.stale_mapping_reads.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.tables.lock().mappings.iter().any(|m| {
            same_folded(&m.provider, provider)
                && (same_folded(&m.source_model, model_id) || same_folded(&m.target_model, model_id))
        }))
    }

    async fn insert_model_mapping(&self, mapping: &NewModelMapping) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();
        let duplicate = tables.mappings.iter().any(|m| {
            same_folded(&m.provider, &mapping.provider)
                && same_folded(&m.source_model, &mapping.source_model)
        });
        if duplicate {
            return Ok(false);
        }
        tables.mappings.push(MappingRow {
            provider: mapping.provider.clone(),
            source_model: mapping.source_model.clone(),
            target_model: mapping.target_model.clone(),
            is_enabled: mapping.is_enabled,
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mapping_lookups_fold_non_ascii_case() {
        let store = MemoryStore::new();
        store.add_mapping("Ärzte", "Modell-Ä", "Modell-Ä");

        assert!(store.model_mapping_exists("ärzte", "modell-ä").await.unwrap());
        assert!(
            !store
                .insert_model_mapping(&NewModelMapping::identity("ÄRZTE", "MODELL-Ä"))
                .await
                .unwrap()
        );
    }
}
