//! Authentication gate: credential -> identity -> entitlement.
//!
//! # Flow
//!
//! 1. Paths under a bypass prefix are public: no result, no error
//! 2. Extract the credential (see [`credentials`](super::credentials))
//! 3. Hash it and resolve the API key; unknown, inactive or revoked keys fail
//! 4. Reject keys whose owning account is disabled, indistinguishably from a bad key
//! 5. Owned keys must pass the [`EntitlementEvaluator`]
//! 6. Queue a best-effort last-used update and return the [`AuthContext`]
//!
//! Lookups fail closed: storage errors become internal errors, never a pass.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::Utc;
use uuid::Uuid;

use super::{
    background::BackgroundQueue,
    credentials::{extract_credential, path_has_segment_prefix},
    entitlement::{Denial, Entitlement, EntitlementEvaluator},
};
use crate::{
    config::{GateSettings, SettingsHandle},
    error::AppError,
    models::api_key::hash_api_key,
    store::GateStore,
};

/// Authentication context attached to authenticated requests.
///
/// Built fresh per request from the key record. It never carries the raw credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// ID of the authenticated API key
    pub api_key_id: Uuid,

    /// Display name of the key
    pub key_name: String,

    /// Whether the key may use management endpoints
    pub is_admin: bool,

    /// Owning account, `None` for unowned system keys
    pub account_id: Option<Uuid>,
}

/// Orchestrates extraction, resolution and entitlement for every request.
#[derive(Clone)]
pub struct Gate {
    settings: SettingsHandle,
    store: Arc<dyn GateStore>,
    evaluator: EntitlementEvaluator,
    background: BackgroundQueue,
}

impl Gate {
    pub fn new(
        settings: SettingsHandle,
        store: Arc<dyn GateStore>,
        background: BackgroundQueue,
    ) -> Self {
        Self {
            evaluator: EntitlementEvaluator::new(store.clone()),
            settings,
            store,
            background,
        }
    }

    /// Authenticate one request.
    ///
    /// Returns `Ok(None)` for public paths and `Ok(Some(ctx))` when the caller may proceed.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials`: nothing extractable
    /// - `InvalidApiKey`: unknown, inactive or revoked key, or disabled owner
    /// - `InsufficientBalance` / `DailyCapExceeded`: entitlement denied
    /// - `Store`: any storage failure
    pub async fn authenticate(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Option<AuthContext>, AppError> {
        let settings = self.settings.load();
        if is_bypassed(path, &settings) {
            return Ok(None);
        }

        let credential =
            extract_credential(headers, path, query, &settings).ok_or(AppError::MissingCredentials)?;

        let key = self
            .store
            .find_api_key(&hash_api_key(credential.value()))
            .await?
            .ok_or(AppError::InvalidApiKey)?;

        if !key.is_usable() {
            tracing::debug!(api_key_id = %key.id, "rejected inactive or revoked api key");
            return Err(AppError::InvalidApiKey);
        }

        if let Some(account_id) = key.user_id {
            let account = self
                .store
                .find_account(account_id)
                .await?
                .filter(|account| !account.is_disabled)
                .ok_or_else(|| {
                    tracing::debug!(api_key_id = %key.id, %account_id, "owner missing or disabled");
                    AppError::InvalidApiKey
                })?;

            match self.evaluator.has_entitlement(&account).await? {
                Entitlement::Granted => {}
                Entitlement::Denied(Denial::InsufficientBalance) => {
                    return Err(AppError::InsufficientBalance);
                }
                Entitlement::Denied(Denial::DailyCapExceeded) => {
                    return Err(AppError::DailyCapExceeded);
                }
            }
        }

        let store = self.store.clone();
        let key_id = key.id;
        self.background.submit("touch_api_key", async move {
            if let Err(err) = store.touch_api_key(key_id, Utc::now()).await {
                tracing::warn!(api_key_id = %key_id, error = %err, "failed to record api key usage");
            }
        });

        Ok(Some(AuthContext {
            api_key_id: key.id,
            key_name: key.name,
            is_admin: key.is_admin,
            account_id: key.user_id,
        }))
    }
}

/// Whether `path` is public under the current bypass prefixes.
pub fn is_bypassed(path: &str, settings: &GateSettings) -> bool {
    settings.bypass_prefixes.iter().any(|prefix| {
        if settings.legacy_prefix_matching {
            path.starts_with(prefix.as_str())
        } else {
            path_has_segment_prefix(path, prefix)
        }
    })
}
