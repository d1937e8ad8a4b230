//! API key model for authentication.
//!
//! API keys identify the caller of every proxied request. They are stored in the database as SHA-256 hashes, so the raw token never leaves the request that carried it.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. A key may be unowned (`user_id` is NULL) for
/// system integrations; such keys are never subject to entitlement checks.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique identifier for this API key
    pub id: Uuid,

    /// Owning account, if any
    pub user_id: Option<Uuid>,

    /// Human-readable label for the key
    pub name: String,

    /// Whether this key may use the management endpoints
    pub is_admin: bool,

    /// Whether this API key is currently active
    pub is_active: bool,

    /// Set when the key was revoked. Revoked keys are rejected even if still flagged active.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Whether the key can authenticate right now.
    pub fn is_usable(&self) -> bool {
        self.is_active && self.revoked_at.is_none()
    }
}

/// Hash a raw API key into the hex digest stored in `api_keys.key_hash`.
pub fn hash_api_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
