//! Account data model.
//!
//! An account (`users` table) owns API keys and every funding source. Only the
//! attributes the gatekeeper needs are mapped here.

use uuid::Uuid;

/// Represents an account record from the database.
///
/// A disabled account has zero entitlement regardless of funding state.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    /// Unique identifier for this account
    pub id: Uuid,

    /// Disabled accounts cannot authenticate or consume anything
    pub is_disabled: bool,

    /// Per-day ceiling on prepaid spending, in micro-units
    ///
    /// Zero (or negative) means unlimited.
    pub daily_max_usage_micros: i64,
}

impl Account {
    /// The configured prepaid daily ceiling, or `None` when unlimited.
    pub fn prepaid_daily_cap(&self) -> Option<i64> {
        (self.daily_max_usage_micros > 0).then_some(self.daily_max_usage_micros)
    }
}
