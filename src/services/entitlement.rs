//! Entitlement evaluation - may this account consume the service right now?
//!
//! Funding is layered and checked in strict order, short-circuiting:
//!
//! 1. **Metered bills.** Qualifying bills (enabled, paid, in period, quota left)
//!    are summed. If they cover the account, the only remaining question is the
//!    bills' daily cap: unlimited if any qualifying bill has no cap, otherwise
//!    today's usage from every source must stay strictly below the summed caps.
//! 2. **Prepaid cards.** Reached only when bills do not cover. At least one valid
//!    card is required, otherwise the account has no funding at all.
//! 3. **Prepaid daily ceiling.** The account's `daily_max_usage` bounds today's
//!    prepaid-charged usage, with a one-micro epsilon at the boundary.
//!
//! "Today" starts at local midnight. Daily caps are a human-facing billing
//! concept, so they follow the server's time zone and not UTC.
//!
//! Evaluation is read-only and stateless; concurrent calls need no coordination.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    models::{account::Account, billing::UsageScope},
    store::{GateStore, StoreError},
};

/// Added to prepaid usage before comparing against the ceiling (1e-6 units).
pub const PREPAID_EPSILON_MICROS: i64 = 1;

/// Why an account may not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No funding source covers the account.
    InsufficientBalance,
    /// Funding exists but today's ceiling has been reached.
    DailyCapExceeded,
}

/// Outcome of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    Granted,
    Denied(Denial),
}

/// Computes [`Entitlement`] from persisted funding and usage.
#[derive(Clone)]
pub struct EntitlementEvaluator {
    store: Arc<dyn GateStore>,
}

impl EntitlementEvaluator {
    pub fn new(store: Arc<dyn GateStore>) -> Self {
        Self { store }
    }

    /// Evaluate the account against the current time.
    ///
    /// The caller resolves the account row; funding and usage are read here.
    ///
    /// # Errors
    ///
    /// Any storage failure is returned as-is; nothing is retried.
    pub async fn has_entitlement(&self, account: &Account) -> Result<Entitlement, StoreError> {
        self.evaluate_at(account, Utc::now()).await
    }

    /// Evaluate the account as of `now`.
    pub async fn evaluate_at(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<Entitlement, StoreError> {
        let account_id = account.id;
        if account.is_disabled {
            tracing::debug!(%account_id, "entitlement denied: account disabled");
            return Ok(Entitlement::Denied(Denial::InsufficientBalance));
        }

        let day_start = local_day_start(now);

        if let Some(outcome) = self.check_bills(account_id, now, day_start).await? {
            return Ok(outcome);
        }

        let cards = self.store.list_prepaid_cards(account_id).await?;
        if !cards.iter().any(|card| card.is_valid_at(now)) {
            tracing::debug!(%account_id, "entitlement denied: no valid funding source");
            return Ok(Entitlement::Denied(Denial::InsufficientBalance));
        }

        let Some(cap) = account.prepaid_daily_cap() else {
            return Ok(Entitlement::Granted);
        };

        let used = self
            .store
            .sum_usage_since(account_id, day_start, UsageScope::PrepaidOnly)
            .await?;

        if used.saturating_add(PREPAID_EPSILON_MICROS) >= cap {
            tracing::debug!(%account_id, used, cap, "entitlement denied: prepaid daily cap reached");
            return Ok(Entitlement::Denied(Denial::DailyCapExceeded));
        }

        Ok(Entitlement::Granted)
    }

    /// Returns `None` when bills do not cover the account and prepaid must be consulted.
    async fn check_bills(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
        day_start: DateTime<Utc>,
    ) -> Result<Option<Entitlement>, StoreError> {
        let bills = self.store.list_bills(account_id).await?;
        let qualifying: Vec<_> = bills.iter().filter(|bill| bill.qualifies_at(now)).collect();

        let remaining: i64 = qualifying
            .iter()
            .fold(0i64, |acc, bill| acc.saturating_add(bill.remaining_quota_micros));
        if remaining <= 0 {
            return Ok(None);
        }

        if qualifying.iter().any(|bill| bill.has_unlimited_daily_quota()) {
            return Ok(Some(Entitlement::Granted));
        }

        let cap: i64 = qualifying
            .iter()
            .fold(0i64, |acc, bill| acc.saturating_add(bill.daily_quota_micros));
        if cap <= 0 {
            return Ok(Some(Entitlement::Granted));
        }

        let used = self
            .store
            .sum_usage_since(account_id, day_start, UsageScope::AllSources)
            .await?;
        if used < cap {
            Ok(Some(Entitlement::Granted))
        } else {
            tracing::debug!(%account_id, used, cap, "entitlement denied: bill daily cap reached");
            Ok(Some(Entitlement::Denied(Denial::DailyCapExceeded)))
        }
    }
}

/// Local midnight of the day containing `now`, as a UTC instant.
pub fn local_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now
        .with_timezone(&Local)
        .date_naive()
        .and_time(NaiveTime::MIN);

    // Zones that jump over midnight on a DST change start the day an hour later.
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or(now)
}
