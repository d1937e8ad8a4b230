//! Funding sources: metered bills and prepaid cards.
//!
//! # Money
//!
//! All amounts are `i64` micro-units (1 currency unit = 1_000_000 micros), the
//! same fixed-point unit usage records are charged in.

use chrono::{DateTime, Utc};

/// Micro-units per whole currency unit.
#[cfg(test)]
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Bill status that makes a bill count toward entitlement.
pub const BILL_STATUS_PAID: &str = "paid";

/// A metered billing entitlement.
///
/// # Database Table
///
/// Maps to the `bills` table. An account may hold several bills at once;
/// qualifying bills are summed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Bill {
    /// Quota left on this bill. Only decreases.
    pub remaining_quota_micros: i64,

    /// Per-day spending cap. Zero or negative means unlimited per day.
    pub daily_quota_micros: i64,

    pub is_enabled: bool,

    /// "pending", "paid", "cancelled" or "refunded"
    pub status: String,

    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl Bill {
    /// Whether this bill contributes quota at `now`.
    ///
    /// Requires enabled, paid, inside `[period_start, period_end]`, and quota left.
    pub fn qualifies_at(&self, now: DateTime<Utc>) -> bool {
        self.is_enabled
            && self.status == BILL_STATUS_PAID
            && self.period_start <= now
            && now <= self.period_end
            && self.remaining_quota_micros > 0
    }

    pub fn has_unlimited_daily_quota(&self) -> bool {
        self.daily_quota_micros <= 0
    }
}

/// A prepaid balance card, attached to an account once redeemed.
///
/// # Database Table
///
/// Maps to the `prepaid_cards` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PrepaidCard {
    pub balance_micros: i64,
    pub is_enabled: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PrepaidCard {
    /// Whether this card funds requests at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_enabled
            && self.balance_micros > 0
            && self.redeemed_at.is_some()
            && self.expires_at.is_none_or(|expiry| expiry >= now)
    }
}

/// `usage_records.charged_to` value for usage paid from prepaid cards.
pub const CHARGED_TO_PREPAID: &str = "prepaid";

/// Which usage records count toward a daily sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageScope {
    /// Everything charged today, whatever paid for it
    AllSources,
    /// Only usage charged to prepaid cards
    PrepaidOnly,
}

impl UsageScope {
    /// Required `charged_to` value, `None` for no restriction.
    pub fn charged_to(self) -> Option<&'static str> {
        match self {
            UsageScope::AllSources => None,
            UsageScope::PrepaidOnly => Some(CHARGED_TO_PREPAID),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bill(now: DateTime<Utc>) -> Bill {
        Bill {
            remaining_quota_micros: 5 * MICROS_PER_UNIT,
            daily_quota_micros: 0,
            is_enabled: true,
            status: BILL_STATUS_PAID.to_string(),
            period_start: now - Duration::days(1),
            period_end: now + Duration::days(30),
        }
    }

    #[test]
    fn bill_outside_window_does_not_qualify() {
        let now = Utc::now();
        let mut b = bill(now);
        assert!(b.qualifies_at(now));

        b.period_end = now - Duration::seconds(1);
        assert!(!b.qualifies_at(now));
    }

    #[test]
    fn bill_not_yet_started_does_not_qualify() {
        let now = Utc::now();
        let mut b = bill(now);
        b.period_start = now + Duration::seconds(1);
        assert!(!b.qualifies_at(now));

        b.period_start = now;
        assert!(b.qualifies_at(now));
    }

    #[test]
    fn disabled_bill_does_not_qualify() {
        let now = Utc::now();
        let mut b = bill(now);
        b.is_enabled = false;
        assert!(!b.qualifies_at(now));
    }

    #[test]
    fn unpaid_or_exhausted_bill_does_not_qualify() {
        let now = Utc::now();
        let mut b = bill(now);
        b.status = "pending".to_string();
        assert!(!b.qualifies_at(now));

        let mut b = bill(now);
        b.remaining_quota_micros = 0;
        assert!(!b.qualifies_at(now));
    }

    #[test]
    fn prepaid_card_requires_redemption_and_unexpired() {
        let now = Utc::now();
        let mut card = PrepaidCard {
            balance_micros: 10,
            is_enabled: true,
            redeemed_at: None,
            expires_at: None,
        };
        assert!(!card.is_valid_at(now));

        card.redeemed_at = Some(now);
        assert!(card.is_valid_at(now));

        card.expires_at = Some(now);
        assert!(card.is_valid_at(now));

        card.expires_at = Some(now - Duration::seconds(1));
        assert!(!card.is_valid_at(now));
    }

    #[test]
    fn disabled_card_does_not_fund() {
        let now = Utc::now();
        let card = PrepaidCard {
            balance_micros: MICROS_PER_UNIT,
            is_enabled: false,
            redeemed_at: Some(now),
            expires_at: None,
        };
        assert!(!card.is_valid_at(now));
    }

    #[test]
    fn usage_scope_maps_to_charged_to_filter() {
        assert_eq!(UsageScope::AllSources.charged_to(), None);
        assert_eq!(UsageScope::PrepaidOnly.charged_to(), Some("prepaid"));
    }
}
