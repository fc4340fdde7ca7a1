//! # Member Loyalty
//!
//! Pure rules for member tiers and points.
//!
//! ## Two Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INCREMENTAL (hot path, inside each transaction's unit of work)         │
//! │    sale     : total_purchase += grand, points += ⌊grand / 100.000⌋      │
//! │    purchase : total_sell     += grand, points += ⌊grand / 200.000⌋      │
//! │    both     : transaction_count += 1, tier = tier_for(total_purchase)   │
//! │                                                                         │
//! │  RECALCULATION (repair sweep, never called by the hot path)             │
//! │    points = ⌊Σ purchase / 100.000⌋ + ⌊Σ sell / 200.000⌋                 │
//! │    totals and count replaced from completed transactions                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Flooring per transaction can award fewer points than flooring the sum,
//! so the sweep may raise a member's points. It never runs implicitly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Member, MemberTier};

/// Spend per point on sales.
pub const PURCHASE_POINT_UNIT: Money = Money::from_rupiah(100_000);

/// Value per point on gold sold to the store.
pub const SELL_POINT_UNIT: Money = Money::from_rupiah(200_000);

/// Tier thresholds on cumulative purchase, highest first.
const TIER_THRESHOLDS: [(Money, MemberTier); 3] = [
    (Money::from_rupiah(100_000_000), MemberTier::Platinum),
    (Money::from_rupiah(50_000_000), MemberTier::Gold),
    (Money::from_rupiah(20_000_000), MemberTier::Silver),
];

/// Tier for a cumulative purchase amount.
///
/// ```rust
/// use aurum_core::loyalty::tier_for;
/// use aurum_core::money::Money;
/// use aurum_core::types::MemberTier;
///
/// assert_eq!(tier_for(Money::from_rupiah(50_000_000)), MemberTier::Gold);
/// assert_eq!(tier_for(Money::from_rupiah(19_999_999)), MemberTier::Regular);
/// ```
pub fn tier_for(total_purchase: Money) -> MemberTier {
    TIER_THRESHOLDS
        .iter()
        .find(|(threshold, _)| total_purchase >= *threshold)
        .map(|(_, tier)| *tier)
        .unwrap_or(MemberTier::Regular)
}

/// Points earned by spending `amount` on a sale.
pub fn points_from_purchase(amount: Money) -> i64 {
    amount.whole_units_of(PURCHASE_POINT_UNIT)
}

/// Points earned by selling gold worth `amount` to the store.
pub fn points_from_sell(amount: Money) -> i64 {
    amount.whole_units_of(SELL_POINT_UNIT)
}

/// The loyalty-relevant slice of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoyaltyStanding {
    pub tier: MemberTier,
    pub points: i64,
    pub total_purchase: Money,
    pub total_sell: Money,
    pub transaction_count: i64,
}

impl LoyaltyStanding {
    pub fn from_member(member: &Member) -> Self {
        LoyaltyStanding {
            tier: member.tier,
            points: member.points,
            total_purchase: member.total_purchase,
            total_sell: member.total_sell,
            transaction_count: member.transaction_count,
        }
    }

    /// Accrual for a completed sale to this member.
    #[must_use]
    pub fn apply_sale(self, grand_total: Money) -> Self {
        let total_purchase = self.total_purchase + grand_total;
        LoyaltyStanding {
            tier: tier_for(total_purchase),
            points: self.points + points_from_purchase(grand_total),
            total_purchase,
            total_sell: self.total_sell,
            transaction_count: self.transaction_count + 1,
        }
    }

    /// Accrual for a completed purchase from this member.
    #[must_use]
    pub fn apply_purchase(self, grand_total: Money) -> Self {
        LoyaltyStanding {
            tier: tier_for(self.total_purchase),
            points: self.points + points_from_sell(grand_total),
            total_purchase: self.total_purchase,
            total_sell: self.total_sell + grand_total,
            transaction_count: self.transaction_count + 1,
        }
    }

    /// Manual award of purchase points without touching totals.
    #[must_use]
    pub fn award_purchase_points(self, amount: Money) -> Self {
        LoyaltyStanding {
            points: self.points + points_from_purchase(amount),
            ..self
        }
    }

    /// Standing rebuilt from scratch out of completed-transaction sums.
    pub fn recalculate(total_purchase: Money, total_sell: Money, transaction_count: i64) -> Self {
        LoyaltyStanding {
            tier: tier_for(total_purchase),
            points: points_from_purchase(total_purchase) + points_from_sell(total_sell),
            total_purchase,
            total_sell,
            transaction_count,
        }
    }
}

impl Default for LoyaltyStanding {
    fn default() -> Self {
        LoyaltyStanding {
            tier: MemberTier::Regular,
            points: 0,
            total_purchase: Money::zero(),
            total_sell: Money::zero(),
            transaction_count: 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
