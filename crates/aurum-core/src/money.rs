//! # Money Module
//!
//! Provides the `Money` type for rupiah amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  2.35 g × Rp 1.150.000/g in f64 = 2702499.9999999995   ❌              │
//! │                                                                         │
//! │  OUR SOLUTION: integer rupiah × integer milligrams                      │
//! │    1_150_000 × 2_350 mg / 1000 = 2_702_500 exactly                      │
//! │                                                                         │
//! │  Every total in a transaction is a sum of integers, so                  │
//! │  grand_total = sub_total − discount + tax holds to the rupiah.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use aurum_core::money::Money;
//! use aurum_core::types::Weight;
//!
//! let per_gram = Money::from_rupiah(500_000);
//! let price = per_gram.for_weight(Weight::from_grams(2));
//! assert_eq!(price.rupiah(), 1_000_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Rate, Weight};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole rupiah.
///
/// Rupiah has no circulating minor unit, so the smallest unit is the
/// rupiah itself. Signed so that intermediate differences (paid − grand
/// total) can be represented and checked.
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  GoldCategory.sell_price_per_gram ──► × Product.weight ──► sell price   │
/// │                                                                         │
/// │  sell price − line discount ──► line sub_total ──► Σ ──► sub_total      │
/// │                                                                         │
/// │  sub_total − discount + tax ──► grand_total ──► Member.total_purchase   │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole rupiah.
    #[inline]
    pub const fn from_rupiah(rupiah: i64) -> Self {
        Money(rupiah)
    }

    /// Returns the value in whole rupiah.
    #[inline]
    pub const fn rupiah(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Prices a weight of gold at this per-gram rate.
    ///
    /// Rounds half up to the nearest rupiah. The product is taken in i128
    /// and saturates at the `i64` bounds; use [`Money::checked_for_weight`]
    /// where an out-of-range result must be rejected.
    ///
    /// ```rust
    /// use aurum_core::money::Money;
    /// use aurum_core::types::Weight;
    ///
    /// let per_gram = Money::from_rupiah(1_150_000);
    /// let price = per_gram.for_weight(Weight::from_milligrams(2_350));
    /// assert_eq!(price.rupiah(), 2_702_500);
    /// ```
    pub fn for_weight(&self, weight: Weight) -> Money {
        Money(saturate(self.weighted_i128(weight)))
    }

    /// [`Money::for_weight`], or `None` when the result does not fit in `i64`.
    pub fn checked_for_weight(&self, weight: Weight) -> Option<Money> {
        i64::try_from(self.weighted_i128(weight)).ok().map(Money)
    }

    fn weighted_i128(&self, weight: Weight) -> i128 {
        div_round_half_up(self.0 as i128 * weight.milligrams() as i128, 1_000)
    }

    /// Returns `rate` of this amount, rounded half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    ///
    /// ```rust
    /// use aurum_core::money::Money;
    /// use aurum_core::types::Rate;
    ///
    /// let sub_total = Money::from_rupiah(2_000_000);
    /// assert_eq!(sub_total.percentage(Rate::from_percent(5)).rupiah(), 100_000);
    /// ```
    pub fn percentage(&self, rate: Rate) -> Money {
        Money(saturate(self.percentage_i128(rate)))
    }

    /// [`Money::percentage`], or `None` when the result does not fit in `i64`.
    pub fn checked_percentage(&self, rate: Rate) -> Option<Money> {
        i64::try_from(self.percentage_i128(rate)).ok().map(Money)
    }

    fn percentage_i128(&self, rate: Rate) -> i128 {
        div_round_half_up(self.0 as i128 * rate.bps() as i128, 10_000)
    }

    /// Checked addition. Returns `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Checked subtraction. Returns `None` on overflow.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Checked sum of an iterator of amounts.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Number of whole `unit`s contained in this amount.
    ///
    /// Used for loyalty points. Negative amounts and non-positive units
    /// yield zero.
    pub fn whole_units_of(&self, unit: Money) -> i64 {
        if unit.0 <= 0 || self.0 <= 0 {
            return 0;
        }
        self.0 / unit.0
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Division rounding half away from zero.
fn div_round_half_up(value: i128, divisor: i128) -> i128 {
    let half = divisor / 2;
    if value >= 0 {
        (value + half) / divisor
    } else {
        (value - half) / divisor
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Formats as `Rp1.250.000` (Indonesian digit grouping).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp{}", sign, grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_rupiah(1_000_000).to_string(), "Rp1.000.000");
        assert_eq!(Money::from_rupiah(950).to_string(), "Rp950");
        assert_eq!(Money::from_rupiah(-12_500).to_string(), "-Rp12.500");
        assert_eq!(Money::zero().to_string(), "Rp0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupiah(1_000_000);
        let b = Money::from_rupiah(250_000);

        assert_eq!((a + b).rupiah(), 1_250_000);
        assert_eq!((a - b).rupiah(), 750_000);
        assert_eq!((b * 3).rupiah(), 750_000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.rupiah(), 1_500_000);
    }

    #[test]
    fn test_for_weight_exact() {
        let per_gram = Money::from_rupiah(500_000);
        assert_eq!(per_gram.for_weight(Weight::from_grams(2)).rupiah(), 1_000_000);
    }

    #[test]
    fn test_for_weight_rounds_half_up() {
        // 3 rupiah/g × 1 mg = 0.003 → 0
        assert_eq!(Money::from_rupiah(3).for_weight(Weight::from_milligrams(1)).rupiah(), 0);
        // 1 rupiah/g × 500 mg = 0.5 → 1
        assert_eq!(Money::from_rupiah(1).for_weight(Weight::from_milligrams(500)).rupiah(), 1);
        // 1 rupiah/g × 499 mg = 0.499 → 0
        assert_eq!(Money::from_rupiah(1).for_weight(Weight::from_milligrams(499)).rupiah(), 0);
    }

    #[test]
    fn test_for_weight_large_values_do_not_overflow() {
        let per_gram = Money::from_rupiah(2_000_000);
        let ingot = Weight::from_grams(1_000_000); // one tonne of gold
        assert_eq!(per_gram.for_weight(ingot).rupiah(), 2_000_000_000_000);
    }

    #[test]
    fn test_for_weight_out_of_range() {
        let per_gram = Money::from_rupiah(i64::MAX / 2);
        let weight = Weight::from_grams(3);
        assert_eq!(per_gram.checked_for_weight(weight), None);
        assert_eq!(per_gram.for_weight(weight).rupiah(), i64::MAX);
        assert_eq!(
            Money::from_rupiah(500_000).checked_for_weight(Weight::from_grams(2)),
            Some(Money::from_rupiah(1_000_000))
        );
    }

    #[test]
    fn test_checked_arithmetic() {
        let max = Money::from_rupiah(i64::MAX);
        assert_eq!(max.checked_add(Money::from_rupiah(1)), None);
        assert_eq!(Money::from_rupiah(i64::MIN).checked_sub(Money::from_rupiah(1)), None);
        assert_eq!(
            Money::from_rupiah(5).checked_sub(Money::from_rupiah(7)),
            Some(Money::from_rupiah(-2))
        );
        assert_eq!(Money::checked_sum([max, Money::from_rupiah(1)]), None);
        assert_eq!(
            Money::checked_sum([Money::from_rupiah(2), Money::from_rupiah(3)]),
            Some(Money::from_rupiah(5))
        );
        assert_eq!(max.checked_percentage(Rate::FULL), Some(max));
    }

    #[test]
    fn test_percentage() {
        let amount = Money::from_rupiah(1_000_000);
        assert_eq!(amount.percentage(Rate::from_percent(10)).rupiah(), 100_000);
        assert_eq!(amount.percentage(Rate::from_bps(250)).rupiah(), 25_000);
        assert_eq!(Money::from_rupiah(3).percentage(Rate::from_bps(5_000)).rupiah(), 2);
        assert_eq!(amount.percentage(Rate::zero()).rupiah(), 0);
    }

    #[test]
    fn test_whole_units_of() {
        let unit = Money::from_rupiah(100_000);
        assert_eq!(Money::from_rupiah(1_000_000).whole_units_of(unit), 10);
        assert_eq!(Money::from_rupiah(199_999).whole_units_of(unit), 1);
        assert_eq!(Money::from_rupiah(99_999).whole_units_of(unit), 0);
        assert_eq!(Money::from_rupiah(-500_000).whole_units_of(unit), 0);
        assert_eq!(Money::from_rupiah(500_000).whole_units_of(Money::zero()), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_rupiah(1).is_positive());
        assert!(Money::from_rupiah(-1).is_negative());
        assert_eq!(Money::default(), Money::zero());
    }
}
