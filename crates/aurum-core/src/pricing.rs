//! # Pricing
//!
//! Transaction totals for sales and purchases.
//!
//! ## Sale Math
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   sub_total_i   = sell_price_i − line_discount_i             │
//! │              sub_total     = Σ sub_total_i                              │
//! │                                                                         │
//! │  discount  = discount_percent > 0 ? sub_total × percent : discount      │
//! │  grand     = sub_total − discount + tax                                 │
//! │  change    = paid − grand            (must be ≥ 0)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purchase Math
//! `line total = net weight × price per gram`, `grand = Σ line totals`, and
//! the store pays exactly the grand total (no change, no tax).
//!
//! Every computed amount is checked: a line or total above
//! [`MAX_AMOUNT_RUPIAH`](crate::MAX_AMOUNT_RUPIAH) is a validation error,
//! never a wrapped or panicking sum.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Rate, Weight};
use crate::MAX_AMOUNT_RUPIAH;

/// Accepts a computed amount only when it fits the money bounds.
fn bounded(field: &str, amount: Option<Money>) -> CoreResult<Money> {
    match amount {
        Some(amount) if (0..=MAX_AMOUNT_RUPIAH).contains(&amount.rupiah()) => Ok(amount),
        _ => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_RUPIAH,
        }
        .into()),
    }
}

/// Sub total of one sale line.
///
/// A line discount larger than the piece's price is rejected rather than
/// producing a negative line.
pub fn sale_line_sub_total(unit_price: Money, line_discount: Money) -> CoreResult<Money> {
    if line_discount.is_negative() || line_discount > unit_price {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: unit_price.rupiah(),
        }
        .into());
    }
    Ok(unit_price - line_discount)
}

/// Total of one purchase line.
pub fn purchase_line_total(weight: Weight, price_per_gram: Money) -> CoreResult<Money> {
    bounded("total", price_per_gram.checked_for_weight(weight))
}

/// Header totals of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub sub_total: Money,
    /// Effective discount amount (computed from the percent when one is set).
    pub discount: Money,
    pub discount_percent: Rate,
    pub tax: Money,
    pub grand_total: Money,
    pub paid_amount: Money,
    pub change_amount: Money,
}

impl SaleTotals {
    /// Computes the sale header from line sub totals.
    ///
    /// ## Errors
    /// - `Validation` if the discount exceeds the sub total, or a total
    ///   leaves the money bounds
    /// - `InsufficientPayment` if `paid < grand_total`
    ///
    /// ```rust
    /// use aurum_core::money::Money;
    /// use aurum_core::pricing::SaleTotals;
    /// use aurum_core::types::Rate;
    ///
    /// let totals = SaleTotals::compute(
    ///     [Money::from_rupiah(1_000_000)],
    ///     Money::zero(),
    ///     Rate::zero(),
    ///     Money::zero(),
    ///     Money::from_rupiah(1_000_000),
    /// )
    /// .unwrap();
    /// assert_eq!(totals.grand_total.rupiah(), 1_000_000);
    /// assert!(totals.change_amount.is_zero());
    /// ```
    pub fn compute(
        line_sub_totals: impl IntoIterator<Item = Money>,
        discount: Money,
        discount_percent: Rate,
        tax: Money,
        paid_amount: Money,
    ) -> CoreResult<SaleTotals> {
        let sub_total = bounded("sub_total", Money::checked_sum(line_sub_totals))?;

        let discount = if discount_percent.is_zero() {
            discount
        } else {
            bounded("discount", sub_total.checked_percentage(discount_percent))?
        };

        if discount > sub_total {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: sub_total.rupiah(),
            }
            .into());
        }

        let grand_total = bounded(
            "grand_total",
            sub_total
                .checked_sub(discount)
                .and_then(|net| net.checked_add(tax)),
        )?;

        if paid_amount < grand_total {
            return Err(CoreError::InsufficientPayment {
                grand_total,
                paid: paid_amount,
            });
        }

        let change_amount = bounded("change_amount", paid_amount.checked_sub(grand_total))?;

        Ok(SaleTotals {
            sub_total,
            discount,
            discount_percent,
            tax,
            grand_total,
            paid_amount,
            change_amount,
        })
    }
}

/// Header totals of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseTotals {
    pub grand_total: Money,
}

impl PurchaseTotals {
    pub fn compute(line_totals: impl IntoIterator<Item = Money>) -> CoreResult<PurchaseTotals> {
        Ok(PurchaseTotals {
            grand_total: bounded("grand_total", Money::checked_sum(line_totals))?,
        })
    }

    /// Purchases are paid in full: sub total, paid and grand are equal.
    pub fn paid_amount(&self) -> Money {
        self.grand_total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
