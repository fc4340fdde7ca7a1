//! # Domain Types
//!
//! Core domain types used throughout Aurum POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Reference catalog           Stock ledger          Transactions         │
//! │  ─────────────────           ────────────          ────────────         │
//! │  GoldCategory ◄── Product ◄── StockItem ──────────► Transaction         │
//! │  Location ◄── StorageBox ◄────┘    │                 └── TransactionItem│
//! │                                    └──► StockTransfer                   │
//! │                                                                         │
//! │  Loyalty                     Audit                 Raw material         │
//! │  ───────                     ─────                 ────────────         │
//! │  Member (tier, points)       PriceUpdateLog        RawMaterial          │
//! │                              └── PriceDetail                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (serial_number, code, transfer_number, ...) - human-readable
//!
//! ## Units
//! - Money: whole rupiah ([`Money`])
//! - Weight: milligrams ([`Weight`])
//! - Percentages: basis points ([`Rate`])

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Weight
// =============================================================================

/// A gold weight in milligrams.
///
/// Jewelry scales read to the milligram, so integer milligrams carry every
/// weight the shop floor can measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Weight(i64);

impl Weight {
    #[inline]
    pub const fn from_milligrams(mg: i64) -> Self {
        Weight(mg)
    }

    #[inline]
    pub const fn from_grams(grams: i64) -> Self {
        Weight(grams * 1_000)
    }

    #[inline]
    pub const fn milligrams(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Weight(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// Formats as grams with three decimals: `2.350 g`.
impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let mg = self.0.unsigned_abs();
        write!(f, "{}{}.{:03} g", sign, mg / 1_000, mg % 1_000)
    }
}

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 250 bps = 2.5%. Used for transaction discount
/// percentages and raw material shrinkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// 100%.
    pub const FULL: Rate = Rate(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Rate(percent * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// String-backed enums
// =============================================================================

/// Implements `as_str`, `Display` and `FromStr` for a closed enum whose
/// wire form is snake_case. Unknown values are rejected with
/// `ValidationError::NotAllowed`.
macro_rules! string_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Stable lowercase form used in storage and JSON.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: $ty::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Stock Status
// =============================================================================

/// Lifecycle state of one serialized piece of inventory.
///
/// ```text
///                 Sale                      Cancellation
///   available ──────────────► sold ──────────────────► available
///       │
///       │ Transfer (location/box change, status unchanged)
///       ▼
///   available
/// ```
/// `reserved` and `transfer` are carried for compatibility with stock
/// imported from older tooling; nothing in this crate moves stock into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Available,
    Reserved,
    Sold,
    Transfer,
}

string_enum!(StockStatus, "status", {
    Available => "available",
    Reserved => "reserved",
    Sold => "sold",
    Transfer => "transfer",
});

impl StockStatus {
    /// Whether a Sale may consume an item in this state.
    pub const fn is_sellable(&self) -> bool {
        match self {
            StockStatus::Available => true,
            StockStatus::Reserved | StockStatus::Sold | StockStatus::Transfer => false,
        }
    }

    /// Whether a Transfer may relocate an item in this state.
    pub const fn is_transferable(&self) -> bool {
        match self {
            StockStatus::Available => true,
            StockStatus::Reserved | StockStatus::Sold | StockStatus::Transfer => false,
        }
    }

    /// Whether the item may be soft-deleted in this state.
    pub const fn is_deletable(&self) -> bool {
        match self {
            StockStatus::Available => true,
            StockStatus::Reserved | StockStatus::Sold | StockStatus::Transfer => false,
        }
    }
}

// =============================================================================
// Transaction enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Stock leaves inventory to a customer.
    Sale,
    /// The store buys gold from a customer ("setor").
    Purchase,
}

string_enum!(TransactionType, "transaction_type", {
    Sale => "sale",
    Purchase => "purchase",
});

impl TransactionType {
    /// Prefix of the human-readable transaction code.
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            TransactionType::Sale => "SL",
            TransactionType::Purchase => "PR",
        }
    }
}

/// Transaction status. `completed → cancelled` happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Cancelled,
}

string_enum!(TransactionStatus, "status", {
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Card,
    Mixed,
}

string_enum!(PaymentMethod, "payment_method", {
    Cash => "cash",
    Transfer => "transfer",
    Card => "card",
    Mixed => "mixed",
});

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Member Tier
// =============================================================================

/// Loyalty tier, derived from cumulative purchase spend only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MemberTier {
    Regular,
    Silver,
    Gold,
    Platinum,
}

string_enum!(MemberTier, "tier", {
    Regular => "regular",
    Silver => "silver",
    Gold => "gold",
    Platinum => "platinum",
});

impl Default for MemberTier {
    fn default() -> Self {
        MemberTier::Regular
    }
}

// =============================================================================
// Raw material enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RawMaterialStatus {
    Available,
    Processed,
    Sold,
}

string_enum!(RawMaterialStatus, "status", {
    Available => "available",
    Processed => "processed",
    Sold => "sold",
});

impl RawMaterialStatus {
    /// Raw material only moves forward: available → processed → sold,
    /// or available → sold directly.
    pub const fn can_transition_to(&self, next: RawMaterialStatus) -> bool {
        matches!(
            (self, next),
            (RawMaterialStatus::Available, RawMaterialStatus::Processed)
                | (RawMaterialStatus::Available, RawMaterialStatus::Sold)
                | (RawMaterialStatus::Processed, RawMaterialStatus::Sold)
        )
    }
}

/// Physical condition of gold bought back from a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RawMaterialCondition {
    New,
    LikeNew,
    Scratched,
    Dented,
    Damaged,
}

string_enum!(RawMaterialCondition, "condition", {
    New => "new",
    LikeNew => "like_new",
    Scratched => "scratched",
    Dented => "dented",
    Damaged => "damaged",
});

impl Default for RawMaterialCondition {
    fn default() -> Self {
        RawMaterialCondition::LikeNew
    }
}

impl RawMaterialCondition {
    /// Label used in purchase line notes.
    pub const fn label(&self) -> &'static str {
        match self {
            RawMaterialCondition::New => "New",
            RawMaterialCondition::LikeNew => "Like new",
            RawMaterialCondition::Scratched => "Scratched",
            RawMaterialCondition::Dented => "Dented",
            RawMaterialCondition::Damaged => "Damaged",
        }
    }
}

// =============================================================================
// Transfer / Location enums
// =============================================================================

/// Transfers complete immediately; `pending` and `cancelled` are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

string_enum!(TransferStatus, "status", {
    Pending => "pending",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Warehouse,
    Store,
}

string_enum!(LocationType, "location_type", {
    Warehouse => "warehouse",
    Store => "store",
});

// =============================================================================
// Reference catalog
// =============================================================================

/// A purity grade carrying the current buy/sell price per gram.
///
/// Prices change only through a price revision so that every change has
/// an audit row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GoldCategory {
    pub id: String,
    /// Business code, e.g. `K24`. Unique among active categories.
    pub code: String,
    pub name: String,
    /// Free-text purity, e.g. `99.9%` or `750`.
    pub purity: Option<String>,
    /// Price the store pays per gram.
    pub buy_price_per_gram: Money,
    /// Price the store charges per gram.
    pub sell_price_per_gram: Money,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl GoldCategory {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        purity: Option<String>,
        buy_price_per_gram: Money,
        sell_price_per_gram: Money,
    ) -> Self {
        let now = Utc::now();
        GoldCategory {
            id: Uuid::new_v4().to_string(),
            code: code.into(),
            name: name.into(),
            purity,
            buy_price_per_gram,
            sell_price_per_gram,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A jewelry design. Physical pieces of it are [`StockItem`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub barcode: String,
    pub name: String,
    /// ring, necklace, bracelet, ...
    pub jewelry_type: Option<String>,
    pub gold_category_id: String,
    pub weight: Weight,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        barcode: impl Into<String>,
        name: impl Into<String>,
        gold_category_id: impl Into<String>,
        weight: Weight,
    ) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            barcode: barcode.into(),
            name: name.into(),
            jewelry_type: None,
            gold_category_id: gold_category_id.into(),
            weight,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A warehouse or store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub code: String,
    pub name: String,
    pub location_type: LocationType,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn new(code: impl Into<String>, name: impl Into<String>, location_type: LocationType) -> Self {
        let now = Utc::now();
        Location {
            id: Uuid::new_v4().to_string(),
            code: code.into(),
            name: name.into(),
            location_type,
            address: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A display tray or safe drawer; belongs to exactly one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StorageBox {
    pub id: String,
    pub location_id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StorageBox {
    pub fn new(location_id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        StorageBox {
            id: Uuid::new_v4().to_string(),
            location_id: location_id.into(),
            code: code.into(),
            name: name.into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this box sits in `location_id`.
    #[inline]
    pub fn belongs_to(&self, location_id: &str) -> bool {
        self.location_id == location_id
    }
}

// =============================================================================
// Stock ledger
// =============================================================================

/// One serialized physical piece of jewelry.
///
/// Prices are never stored here: they are derived from the product weight
/// and the category's current per-gram price (see [`StockItemDetail`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockItem {
    pub id: String,
    pub product_id: String,
    pub location_id: String,
    pub storage_box_id: String,
    /// Immutable, unique among non-deleted stock.
    pub serial_number: String,
    pub status: StockStatus,
    pub supplier_name: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub sold_at: Option<DateTime<Utc>>,
    /// Set while the item is sold by a completed transaction.
    pub transaction_id: Option<String>,
    pub barcode_printed: bool,
    #[ts(as = "Option<String>")]
    pub barcode_printed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A stock item joined with its product, category and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockItemDetail {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub stock: StockItem,
    pub product_name: String,
    pub product_barcode: String,
    pub product_weight: Weight,
    pub gold_category_id: String,
    pub gold_category_name: String,
    pub gold_purity: Option<String>,
    pub buy_price_per_gram: Money,
    pub sell_price_per_gram: Money,
    pub location_name: String,
    pub storage_box_name: String,
}

impl StockItemDetail {
    /// Current selling price: category sell price × product weight.
    pub fn sell_price(&self) -> Money {
        self.sell_price_per_gram.for_weight(self.product_weight)
    }

    /// Current cost basis: category buy price × product weight.
    pub fn buy_price(&self) -> Money {
        self.buy_price_per_gram.for_weight(self.product_weight)
    }
}

/// An immutable record of one stock item moving between placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransfer {
    pub id: String,
    pub transfer_number: String,
    pub stock_id: String,
    pub from_location_id: String,
    pub from_box_id: String,
    pub to_location_id: String,
    pub to_box_id: String,
    pub transferred_by: String,
    pub status: TransferStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub transferred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Transactions
// =============================================================================

/// A completed (or later cancelled) sale or purchase.
///
/// Financial fields are written once at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub code: String,
    pub transaction_type: TransactionType,
    pub member_id: Option<String>,
    pub location_id: String,
    /// Cashier who recorded the transaction.
    pub user_id: String,
    pub sub_total: Money,
    pub discount: Money,
    pub discount_percent: Rate,
    pub tax: Money,
    pub grand_total: Money,
    pub paid_amount: Money,
    pub change_amount: Money,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line of a transaction, snapshotting the goods at the time of the deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    /// Sale lines reference the sold stock item.
    pub stock_id: Option<String>,
    pub product_id: Option<String>,
    /// Purchase lines reference the bought gold category, when known.
    pub gold_category_id: Option<String>,
    pub item_name: String,
    pub barcode: Option<String>,
    pub weight: Weight,
    pub price_per_gram: Money,
    pub unit_price: Money,
    pub quantity: i64,
    pub discount: Money,
    pub sub_total: Money,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A transaction together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Members
// =============================================================================

/// A loyalty member.
///
/// `tier` is a function of `total_purchase`; `points` only grows except
/// through the recalculation sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Member {
    pub id: String,
    pub member_code: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub id_number: Option<String>,
    pub tier: MemberTier,
    pub points: i64,
    /// Cumulative spend on sales (the member buying).
    pub total_purchase: Money,
    /// Cumulative value of gold sold to the store.
    pub total_sell: Money,
    pub transaction_count: i64,
    #[ts(as = "String")]
    pub join_date: DateTime<Utc>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Price revisions
// =============================================================================

/// One batch of gold price changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PriceUpdateLog {
    pub id: String,
    pub updated_by: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub update_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Before/after prices of one category within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PriceDetail {
    pub id: String,
    pub log_id: String,
    pub gold_category_id: String,
    pub old_buy_price: Money,
    pub new_buy_price: Money,
    pub old_sell_price: Money,
    pub new_sell_price: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A price batch with its details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceRevision {
    #[serde(flatten)]
    pub log: PriceUpdateLog,
    pub details: Vec<PriceDetail>,
}

/// Answer to "have prices been revised today?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceUpdateStatus {
    pub needs_update: bool,
    pub last_update: Option<PriceUpdateLog>,
    pub categories: Vec<GoldCategory>,
}

// =============================================================================
// Raw material
// =============================================================================

/// Unprocessed gold received from a customer or supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RawMaterial {
    pub id: String,
    pub code: String,
    pub gold_category_id: Option<String>,
    pub location_id: String,
    pub weight_gross: Weight,
    /// Net weight after shrinkage; the priced weight.
    pub weight: Weight,
    pub shrinkage_percent: Rate,
    pub purity: Option<String>,
    pub buy_price_per_gram: Money,
    /// `weight × buy_price_per_gram`.
    pub total_buy_price: Money,
    pub condition: RawMaterialCondition,
    pub status: RawMaterialStatus,
    pub supplier_name: Option<String>,
    pub member_id: Option<String>,
    pub transaction_id: Option<String>,
    pub received_by: String,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_display() {
        assert_eq!(Weight::from_grams(2).to_string(), "2.000 g");
        assert_eq!(Weight::from_milligrams(2_350).to_string(), "2.350 g");
        assert_eq!(Weight::from_milligrams(5).to_string(), "0.005 g");
    }

    #[test]
    fn test_rate_from_percent() {
        assert_eq!(Rate::from_percent(10).bps(), 1_000);
        assert_eq!(Rate::from_bps(250).to_string(), "2.50%");
        assert!(Rate::default().is_zero());
    }

    #[test]
    fn test_stock_status_gates() {
        assert!(StockStatus::Available.is_sellable());
        assert!(StockStatus::Available.is_transferable());
        assert!(StockStatus::Available.is_deletable());

        for status in [StockStatus::Reserved, StockStatus::Sold, StockStatus::Transfer] {
            assert!(!status.is_sellable());
            assert!(!status.is_transferable());
            assert!(!status.is_deletable());
        }
    }

    #[test]
    fn test_enum_parsing_rejects_unknown_values() {
        assert_eq!("like_new".parse::<RawMaterialCondition>().unwrap(), RawMaterialCondition::LikeNew);
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);

        let err = "bitcoin".parse::<PaymentMethod>().unwrap_err();
        match err {
            ValidationError::NotAllowed { field, allowed } => {
                assert_eq!(field, "payment_method");
                assert_eq!(allowed, vec!["cash", "transfer", "card", "mixed"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enum_serde_matches_storage_form() {
        let json = serde_json::to_string(&RawMaterialCondition::LikeNew).unwrap();
        assert_eq!(json, "\"like_new\"");
        let status: StockStatus = serde_json::from_str("\"sold\"").unwrap();
        assert_eq!(status, StockStatus::Sold);
        assert!(serde_json::from_str::<StockStatus>("\"lost\"").is_err());
    }

    #[test]
    fn test_raw_material_transitions() {
        use RawMaterialStatus::*;
        assert!(Available.can_transition_to(Processed));
        assert!(Available.can_transition_to(Sold));
        assert!(Processed.can_transition_to(Sold));
        assert!(!Processed.can_transition_to(Available));
        assert!(!Sold.can_transition_to(Processed));
        assert!(!Available.can_transition_to(Available));
    }

    #[test]
    fn test_stock_detail_prices_are_live() {
        let now = Utc::now();
        let mut detail = StockItemDetail {
            stock: StockItem {
                id: "s1".into(),
                product_id: "p1".into(),
                location_id: "l1".into(),
                storage_box_id: "b1".into(),
                serial_number: "0000001001".into(),
                status: StockStatus::Available,
                supplier_name: None,
                notes: None,
                received_at: now,
                sold_at: None,
                transaction_id: None,
                barcode_printed: false,
                barcode_printed_at: None,
                created_at: now,
                updated_at: now,
            },
            product_name: "Ring".into(),
            product_barcode: "RG-1".into(),
            product_weight: Weight::from_grams(2),
            gold_category_id: "c1".into(),
            gold_category_name: "24K".into(),
            gold_purity: None,
            buy_price_per_gram: Money::from_rupiah(450_000),
            sell_price_per_gram: Money::from_rupiah(500_000),
            location_name: "Store".into(),
            storage_box_name: "Tray A".into(),
        };
        assert_eq!(detail.sell_price().rupiah(), 1_000_000);
        assert_eq!(detail.buy_price().rupiah(), 900_000);

        detail.sell_price_per_gram = Money::from_rupiah(510_000);
        assert_eq!(detail.sell_price().rupiah(), 1_020_000);
    }

    #[test]
    fn test_storage_box_belongs_to() {
        let tray = StorageBox::new("loc-1", "A1", "Tray A1");
        assert!(tray.belongs_to("loc-1"));
        assert!(!tray.belongs_to("loc-2"));
    }
}
