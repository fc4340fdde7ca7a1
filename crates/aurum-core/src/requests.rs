//! # Requests
//!
//! Inputs of the atomic operations, plus list filters.
//!
//! Each request carries a `validate()` that checks shape only (presence,
//! ranges, duplicates). Existence and status checks need the store and run
//! in aurum-db. The acting user id is passed next to the request, never
//! inside it, because it comes from the authenticated session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    LocationType, PaymentMethod, Rate, RawMaterialCondition, RawMaterialStatus, StockStatus,
    TransactionStatus, TransactionType, Weight,
};
use crate::validation::{
    validate_amount, validate_distinct, validate_line_count, validate_name,
    validate_optional_text, validate_rate, validate_receive_quantity, validate_uuid,
    validate_weight, ValidationResult,
};

const MAX_NOTES: usize = 500;
const MAX_NAME: usize = 100;

// =============================================================================
// Sale
// =============================================================================

/// One stock item on a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub stock_id: String,
    /// Discount on this piece, subtracted from its live sell price.
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A sale of serialized stock to a member or walk-in customer.
///
/// `discount_percent` wins over `discount` when it is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub location_id: String,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<SaleLine>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub discount_percent: Rate,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub paid_amount: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SaleRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("location_id", &self.location_id)?;
        if let Some(member_id) = &self.member_id {
            validate_uuid("member_id", member_id)?;
        }
        validate_customer(self.customer_name.as_deref(), self.customer_phone.as_deref())?;
        validate_line_count(self.items.len())?;
        for line in &self.items {
            validate_uuid("stock_id", &line.stock_id)?;
            validate_amount("discount", line.discount)?;
            validate_optional_text("notes", line.notes.as_deref(), MAX_NOTES)?;
        }
        validate_distinct("stock_id", self.items.iter().map(|l| l.stock_id.as_str()))?;
        validate_amount("discount", self.discount)?;
        validate_rate("discount_percent", self.discount_percent)?;
        validate_amount("tax", self.tax)?;
        validate_amount("paid_amount", self.paid_amount)?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES)
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// One lot of gold bought from a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLine {
    #[serde(default)]
    pub gold_category_id: Option<String>,
    /// Purity as written by the cashier, used when no category is chosen.
    #[serde(default)]
    pub purity: Option<String>,
    /// Weight on the scale; zero means "same as net weight".
    #[serde(default)]
    pub weight_gross: Weight,
    #[serde(default)]
    pub shrinkage_percent: Rate,
    /// Net (priced) weight.
    pub weight: Weight,
    pub price_per_gram: Money,
    #[serde(default)]
    pub condition: RawMaterialCondition,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PurchaseLine {
    /// Gross weight, defaulting to the net weight when not recorded.
    pub fn effective_weight_gross(&self) -> Weight {
        if self.weight_gross.is_zero() {
            self.weight
        } else {
            self.weight_gross
        }
    }
}

/// The store buying gold from a member or walk-in customer ("setor").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseRequest {
    pub location_id: String,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<PurchaseLine>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    /// Also book every line as raw material in the same unit of work.
    #[serde(default)]
    pub save_as_raw_material: bool,
}

impl PurchaseRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("location_id", &self.location_id)?;
        if let Some(member_id) = &self.member_id {
            validate_uuid("member_id", member_id)?;
        }
        validate_customer(self.customer_name.as_deref(), self.customer_phone.as_deref())?;
        validate_line_count(self.items.len())?;
        for line in &self.items {
            if let Some(category_id) = &line.gold_category_id {
                validate_uuid("gold_category_id", category_id)?;
            }
            validate_optional_text("purity", line.purity.as_deref(), 50)?;
            validate_weight("weight", line.weight)?;
            validate_gross_weight(line.weight_gross)?;
            if line.effective_weight_gross() < line.weight {
                return Err(ValidationError::OutOfRange {
                    field: "weight".to_string(),
                    min: 1,
                    max: line.effective_weight_gross().milligrams(),
                });
            }
            validate_rate("shrinkage_percent", line.shrinkage_percent)?;
            validate_amount("price_per_gram", line.price_per_gram)?;
            validate_optional_text("notes", line.notes.as_deref(), MAX_NOTES)?;
        }
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES)
    }
}

/// Gross weight is optional (zero means "same as net").
fn validate_gross_weight(weight_gross: Weight) -> ValidationResult<()> {
    if weight_gross.milligrams() < 0 {
        return Err(ValidationError::negative("weight_gross"));
    }
    if weight_gross.is_zero() {
        return Ok(());
    }
    validate_weight("weight_gross", weight_gross)
}

fn validate_customer(name: Option<&str>, phone: Option<&str>) -> ValidationResult<()> {
    validate_optional_text("customer_name", name, MAX_NAME)?;
    validate_optional_text("customer_phone", phone, 30)
}

// =============================================================================
// Stock receipt & transfer
// =============================================================================

/// Receive `quantity` new pieces of a product into a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiveStockRequest {
    pub product_id: String,
    pub location_id: String,
    pub storage_box_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReceiveStockRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("product_id", &self.product_id)?;
        validate_uuid("location_id", &self.location_id)?;
        validate_uuid("storage_box_id", &self.storage_box_id)?;
        validate_receive_quantity(self.quantity)?;
        validate_optional_text("supplier_name", self.supplier_name.as_deref(), MAX_NAME)?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES)
    }
}

/// Move one available stock item to another location/box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferRequest {
    pub stock_id: String,
    pub to_location_id: String,
    pub to_box_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransferRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("stock_id", &self.stock_id)?;
        validate_uuid("to_location_id", &self.to_location_id)?;
        validate_uuid("to_box_id", &self.to_box_id)?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES)
    }
}

// =============================================================================
// Price revision
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceEntry {
    pub gold_category_id: String,
    pub new_buy_price: Money,
    pub new_sell_price: Money,
}

/// A batch of per-gram price changes, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceRevisionRequest {
    pub entries: Vec<PriceEntry>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PriceRevisionRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.entries.is_empty() {
            return Err(ValidationError::required("entries"));
        }
        for entry in &self.entries {
            validate_uuid("gold_category_id", &entry.gold_category_id)?;
            validate_amount("new_buy_price", entry.new_buy_price)?;
            validate_amount("new_sell_price", entry.new_sell_price)?;
        }
        validate_distinct(
            "gold_category_id",
            self.entries.iter().map(|e| e.gold_category_id.as_str()),
        )?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES)
    }
}

// =============================================================================
// Members & raw material
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
}

impl NewMember {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name, MAX_NAME)?;
        validate_optional_text("phone", self.phone.as_deref(), 30)?;
        validate_optional_text("email", self.email.as_deref(), MAX_NAME)?;
        validate_optional_text("address", self.address.as_deref(), MAX_NOTES)?;
        validate_optional_text("id_number", self.id_number.as_deref(), 50)
    }
}

/// Raw material booked directly (not through a purchase), e.g. from a
/// refinery supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewRawMaterial {
    pub location_id: String,
    #[serde(default)]
    pub gold_category_id: Option<String>,
    #[serde(default)]
    pub weight_gross: Weight,
    #[serde(default)]
    pub shrinkage_percent: Rate,
    pub weight: Weight,
    #[serde(default)]
    pub purity: Option<String>,
    pub buy_price_per_gram: Money,
    #[serde(default)]
    pub condition: RawMaterialCondition,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewRawMaterial {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("location_id", &self.location_id)?;
        if let Some(category_id) = &self.gold_category_id {
            validate_uuid("gold_category_id", category_id)?;
        }
        validate_weight("weight", self.weight)?;
        validate_gross_weight(self.weight_gross)?;
        validate_rate("shrinkage_percent", self.shrinkage_percent)?;
        validate_amount("buy_price_per_gram", self.buy_price_per_gram)?;
        validate_optional_text("supplier_name", self.supplier_name.as_deref(), MAX_NAME)?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES)
    }
}

/// Corrections to an `available` raw material lot. `None` keeps the stored
/// value. The total buy price is always recomputed from the resulting net
/// weight and per-gram price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RawMaterialUpdate {
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub gold_category_id: Option<String>,
    #[serde(default)]
    pub weight_gross: Option<Weight>,
    #[serde(default)]
    pub weight: Option<Weight>,
    #[serde(default)]
    pub shrinkage_percent: Option<Rate>,
    #[serde(default)]
    pub purity: Option<String>,
    #[serde(default)]
    pub buy_price_per_gram: Option<Money>,
    #[serde(default)]
    pub condition: Option<RawMaterialCondition>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RawMaterialUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(location_id) = &self.location_id {
            validate_uuid("location_id", location_id)?;
        }
        if let Some(category_id) = &self.gold_category_id {
            validate_uuid("gold_category_id", category_id)?;
        }
        if let Some(weight) = self.weight {
            validate_weight("weight", weight)?;
        }
        if let Some(weight_gross) = self.weight_gross {
            validate_weight("weight_gross", weight_gross)?;
        }
        if let Some(rate) = self.shrinkage_percent {
            validate_rate("shrinkage_percent", rate)?;
        }
        validate_optional_text("purity", self.purity.as_deref(), 50)?;
        if let Some(price) = self.buy_price_per_gram {
            validate_amount("buy_price_per_gram", price)?;
        }
        validate_optional_text("supplier_name", self.supplier_name.as_deref(), MAX_NAME)?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_NOTES)
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Stock list filter. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockFilter {
    pub location_id: Option<String>,
    pub storage_box_id: Option<String>,
    pub product_id: Option<String>,
    pub status: Option<StockStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferFilter {
    pub stock_id: Option<String>,
    pub from_location_id: Option<String>,
    pub to_location_id: Option<String>,
}

/// Transaction list filter. `from`/`to` bound `transaction_date` as
/// `[from, to)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub location_id: Option<String>,
    pub member_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RawMaterialFilter {
    pub location_id: Option<String>,
    pub status: Option<RawMaterialStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocationFilter {
    pub location_type: Option<LocationType>,
}

// =============================================================================
// Unit Tests
// =============================================================================
