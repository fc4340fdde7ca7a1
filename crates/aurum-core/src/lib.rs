//! # aurum-core: Pure Domain Logic for Aurum POS
//!
//! The rules of the jewelry ledger as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aurum POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          HTTP layer (auth, permissions, routing)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    aurum-db (storage + engines)                 │   │
//! │  │   stock ledger • sales/purchases • transfers • price log        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ aurum-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐   │   │
//! │  │   │  types  │ │  money  │ │ pricing │ │ loyalty │ │  codes  │   │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘   │   │
//! │  │   ┌──────────┐ ┌────────────┐ ┌─────────┐                       │   │
//! │  │   │ requests │ │ validation │ │  error  │                       │   │
//! │  │   └──────────┘ └────────────┘ └─────────┘                       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and closed enums (StockItem, Transaction, Member, ...)
//! - [`money`] - Integer rupiah with weight and percentage pricing
//! - [`pricing`] - Sale and purchase totals
//! - [`loyalty`] - Member tier and points rules
//! - [`codes`] - Serial numbers and business codes
//! - [`requests`] - Operation inputs and list filters
//! - [`validation`] - Shape validation
//! - [`error`] - Domain error types and stable kinds
//!
//! ## Example Usage
//!
//! ```rust
//! use aurum_core::money::Money;
//! use aurum_core::pricing::SaleTotals;
//! use aurum_core::types::{Rate, Weight};
//!
//! let price = Money::from_rupiah(500_000).for_weight(Weight::from_grams(2));
//! let totals = SaleTotals::compute([price], Money::zero(), Rate::zero(), Money::zero(), price)
//!     .unwrap();
//! assert_eq!(totals.grand_total.rupiah(), 1_000_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codes;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod requests;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use loyalty::LoyaltyStanding;
pub use money::Money;
pub use pricing::{PurchaseTotals, SaleTotals};
pub use requests::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single sale or purchase.
pub const MAX_TRANSACTION_LINES: usize = 100;

/// Maximum pieces received in one batch.
///
/// Bounded well below 36³ so the three-character serial suffix never
/// wraps.
pub const MAX_RECEIVE_QUANTITY: u32 = 1_000;

/// Largest amount accepted on any money field or computed total, in rupiah
/// (one trillion).
///
/// With [`MAX_WEIGHT_MILLIGRAMS`] this keeps `price × weight` well inside
/// `i64`; totals summed past it are rejected instead of wrapping.
pub const MAX_AMOUNT_RUPIAH: i64 = 1_000_000_000_000;

/// Heaviest single piece or lot accepted (100 kg).
pub const MAX_WEIGHT_MILLIGRAMS: i64 = 100_000_000;
