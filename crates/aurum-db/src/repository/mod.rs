//! # Repository Module
//!
//! Database repositories and the atomic engines of Aurum POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Engines                             │
//! │                                                                         │
//! │  HTTP handler / bin                                                     │
//! │       │                                                                 │
//! │       │  db.transactions().create_sale(&request, &user_id)              │
//! │       ▼                                                                 │
//! │  TransactionRepository                                                  │
//! │  ├── validation pre-pass (pool reads, no transaction held)              │
//! │  └── atomic unit (one sqlx::Transaction)                                │
//! │        ├── header INSERT            ← first write takes the lock        │
//! │        ├── stock::mark_sold (CAS)   ← 0 rows = concurrent change        │
//! │        ├── item INSERTs                                                 │
//! │        └── member::apply (loyalty accrual)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Gold categories, products, locations, boxes
//! - [`StockRepository`](stock::StockRepository) - Serialized stock ledger
//! - [`TransferRepository`](transfer::TransferRepository) - Stock moves between placements
//! - [`TransactionRepository`](transaction::TransactionRepository) - Sales, purchases, cancellation
//! - [`PriceRepository`](price::PriceRepository) - Price revisions and their audit log
//! - [`MemberRepository`](member::MemberRepository) - Members and loyalty
//! - [`RawMaterialRepository`](raw_material::RawMaterialRepository) - Unprocessed gold

pub mod catalog;
pub mod member;
pub mod price;
pub mod raw_material;
pub mod stock;
pub mod transaction;
pub mod transfer;

use crate::error::DbError;

/// Re-labels a unique violation with the business field and value the
/// caller knows about. SQLite only reports `table.column`.
pub(crate) fn unique_as<'a>(
    field: &'static str,
    value: &'a str,
) -> impl FnOnce(sqlx::Error) -> DbError + 'a {
    move |err| match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate(field, value),
        other => other,
    }
}
