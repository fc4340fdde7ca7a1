//! # aurum-db: Storage and Consistency Engine for Aurum POS
//!
//! SQLite storage for the jewelry ledger, plus every operation that must
//! change several rows at once.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aurum POS Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (sell, transfer, revise prices, ...)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     aurum-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐   │   │
//! │  │   │   Database    │    │    Repositories    │  │ Migrations │   │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │   │   │
//! │  │   │               │    │ StockRepository    │  │            │   │   │
//! │  │   │ SqlitePool    │◄───│ TransactionRepo    │  │ 001_...sql │   │   │
//! │  │   │ WAL, FK on    │    │ TransferRepository │  │            │   │   │
//! │  │   │               │    │ PriceRepository    │  │            │   │   │
//! │  │   │               │    │ MemberRepository   │  │            │   │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (aurum.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - The ledger, the engines and their reads
//! - [`config`] - Environment configuration for the binaries
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aurum_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("aurum.db")).await?;
//!
//! let pieces = db.stocks().receive(&receive_request).await?;
//! let sale = db.transactions().create_sale(&sale_request, &cashier_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod telemetry;

#[cfg(test)]
mod testutil;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult, ErrorBody};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::member::MemberRepository;
pub use repository::price::PriceRepository;
pub use repository::raw_material::RawMaterialRepository;
pub use repository::stock::StockRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::transfer::TransferRepository;
