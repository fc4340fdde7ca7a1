//! # Error Types
//!
//! Domain-specific error types for aurum-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  aurum-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger / transaction rule violations            │
//! │  ├── ValidationError  - Malformed or out-of-range input                 │
//! │  └── ErrorKind        - Stable classification shared by every layer     │
//! │                                                                         │
//! │  aurum-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ErrorBody → HTTP layer   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Kinds
//! | Kind          | HTTP | Examples                                         |
//! |---------------|------|--------------------------------------------------|
//! | `validation`  | 400  | stock not in sale location, underpayment         |
//! | `not_found`   | 404  | unknown member, unknown destination box          |
//! | `conflict`    | 400  | stock already sold, transaction already cancelled|
//! | `persistence` | 500  | pool exhausted, migration failure                |

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{RawMaterialStatus, StockStatus, TransactionStatus};

// =============================================================================
// Error Kind
// =============================================================================

/// The four stable error classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Persistence,
}

impl ErrorKind {
    /// Machine-readable code for API consumers.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Persistence => "persistence_error",
        }
    }

    /// HTTP status hint. Conflicts answer 400, matching what existing
    /// POS clients already handle.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::Conflict => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Persistence => 500,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations of the ledger and transaction engines.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale line names a stock item that does not exist.
    #[error("Stock not found: {stock_id}")]
    SaleStockMissing { stock_id: String },

    /// The stock item is not in a state that allows the operation.
    ///
    /// ## When This Occurs
    /// ```text
    /// Cashier A: sell SN-001 ──► sold
    /// Cashier B: sell SN-001 ──► StockNotAvailable { status: Sold }
    /// ```
    #[error("Stock {serial_number} is not available (status: {status})")]
    StockNotAvailable {
        serial_number: String,
        status: StockStatus,
    },

    /// The stock item changed between validation and the atomic update.
    #[error("Stock {serial_number} was modified by a concurrent operation")]
    StockModified { serial_number: String },

    /// A sale tried to consume stock held at another location.
    #[error("Stock {serial_number} is not at location {location_id}")]
    StockNotInLocation {
        serial_number: String,
        location_id: String,
    },

    /// Soft delete of stock that has left the available state.
    #[error("Stock {serial_number} cannot be deleted while {status}")]
    StockNotDeletable {
        serial_number: String,
        status: StockStatus,
    },

    /// Paid amount is below the grand total.
    #[error("Insufficient payment: grand total {grand_total}, paid {paid}")]
    InsufficientPayment { grand_total: Money, paid: Money },

    /// A storage box was addressed through the wrong location.
    #[error("Storage box {box_id} does not belong to location {location_id}")]
    BoxNotInLocation { box_id: String, location_id: String },

    /// Transaction is not in a state that allows the requested operation.
    #[error("Transaction {code} is {status}, cannot perform operation")]
    InvalidTransactionStatus {
        code: String,
        status: TransactionStatus,
    },

    /// Raw material can no longer be changed or deleted.
    #[error("Raw material {code} is {status}, cannot perform operation")]
    RawMaterialNotAvailable {
        code: String,
        status: RawMaterialStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::SaleStockMissing { .. }
            | CoreError::StockNotInLocation { .. }
            | CoreError::InsufficientPayment { .. }
            | CoreError::BoxNotInLocation { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::StockNotAvailable { .. }
            | CoreError::StockModified { .. }
            | CoreError::StockNotDeletable { .. }
            | CoreError::InvalidTransactionStatus { .. }
            | CoreError::RawMaterialNotAvailable { .. } => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The same value appears twice in one request.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required { field: field.into() }
    }

    pub fn negative(field: impl Into<String>) -> Self {
        ValidationError::Negative { field: field.into() }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::StockNotAvailable {
            serial_number: "0ABCDEF001".to_string(),
            status: StockStatus::Sold,
        };
        assert_eq!(err.to_string(), "Stock 0ABCDEF001 is not available (status: sold)");

        let err = CoreError::InsufficientPayment {
            grand_total: Money::from_rupiah(1_000_000),
            paid: Money::from_rupiah(900_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: grand total Rp1.000.000, paid Rp900.000"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("items").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kinds() {
        let conflict = CoreError::InvalidTransactionStatus {
            code: "SL20260101ABCD1234".into(),
            status: TransactionStatus::Cancelled,
        };
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(conflict.kind().http_status(), 400);

        let misplaced = CoreError::StockNotInLocation {
            serial_number: "X".into(),
            location_id: "L".into(),
        };
        assert_eq!(misplaced.kind(), ErrorKind::Validation);

        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::Persistence.http_status(), 500);
        assert_eq!(ErrorKind::Conflict.as_str(), "conflict");
    }
}
