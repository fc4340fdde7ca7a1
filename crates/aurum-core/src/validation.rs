//! # Validation Module
//!
//! Input validation utilities for Aurum POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                  │
//! │  └── Deserialization (unknown enum values rejected by serde)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Request::validate() (THIS MODULE)                             │
//! │  ├── Shape checks: required ids, ranges, duplicates                     │
//! │  └── No database access                                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: aurum-db pre-pass                                             │
//! │  ├── Existence (NotFound), placement and status checks                  │
//! │  └── Then the atomic unit with compare-and-swap updates                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite constraints (UNIQUE, FOREIGN KEY, CHECK)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Rate, Weight};
use crate::{MAX_AMOUNT_RUPIAH, MAX_RECEIVE_QUANTITY, MAX_TRANSACTION_LINES, MAX_WEIGHT_MILLIGRAMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that an identifier or code is present.
///
/// ```rust
/// use aurum_core::validation::validate_required;
///
/// assert!(validate_required("location_id", "loc-1").is_ok());
/// assert!(validate_required("location_id", "  ").is_err());
/// ```
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates a display name: present and at most `max` characters.
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    validate_required(field, value)?;

    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field's length.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a UUID string format.
///
/// ```rust
/// use aurum_core::validation::validate_uuid;
///
/// assert!(validate_uuid("stock_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("stock_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    validate_required(field, id)?;

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a money field: zero or more, and at most [`MAX_AMOUNT_RUPIAH`].
///
/// ```rust
/// use aurum_core::money::Money;
/// use aurum_core::validation::validate_amount;
///
/// assert!(validate_amount("tax", Money::from_rupiah(11_000)).is_ok());
/// assert!(validate_amount("tax", Money::from_rupiah(-1)).is_err());
/// assert!(validate_amount("tax", Money::from_rupiah(i64::MAX)).is_err());
/// ```
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::negative(field));
    }
    if amount.rupiah() > MAX_AMOUNT_RUPIAH {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_RUPIAH,
        });
    }
    Ok(())
}

/// Validates a percentage: 0% to 100%.
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate > Rate::FULL {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Rate::FULL.bps() as i64,
        });
    }
    Ok(())
}

/// Validates a measured weight: more than zero, at most
/// [`MAX_WEIGHT_MILLIGRAMS`].
pub fn validate_weight(field: &str, weight: Weight) -> ValidationResult<()> {
    if !weight.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if weight.milligrams() > MAX_WEIGHT_MILLIGRAMS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_WEIGHT_MILLIGRAMS,
        });
    }
    Ok(())
}

/// Validates the size of a receiving batch.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed [`MAX_RECEIVE_QUANTITY`]; the serial sequence suffix is
///   three base-36 digits, so a batch can never run out of suffixes.
pub fn validate_receive_quantity(quantity: u32) -> ValidationResult<()> {
    if quantity == 0 || quantity > MAX_RECEIVE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_RECEIVE_QUANTITY as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on one transaction.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::required("items"));
    }

    if count > MAX_TRANSACTION_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_TRANSACTION_LINES as i64,
        });
    }

    Ok(())
}

/// Rejects a value appearing twice in the same request.
pub fn validate_distinct<'a>(
    field: &str,
    values: impl IntoIterator<Item = &'a str>,
) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(ValidationError::Duplicate {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
