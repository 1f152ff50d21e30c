//! # Validation Module
//!
//! Input validation utilities for Stitch Market forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser form                                                 │
//! │  ├── required / min / max attributes                                   │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Form handler (Rust)                                          │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::{MAX_ORDER_QUANTITY, MAX_SAMPLE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest bank or transfer reference accepted.
pub const MAX_REFERENCE_LEN: usize = 64;

/// Longest free-text note accepted on orders, samples and reviews.
pub const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name (product, factory, sender).
///
/// ## Returns
/// The trimmed value.
///
/// ## Example
/// ```rust
/// use stitch_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Denim Jacket ", 200).unwrap(), "Denim Jacket");
/// assert!(validate_name("name", "   ", 200).is_err());
/// ```
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional free-text field; blank input becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Validates a transfer reference (letters, digits, `-`, `/`, spaces).
pub fn validate_reference(value: &str) -> ValidationResult<String> {
    let reference = validate_name("reference", value, MAX_REFERENCE_LEN)?;

    if !reference
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '/' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: "reference".to_string(),
            reason: "must contain only letters, numbers, spaces, '-' and '/'".to_string(),
        });
    }

    Ok(reference)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses a non-negative price from form text.
///
/// ## Example
/// ```rust
/// use stitch_core::validation::validate_price;
///
/// assert!(validate_price("base_price", "12.50").is_ok());
/// assert!(validate_price("base_price", "0").is_ok());
/// assert!(validate_price("base_price", "-1").is_err());
/// assert!(validate_price("base_price", "abc").is_err());
/// ```
pub fn validate_price(field: &str, value: &str) -> ValidationResult<Decimal> {
    let price = Decimal::from_str(value.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a decimal number".to_string(),
    })?;

    if price < Decimal::ZERO {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(price)
}

/// Validates a product's minimum order quantity.
pub fn validate_moq(moq: i64) -> ValidationResult<()> {
    if !(1..=MAX_ORDER_QUANTITY).contains(&moq) {
        return Err(ValidationError::OutOfRange {
            field: "moq".to_string(),
            min: 1,
            max: MAX_ORDER_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of sample pieces requested.
///
/// ## Rules
/// - Between 1 and [`MAX_SAMPLE_QUANTITY`]
pub fn validate_sample_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_SAMPLE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_SAMPLE_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
