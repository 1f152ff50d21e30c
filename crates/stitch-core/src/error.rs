//! # Error Types
//!
//! Domain-specific error types for stitch-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stitch-core errors (this file)                                        │
//! │  ├── PricingError     - Tier resolution and tier data failures         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stitch-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  web errors (apps/web)                                                 │
//! │  └── ApiError         - What the browser sees (code + message)         │
//! │                                                                         │
//! │  Flow: PricingError/ValidationError → CoreError → ApiError → Browser   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Pricing Error
// =============================================================================

/// Errors raised while validating tiers or resolving a unit price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Requested quantity is zero or negative.
    ///
    /// User-correctable: the quantity input must be fixed.
    #[error("Quantity must be at least 1 (got {quantity})")]
    InvalidQuantity { quantity: i64 },

    /// A stored or submitted tier is malformed (e.g. max below min).
    ///
    /// ## When This Occurs
    /// - Factory owner typed a range backwards
    /// - Price is not a non-negative decimal
    /// - Legacy rows written before write-time validation existed
    #[error("Invalid price tier {min_quantity}..{}: {reason}", fmt_max(.max_quantity))]
    InvalidTierData {
        min_quantity: i64,
        max_quantity: Option<i64>,
        reason: String,
    },

    /// Two tiers of the same product cover a common quantity.
    #[error("Price tiers starting at {first_min} and {second_min} overlap")]
    OverlappingTiers { first_min: i64, second_min: i64 },

    /// An open-ended tier is not the one covering the largest quantities.
    #[error("Open-ended tier starting at {min_quantity} must be the last tier")]
    UnboundedTierNotLast { min_quantity: i64 },

    /// `unit_price * quantity` does not fit the decimal range.
    #[error("Total for quantity {quantity} is out of range")]
    TotalOverflow { quantity: i64 },
}

fn fmt_max(max: &Option<i64>) -> String {
    match max {
        Some(max) => max.to_string(),
        None => "∞".to_string(),
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They are translated to localized messages at the web boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found or is no longer listed.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is not accepting orders.
    #[error("Product {0} is not available for ordering")]
    ProductUnavailable(String),

    /// Order quantity is below the product's minimum order quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Buyer enters quantity: 40
    ///      │
    ///      ▼
    /// Product MOQ: 100
    ///      │
    ///      ▼
    /// BelowMinimumOrder { moq: 100, requested: 40 }
    ///      │
    ///      ▼
    /// Form shows: "Minimum order is 100 pieces"
    /// ```
    #[error("Quantity {requested} is below the minimum order quantity ({moq})")]
    BelowMinimumOrder { moq: i64, requested: i64 },

    /// Quantity exceeds the hard upper limit.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A status change that the lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Shipping an order that was never confirmed
    /// - Approving a sample request that was already declined
    /// - Verifying a payment twice
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The caller's role may not perform this step.
    #[error("A {role} cannot {action}")]
    NotPermitted { role: String, action: String },

    /// Order is in a state that cannot be invoiced.
    #[error("Order {order_number} is {status} and cannot be invoiced")]
    OrderNotInvoiceable {
        order_number: String,
        status: String,
    },

    /// Invoice no longer accepts payments.
    #[error("Invoice {invoice_number} is {status} and does not accept payments")]
    InvoiceNotPayable {
        invoice_number: String,
        status: String,
    },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// A monetary value does not fit in the cents range.
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// Pricing failure (wraps PricingError).
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
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

    /// Invalid format (e.g., invalid UUID, invalid decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The request body could not be read into a form or JSON document.
    #[error("Request body is invalid: {reason}")]
    MalformedBody { reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
