//! # Orders & Samples
//!
//! Order submission rules and the order / sample request lifecycles.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  pending ──► confirmed ──► in_production ──► shipped ──► delivered      │
//! │     │            │                                                      │
//! │     └────────────┴──────► cancelled                                     │
//! │                                                                         │
//! │  factory: every forward step, cancel while pending/confirmed           │
//! │  buyer:   cancel while pending, confirm delivery once shipped          │
//! │  admin:   any step the lifecycle allows                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sample Lifecycle
//! ```text
//!  requested ──► approved ──► shipped ──► delivered
//!      │
//!      └──────► declined
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, PricingError};
use crate::money::Money;
use crate::pricing::{resolve_unit_price, PriceQuote};
use crate::tiers::PriceTier;
use crate::types::{OrderStatus, Product, SampleStatus, UserRole};
use crate::validation::validate_sample_quantity;
use crate::MAX_ORDER_QUANTITY;

// =============================================================================
// Order Lifecycle
// =============================================================================

impl OrderStatus {
    /// Statuses reachable from this one, regardless of who asks.
    pub fn next_statuses(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[InProduction, Cancelled],
            InProduction => &[Shipped],
            Shipped => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    /// Checks the lifecycle table only.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    /// True once the factory has accepted the order and it is not cancelled.
    pub fn is_invoiceable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::InProduction
                | OrderStatus::Shipped
                | OrderStatus::Delivered
        )
    }

    /// Validates a status change requested by `role`.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidTransition`] if the lifecycle forbids it
    /// - [`CoreError::NotPermitted`] if the lifecycle allows it but not for `role`
    pub fn transition(self, next: OrderStatus, role: UserRole) -> CoreResult<OrderStatus> {
        if !self.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity: "order",
                from: self.to_string(),
                to: next.to_string(),
            });
        }

        let allowed = match role {
            UserRole::Admin | UserRole::Factory => true,
            UserRole::Buyer => matches!(
                (self, next),
                (OrderStatus::Pending, OrderStatus::Cancelled)
                    | (OrderStatus::Shipped, OrderStatus::Delivered)
            ),
        };

        if !allowed {
            return Err(CoreError::NotPermitted {
                role: role.to_string(),
                action: format!("move an order to {}", next),
            });
        }

        Ok(next)
    }
}

// =============================================================================
// Sample Lifecycle
// =============================================================================

impl SampleStatus {
    pub fn next_statuses(&self) -> &'static [SampleStatus] {
        use SampleStatus::*;
        match self {
            Requested => &[Approved, Declined],
            Approved => &[Shipped],
            Shipped => &[Delivered],
            Delivered | Declined => &[],
        }
    }

    pub fn can_transition_to(&self, next: SampleStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Validates a status change requested by `role`.
    ///
    /// Only the factory (or an admin) moves samples, except that the buyer
    /// may confirm a shipped sample as delivered.
    pub fn transition(self, next: SampleStatus, role: UserRole) -> CoreResult<SampleStatus> {
        if !self.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity: "sample request",
                from: self.to_string(),
                to: next.to_string(),
            });
        }

        let allowed = match role {
            UserRole::Admin | UserRole::Factory => true,
            UserRole::Buyer => next == SampleStatus::Delivered,
        };

        if !allowed {
            return Err(CoreError::NotPermitted {
                role: role.to_string(),
                action: format!("move a sample request to {}", next),
            });
        }

        Ok(next)
    }
}

// =============================================================================
// Order Submission
// =============================================================================

/// Authoritative quote for an order submission.
///
/// ## Rules (in order)
/// 1. Product must be active
/// 2. Quantity must be ≥ 1 ([`PricingError::InvalidQuantity`])
/// 3. Quantity must be ≤ [`MAX_ORDER_QUANTITY`]
/// 4. Quantity must be ≥ the product's MOQ
/// 5. Unit price comes from the tier resolver
///
/// ## Example
/// ```text
/// Product: base 120, MOQ 10, tiers [1..49 @ 100] [50..199 @ 90] [200.. @ 75]
///
/// quote_order(product, tiers, 5)    → BelowMinimumOrder { moq: 10, requested: 5 }
/// quote_order(product, tiers, 50)   → 90 × 50 = 4500
/// ```
pub fn quote_order(product: &Product, tiers: &[PriceTier], quantity: i64) -> CoreResult<PriceQuote> {
    if !product.is_active {
        return Err(CoreError::ProductUnavailable(product.id.clone()));
    }

    if quantity <= 0 {
        return Err(PricingError::InvalidQuantity { quantity }.into());
    }

    if quantity > MAX_ORDER_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ORDER_QUANTITY,
        });
    }

    if quantity < product.moq {
        return Err(CoreError::BelowMinimumOrder {
            moq: product.moq,
            requested: quantity,
        });
    }

    Ok(resolve_unit_price(product.base_price, tiers, quantity)?)
}

/// Charge for a sample request: `sample_price × quantity`, or zero when the
/// product offers free samples.
pub fn sample_charge(product: &Product, quantity: i64) -> CoreResult<Money> {
    if !product.is_active {
        return Err(CoreError::ProductUnavailable(product.id.clone()));
    }

    validate_sample_quantity(quantity)?;

    match product.sample_price {
        Some(price) => {
            let total = price
                .checked_mul(Decimal::from(quantity))
                .ok_or(PricingError::TotalOverflow { quantity })?;
            Money::from_decimal(total)
        }
        None => Ok(Money::zero()),
    }
}

// =============================================================================
// Document Numbers
// =============================================================================

/// Prefix for order numbers.
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Prefix for invoice numbers.
pub const INVOICE_NUMBER_PREFIX: &str = "INV";

/// Formats a daily-sequenced document number: `PREFIX-YYYYMMDD-NNNN`.
///
/// `sequence` is 1-based within the day; it widens past four digits rather
/// than wrapping.
///
/// ```rust
/// use chrono::NaiveDate;
/// use stitch_core::orders::document_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
/// assert_eq!(document_number("ORD", day, 7), "ORD-20260309-0007");
/// ```
pub fn document_number(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), sequence)
}

// =============================================================================
// Unit Tests
// =============================================================================
