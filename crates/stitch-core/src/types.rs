//! # Domain Types
//!
//! Core domain types used throughout Stitch Market.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Factory      │──►│    Product      │──►│   PriceTier     │       │
//! │  │  owner_id       │   │  base_price     │   │  min..max       │       │
//! │  │  is_verified    │   │  moq            │   │  unit_price     │       │
//! │  └─────────────────┘   └───────┬─────────┘   └─────────────────┘       │
//! │                                │                                        │
//! │               ┌────────────────┴────────────────┐                       │
//! │               ▼                                 ▼                       │
//! │  ┌─────────────────┐                   ┌─────────────────┐              │
//! │  │     Order       │                   │ SampleRequest   │              │
//! │  │  unit_price     │                   │  quantity ≤ 10  │              │
//! │  │  total_cents    │                   │  charge_cents   │              │
//! │  └───────┬─────────┘                   └─────────────────┘              │
//! │          ▼                                                              │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │    Invoice      │◄──│    Payment      │  bank_transfer |             │
//! │  │  total_cents    │   │  amount_cents   │  cash_transfer               │
//! │  │  amount_paid    │   │  status         │                              │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Orders freeze the product name and resolved unit price at submission, so
//! later edits to the product or its tiers never change a placed order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// User Role
// =============================================================================

/// Role carried in the auth provider's access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Apparel business placing orders.
    Buyer,
    /// Garment factory owner.
    Factory,
    /// Marketplace operator.
    Admin,
}

impl UserRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UserRole::Buyer => "buyer",
            UserRole::Factory => "factory",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Factory
// =============================================================================

/// A garment factory listed on the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Factory {
    pub id: String,
    /// Auth subject of the owning user.
    pub owner_id: String,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    /// Comma-separated specialties ("denim, knitwear").
    pub specialties: Option<String>,
    pub is_verified: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product offered by a factory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub factory_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Unit price when no tier applies.
    #[ts(as = "String")]
    pub base_price: Decimal,
    /// Minimum order quantity.
    pub moq: i64,
    /// Per-piece price for samples; `None` means samples are free.
    #[ts(as = "Option<String>")]
    pub sample_price: Option<Decimal>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// The status of a bulk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Submitted by the buyer, awaiting the factory.
    Pending,
    /// Accepted by the factory.
    Confirmed,
    InProduction,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProduction => "in_production",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bulk order placed by a buyer for one product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable number: `ORD-YYYYMMDD-NNNN`.
    pub order_number: String,
    pub buyer_id: String,
    pub factory_id: String,
    pub product_id: String,
    /// Product name at time of order (frozen).
    pub product_name_snapshot: String,
    pub quantity: i64,
    /// Resolved unit price at time of order (frozen, exact).
    #[ts(as = "String")]
    pub unit_price: Decimal,
    /// Authoritative total, rounded half-up to cents.
    pub total_cents: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the stored total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sample Request
// =============================================================================

/// The status of a sample request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Requested,
    Approved,
    Shipped,
    Delivered,
    Declined,
}

impl SampleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SampleStatus::Requested => "requested",
            SampleStatus::Approved => "approved",
            SampleStatus::Shipped => "shipped",
            SampleStatus::Delivered => "delivered",
            SampleStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A buyer's request for product samples before a bulk order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SampleRequest {
    pub id: String,
    pub buyer_id: String,
    pub factory_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Sample charge, rounded to cents (zero for free samples).
    pub charge_cents: i64,
    pub notes: Option<String>,
    pub status: SampleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Invoice
// =============================================================================

/// The payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Nothing paid, nothing awaiting review.
    Unpaid,
    /// At least one submitted payment awaits the factory's review.
    PendingVerification,
    /// Verified payments cover part of the total.
    PartiallyPaid,
    /// Verified payments cover the total.
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::PendingVerification => "pending_verification",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An invoice issued for an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Human-readable number: `INV-YYYYMMDD-NNNN`.
    pub invoice_number: String,
    pub order_id: String,
    pub buyer_id: String,
    pub factory_id: String,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    /// Sum of verified payments.
    pub amount_paid_cents: i64,
    pub status: InvoiceStatus,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub due_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// Amount still owed (never negative).
    #[inline]
    pub fn outstanding(&self) -> Money {
        self.total().saturating_sub_floor_zero(self.amount_paid())
    }
}

// =============================================================================
// Payment
// =============================================================================

/// How a manual payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Wire to the factory's bank account; identified by its reference.
    BankTransfer,
    /// Over-the-counter cash-transfer service; identified by sender + receipt.
    CashTransfer,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CashTransfer => "cash_transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review status of a manual payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manual payment recorded by the buyer against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Bank reference or transfer receipt number.
    pub reference: Option<String>,
    /// Name the cash transfer was sent under.
    pub sender_name: Option<String>,
    pub status: PaymentStatus,
    pub reviewed_by: Option<String>,
    pub review_note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
