//! # stitch-core: Pure Business Logic for Stitch Market
//!
//! Stitch Market connects apparel businesses (buyers) with garment factories.
//! This crate holds the rules: tier pricing, order and sample lifecycles,
//! invoicing, manual payment review, validation and localized messages.
//! It performs no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stitch Market Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser                                      │   │
//! │  │   Catalog ──► Price calculator ──► Order form ──► Invoice       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP (forms / JSON)                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/web (axum)                              │   │
//! │  │   JWT verification, locale, handlers                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stitch-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ │   │
//! │  │   │  tiers  │ │ pricing │ │ orders  │ │invoicing│ │ locale  │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stitch-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`tiers`] - Price tiers and their boundary parsing
//! - [`pricing`] - The tier resolver
//! - [`orders`] - Order submission and order/sample lifecycles
//! - [`invoicing`] - Invoices and manual payment review
//! - [`money`] - Integer-cents money
//! - [`locale`] - Request locale and message rendering
//! - [`validation`] - Field validation
//! - [`types`] - Domain types
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use stitch_core::pricing::resolve_unit_price;
//! use stitch_core::tiers::PriceTier;
//!
//! let tiers = [PriceTier::new(200, None, Decimal::from(75)).unwrap()];
//!
//! let quote = resolve_unit_price(Decimal::from(120), &tiers, 5000).unwrap();
//! assert_eq!(quote.total, Decimal::from(375_000));
//! assert_eq!(quote.total_money().unwrap().cents(), 37_500_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoicing;
pub mod locale;
pub mod money;
pub mod orders;
pub mod pricing;
pub mod tiers;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, PricingError, ValidationError};
pub use locale::{Locale, Messages};
pub use money::Money;
pub use pricing::{PriceQuote, PriceSource};
pub use tiers::{PriceTier, TierRecord};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity accepted on a single order.
///
/// ## Business Reason
/// Catches typos (an extra zero or two) before they reach a factory.
pub const MAX_ORDER_QUANTITY: i64 = 1_000_000;

/// Most pieces a buyer may request as samples at once.
pub const MAX_SAMPLE_QUANTITY: i64 = 10;
