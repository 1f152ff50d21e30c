//! # Money Module
//!
//! Provides the `Money` type for stored and displayed monetary values.
//!
//! ## Two Representations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UNIT PRICES: rust_decimal::Decimal                                     │
//! │    Tier prices may carry sub-cent precision (e.g. 0.125 per button)     │
//! │    unit_price × quantity is computed EXACTLY                            │
//! │                                                                         │
//! │  STORED / DISPLAYED TOTALS: Money (integer cents)                      │
//! │    Exact total ──► round half-up to 2 dp ──► Money                     │
//! │    Invoices, payments and balances only ever deal in Money             │
//! │                                                                         │
//! │  Rounding happens ONCE, at the boundary, never mid-computation         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use stitch_core::money::Money;
//!
//! let total = Decimal::new(1_000_125, 3); // 1000.125
//! let stored = Money::from_decimal(total).unwrap();
//! assert_eq!(stored.cents(), 100_013); // half-up
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Number of decimal places in the marketplace currency.
pub const CURRENCY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Balances can be computed as `total - paid`
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use stitch_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts an exact decimal amount to Money, rounding half-up to cents.
    ///
    /// ## Rounding
    /// `MidpointAwayFromZero` is standard half-up for the non-negative
    /// amounts the marketplace deals in: 0.125 → 0.13, 0.124 → 0.12.
    ///
    /// ## Errors
    /// [`CoreError::AmountOutOfRange`] when the value does not fit in i64 cents.
    pub fn from_decimal(amount: Decimal) -> CoreResult<Self> {
        let rounded =
            amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);

        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Money)
            .ok_or_else(|| CoreError::AmountOutOfRange(amount.to_string()))
    }

    /// Returns the value as a 2 dp decimal (`1099` → `10.99`).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, CURRENCY_SCALE)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Subtracts without going below zero (outstanding balances).
    #[inline]
    pub const fn saturating_sub_floor_zero(&self, other: Money) -> Money {
        let diff = self.0.saturating_sub(other.0);
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain amount with two decimals and a thousands separator.
///
/// ## Note
/// Currency symbols and localized separators are applied by
/// [`crate::locale::Messages::format_money`].
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let major = self.major().unsigned_abs().to_string();

        let mut grouped = String::with_capacity(major.len() + major.len() / 3);
        for (i, ch) in major.chars().enumerate() {
            if i > 0 && (major.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}{}.{:02}", sign, grouped, self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_decimal_rounds_half_up() {
        assert_eq!(Money::from_decimal(Decimal::new(1005, 3)).unwrap().cents(), 101); // 1.005
        assert_eq!(Money::from_decimal(Decimal::new(1004, 3)).unwrap().cents(), 100); // 1.004
        assert_eq!(Money::from_decimal(Decimal::new(125, 3)).unwrap().cents(), 13); // 0.125
        assert_eq!(Money::from_decimal(Decimal::new(375_000, 0)).unwrap().cents(), 37_500_000);
    }

    #[test]
    fn test_from_decimal_out_of_range() {
        let huge = Decimal::MAX;
        assert!(matches!(
            Money::from_decimal(huge),
            Err(CoreError::AmountOutOfRange(_))
        ));
    }

    #[test]
    fn test_to_decimal() {
        assert_eq!(Money::from_cents(1099).to_decimal(), Decimal::new(1099, 2));
        assert_eq!(Money::from_cents(1099).to_decimal().to_string(), "10.99");
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(37_500_000).to_string(), "375,000.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
        assert_eq!(Money::from_cents(100_000).to_string(), "1,000.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_saturating_sub_floor_zero() {
        let total = Money::from_cents(1000);
        assert_eq!(total.saturating_sub_floor_zero(Money::from_cents(400)).cents(), 600);
        assert_eq!(total.saturating_sub_floor_zero(Money::from_cents(1400)).cents(), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
    }
}
