//! # Tier Resolver
//!
//! Maps an order quantity to a unit price and a total.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tiers = [1..49 @ 100] [50..199 @ 90] [200..∞ @ 75]   base = 120        │
//! │                                                                         │
//! │  quantity ≤ 0            → InvalidQuantity                              │
//! │  quantity in one tier    → that tier's price     (10 → 100, 50 → 90)   │
//! │  quantity in no tier     → base price            (empty tiers → 120)   │
//! │  quantity in many tiers  → highest min_quantity  (overlap flagged)     │
//! │                                                                         │
//! │  total = unit_price × quantity   (exact, no rounding here)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Called live by the buyer-facing calculator and again, authoritatively,
//! when an order is submitted. Both calls see the same inputs and get the
//! same answer: the resolver keeps no state.

use rust_decimal::Decimal;
use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreResult, PricingError};
use crate::money::Money;
use crate::tiers::{parse_tier_records, PriceTier, TierRecord};

// =============================================================================
// Quote
// =============================================================================

/// Where the unit price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum PriceSource {
    /// No tier covered the quantity.
    BasePrice,
    /// The tier with this range was applied.
    Tier {
        min_quantity: i64,
        max_quantity: Option<i64>,
    },
}

/// Result of resolving a quantity against a product's tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    #[ts(as = "String")]
    pub unit_price: Decimal,
    pub quantity: i64,
    /// Exact `unit_price × quantity`.
    #[ts(as = "String")]
    pub total: Decimal,
    pub source: PriceSource,
    /// More than one tier matched (overlapping ranges upstream).
    pub overlap: bool,
}

impl PriceQuote {
    /// Total rounded half-up to cents, for storage and display.
    pub fn total_money(&self) -> CoreResult<Money> {
        Money::from_decimal(self.total)
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves the unit price and total for `quantity`.
///
/// `tiers` need not be sorted. See the module docs for the rules.
///
/// ## Errors
/// - [`PricingError::InvalidQuantity`] if `quantity <= 0`
/// - [`PricingError::TotalOverflow`] if the total leaves the decimal range
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use stitch_core::pricing::resolve_unit_price;
/// use stitch_core::tiers::PriceTier;
///
/// let tiers = [
///     PriceTier::new(1, Some(49), Decimal::from(100)).unwrap(),
///     PriceTier::new(50, Some(199), Decimal::from(90)).unwrap(),
///     PriceTier::new(200, None, Decimal::from(75)).unwrap(),
/// ];
///
/// let quote = resolve_unit_price(Decimal::from(120), &tiers, 50).unwrap();
/// assert_eq!(quote.unit_price, Decimal::from(90));
/// assert_eq!(quote.total, Decimal::from(4500));
/// ```
pub fn resolve_unit_price(
    base_price: Decimal,
    tiers: &[PriceTier],
    quantity: i64,
) -> Result<PriceQuote, PricingError> {
    if quantity <= 0 {
        return Err(PricingError::InvalidQuantity { quantity });
    }

    let mut matched: Option<&PriceTier> = None;
    let mut match_count = 0usize;

    for tier in tiers.iter().filter(|tier| tier.contains(quantity)) {
        match_count += 1;
        if matched.map_or(true, |best| tier.min_quantity() > best.min_quantity()) {
            matched = Some(tier);
        }
    }

    let (unit_price, source) = match matched {
        Some(tier) => (
            tier.unit_price(),
            PriceSource::Tier {
                min_quantity: tier.min_quantity(),
                max_quantity: tier.max_quantity(),
            },
        ),
        None => (base_price, PriceSource::BasePrice),
    };

    let total = unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or(PricingError::TotalOverflow { quantity })?;

    Ok(PriceQuote {
        unit_price,
        quantity,
        total,
        source,
        overlap: match_count > 1,
    })
}

/// A quote computed from raw records, plus the records that were refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuote {
    pub quote: PriceQuote,
    /// One `InvalidTierData` per malformed record; log these.
    pub rejected: Vec<PricingError>,
}

/// Resolves directly from untyped tier records.
///
/// Malformed records are never used for pricing: they are dropped and
/// returned in [`RecordQuote::rejected`]. If no valid tier matches, the
/// base price applies.
///
/// ## Errors
/// Same as [`resolve_unit_price`].
pub fn resolve_from_records(
    base_price: Decimal,
    records: &[TierRecord],
    quantity: i64,
) -> Result<RecordQuote, PricingError> {
    let (tiers, rejected) = parse_tier_records(records);
    let quote = resolve_unit_price(base_price, &tiers, quantity)?;
    Ok(RecordQuote { quote, rejected })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn catalog_tiers() -> Vec<PriceTier> {
        vec![
            PriceTier::new(1, Some(49), d(100)).unwrap(),
            PriceTier::new(50, Some(199), d(90)).unwrap(),
            PriceTier::new(200, None, d(75)).unwrap(),
        ]
    }

    fn quote(quantity: i64) -> PriceQuote {
        resolve_unit_price(d(120), &catalog_tiers(), quantity).unwrap()
    }

    #[test]
    fn test_worked_example() {
        let q = quote(10);
        assert_eq!((q.unit_price, q.total), (d(100), d(1000)));

        let q = quote(50);
        assert_eq!((q.unit_price, q.total), (d(90), d(4500)));

        let q = quote(200);
        assert_eq!((q.unit_price, q.total), (d(75), d(15000)));

        let q = quote(5000);
        assert_eq!((q.unit_price, q.total), (d(75), d(375_000)));
    }

    #[test]
    fn test_zero_and_negative_quantity() {
        assert_eq!(
            resolve_unit_price(d(120), &catalog_tiers(), 0),
            Err(PricingError::InvalidQuantity { quantity: 0 })
        );
        assert_eq!(
            resolve_unit_price(d(120), &catalog_tiers(), -3),
            Err(PricingError::InvalidQuantity { quantity: -3 })
        );
    }

    #[test]
    fn test_empty_tiers_use_base_price() {
        let q = resolve_unit_price(d(120), &[], 10).unwrap();
        assert_eq!(q.unit_price, d(120));
        assert_eq!(q.total, d(1200));
        assert_eq!(q.source, PriceSource::BasePrice);
        assert!(!q.overlap);
    }

    #[test]
    fn test_below_lowest_tier_uses_base_price() {
        let tiers = vec![PriceTier::new(100, Some(499), d(8)).unwrap()];
        for quantity in [1, 50, 99] {
            let q = resolve_unit_price(d(10), &tiers, quantity).unwrap();
            assert_eq!(q.unit_price, d(10));
            assert_eq!(q.source, PriceSource::BasePrice);
        }
    }

    #[test]
    fn test_gap_between_tiers_uses_base_price() {
        let tiers = vec![
            PriceTier::new(1, Some(10), d(5)).unwrap(),
            PriceTier::new(100, None, d(3)).unwrap(),
        ];
        let q = resolve_unit_price(d(6), &tiers, 50).unwrap();
        assert_eq!(q.unit_price, d(6));
    }

    #[test]
    fn test_boundaries_resolve_to_own_tier() {
        assert_eq!(quote(49).unit_price, d(100));
        assert_eq!(quote(50).unit_price, d(90));
        assert_eq!(quote(199).unit_price, d(90));
        assert_eq!(quote(200).unit_price, d(75));
    }

    #[test]
    fn test_open_tier_covers_huge_quantities() {
        let q = quote(i64::MAX);
        assert_eq!(q.unit_price, d(75));
        assert_eq!(
            q.source,
            PriceSource::Tier {
                min_quantity: 200,
                max_quantity: None
            }
        );
    }

    #[test]
    fn test_unsorted_input() {
        let mut tiers = catalog_tiers();
        tiers.reverse();
        let q = resolve_unit_price(d(120), &tiers, 60).unwrap();
        assert_eq!(q.unit_price, d(90));
    }

    #[test]
    fn test_overlap_prefers_highest_min() {
        let tiers = vec![
            PriceTier::new(1, Some(100), d(10)).unwrap(),
            PriceTier::new(50, Some(150), d(9)).unwrap(),
            PriceTier::new(20, Some(80), d(11)).unwrap(),
        ];
        let q = resolve_unit_price(d(12), &tiers, 60).unwrap();
        assert_eq!(q.unit_price, d(9));
        assert!(q.overlap);
    }

    #[test]
    fn test_idempotent() {
        let tiers = catalog_tiers();
        let first = resolve_unit_price(d(120), &tiers, 75).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve_unit_price(d(120), &tiers, 75).unwrap(), first);
        }
    }

    #[test]
    fn test_total_kept_exact_until_rounded() {
        let tiers = vec![PriceTier::new(1, None, Decimal::new(1_005, 3)).unwrap()]; // 1.005
        let q = resolve_unit_price(d(2), &tiers, 3).unwrap();
        assert_eq!(q.total, Decimal::new(3_015, 3)); // 3.015 exact
        assert_eq!(q.total_money().unwrap().cents(), 302); // 3.02 half-up
    }

    #[test]
    fn test_resolve_from_records_skips_malformed_tier() {
        let records = vec![
            TierRecord {
                min_quantity: 1,
                max_quantity: Some(49),
                price: "100".to_string(),
            },
            TierRecord {
                min_quantity: 80,
                max_quantity: Some(50),
                price: "60".to_string(),
            },
        ];

        // 60 would fall in the malformed 80..50 row; it must not be used.
        let result = resolve_from_records(d(120), &records, 60).unwrap();
        assert_eq!(result.quote.unit_price, d(120));
        assert_eq!(result.quote.source, PriceSource::BasePrice);
        assert_eq!(result.rejected.len(), 1);
        assert!(matches!(
            result.rejected[0],
            PricingError::InvalidTierData { min_quantity: 80, .. }
        ));

        let result = resolve_from_records(d(120), &records, 10).unwrap();
        assert_eq!(result.quote.unit_price, d(100));
    }

    #[test]
    fn test_resolve_from_records_invalid_quantity() {
        assert!(matches!(
            resolve_from_records(d(120), &[], 0),
            Err(PricingError::InvalidQuantity { quantity: 0 })
        ));
    }
}
