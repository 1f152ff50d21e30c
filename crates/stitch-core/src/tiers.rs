//! # Price Tiers
//!
//! Quantity-range price tiers and their validation.
//!
//! ## Boundary Parsing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Where Tiers Come From                              │
//! │                                                                         │
//! │  Product form (factory owner)        price_tiers table                 │
//! │         │                                   │                           │
//! │         ▼                                   ▼                           │
//! │  TierRecord { min, max?, "price" }   TierRecord { min, max?, "price" } │
//! │         │                                   │                           │
//! │         ▼                                   ▼                           │
//! │  validate_tier_set() ← strict        parse_tier_records() ← lenient    │
//! │  (rejects the whole set)             (skips + reports bad rows)        │
//! │         │                                   │                           │
//! │         └──────────────► PriceTier ◄────────┘                           │
//! │                      (always well-formed)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `PriceTier` can only be built through [`PriceTier::new`], so the
//! resolver in [`crate::pricing`] never sees a range with `max < min`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::PricingError;

// =============================================================================
// Price Tier
// =============================================================================

/// A validated quantity range with its per-unit price.
///
/// `max_quantity == None` means "and above".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PriceTier {
    min_quantity: i64,
    max_quantity: Option<i64>,
    #[ts(as = "String")]
    unit_price: Decimal,
}

impl PriceTier {
    /// Creates a tier, checking its own range and price.
    ///
    /// ## Errors
    /// [`PricingError::InvalidTierData`] when `min_quantity < 1`,
    /// `max_quantity < min_quantity`, or `unit_price < 0`.
    pub fn new(
        min_quantity: i64,
        max_quantity: Option<i64>,
        unit_price: Decimal,
    ) -> Result<Self, PricingError> {
        let invalid = |reason: &str| PricingError::InvalidTierData {
            min_quantity,
            max_quantity,
            reason: reason.to_string(),
        };

        if min_quantity < 1 {
            return Err(invalid("minimum quantity must be at least 1"));
        }

        if let Some(max) = max_quantity {
            if max < min_quantity {
                return Err(invalid("maximum quantity is below minimum quantity"));
            }
        }

        if unit_price < Decimal::ZERO {
            return Err(invalid("price must not be negative"));
        }

        Ok(PriceTier {
            min_quantity,
            max_quantity,
            unit_price,
        })
    }

    /// Inclusive lower bound.
    #[inline]
    pub fn min_quantity(&self) -> i64 {
        self.min_quantity
    }

    /// Inclusive upper bound, `None` when open-ended.
    #[inline]
    pub fn max_quantity(&self) -> Option<i64> {
        self.max_quantity
    }

    /// Price per unit inside this range.
    #[inline]
    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// True for the "and above" tier.
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.max_quantity.is_none()
    }

    /// Checks whether `quantity` falls inside this tier (both ends inclusive).
    #[inline]
    pub fn contains(&self, quantity: i64) -> bool {
        self.min_quantity <= quantity && self.max_quantity.map_or(true, |max| quantity <= max)
    }

    /// Checks whether two tiers share at least one quantity.
    pub fn overlaps(&self, other: &PriceTier) -> bool {
        let self_max = self.max_quantity.unwrap_or(i64::MAX);
        let other_max = other.max_quantity.unwrap_or(i64::MAX);
        self.min_quantity <= other_max && other.min_quantity <= self_max
    }
}

// =============================================================================
// Tier Record (untyped boundary shape)
// =============================================================================

/// A tier as it arrives from a form or a database row.
///
/// The price is kept as text so that no precision is lost before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TierRecord {
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
    pub price: String,
}

impl TryFrom<&TierRecord> for PriceTier {
    type Error = PricingError;

    fn try_from(record: &TierRecord) -> Result<Self, Self::Error> {
        let unit_price =
            Decimal::from_str(record.price.trim()).map_err(|_| PricingError::InvalidTierData {
                min_quantity: record.min_quantity,
                max_quantity: record.max_quantity,
                reason: format!("'{}' is not a valid price", record.price),
            })?;

        PriceTier::new(record.min_quantity, record.max_quantity, unit_price)
    }
}

impl From<&PriceTier> for TierRecord {
    fn from(tier: &PriceTier) -> Self {
        TierRecord {
            min_quantity: tier.min_quantity,
            max_quantity: tier.max_quantity,
            price: tier.unit_price.to_string(),
        }
    }
}

// =============================================================================
// Parsing & Validation
// =============================================================================

/// Parses records leniently: valid tiers are kept, malformed ones reported.
///
/// Used at order time, where a bad legacy row must not block pricing.
/// The caller is expected to log every returned error.
pub fn parse_tier_records(records: &[TierRecord]) -> (Vec<PriceTier>, Vec<PricingError>) {
    let mut tiers = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for record in records {
        match PriceTier::try_from(record) {
            Ok(tier) => tiers.push(tier),
            Err(err) => rejected.push(err),
        }
    }

    (tiers, rejected)
}

/// Validates a complete tier set for a product (write time).
///
/// ## Rules
/// - Every record parses into a [`PriceTier`]
/// - At most one open-ended tier, and it has the highest minimum
/// - No two ranges overlap (gaps are allowed: they fall back to base price)
///
/// ## Returns
/// The tiers sorted by `min_quantity`. An empty set is valid.
///
/// ## Example
/// ```rust
/// use stitch_core::tiers::{validate_tier_set, TierRecord};
///
/// let records = vec![
///     TierRecord { min_quantity: 50, max_quantity: Some(199), price: "90".into() },
///     TierRecord { min_quantity: 1, max_quantity: Some(49), price: "100".into() },
///     TierRecord { min_quantity: 200, max_quantity: None, price: "75".into() },
/// ];
/// let tiers = validate_tier_set(&records).unwrap();
/// assert_eq!(tiers[0].min_quantity(), 1);
/// ```
pub fn validate_tier_set(records: &[TierRecord]) -> Result<Vec<PriceTier>, PricingError> {
    let mut tiers = records
        .iter()
        .map(PriceTier::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    tiers.sort_by_key(PriceTier::min_quantity);

    let last_index = tiers.len().saturating_sub(1);
    if let Some((_, open)) = tiers
        .iter()
        .enumerate()
        .find(|(i, tier)| tier.is_unbounded() && *i != last_index)
    {
        return Err(PricingError::UnboundedTierNotLast {
            min_quantity: open.min_quantity,
        });
    }

    // Sorted by min: any overlap shows up between neighbours.
    for pair in tiers.windows(2) {
        if let [first, second] = pair {
            if first.overlaps(second) {
                return Err(PricingError::OverlappingTiers {
                    first_min: first.min_quantity,
                    second_min: second.min_quantity,
                });
            }
        }
    }

    Ok(tiers)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(min: i64, max: Option<i64>, price: &str) -> TierRecord {
        TierRecord {
            min_quantity: min,
            max_quantity: max,
            price: price.to_string(),
        }
    }

    #[test]
    fn test_new_rejects_backwards_range() {
        let err = PriceTier::new(50, Some(10), Decimal::ONE).unwrap_err();
        assert!(matches!(
            err,
            PricingError::InvalidTierData {
                min_quantity: 50,
                max_quantity: Some(10),
                ..
            }
        ));
    }

    #[test]
    fn test_new_rejects_zero_min_and_negative_price() {
        assert!(PriceTier::new(0, Some(10), Decimal::ONE).is_err());
        assert!(PriceTier::new(1, Some(10), Decimal::NEGATIVE_ONE).is_err());
        assert!(PriceTier::new(1, Some(10), Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_single_quantity_tier() {
        let tier = PriceTier::new(5, Some(5), Decimal::TEN).unwrap();
        assert!(tier.contains(5));
        assert!(!tier.contains(4));
        assert!(!tier.contains(6));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let tier = PriceTier::new(50, Some(199), Decimal::ONE).unwrap();
        assert!(tier.contains(50));
        assert!(tier.contains(199));
        assert!(!tier.contains(49));
        assert!(!tier.contains(200));

        let open = PriceTier::new(200, None, Decimal::ONE).unwrap();
        assert!(open.contains(200));
        assert!(open.contains(i64::MAX));
    }

    #[test]
    fn test_record_parsing() {
        let tier = PriceTier::try_from(&record(1, Some(49), " 12.345 ")).unwrap();
        assert_eq!(tier.unit_price(), Decimal::new(12_345, 3));

        let err = PriceTier::try_from(&record(1, Some(49), "twelve")).unwrap_err();
        assert!(err.to_string().contains("not a valid price"));
    }

    #[test]
    fn test_record_round_trip_keeps_precision() {
        let tier = PriceTier::try_from(&record(10, None, "0.125")).unwrap();
        assert_eq!(TierRecord::from(&tier), record(10, None, "0.125"));
    }

    #[test]
    fn test_parse_tier_records_skips_malformed() {
        let records = vec![
            record(1, Some(49), "100"),
            record(80, Some(50), "90"),
            record(200, None, "abc"),
        ];

        let (tiers, rejected) = parse_tier_records(&records);
        assert_eq!(tiers.len(), 1);
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_validate_tier_set_sorts() {
        let records = vec![
            record(200, None, "75"),
            record(1, Some(49), "100"),
            record(50, Some(199), "90"),
        ];

        let tiers = validate_tier_set(&records).unwrap();
        let mins: Vec<i64> = tiers.iter().map(PriceTier::min_quantity).collect();
        assert_eq!(mins, vec![1, 50, 200]);
    }

    #[test]
    fn test_validate_tier_set_allows_empty_and_gaps() {
        assert!(validate_tier_set(&[]).unwrap().is_empty());

        let gapped = vec![record(10, Some(20), "5"), record(100, None, "4")];
        assert_eq!(validate_tier_set(&gapped).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_tier_set_rejects_overlap() {
        let records = vec![record(1, Some(50), "100"), record(50, Some(199), "90")];

        assert_eq!(
            validate_tier_set(&records),
            Err(PricingError::OverlappingTiers {
                first_min: 1,
                second_min: 50
            })
        );
    }

    #[test]
    fn test_validate_tier_set_rejects_misplaced_open_tier() {
        let records = vec![record(1, None, "100"), record(50, Some(199), "90")];
        assert_eq!(
            validate_tier_set(&records),
            Err(PricingError::UnboundedTierNotLast { min_quantity: 1 })
        );

        let two_open = vec![record(1, None, "100"), record(500, None, "90")];
        assert_eq!(
            validate_tier_set(&two_open),
            Err(PricingError::UnboundedTierNotLast { min_quantity: 1 })
        );
    }

    #[test]
    fn test_validate_tier_set_rejects_malformed_record() {
        let records = vec![record(1, Some(49), "100"), record(80, Some(50), "90")];
        assert!(matches!(
            validate_tier_set(&records),
            Err(PricingError::InvalidTierData { min_quantity: 80, .. })
        ));
    }
}
