//! Ingredient cost estimation
//!
//! Weighted-average unit cost over the lots that still hold stock, with a
//! fall back to the most recently acquired lot's price when everything has
//! been consumed. Computed on query; no cached average is maintained.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The slice of lot state the estimator needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotCost {
    /// Creation sequence number; picks the "last known price" lot.
    pub seq: i64,
    pub remaining: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CostingError {
    /// The ingredient has no lots at all; a manual price is needed.
    #[error("no price history for ingredient")]
    NoPriceHistory,
}

/// Weighted-average unit cost over lots with stock remaining
///
/// Returns `None` when no lot has anything left.
pub fn weighted_average_cost(lots: &[LotCost]) -> Option<Decimal> {
    let mut total_qty = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    for lot in lots {
        if lot.remaining > Decimal::ZERO {
            total_qty += lot.remaining;
            total_value += lot.remaining * lot.unit_cost;
        }
    }
    if total_qty > Decimal::ZERO {
        Some(total_value / total_qty)
    } else {
        None
    }
}

/// Current unit cost: weighted average, else last known purchase price
///
/// The fallback is the unit cost of the most recently created lot even if its
/// remaining quantity is zero. No lots at all is a recoverable
/// `NoPriceHistory` condition for the caller to handle.
pub fn current_unit_cost(lots: &[LotCost]) -> Result<Decimal, CostingError> {
    if let Some(avg) = weighted_average_cost(lots) {
        return Ok(avg);
    }
    lots.iter()
        .max_by_key(|l| l.seq)
        .map(|l| l.unit_cost)
        .ok_or(CostingError::NoPriceHistory)
}

/// Total quantity on hand across lots
pub fn stock_on_hand(lots: &[LotCost]) -> Decimal {
    lots.iter()
        .filter(|l| l.remaining > Decimal::ZERO)
        .map(|l| l.remaining)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lot(seq: i64, remaining: &str, unit_cost: &str) -> LotCost {
        LotCost {
            seq,
            remaining: dec(remaining),
            unit_cost: dec(unit_cost),
        }
    }

    #[test]
    fn test_weighted_average() {
        // 100 @ 20 + 50 @ 30 -> 3500 / 150
        let lots = vec![lot(1, "100", "20"), lot(2, "50", "30")];
        let avg = weighted_average_cost(&lots).unwrap();
        assert!(avg > dec("23.3") && avg < dec("23.4"));
    }

    #[test]
    fn test_average_ignores_depleted_lots() {
        let lots = vec![lot(1, "0", "99"), lot(2, "10", "5")];
        assert_eq!(weighted_average_cost(&lots), Some(dec("5")));
    }

    #[test]
    fn test_fallback_to_last_known_price() {
        // Everything consumed: the newest lot's price still answers
        let lots = vec![lot(1, "0", "1.80"), lot(2, "0", "2.50")];
        assert_eq!(current_unit_cost(&lots), Ok(dec("2.50")));
    }

    #[test]
    fn test_no_lots_is_no_price_history() {
        assert_eq!(current_unit_cost(&[]), Err(CostingError::NoPriceHistory));
    }

    #[test]
    fn test_average_bounded_by_lot_prices() {
        let lots = vec![lot(1, "30", "2"), lot(2, "70", "4")];
        let avg = weighted_average_cost(&lots).unwrap();
        assert!(avg >= dec("2") && avg <= dec("4"));
    }

    #[test]
    fn test_stock_on_hand() {
        let lots = vec![lot(1, "3", "1"), lot(2, "0", "1"), lot(3, "4.5", "1")];
        assert_eq!(stock_on_hand(&lots), dec("7.5"));
    }
}
