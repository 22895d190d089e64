//! Canonical FIFO lot ordering and consumption planning
//!
//! The planner is a pure allocation algorithm: given a snapshot of a single
//! ingredient's lots it decides which lots to debit and by how much. It never
//! fails on insufficient stock; the unmet remainder is reported as shortfall
//! and policy (proceed, block) is decided by the order pipeline. The backend
//! executes a plan inside the same transaction that locked the snapshot.

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The slice of lot state the planner needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotSnapshot {
    pub lot_id: Uuid,
    /// Creation sequence number; tie-break for equal expiries.
    pub seq: i64,
    pub expiry: Option<NaiveDate>,
    pub remaining: Decimal,
}

/// One planned debit against a lot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotDebit {
    pub lot_id: Uuid,
    pub quantity: Decimal,
}

/// Result of planning a consumption
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionPlan {
    /// Debits in canonical FIFO order, one per touched lot.
    pub debits: Vec<LotDebit>,
    pub consumed: Decimal,
    pub shortfall: Decimal,
}

impl ConsumptionPlan {
    pub fn is_short(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

/// Canonical FIFO comparison: expiry ascending with `None` last, then
/// creation sequence ascending
///
/// This is the one ordering used everywhere lots are walked or locked, so
/// that repeated calls against the same snapshot pick the same lots in the
/// same order.
pub fn canonical_cmp(a: &LotSnapshot, b: &LotSnapshot) -> Ordering {
    match (a.expiry, b.expiry) {
        (Some(ea), Some(eb)) => ea.cmp(&eb).then(a.seq.cmp(&b.seq)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.seq.cmp(&b.seq),
    }
}

/// Sort lots into canonical FIFO order
pub fn sort_canonical(lots: &mut [LotSnapshot]) {
    lots.sort_by(canonical_cmp);
}

/// Plan a FIFO consumption of `required` units against a lot snapshot
///
/// Lots are walked in canonical order, each debited up to its remaining
/// quantity until the requirement is satisfied or lots run out. Lots with
/// nothing remaining are skipped. A non-positive requirement yields an empty
/// plan.
pub fn plan_consumption(lots: &[LotSnapshot], required: Decimal) -> ConsumptionPlan {
    if required <= Decimal::ZERO {
        return ConsumptionPlan {
            debits: Vec::new(),
            consumed: Decimal::ZERO,
            shortfall: Decimal::ZERO,
        };
    }

    let mut ordered: Vec<&LotSnapshot> = lots.iter().collect();
    ordered.sort_by(|a, b| canonical_cmp(a, b));

    let mut debits = Vec::new();
    let mut left = required;
    for lot in ordered {
        if left <= Decimal::ZERO {
            break;
        }
        if lot.remaining <= Decimal::ZERO {
            continue;
        }
        let taken = left.min(lot.remaining);
        debits.push(LotDebit {
            lot_id: lot.lot_id,
            quantity: taken,
        });
        left -= taken;
    }

    ConsumptionPlan {
        debits,
        consumed: required - left,
        shortfall: left,
    }
}

/// Total quantity remaining across a snapshot
pub fn available(lots: &[LotSnapshot]) -> Decimal {
    lots.iter()
        .filter(|l| l.remaining > Decimal::ZERO)
        .map(|l| l.remaining)
        .sum()
}

/// Apply a plan's debits to a snapshot, in place
///
/// Used by callers that chain plans against an evolving local snapshot (and
/// by tests simulating competing consumers).
pub fn apply_plan(lots: &mut [LotSnapshot], plan: &ConsumptionPlan) {
    for debit in &plan.debits {
        if let Some(lot) = lots.iter_mut().find(|l| l.lot_id == debit.lot_id) {
            lot.remaining -= debit.quantity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(seq: i64, expiry: Option<NaiveDate>, remaining: &str) -> LotSnapshot {
        LotSnapshot {
            lot_id: Uuid::new_v4(),
            seq,
            expiry,
            remaining: dec(remaining),
        }
    }

    #[test]
    fn test_earlier_expiry_first() {
        let late = lot(1, Some(date(2025, 6, 1)), "100");
        let early = lot(2, Some(date(2025, 3, 1)), "100");
        let plan = plan_consumption(&[late.clone(), early.clone()], dec("50"));

        assert_eq!(plan.debits.len(), 1);
        assert_eq!(plan.debits[0].lot_id, early.lot_id);
        assert_eq!(plan.shortfall, Decimal::ZERO);
    }

    #[test]
    fn test_no_expiry_sorts_last() {
        let undated = lot(1, None, "100");
        let dated = lot(2, Some(date(2025, 12, 31)), "100");
        let plan = plan_consumption(&[undated.clone(), dated.clone()], dec("150"));

        assert_eq!(plan.debits[0].lot_id, dated.lot_id);
        assert_eq!(plan.debits[0].quantity, dec("100"));
        assert_eq!(plan.debits[1].lot_id, undated.lot_id);
        assert_eq!(plan.debits[1].quantity, dec("50"));
    }

    #[test]
    fn test_equal_expiry_breaks_tie_by_seq() {
        let second = lot(9, Some(date(2025, 3, 1)), "10");
        let first = lot(3, Some(date(2025, 3, 1)), "10");
        let plan = plan_consumption(&[second.clone(), first.clone()], dec("5"));

        assert_eq!(plan.debits[0].lot_id, first.lot_id);
    }

    #[test]
    fn test_shortfall_reported_not_failed() {
        // 7 units on hand, 10 required: consume 7, report 3 short
        let a = lot(1, Some(date(2025, 1, 1)), "4");
        let b = lot(2, None, "3");
        let plan = plan_consumption(&[a, b], dec("10"));

        assert_eq!(plan.consumed, dec("7"));
        assert_eq!(plan.shortfall, dec("3"));
        assert!(plan.is_short());
        let total: Decimal = plan.debits.iter().map(|d| d.quantity).sum();
        assert_eq!(total, dec("7"));
    }

    #[test]
    fn test_empty_lot_skipped() {
        let empty = lot(1, Some(date(2025, 1, 1)), "0");
        let full = lot(2, Some(date(2025, 2, 1)), "10");
        let plan = plan_consumption(&[empty, full.clone()], dec("5"));

        assert_eq!(plan.debits.len(), 1);
        assert_eq!(plan.debits[0].lot_id, full.lot_id);
    }

    #[test]
    fn test_non_positive_requirement_is_empty_plan() {
        let a = lot(1, None, "10");
        let plan = plan_consumption(&[a.clone()], Decimal::ZERO);
        assert!(plan.debits.is_empty());
        assert_eq!(plan.consumed, Decimal::ZERO);
        assert_eq!(plan.shortfall, Decimal::ZERO);

        let plan = plan_consumption(&[a], dec("-5"));
        assert!(plan.debits.is_empty());
    }

    #[test]
    fn test_deterministic_over_identical_snapshots() {
        let lots = vec![
            lot(1, Some(date(2025, 5, 1)), "8"),
            lot(2, Some(date(2025, 4, 1)), "3"),
            lot(3, None, "20"),
        ];
        let first = plan_consumption(&lots, dec("15"));
        let second = plan_consumption(&lots, dec("15"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_competing_claims_never_double_spend() {
        // Two 6-unit claims against a single 10-unit lot: one wins in full,
        // the other gets 4 with 2 short. Never 12 consumed.
        let mut lots = vec![lot(1, None, "10")];

        let first = plan_consumption(&lots, dec("6"));
        apply_plan(&mut lots, &first);
        let second = plan_consumption(&lots, dec("6"));

        assert_eq!(first.consumed, dec("6"));
        assert_eq!(first.shortfall, Decimal::ZERO);
        assert_eq!(second.consumed, dec("4"));
        assert_eq!(second.shortfall, dec("2"));
        assert_eq!(lots[0].remaining - second.consumed, Decimal::ZERO);
    }

    #[test]
    fn test_available_ignores_depleted_lots() {
        let lots = vec![lot(1, None, "0"), lot(2, None, "7")];
        assert_eq!(available(&lots), dec("7"));
    }
}
