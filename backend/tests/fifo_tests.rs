//! FIFO consumption tests
//!
//! Tests for batch inventory consumption including:
//! - Canonical lot ordering (expiry first, then creation sequence)
//! - Shortfall reporting instead of failure
//! - No double-spend across competing claims

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{apply_plan, available, plan_consumption, sort_canonical, LotSnapshot};

// Helper to create Decimal from string
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

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Lots expiring sooner are consumed first
    #[test]
    fn test_consumption_prefers_earliest_expiry() {
        let december = lot(1, Some(date(2026, 12, 1)), "100");
        let march = lot(2, Some(date(2026, 3, 1)), "100");
        let june = lot(3, Some(date(2026, 6, 1)), "100");

        let plan = plan_consumption(&[december.clone(), march.clone(), june.clone()], dec("150"));

        assert_eq!(plan.debits.len(), 2);
        assert_eq!(plan.debits[0].lot_id, march.lot_id);
        assert_eq!(plan.debits[0].quantity, dec("100"));
        assert_eq!(plan.debits[1].lot_id, june.lot_id);
        assert_eq!(plan.debits[1].quantity, dec("50"));
    }

    /// Non-perishable lots (no expiry) are used only after every dated lot
    #[test]
    fn test_undated_lots_consumed_last() {
        let undated = lot(1, None, "50");
        let dated = lot(2, Some(date(2027, 1, 1)), "50");

        let plan = plan_consumption(&[undated.clone(), dated.clone()], dec("60"));

        assert_eq!(plan.debits[0].lot_id, dated.lot_id);
        assert_eq!(plan.debits[1].lot_id, undated.lot_id);
        assert_eq!(plan.debits[1].quantity, dec("10"));
    }

    /// Equal expiries fall back to creation order
    #[test]
    fn test_same_expiry_uses_creation_sequence() {
        let newer = lot(20, Some(date(2026, 5, 1)), "30");
        let older = lot(10, Some(date(2026, 5, 1)), "30");

        let plan = plan_consumption(&[newer.clone(), older.clone()], dec("10"));

        assert_eq!(plan.debits.len(), 1);
        assert_eq!(plan.debits[0].lot_id, older.lot_id);
    }

    /// Requesting 10 with 7 on hand consumes 7 and reports 3 missing
    #[test]
    fn test_partial_stock_reports_shortfall() {
        let lots = vec![lot(1, Some(date(2026, 1, 1)), "4"), lot(2, None, "3")];

        let plan = plan_consumption(&lots, dec("10"));

        assert_eq!(plan.consumed, dec("7"));
        assert_eq!(plan.shortfall, dec("3"));
        assert!(plan.is_short());
    }

    /// An empty stock position consumes nothing and reports everything missing
    #[test]
    fn test_no_stock_all_shortfall() {
        let plan = plan_consumption(&[], dec("25"));

        assert!(plan.debits.is_empty());
        assert_eq!(plan.consumed, Decimal::ZERO);
        assert_eq!(plan.shortfall, dec("25"));
    }

    /// Two 6-unit claims against one 10-unit lot never spend 12
    #[test]
    fn test_sequential_claims_respect_remaining() {
        let mut lots = vec![lot(1, None, "10")];

        let first = plan_consumption(&lots, dec("6"));
        apply_plan(&mut lots, &first);
        let second = plan_consumption(&lots, dec("6"));
        apply_plan(&mut lots, &second);

        assert_eq!(first.consumed, dec("6"));
        assert_eq!(second.consumed, dec("4"));
        assert_eq!(second.shortfall, dec("2"));
        assert_eq!(lots[0].remaining, Decimal::ZERO);
    }

    /// Sorting is stable and total availability skips depleted lots
    #[test]
    fn test_sort_and_availability() {
        let mut lots = vec![
            lot(3, None, "5"),
            lot(1, Some(date(2026, 8, 1)), "0"),
            lot(2, Some(date(2026, 2, 1)), "8"),
        ];
        sort_canonical(&mut lots);

        assert_eq!(lots[0].seq, 2);
        assert_eq!(lots[1].seq, 1);
        assert_eq!(lots[2].seq, 3);
        assert_eq!(available(&lots), dec("13"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid remaining quantities
    fn remaining_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.0 to 1000.0
    }

    /// Strategy for generating required quantities (strictly positive)
    fn required_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=20000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 2000.0
    }

    /// Strategy for generating an optional expiry date
    fn expiry_strategy() -> impl Strategy<Value = Option<NaiveDate>> {
        prop_oneof![
            Just(None),
            (0u32..=364u32).prop_map(|d| {
                NaiveDate::from_ymd_opt(2026, 1, 1).map(|base| base + chrono::Days::new(d as u64))
            }),
        ]
    }

    /// Strategy for generating a lot snapshot list with ascending sequence
    fn lots_strategy() -> impl Strategy<Value = Vec<LotSnapshot>> {
        prop::collection::vec((expiry_strategy(), remaining_strategy()), 0..8).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (expiry, remaining))| LotSnapshot {
                    lot_id: Uuid::new_v4(),
                    seq: i as i64 + 1,
                    expiry,
                    remaining,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Consumed plus shortfall always equals the requirement
        #[test]
        fn prop_consumed_plus_shortfall_is_required(
            lots in lots_strategy(),
            required in required_strategy()
        ) {
            let plan = plan_consumption(&lots, required);
            prop_assert_eq!(plan.consumed + plan.shortfall, required);
        }

        /// Consumption never exceeds what is available
        #[test]
        fn prop_never_consumes_more_than_available(
            lots in lots_strategy(),
            required in required_strategy()
        ) {
            let plan = plan_consumption(&lots, required);
            prop_assert!(plan.consumed <= available(&lots));
            prop_assert!(plan.consumed >= Decimal::ZERO);
            prop_assert!(plan.shortfall >= Decimal::ZERO);
        }

        /// No debit exceeds its lot's remaining quantity
        #[test]
        fn prop_debits_bounded_by_lot_remaining(
            lots in lots_strategy(),
            required in required_strategy()
        ) {
            let plan = plan_consumption(&lots, required);
            for debit in &plan.debits {
                let lot = lots.iter().find(|l| l.lot_id == debit.lot_id);
                prop_assert!(lot.is_some());
                prop_assert!(debit.quantity > Decimal::ZERO);
                prop_assert!(debit.quantity <= lot.unwrap().remaining);
            }
        }

        /// Applying a plan never drives any remaining quantity negative
        #[test]
        fn prop_applied_plan_keeps_remaining_non_negative(
            lots in lots_strategy(),
            required in required_strategy()
        ) {
            let mut lots = lots;
            let plan = plan_consumption(&lots, required);
            apply_plan(&mut lots, &plan);
            for lot in &lots {
                prop_assert!(lot.remaining >= Decimal::ZERO);
            }
        }

        /// Planning twice over the same snapshot yields the same plan
        #[test]
        fn prop_planning_is_deterministic(
            lots in lots_strategy(),
            required in required_strategy()
        ) {
            let first = plan_consumption(&lots, required);
            let second = plan_consumption(&lots, required);
            prop_assert_eq!(first, second);
        }

        /// Debits come out in canonical FIFO order
        #[test]
        fn prop_debits_follow_canonical_order(
            lots in lots_strategy(),
            required in required_strategy()
        ) {
            let plan = plan_consumption(&lots, required);
            let positions: Vec<usize> = {
                let mut sorted = lots.clone();
                sort_canonical(&mut sorted);
                plan.debits
                    .iter()
                    .map(|d| sorted.iter().position(|l| l.lot_id == d.lot_id).unwrap())
                    .collect()
            };
            for window in positions.windows(2) {
                prop_assert!(window[0] < window[1]);
            }
        }
    }
}
