//! Order pipeline tests
//!
//! Tests for the stage state machine including:
//! - Forward-only sequential transitions
//! - Trigger stage detection for stock consumption
//! - Cancellation rules and configuration fallback

use proptest::prelude::*;

use shared::{
    PipelineError, RawStageConfig, ShortagePolicy, StageConfig, CANCELLED_STAGE, DEFAULT_STAGES,
    DEFAULT_TRIGGER_STAGE,
};

fn raw(stages: &[&str], trigger: &str) -> RawStageConfig {
    RawStageConfig {
        stages: stages.iter().map(|s| s.to_string()).collect(),
        trigger_stage: trigger.to_string(),
        shortage_policy: ShortagePolicy::default(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A full run through the default pipeline, stage by stage
    #[test]
    fn test_full_default_pipeline_walk() {
        let cfg = StageConfig::default();
        let mut current = cfg.first_stage().to_string();

        while let Some(next) = cfg.next_stage(&current) {
            let effect = cfg.validate_advance(&current, next).unwrap();
            assert_eq!(effect.enters_trigger, next == DEFAULT_TRIGGER_STAGE);
            current = next.to_string();
        }

        assert_eq!(current, *DEFAULT_STAGES.last().unwrap());
        assert!(cfg.is_terminal(&current));
    }

    /// Skipping a stage is rejected even when both stages exist
    #[test]
    fn test_skip_rejected() {
        let cfg = StageConfig::default();
        let err = cfg.validate_advance("NOVO", "PRONTO").unwrap_err();

        assert_eq!(
            err,
            PipelineError::InvalidTransition {
                from: "NOVO".to_string(),
                to: "PRONTO".to_string(),
            }
        );
    }

    /// Backward movement is rejected
    #[test]
    fn test_backward_rejected() {
        let cfg = StageConfig::default();
        assert!(cfg.validate_advance("ENTREGUE", "PRONTO").is_err());
    }

    /// A malformed stored configuration falls back wholesale to the default
    #[test]
    fn test_malformed_config_falls_back_then_operates() {
        let (cfg, fell_back) = StageConfig::from_raw(raw(&["A", "A", "B"], "A"));

        assert!(fell_back);
        // The fallback pipeline is immediately usable
        let effect = cfg.validate_advance("NOVO", "EM_PRODUCAO").unwrap();
        assert!(effect.enters_trigger);
    }

    /// Fallback never mixes operator stages with default stages
    #[test]
    fn test_fallback_is_never_partial() {
        let (cfg, fell_back) = StageConfig::from_raw(raw(&["CUSTOM", ""], "CUSTOM"));

        assert!(fell_back);
        assert!(!cfg.stages().iter().any(|s| s == "CUSTOM"));
        assert_eq!(cfg.stages(), StageConfig::default().stages());
    }

    /// A custom pipeline drives trigger detection from its own trigger stage
    #[test]
    fn test_custom_trigger_stage() {
        let (cfg, fell_back) = StageConfig::from_raw(raw(&["RECEBIDO", "ASSANDO", "RETIRADA"], "ASSANDO"));

        assert!(!fell_back);
        assert!(cfg.validate_advance("RECEBIDO", "ASSANDO").unwrap().enters_trigger);
        assert!(!cfg.validate_advance("ASSANDO", "RETIRADA").unwrap().enters_trigger);
    }

    /// Cancellation needs a non-blank justification and a non-terminal stage
    #[test]
    fn test_cancellation_rules() {
        let cfg = StageConfig::default();

        assert_eq!(
            cfg.validate_cancel("EM_PRODUCAO", "  "),
            Err(PipelineError::MissingJustification)
        );
        assert!(cfg.validate_cancel("EM_PRODUCAO", "forno quebrou").is_ok());
        assert!(cfg.validate_cancel("DONE", "tarde demais").is_err());
        assert!(cfg.validate_cancel(CANCELLED_STAGE, "de novo").is_err());
    }

    /// The cancelled stage admits nothing further
    #[test]
    fn test_cancelled_is_terminal() {
        let cfg = StageConfig::default();

        assert!(cfg.is_terminal(CANCELLED_STAGE));
        assert!(cfg.validate_advance(CANCELLED_STAGE, "NOVO").is_err());
        assert_eq!(cfg.next_stage(CANCELLED_STAGE), None);
    }

    /// Strict validation rejects what lenient parsing falls back on
    #[test]
    fn test_strict_update_validation() {
        assert!(StageConfig::try_from_raw(&raw(&[], "X")).is_err());
        assert!(StageConfig::try_from_raw(&raw(&["A", "B"], "C")).is_err());
        assert!(StageConfig::try_from_raw(&raw(&["A", CANCELLED_STAGE], "A")).is_err());
        assert!(StageConfig::try_from_raw(&raw(&["A", "B"], "B")).is_ok());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating stage names
    fn stage_name_strategy() -> impl Strategy<Value = String> {
        "[A-Z][A-Z_]{1,12}".prop_filter("not the cancelled stage", |s| s != CANCELLED_STAGE)
    }

    /// Strategy for generating a valid raw configuration
    fn valid_raw_strategy() -> impl Strategy<Value = RawStageConfig> {
        prop::collection::btree_set(stage_name_strategy(), 2..8).prop_flat_map(|set| {
            let stages: Vec<String> = set.into_iter().collect();
            let len = stages.len();
            (Just(stages), 0..len).prop_map(|(stages, trigger_idx)| RawStageConfig {
                trigger_stage: stages[trigger_idx].clone(),
                stages,
                shortage_policy: ShortagePolicy::default(),
            })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Valid configurations parse without fallback and keep their stages
        #[test]
        fn prop_valid_config_accepted_verbatim(raw in valid_raw_strategy()) {
            let (cfg, fell_back) = StageConfig::from_raw(raw.clone());
            prop_assert!(!fell_back);
            prop_assert_eq!(cfg.stages(), raw.stages.as_slice());
            prop_assert_eq!(cfg.trigger_stage(), raw.trigger_stage.as_str());
        }

        /// The only accepted advance from any stage is its immediate successor
        #[test]
        fn prop_only_immediate_successor_accepted(raw in valid_raw_strategy()) {
            let (cfg, _) = StageConfig::from_raw(raw);
            let stages = cfg.stages().to_vec();
            for (i, from) in stages.iter().enumerate() {
                for (j, to) in stages.iter().enumerate() {
                    let ok = cfg.validate_advance(from, to).is_ok();
                    prop_assert_eq!(ok, j == i + 1);
                }
            }
        }

        /// Exactly one transition in a valid pipeline enters the trigger stage
        #[test]
        fn prop_exactly_one_trigger_entry(raw in valid_raw_strategy()) {
            let (cfg, _) = StageConfig::from_raw(raw);
            let stages = cfg.stages().to_vec();
            let mut trigger_entries = 0;
            for window in stages.windows(2) {
                let effect = cfg.validate_advance(&window[0], &window[1]).unwrap();
                if effect.enters_trigger {
                    trigger_entries += 1;
                }
            }
            // The first stage is never entered by a transition, so a trigger
            // there means no consuming transition exists.
            let expected = if cfg.trigger_stage() == cfg.first_stage() { 0 } else { 1 };
            prop_assert_eq!(trigger_entries, expected);
        }

        /// Lenient parsing always yields an operable configuration
        #[test]
        fn prop_fallback_always_operable(
            stages in prop::collection::vec("[A-Z_]{0,8}", 0..6),
            trigger in "[A-Z_]{0,8}"
        ) {
            let (cfg, _) = StageConfig::from_raw(RawStageConfig {
                stages,
                trigger_stage: trigger,
                shortage_policy: ShortagePolicy::default(),
            });
            prop_assert!(!cfg.stages().is_empty());
            prop_assert!(cfg.stages().iter().any(|s| s == cfg.trigger_stage()));
            prop_assert!(cfg.is_terminal(cfg.stages().last().unwrap()));
        }
    }
}
