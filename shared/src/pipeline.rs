//! Order pipeline stage configuration and transition rules
//!
//! The stage list is operator-supplied and therefore untrusted: validation
//! produces either the parsed configuration or the built-in default, never a
//! partially-applied mix. Transitions are forward-only and sequential, with
//! a terminal CANCELADO reachable from any non-terminal stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal cancellation stage; never part of the configured sequence.
pub const CANCELLED_STAGE: &str = "CANCELADO";

/// Built-in stage sequence used when configuration is missing or malformed.
pub const DEFAULT_STAGES: [&str; 7] = [
    "NOVO",
    "EM_PRODUCAO",
    "PRONTO",
    "ENTREGUE",
    "POS1",
    "POS2",
    "DONE",
];

/// Default stage whose entry consumes stock.
pub const DEFAULT_TRIGGER_STAGE: &str = "EM_PRODUCAO";

/// What to do when the trigger stage cannot fully satisfy requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShortagePolicy {
    /// Complete the transition, flag the order and record the shortfalls.
    #[default]
    Proceed,
    /// Reject the transition; nothing is consumed.
    Block,
}

/// Unvalidated configuration as supplied by the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStageConfig {
    pub stages: Vec<String>,
    pub trigger_stage: String,
    #[serde(default)]
    pub shortage_policy: ShortagePolicy,
}

/// Validated pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    stages: Vec<String>,
    trigger_stage: String,
    pub shortage_policy: ShortagePolicy,
}

/// Transition errors surfaced by the pipeline rules
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("cancellation requires a non-empty justification")]
    MissingJustification,
}

/// Effect of a validated forward transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceEffect {
    /// The target is the configured trigger stage; stock consumption is due
    /// unless the order already carries the consumed guard.
    pub enters_trigger: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            stages: DEFAULT_STAGES.iter().map(|s| s.to_string()).collect(),
            trigger_stage: DEFAULT_TRIGGER_STAGE.to_string(),
            shortage_policy: ShortagePolicy::default(),
        }
    }
}

impl StageConfig {
    /// Validate raw configuration, falling back to the default on any defect
    ///
    /// Returns the configuration plus a flag telling whether the fallback was
    /// taken, so the caller can report it to an operator. The shortage policy
    /// is typed and always carried over.
    pub fn from_raw(raw: RawStageConfig) -> (Self, bool) {
        match Self::try_from_raw(&raw) {
            Ok(cfg) => (cfg, false),
            Err(_) => (
                Self {
                    shortage_policy: raw.shortage_policy,
                    ..Self::default()
                },
                true,
            ),
        }
    }

    /// Strict validation for configuration updates
    pub fn try_from_raw(raw: &RawStageConfig) -> Result<Self, String> {
        let stages: Vec<String> = raw.stages.iter().map(|s| s.trim().to_string()).collect();
        if stages.is_empty() {
            return Err("stage list is empty".to_string());
        }
        if stages.iter().any(|s| s.is_empty()) {
            return Err("stage list contains a blank entry".to_string());
        }
        if stages.iter().any(|s| s == CANCELLED_STAGE) {
            return Err(format!("{CANCELLED_STAGE} cannot be a pipeline stage"));
        }
        for (i, stage) in stages.iter().enumerate() {
            if stages[..i].contains(stage) {
                return Err(format!("duplicate stage {stage}"));
            }
        }
        let trigger = raw.trigger_stage.trim().to_string();
        if !stages.contains(&trigger) {
            return Err(format!("trigger stage {trigger} is not in the stage list"));
        }
        Ok(Self {
            stages,
            trigger_stage: trigger,
            shortage_policy: raw.shortage_policy,
        })
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub fn trigger_stage(&self) -> &str {
        &self.trigger_stage
    }

    /// Initial stage for newly created orders
    pub fn first_stage(&self) -> &str {
        &self.stages[0]
    }

    fn position(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|s| s == stage)
    }

    /// A terminal stage admits no further transition (last configured stage,
    /// or CANCELADO)
    pub fn is_terminal(&self, stage: &str) -> bool {
        stage == CANCELLED_STAGE || self.position(stage) == Some(self.stages.len() - 1)
    }

    /// The only legal forward target from `current`, if any
    pub fn next_stage(&self, current: &str) -> Option<&str> {
        let pos = self.position(current)?;
        self.stages.get(pos + 1).map(|s| s.as_str())
    }

    /// Validate a forward transition; skipping and backward moves are illegal
    pub fn validate_advance(&self, current: &str, target: &str) -> Result<AdvanceEffect, PipelineError> {
        let invalid = || PipelineError::InvalidTransition {
            from: current.to_string(),
            to: target.to_string(),
        };
        match self.next_stage(current) {
            Some(next) if next == target => Ok(AdvanceEffect {
                enters_trigger: target == self.trigger_stage,
            }),
            _ => Err(invalid()),
        }
    }

    /// Validate a cancellation from `current` with the given justification
    ///
    /// The reason is required verbatim and must not be blank; terminal orders
    /// cannot be cancelled.
    pub fn validate_cancel(&self, current: &str, justification: &str) -> Result<(), PipelineError> {
        if self.is_terminal(current) {
            return Err(PipelineError::InvalidTransition {
                from: current.to_string(),
                to: CANCELLED_STAGE.to_string(),
            });
        }
        if justification.trim().is_empty() {
            return Err(PipelineError::MissingJustification);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(stages: &[&str], trigger: &str) -> RawStageConfig {
        RawStageConfig {
            stages: stages.iter().map(|s| s.to_string()).collect(),
            trigger_stage: trigger.to_string(),
            shortage_policy: ShortagePolicy::default(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let cfg = StageConfig::default();
        assert_eq!(cfg.first_stage(), "NOVO");
        assert_eq!(cfg.trigger_stage(), "EM_PRODUCAO");
        assert_eq!(cfg.stages().len(), 7);
    }

    #[test]
    fn test_valid_custom_config() {
        let (cfg, fell_back) = StageConfig::from_raw(raw(&["A", "B", "C"], "B"));
        assert!(!fell_back);
        assert_eq!(cfg.first_stage(), "A");
        assert_eq!(cfg.trigger_stage(), "B");
    }

    #[test]
    fn test_trigger_absent_falls_back() {
        let (cfg, fell_back) = StageConfig::from_raw(raw(&["A", "B"], "MISSING"));
        assert!(fell_back);
        assert_eq!(cfg, StageConfig::default());
    }

    #[test]
    fn test_empty_stage_list_falls_back() {
        let (cfg, fell_back) = StageConfig::from_raw(raw(&[], "X"));
        assert!(fell_back);
        assert_eq!(cfg.first_stage(), "NOVO");
    }

    #[test]
    fn test_duplicate_and_blank_stages_fall_back() {
        let (_, fell_back) = StageConfig::from_raw(raw(&["A", "A"], "A"));
        assert!(fell_back);
        let (_, fell_back) = StageConfig::from_raw(raw(&["A", "  "], "A"));
        assert!(fell_back);
    }

    #[test]
    fn test_cancelled_stage_not_allowed_in_list() {
        let (_, fell_back) = StageConfig::from_raw(raw(&["NOVO", CANCELLED_STAGE], "NOVO"));
        assert!(fell_back);
    }

    #[test]
    fn test_fallback_keeps_shortage_policy() {
        let mut r = raw(&[], "X");
        r.shortage_policy = ShortagePolicy::Block;
        let (cfg, fell_back) = StageConfig::from_raw(r);
        assert!(fell_back);
        assert_eq!(cfg.shortage_policy, ShortagePolicy::Block);
    }

    #[test]
    fn test_sequential_advance_only() {
        let cfg = StageConfig::default();
        assert!(cfg.validate_advance("NOVO", "EM_PRODUCAO").is_ok());
        // Skipping
        assert!(cfg.validate_advance("NOVO", "PRONTO").is_err());
        // Backward
        assert!(cfg.validate_advance("PRONTO", "EM_PRODUCAO").is_err());
        // Self
        assert!(cfg.validate_advance("NOVO", "NOVO").is_err());
        // Unknown
        assert!(cfg.validate_advance("NOVO", "NOPE").is_err());
        assert!(cfg.validate_advance("NOPE", "NOVO").is_err());
    }

    #[test]
    fn test_trigger_entry_detected() {
        let cfg = StageConfig::default();
        let effect = cfg.validate_advance("NOVO", "EM_PRODUCAO").unwrap();
        assert!(effect.enters_trigger);
        let effect = cfg.validate_advance("EM_PRODUCAO", "PRONTO").unwrap();
        assert!(!effect.enters_trigger);
    }

    #[test]
    fn test_no_advance_from_terminal() {
        let cfg = StageConfig::default();
        assert!(cfg.is_terminal("DONE"));
        assert!(cfg.is_terminal(CANCELLED_STAGE));
        assert!(cfg.validate_advance("DONE", "NOVO").is_err());
    }

    #[test]
    fn test_cancel_requires_justification() {
        let cfg = StageConfig::default();
        assert_eq!(
            cfg.validate_cancel("NOVO", ""),
            Err(PipelineError::MissingJustification)
        );
        assert_eq!(
            cfg.validate_cancel("NOVO", "   "),
            Err(PipelineError::MissingJustification)
        );
        assert!(cfg.validate_cancel("NOVO", "cliente desistiu").is_ok());
    }

    #[test]
    fn test_cancel_blocked_from_terminal() {
        let cfg = StageConfig::default();
        assert!(cfg.validate_cancel("DONE", "reason").is_err());
        assert!(cfg.validate_cancel(CANCELLED_STAGE, "reason").is_err());
        // Any non-terminal stage may cancel
        assert!(cfg.validate_cancel("POS2", "reason").is_ok());
    }
}
