// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Edge predicates.
//!
//! Conditions are a closed vocabulary evaluated against the status string of
//! an edge's source step result. There is no expression language.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition attached to an edge.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Predicate {
    Always,
    #[serde(alias = "ok", alias = "success")]
    StepSucceeded,
    #[serde(alias = "error", alias = "failed")]
    StepFailed,
}

impl Predicate {
    /// Whether a step status counts as success (`ok` or `success`).
    pub fn is_success_status(status: &str) -> bool {
        let status = status.trim();
        status.eq_ignore_ascii_case("ok") || status.eq_ignore_ascii_case("success")
    }

    /// Evaluate against the source step's status.
    pub fn evaluate(self, status: &str) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::StepSucceeded => Self::is_success_status(status),
            Predicate::StepFailed => !Self::is_success_status(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate() {
        assert!(Predicate::Always.evaluate("error"));
        assert!(Predicate::StepSucceeded.evaluate("ok"));
        assert!(Predicate::StepSucceeded.evaluate(" Success "));
        assert!(!Predicate::StepSucceeded.evaluate("fallback"));
        assert!(Predicate::StepFailed.evaluate("error"));
        assert!(Predicate::StepFailed.evaluate("unmatched"));
        assert!(!Predicate::StepFailed.evaluate("OK"));
    }

    #[test]
    fn test_aliases() {
        let parse = |s: &str| serde_json::from_str::<Predicate>(s).unwrap();
        assert_eq!(parse("\"ok\""), Predicate::StepSucceeded);
        assert_eq!(parse("\"success\""), Predicate::StepSucceeded);
        assert_eq!(parse("\"step_succeeded\""), Predicate::StepSucceeded);
        assert_eq!(parse("\"error\""), Predicate::StepFailed);
        assert_eq!(parse("\"failed\""), Predicate::StepFailed);
        assert_eq!(parse("\"always\""), Predicate::Always);
        assert!(serde_json::from_str::<Predicate>("\"x > 1\"").is_err());
    }

    #[test]
    fn test_serializes_canonical_name() {
        assert_eq!(
            serde_json::to_string(&Predicate::StepFailed).unwrap(),
            "\"step_failed\""
        );
        assert_eq!(Predicate::StepSucceeded.to_string(), "step_succeeded");
    }
}
