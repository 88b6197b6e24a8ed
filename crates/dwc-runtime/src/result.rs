// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The `{tool, status, result}` record every step produces.

use dwc_ir::Predicate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";
/// An LLM step answered with the fallback synthesis.
pub const STATUS_FALLBACK: &str = "fallback";
/// A condition step whose predicate did not hold.
pub const STATUS_UNMATCHED: &str = "unmatched";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub tool: String,
    pub status: String,
    pub result: String,
}

impl StepResult {
    pub fn new(tool: impl Into<String>, status: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: status.into(),
            result: result.into(),
        }
    }

    pub fn ok(tool: impl Into<String>, result: impl Into<String>) -> Self {
        Self::new(tool, STATUS_OK, result)
    }

    pub fn error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(tool, STATUS_ERROR, message)
    }

    /// `ok` or `success`, case-insensitively.
    pub fn is_success(&self) -> bool {
        Predicate::is_success_status(&self.status)
    }

    /// Coerce an arbitrary tool return value into a result record.
    ///
    /// Objects keep their fields with `tool`, `status` and `result` filled
    /// in when missing; any other value becomes an `ok` result holding its
    /// text.
    pub fn from_value(default_tool: &str, value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let field = |key: &str| map.get(key).map(value_text);
                Self {
                    tool: field("tool").unwrap_or_else(|| default_tool.to_string()),
                    status: field("status").unwrap_or_else(|| STATUS_OK.to_string()),
                    result: field("result").unwrap_or_default(),
                }
            }
            other => Self::ok(default_tool, value_text(&other)),
        }
    }

    /// Fill empty `tool` and `status` fields.
    pub fn sanitized(mut self, default_tool: &str) -> Self {
        if self.tool.trim().is_empty() {
            self.tool = default_tool.to_string();
        }
        if self.status.trim().is_empty() {
            self.status = STATUS_OK.to_string();
        }
        self
    }
}

/// Strings as-is, null as empty, anything else as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_fills_missing_fields() {
        let r = StepResult::from_value("step_a", json!({"result": "found 3"}));
        assert_eq!(r, StepResult::ok("step_a", "found 3"));

        let r = StepResult::from_value("step_a", json!({"tool": "search", "status": "error"}));
        assert_eq!(r, StepResult::error("search", ""));

        let r = StepResult::from_value("step_a", json!({"result": {"count": 3}}));
        assert_eq!(r.result, r#"{"count":3}"#);
    }

    #[test]
    fn test_from_scalar() {
        assert_eq!(
            StepResult::from_value("t", json!(42)),
            StepResult::ok("t", "42")
        );
        assert_eq!(
            StepResult::from_value("t", json!("plain")),
            StepResult::ok("t", "plain")
        );
    }

    #[test]
    fn test_sanitized() {
        let r = StepResult::new("", " ", "x").sanitized("fallback_tool");
        assert_eq!(r, StepResult::ok("fallback_tool", "x"));
    }

    #[test]
    fn test_is_success() {
        assert!(StepResult::new("t", "SUCCESS", "").is_success());
        assert!(!StepResult::new("t", STATUS_FALLBACK, "").is_success());
    }
}
