// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dynamic Workflow Runtime
//!
//! Execution engine that every generated workflow program links against.
//! The generated `main.rs` builds a [`plan::WorkflowPlan`] describing the
//! optimized graph and hands it to the [`engine::Engine`], which provides:
//!
//! - Wave dispatch of ready steps onto a bounded worker pool
//! - Hard per-attempt timeouts
//! - Sequential retries with fixed or exponential backoff
//! - Conditional routing on the status of a step's result
//! - A fallback synthesis that never fails
//! - Document input from text, PDF, DOCX and DOC files
//!
//! Usage in generated workflow code:
//! ```rust,ignore
//! use dwc_runtime::prelude::*;
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod executor;
pub mod input;
pub mod llm;
pub mod plan;
pub mod result;
pub mod retry;
pub mod routing;
pub mod synthesis;
pub mod telemetry;
pub mod tools;

// Re-exported for generated workflows
pub use dwc_ir;
pub use serde_json;
pub use tokio;
pub use tracing;

/// Task input handed to every step: the workflow input enriched with
/// step context.
pub type TaskInput = serde_json::Map<String, serde_json::Value>;

/// Parse a JSON object literal embedded in generated code.
///
/// Anything that is not a JSON object yields an empty map.
pub fn json_object(text: &str) -> TaskInput {
    match serde_json::from_str(text) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => TaskInput::new(),
    }
}

// Prelude for convenient imports
pub mod prelude {
    pub use crate::TaskInput;
    pub use crate::config::{RuntimeConfig, load_dotenv};
    pub use crate::engine::{Engine, RunOutcome};
    pub use crate::error::{StepError, ToolError};
    pub use crate::executor::{DefaultExecutor, StepContext, StepExecutor};
    pub use crate::input::{RunArgs, build_input};
    pub use crate::json_object;
    pub use crate::plan::{EdgePlan, OutputBinding, PlanContext, StepPlan, WorkflowPlan};
    pub use crate::result::StepResult;
    pub use crate::telemetry::init_subscriber;
    pub use crate::tools::{ToolFn, ToolRegistry, input_text};
    pub use dwc_ir::{BackoffStrategy, Predicate, RetryPolicy, StepKind};
    pub use serde_json::{Value, json};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object() {
        assert_eq!(json_object(r#"{"a": 1}"#)["a"], 1);
        assert!(json_object("[1, 2]").is_empty());
        assert!(json_object("not json").is_empty());
    }
}
