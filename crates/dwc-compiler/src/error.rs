// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error taxonomy for the compiler pipeline.
//!
//! Nothing in the pipeline recovers from these: the first error halts
//! compilation at the stage that raised it.

use std::path::PathBuf;

/// The step graph contains at least one cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Workflow graph contains a cycle involving steps: {}", .unordered.join(", "))]
pub struct CycleError {
    /// Steps that could not be placed in a topological order, sorted.
    pub unordered: Vec<String>,
}

/// A structural invariant of the workflow is violated.
///
/// Codes are stable and checked in ascending order; only the first
/// violation is reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("[E001] Workflow must include at least one step")]
    EmptyWorkflow,

    #[error("[E002] Duplicate step id '{step_id}'")]
    DuplicateStepId { step_id: String },

    #[error("[E003] Step at index {index} has an empty id")]
    EmptyStepId { index: usize },

    #[error("[E004] Edge source does not exist: '{edge_source}' (edge to '{edge_target}')")]
    UnknownEdgeSource {
        edge_source: String,
        edge_target: String,
    },

    #[error("[E005] Edge target does not exist: '{edge_target}' (edge from '{edge_source}')")]
    UnknownEdgeTarget {
        edge_source: String,
        edge_target: String,
    },

    #[error("[E006] Output '{output_id}' references unknown step '{source_step}'")]
    UnknownOutputSource {
        output_id: String,
        source_step: String,
    },

    #[error("[E007] Tool step '{step_id}' must declare config.tool_name or config.loader")]
    MissingToolBinding { step_id: String },

    #[error("[E008] Step '{step_id}' timeout_seconds must be positive, got {timeout_seconds}")]
    NonPositiveTimeout { step_id: String, timeout_seconds: i64 },

    #[error("[E009] Step '{step_id}' has an invalid retry policy: {reason}")]
    InvalidRetryPolicy { step_id: String, reason: String },

    #[error("[E010] {0}")]
    Cycle(#[from] CycleError),
}

impl ValidationError {
    /// The stable error code, e.g. `E004`.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyWorkflow => "E001",
            ValidationError::DuplicateStepId { .. } => "E002",
            ValidationError::EmptyStepId { .. } => "E003",
            ValidationError::UnknownEdgeSource { .. } => "E004",
            ValidationError::UnknownEdgeTarget { .. } => "E005",
            ValidationError::UnknownOutputSource { .. } => "E006",
            ValidationError::MissingToolBinding { .. } => "E007",
            ValidationError::NonPositiveTimeout { .. } => "E008",
            ValidationError::InvalidRetryPolicy { .. } => "E009",
            ValidationError::Cycle(_) => "E010",
        }
    }
}

/// Failure raised from inside an optimization pass.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// Propagated unchanged by the optimizer.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wrapped by the optimizer with the failing pass name.
    #[error("{0}")]
    Failed(String),
}

impl From<CycleError> for PassError {
    fn from(err: CycleError) -> Self {
        PassError::Validation(ValidationError::Cycle(err))
    }
}

/// Failure while rendering or writing generated artifacts.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("Tool '{tool}' code could not be tokenized as Rust: {message}")]
    UnrenderableToolCode { tool: String, message: String },

    #[error("'{name}' cannot be turned into a Rust identifier")]
    InvalidIdentifier { name: String },

    #[error("Dependency '{requirement}' is not a valid crate requirement: {reason}")]
    InvalidDependency {
        requirement: String,
        reason: &'static str,
    },

    #[error("Template '{template}' failed to render: {source}")]
    Template {
        template: &'static str,
        #[source]
        source: minijinja::Error,
    },

    #[error("Failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level compile failure.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Failed to parse workflow spec: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Optimization pass '{pass}' failed: {message}")]
    PassExecution { pass: &'static str, message: String },

    #[error("Code generation failed: {0}")]
    Codegen(#[from] CodegenError),
}
