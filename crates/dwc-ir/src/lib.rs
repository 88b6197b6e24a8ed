// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow intermediate representation.
//!
//! A [`WorkflowSpec`] is a graph of typed steps connected by (optionally
//! conditional) edges, together with declared inputs, outputs, advisory
//! constraints and free-form metadata supplied by upstream collaborators.
//!
//! Values of these types are never mutated by the compiler: every
//! optimization pass consumes one spec and produces a new one.
//!
//! The JSON form is strict. Unknown fields are rejected at every level.
//!
//! ```
//! use dwc_ir::{StepKind, parse_workflow_spec};
//!
//! let spec = parse_workflow_spec(r#"{
//!     "name": "summarize",
//!     "steps": [
//!         {"id": "fetch", "kind": "tool", "config": {"tool_name": "fetch_doc"}},
//!         {"id": "summarize", "kind": "llm", "config": {"model": "gpt-4o", "prompt": "Summarize"}}
//!     ],
//!     "edges": [{"source": "fetch", "target": "summarize"}]
//! }"#).unwrap();
//!
//! assert_eq!(spec.version, "1.0.0");
//! assert_eq!(spec.steps[1].kind, StepKind::Llm);
//! ```

mod metadata;
mod predicate;
mod retry;
pub mod schema;
mod spec;

pub use metadata::{ToolFunction, WorkflowMetadata};
pub use predicate::Predicate;
pub use retry::{BackoffStrategy, MAX_RETRIES_LIMIT, RetryPolicy};
pub use schema::generate_ir_schema;
pub use spec::{
    ConstraintSpec, EdgeSpec, InputSpec, OutputSpec, Severity, StepKind, StepSpec, WorkflowSpec,
    parse_workflow_spec,
};

/// Version of the IR format understood by this crate.
pub const IR_VERSION: &str = "1.0.0";

/// Default per-attempt timeout for a step, in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 120;
