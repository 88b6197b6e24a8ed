// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory description of an optimized workflow.
//!
//! Generated programs build a [`WorkflowPlan`] with the builder methods
//! below; the engine only ever reads it.

use std::time::Duration;

use dwc_ir::{Predicate, RetryPolicy, StepKind};
use serde_json::Value;

use crate::TaskInput;

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Metadata strings baked into the generated program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanContext {
    pub synthesis_prompt: String,
    pub approved_plan: String,
    pub intent_summary: String,
    pub current_task_description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepPlan {
    pub id: String,
    pub kind: StepKind,
    pub config: TaskInput,
    pub retry: RetryPolicy,
    pub timeout_seconds: u64,
}

impl StepPlan {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            config: TaskInput::new(),
            retry: RetryPolicy::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn config(mut self, config: TaskInput) -> Self {
        self.config = config;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Hard per-attempt timeout. Never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Registry key of the tool this step calls.
    pub fn tool_name(&self) -> &str {
        self.config_str("tool_name")
            .or_else(|| self.config_str("loader"))
            .unwrap_or(&self.id)
    }

    pub fn subtask_description(&self) -> &str {
        self.config_str("subtask_description").unwrap_or_default()
    }

    /// Human label used in synthesized answers.
    pub fn label(&self) -> &str {
        self.config_str("subtask_description").unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePlan {
    pub source: String,
    pub target: String,
    pub condition: Option<Predicate>,
}

impl EdgePlan {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    pub fn when(mut self, condition: Predicate) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Edges with no condition or `always` are defaults, not conditions.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self.condition,
            Some(Predicate::StepSucceeded | Predicate::StepFailed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBinding {
    pub id: String,
    pub name: String,
    pub source_step: Option<String>,
}

impl OutputBinding {
    pub fn new(id: impl Into<String>, name: impl Into<String>, source_step: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_step: source_step.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowPlan {
    pub name: String,
    pub version: String,
    pub steps: Vec<StepPlan>,
    pub edges: Vec<EdgePlan>,
    pub outputs: Vec<OutputBinding>,
    /// Topological order, used to order dispatch and synthesized answers.
    pub order: Vec<String>,
    pub context: PlanContext,
}

impl WorkflowPlan {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn step(mut self, step: StepPlan) -> Self {
        self.steps.push(step);
        self
    }

    pub fn edge(mut self, edge: EdgePlan) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn output(mut self, output: OutputBinding) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn order(mut self, order: &[&str]) -> Self {
        self.order = order.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn context(mut self, context: PlanContext) -> Self {
        self.context = context;
        self
    }

    pub fn get_step(&self, id: &str) -> Option<&StepPlan> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn outgoing(&self, id: &str) -> Vec<&EdgePlan> {
        self.edges.iter().filter(|e| e.source == id).collect()
    }

    pub fn incoming(&self, id: &str) -> Vec<&EdgePlan> {
        self.edges.iter().filter(|e| e.target == id).collect()
    }

    /// Steps without incoming edges, in plan order.
    pub fn roots(&self) -> Vec<&str> {
        self.ordered_steps()
            .into_iter()
            .filter(|s| self.edges.iter().all(|e| e.target != s.id))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Steps in topological order when one was provided, followed by any
    /// step the order does not mention, in declaration order.
    pub fn ordered_steps(&self) -> Vec<&StepPlan> {
        let mut ordered: Vec<&StepPlan> = self
            .order
            .iter()
            .filter_map(|id| self.get_step(id))
            .collect();
        for step in &self.steps {
            if !self.order.contains(&step.id) {
                ordered.push(step);
            }
        }
        ordered
    }

    /// Distinct output source steps in output order.
    pub fn output_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        for output in &self.outputs {
            if let Some(source) = output.source_step.as_deref()
                && !sources.contains(&source)
            {
                sources.push(source);
            }
        }
        sources
    }
}
