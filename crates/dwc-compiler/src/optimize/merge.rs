// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fusion of adjacent, equivalently configured LLM steps.
//!
//! Fusion happens in two phases. [`RewritePlan::build`] inspects the spec
//! and decides which `head -> tail` pairs to fuse; [`RewritePlan::apply`]
//! produces the rewritten spec in one pass. The input spec is never
//! modified while it is being inspected.

use std::collections::{BTreeMap, BTreeSet};

use dwc_ir::{EdgeSpec, Predicate, StepKind, StepSpec, WorkflowSpec};
use serde_json::{Value, json};
use tracing::debug;

use super::OptimizationPass;
use crate::error::PassError;

/// One `head -> tail` fusion. The tail is absorbed into the head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fusion {
    pub head: String,
    pub tail: String,
}

/// The fusions to apply to a spec. Each step takes part in at most one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewritePlan {
    fusions: Vec<Fusion>,
}

impl RewritePlan {
    /// Decide which adjacent pairs to fuse.
    ///
    /// A pair `A -> B` qualifies when the edge is unconditional, both steps
    /// are LLM steps sharing `model` and `temperature` (missing temperature
    /// reads as 0), `A` has exactly one outgoing edge and `B` exactly one
    /// incoming edge. Steps are visited in spec order.
    pub fn build(spec: &WorkflowSpec) -> Self {
        let steps = spec.step_map();
        let outgoing = spec.edge_map();
        let incoming = spec.incoming_edge_map();
        let mut claimed: BTreeSet<&str> = BTreeSet::new();
        let mut fusions = Vec::new();

        for head in &spec.steps {
            if claimed.contains(head.id.as_str()) {
                continue;
            }
            let Some([edge]) = outgoing.get(head.id.as_str()).map(Vec::as_slice) else {
                continue;
            };
            if !edge.is_unconditional() || claimed.contains(edge.target.as_str()) {
                continue;
            }
            if incoming.get(edge.target.as_str()).map_or(0, Vec::len) != 1 {
                continue;
            }
            let Some(tail) = steps.get(edge.target.as_str()) else {
                continue;
            };
            if !compatible(head, tail) {
                continue;
            }

            claimed.insert(head.id.as_str());
            claimed.insert(tail.id.as_str());
            fusions.push(Fusion {
                head: head.id.clone(),
                tail: tail.id.clone(),
            });
        }

        Self { fusions }
    }

    pub fn fusions(&self) -> &[Fusion] {
        &self.fusions
    }

    pub fn is_empty(&self) -> bool {
        self.fusions.is_empty()
    }

    /// Produce the rewritten spec.
    pub fn apply(&self, spec: WorkflowSpec) -> WorkflowSpec {
        if self.is_empty() {
            return spec;
        }

        let merged_into: BTreeMap<&str, &str> = self
            .fusions
            .iter()
            .map(|f| (f.tail.as_str(), f.head.as_str()))
            .collect();
        let tails_by_head: BTreeMap<&str, &str> = self
            .fusions
            .iter()
            .map(|f| (f.head.as_str(), f.tail.as_str()))
            .collect();
        let remap = |id: &str| merged_into.get(id).copied().unwrap_or(id).to_string();

        let by_id = spec.step_map();
        let steps: Vec<StepSpec> = spec
            .steps
            .iter()
            .filter(|s| !merged_into.contains_key(s.id.as_str()))
            .map(|s| match tails_by_head.get(s.id.as_str()).and_then(|t| by_id.get(t)) {
                Some(tail) => fuse(s, tail),
                None => s.clone(),
            })
            .collect();

        let mut seen: BTreeSet<(String, String, Option<Predicate>)> = BTreeSet::new();
        let mut edges = Vec::with_capacity(spec.edges.len());
        for edge in &spec.edges {
            let source = remap(&edge.source);
            let target = remap(&edge.target);
            if source == target {
                continue;
            }
            if seen.insert((source.clone(), target.clone(), edge.condition)) {
                edges.push(EdgeSpec {
                    source,
                    target,
                    condition: edge.condition,
                });
            }
        }

        let mut outputs = spec.outputs.clone();
        for output in &mut outputs {
            if let Some(source) = output.source_step.as_mut() {
                *source = remap(source);
            }
        }

        WorkflowSpec {
            steps,
            edges,
            outputs,
            ..spec
        }
    }
}

fn fusible(kind: StepKind) -> bool {
    match kind {
        StepKind::Llm => true,
        StepKind::Tool | StepKind::Condition | StepKind::Transform => false,
    }
}

fn compatible(head: &StepSpec, tail: &StepSpec) -> bool {
    fusible(head.kind)
        && fusible(tail.kind)
        && head.config.get("model") == tail.config.get("model")
        && same_temperature(head.config.get("temperature"), tail.config.get("temperature"))
}

fn same_temperature(a: Option<&Value>, b: Option<&Value>) -> bool {
    let zero = json!(0);
    let (a, b) = (a.unwrap_or(&zero), b.unwrap_or(&zero));
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn prompt_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn fuse(head: &StepSpec, tail: &StepSpec) -> StepSpec {
    let mut config = head.config.clone();

    let prompts: Vec<String> = [head.config.get("prompt"), tail.config.get("prompt")]
        .into_iter()
        .flatten()
        .map(prompt_text)
        .collect();
    if !prompts.is_empty() {
        config.insert("prompt".to_string(), Value::String(prompts.join("\n\n")));
    }
    config.insert(
        "fused_steps".to_string(),
        json!([head.id.as_str(), tail.id.as_str()]),
    );

    debug!(head = %head.id, tail = %tail.id, "Fused LLM steps");

    StepSpec {
        id: head.id.clone(),
        kind: head.kind,
        config,
        retry_policy: head.retry_policy.clone(),
        timeout_seconds: head.timeout_seconds.max(tail.timeout_seconds),
    }
}

/// Fuses adjacent compatible LLM steps, one link per chain per run.
pub struct MergeCompatibleStepsPass;

impl OptimizationPass for MergeCompatibleStepsPass {
    fn name(&self) -> &'static str {
        "merge_compatible_steps"
    }

    fn apply(&self, spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        let plan = RewritePlan::build(&spec);
        Ok(plan.apply(spec))
    }
}
