// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Canonical ordering for deterministic serialization and codegen.

use dwc_ir::WorkflowSpec;

use super::OptimizationPass;
use crate::error::{PassError, ValidationError};
use crate::validation::validate_workflow;

/// Sort inputs, outputs, steps and constraints by id and edges by
/// `(source, target, condition)`, then re-validate.
pub fn normalize_workflow(mut spec: WorkflowSpec) -> Result<WorkflowSpec, ValidationError> {
    spec.inputs.sort_by(|a, b| a.id.cmp(&b.id));
    spec.outputs.sort_by(|a, b| a.id.cmp(&b.id));
    spec.steps.sort_by(|a, b| a.id.cmp(&b.id));
    spec.edges.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    if let Some(constraints) = spec.constraints.as_mut() {
        constraints.sort_by(|a, b| a.id.cmp(&b.id));
    }
    validate_workflow(spec)
}

pub struct NormalizePass;

impl OptimizationPass for NormalizePass {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        Ok(normalize_workflow(spec)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwc_ir::{EdgeSpec, Predicate, StepKind, StepSpec};

    fn shuffled() -> WorkflowSpec {
        let mut spec = WorkflowSpec::new("w");
        spec.steps = ["c", "a", "b"]
            .into_iter()
            .map(|id| StepSpec::new(id, StepKind::Transform))
            .collect();
        spec.edges = vec![
            EdgeSpec::new("b", "c").when(Predicate::StepFailed),
            EdgeSpec::new("a", "c"),
            EdgeSpec::new("b", "c").when(Predicate::StepSucceeded),
            EdgeSpec::new("a", "b"),
        ];
        spec
    }

    #[test]
    fn test_sorts_steps_and_edges() {
        let spec = normalize_workflow(shuffled()).unwrap();
        assert_eq!(spec.step_ids(), vec!["a", "b", "c"]);
        let edges: Vec<_> = spec
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.condition))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("a", "b", None),
                ("a", "c", None),
                ("b", "c", Some(Predicate::StepSucceeded)),
                ("b", "c", Some(Predicate::StepFailed)),
            ]
        );
    }

    #[test]
    fn test_idempotent_and_byte_stable() {
        let once = normalize_workflow(shuffled()).unwrap();
        let twice = normalize_workflow(once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            once.to_canonical_json().unwrap(),
            twice.to_canonical_json().unwrap()
        );
    }
}
