// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
use dwc_ir::WorkflowSpec;

use super::OptimizationPass;
use crate::dependency_resolver::DependencyAnnotation;
use crate::error::PassError;

/// Stores topological order, roots and sinks under `metadata.dependency`.
/// Steps and edges are left untouched.
pub struct DependencyResolvePass;

impl OptimizationPass for DependencyResolvePass {
    fn name(&self) -> &'static str {
        "dependency_resolve"
    }

    fn apply(&self, mut spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        let annotation = DependencyAnnotation::compute(&spec)?;
        let value = serde_json::to_value(annotation)
            .map_err(|e| PassError::Failed(format!("cannot encode dependency annotation: {e}")))?;
        spec.metadata.insert("dependency".to_string(), value);
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwc_ir::{EdgeSpec, StepKind, StepSpec};
    use serde_json::json;

    #[test]
    fn test_annotation_only() {
        let mut spec = WorkflowSpec::new("w");
        spec.steps = ["A", "B", "C"]
            .into_iter()
            .map(|id| StepSpec::new(id, StepKind::Transform))
            .collect();
        spec.edges = vec![EdgeSpec::new("A", "C"), EdgeSpec::new("B", "C")];

        let annotated = DependencyResolvePass.apply(spec.clone()).unwrap();
        assert_eq!(annotated.steps, spec.steps);
        assert_eq!(annotated.edges, spec.edges);
        assert_eq!(
            annotated.metadata["dependency"],
            json!({
                "topological_order": ["A", "B", "C"],
                "roots": ["A", "B"],
                "sinks": ["C"]
            })
        );
    }
}
