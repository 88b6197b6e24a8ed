// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
use std::collections::BTreeMap;

use dwc_ir::WorkflowSpec;
use serde_json::{Value, json};

use super::OptimizationPass;
use crate::dependency_resolver::find_parallel_groups;
use crate::error::PassError;

/// Records conservatively independent sibling groups.
///
/// Groups go to `metadata.parallel_groups` and every grouped step gets
/// `config.parallel_group = "group_<i>"`. Edges are not changed.
pub struct ParallelizationPass;

impl OptimizationPass for ParallelizationPass {
    fn name(&self) -> &'static str {
        "parallelization"
    }

    fn apply(&self, mut spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        let groups = find_parallel_groups(&spec);
        if groups.is_empty() {
            return Ok(spec);
        }

        // A step that is a child of several parents keeps its last group.
        let mut group_of: BTreeMap<&str, usize> = BTreeMap::new();
        for (idx, group) in groups.iter().enumerate() {
            for step_id in group {
                group_of.insert(step_id.as_str(), idx);
            }
        }

        for step in &mut spec.steps {
            if let Some(idx) = group_of.get(step.id.as_str()) {
                step.config.insert(
                    "parallel_group".to_string(),
                    Value::String(format!("group_{idx}")),
                );
            }
        }

        spec.metadata
            .insert("parallel_groups".to_string(), json!(groups));
        Ok(spec)
    }
}
