// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Removal of steps that cannot influence any workflow result.

use dwc_ir::WorkflowSpec;
use tracing::debug;

use super::OptimizationPass;
use crate::dependency_resolver::{ancestors_of, terminal_steps};
use crate::error::PassError;

/// Keeps only steps backward-reachable from a terminal step.
///
/// Terminal steps are the declared output sources, or the sinks when no
/// output names one. A spec with no steps or no terminal steps passes
/// through unchanged.
pub struct DeadStepEliminationPass;

impl OptimizationPass for DeadStepEliminationPass {
    fn name(&self) -> &'static str {
        "dead_step_elimination"
    }

    fn apply(&self, mut spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        if spec.steps.is_empty() {
            return Ok(spec);
        }
        let terminals = terminal_steps(&spec);
        if terminals.is_empty() {
            return Ok(spec);
        }

        let useful = ancestors_of(&spec, &terminals);
        let before = spec.steps.len();

        spec.steps.retain(|s| useful.contains(&s.id));
        spec.edges
            .retain(|e| useful.contains(&e.source) && useful.contains(&e.target));
        spec.outputs.retain(|o| match o.source_step.as_deref() {
            None | Some("") => true,
            Some(step) => useful.contains(step),
        });

        if spec.steps.len() != before {
            debug!(removed = before - spec.steps.len(), "Eliminated dead steps");
        }
        Ok(spec)
    }
}
