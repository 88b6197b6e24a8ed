// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
use dwc_ir::WorkflowSpec;

use super::OptimizationPass;
use crate::error::PassError;
use crate::validation::validate_workflow;

/// Re-asserts structural invariants before anything is rewritten.
pub struct ValidatePass;

impl OptimizationPass for ValidatePass {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn apply(&self, spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        Ok(validate_workflow(spec)?)
    }
}
