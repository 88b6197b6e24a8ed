// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
use dwc_ir::{BackoffStrategy, StepKind, WorkflowSpec};

use super::OptimizationPass;
use crate::error::PassError;

/// Floor applied to every step's timeout.
pub const MIN_TIMEOUT_SECONDS: i64 = 30;

/// Raises retry and timeout settings to per-kind minimums.
///
/// | kind      | min retries | default backoff |
/// |-----------|-------------|-----------------|
/// | llm       | 2           | exponential     |
/// | tool      | 1           | fixed           |
/// | condition | 1           | fixed           |
/// | transform | 1           | fixed           |
///
/// Explicit strategies are kept. Every timeout is raised to at least
/// [`MIN_TIMEOUT_SECONDS`].
pub struct RetryPolicyInjectionPass;

fn minimums(kind: StepKind) -> (u32, BackoffStrategy) {
    match kind {
        StepKind::Llm => (2, BackoffStrategy::Exponential),
        StepKind::Tool | StepKind::Condition | StepKind::Transform => (1, BackoffStrategy::Fixed),
    }
}

impl OptimizationPass for RetryPolicyInjectionPass {
    fn name(&self) -> &'static str {
        "retry_policy_injection"
    }

    fn apply(&self, mut spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        for step in &mut spec.steps {
            let (min_retries, default_backoff) = minimums(step.kind);
            let policy = &mut step.retry_policy;
            policy.max_retries = policy.max_retries.max(min_retries);
            policy.backoff_strategy.get_or_insert(default_backoff);
            step.timeout_seconds = step.timeout_seconds.max(MIN_TIMEOUT_SECONDS);
        }
        Ok(spec)
    }
}
