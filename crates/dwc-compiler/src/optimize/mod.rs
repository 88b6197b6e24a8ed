// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Optimization pipeline.
//!
//! A pass consumes one [`WorkflowSpec`] and returns a new one. The
//! [`Optimizer`] runs passes in order and records the names of the passes
//! it applied under `metadata.optimization_trace`.
//!
//! Default pass order:
//!
//! | # | Pass                     | Effect                                       |
//! |---|--------------------------|----------------------------------------------|
//! | 1 | `validate`               | structural invariants                        |
//! | 2 | `normalize`              | canonical ordering, re-validated             |
//! | 3 | `dependency_resolve`     | `metadata.dependency`                        |
//! | 4 | `dead_step_elimination`  | drops steps that feed no terminal step       |
//! | 5 | `merge_compatible_steps` | fuses adjacent compatible LLM steps          |
//! | 6 | `parallelization`        | `metadata.parallel_groups`, step tags        |
//! | 7 | `retry_policy_injection` | per-kind retry and timeout minimums          |
//! | 8 | `cost_estimation`        | `metadata.cost_estimate`                     |

mod cost;
mod dead_steps;
mod dependency;
mod merge;
mod normalize;
mod parallel;
mod retry_injection;
mod validate;

pub use cost::CostEstimationPass;
pub use dead_steps::DeadStepEliminationPass;
pub use dependency::DependencyResolvePass;
pub use merge::{Fusion, MergeCompatibleStepsPass, RewritePlan};
pub use normalize::{NormalizePass, normalize_workflow};
pub use parallel::ParallelizationPass;
pub use retry_injection::RetryPolicyInjectionPass;
pub use validate::ValidatePass;

use dwc_ir::WorkflowSpec;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CompileError, PassError};

/// A single `Spec -> Spec` transform.
pub trait OptimizationPass {
    /// Name recorded in the optimization trace and in error messages.
    fn name(&self) -> &'static str;

    fn apply(&self, spec: WorkflowSpec) -> Result<WorkflowSpec, PassError>;
}

/// Runs an ordered list of passes.
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizationPass>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Optimizer with the default eight passes.
    pub fn new() -> Self {
        Self::with_passes(vec![
            Box::new(ValidatePass),
            Box::new(NormalizePass),
            Box::new(DependencyResolvePass),
            Box::new(DeadStepEliminationPass),
            Box::new(MergeCompatibleStepsPass),
            Box::new(ParallelizationPass),
            Box::new(RetryPolicyInjectionPass),
            Box::new(CostEstimationPass),
        ])
    }

    pub fn with_passes(passes: Vec<Box<dyn OptimizationPass>>) -> Self {
        Self { passes }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass in order.
    ///
    /// Validation errors raised by a pass surface as
    /// [`CompileError::Validation`]; any other failure is wrapped in
    /// [`CompileError::PassExecution`] with the failing pass's name.
    pub fn optimize(&self, spec: WorkflowSpec) -> Result<WorkflowSpec, CompileError> {
        let mut current = spec;
        let mut trace = Vec::with_capacity(self.passes.len());

        for pass in &self.passes {
            let name = pass.name();
            debug!(pass = name, steps = current.steps.len(), "Applying optimization pass");

            current = match pass.apply(current) {
                Ok(next) => next,
                Err(PassError::Validation(err)) => return Err(CompileError::Validation(err)),
                Err(PassError::Failed(message)) => {
                    return Err(CompileError::PassExecution {
                        pass: name,
                        message,
                    });
                }
            };
            trace.push(Value::String(name.to_string()));
        }

        info!(
            workflow = %current.name,
            steps = current.steps.len(),
            edges = current.edges.len(),
            "Workflow optimized"
        );

        current
            .metadata
            .insert("optimization_trace".to_string(), Value::Array(trace));
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use dwc_ir::{StepKind, StepSpec};

    struct FailingPass;

    impl OptimizationPass for FailingPass {
        fn name(&self) -> &'static str {
            "always_fails"
        }

        fn apply(&self, _spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
            Err(PassError::Failed("boom".into()))
        }
    }

    fn one_step() -> WorkflowSpec {
        let mut spec = WorkflowSpec::new("w");
        spec.steps
            .push(StepSpec::new("a", StepKind::Tool).with_config("tool_name", "t"));
        spec
    }

    #[test]
    fn test_default_pass_order() {
        assert_eq!(
            Optimizer::new().pass_names(),
            vec![
                "validate",
                "normalize",
                "dependency_resolve",
                "dead_step_elimination",
                "merge_compatible_steps",
                "parallelization",
                "retry_policy_injection",
                "cost_estimation",
            ]
        );
    }

    #[test]
    fn test_trace_recorded() {
        let optimized = Optimizer::new().optimize(one_step()).unwrap();
        let trace = optimized.metadata["optimization_trace"].as_array().unwrap();
        assert_eq!(trace.len(), 8);
        assert_eq!(trace[0], "validate");
        assert_eq!(trace[7], "cost_estimation");
    }

    #[test]
    fn test_failure_wrapped_with_pass_name() {
        let optimizer = Optimizer::with_passes(vec![Box::new(ValidatePass), Box::new(FailingPass)]);
        let err = optimizer.optimize(one_step()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Optimization pass 'always_fails' failed: boom"
        );
    }

    #[test]
    fn test_validation_error_propagated_unchanged() {
        let err = Optimizer::new()
            .optimize(WorkflowSpec::new("empty"))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Validation(ValidationError::EmptyWorkflow)
        ));
    }
}
