// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structural validation of workflow specs.
//!
//! Checks run in a fixed order and stop at the first violation:
//!
//! 1. The workflow has at least one step
//! 2. Step ids are unique
//! 3. Step ids are non-empty
//! 4. Edge endpoints reference known steps
//! 5. Output `source_step`s reference known steps
//! 6. Kind-specific step configuration is present
//! 7. Timeouts are positive
//! 8. Retry policies are within bounds
//! 9. The graph is acyclic

use std::collections::BTreeSet;

use dwc_ir::{MAX_RETRIES_LIMIT, StepKind, StepSpec, WorkflowSpec};

use crate::dependency_resolver;
use crate::error::ValidationError;

/// Validate a spec, handing it back unchanged on success.
pub fn validate_workflow(spec: WorkflowSpec) -> Result<WorkflowSpec, ValidationError> {
    check_workflow(&spec)?;
    Ok(spec)
}

/// Borrowing form of [`validate_workflow`].
pub fn check_workflow(spec: &WorkflowSpec) -> Result<(), ValidationError> {
    if spec.steps.is_empty() {
        return Err(ValidationError::EmptyWorkflow);
    }

    let mut seen = BTreeSet::new();
    for step in &spec.steps {
        let id = step.id.trim();
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateStepId {
                step_id: id.to_string(),
            });
        }
    }

    if let Some(index) = spec.steps.iter().position(|s| s.id.trim().is_empty()) {
        return Err(ValidationError::EmptyStepId { index });
    }

    let known: BTreeSet<&str> = spec.steps.iter().map(|s| s.id.as_str()).collect();

    for edge in &spec.edges {
        if !known.contains(edge.source.as_str()) {
            return Err(ValidationError::UnknownEdgeSource {
                edge_source: edge.source.clone(),
                edge_target: edge.target.clone(),
            });
        }
        if !known.contains(edge.target.as_str()) {
            return Err(ValidationError::UnknownEdgeTarget {
                edge_source: edge.source.clone(),
                edge_target: edge.target.clone(),
            });
        }
    }

    for output in &spec.outputs {
        if let Some(source_step) = output.source_step.as_deref()
            && !source_step.is_empty()
            && !known.contains(source_step)
        {
            return Err(ValidationError::UnknownOutputSource {
                output_id: output.id.clone(),
                source_step: source_step.to_string(),
            });
        }
    }

    for step in &spec.steps {
        check_step_config(step)?;
    }

    for step in &spec.steps {
        if step.timeout_seconds <= 0 {
            return Err(ValidationError::NonPositiveTimeout {
                step_id: step.id.clone(),
                timeout_seconds: step.timeout_seconds,
            });
        }
    }

    for step in &spec.steps {
        check_retry_policy(step)?;
    }

    dependency_resolver::topological_order(spec)?;
    Ok(())
}

fn check_step_config(step: &StepSpec) -> Result<(), ValidationError> {
    match step.kind {
        StepKind::Tool => {
            if step.tool_name().is_none() {
                return Err(ValidationError::MissingToolBinding {
                    step_id: step.id.clone(),
                });
            }
        }
        // Model and temperature fall back to runtime defaults.
        StepKind::Llm => {}
        StepKind::Condition | StepKind::Transform => {}
    }
    Ok(())
}

fn check_retry_policy(step: &StepSpec) -> Result<(), ValidationError> {
    let policy = &step.retry_policy;
    let invalid = |reason: String| ValidationError::InvalidRetryPolicy {
        step_id: step.id.clone(),
        reason,
    };

    if policy.max_retries > MAX_RETRIES_LIMIT {
        return Err(invalid(format!(
            "max_retries {} exceeds {MAX_RETRIES_LIMIT}",
            policy.max_retries
        )));
    }
    if !(policy.initial_delay_seconds.is_finite() && policy.initial_delay_seconds > 0.0) {
        return Err(invalid(format!(
            "initial_delay_seconds must be positive, got {}",
            policy.initial_delay_seconds
        )));
    }
    if !(policy.max_delay_seconds.is_finite() && policy.max_delay_seconds > 0.0) {
        return Err(invalid(format!(
            "max_delay_seconds must be positive, got {}",
            policy.max_delay_seconds
        )));
    }
    Ok(())
}
