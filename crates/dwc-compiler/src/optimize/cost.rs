// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Heuristic token and cost estimate for LLM steps.

use dwc_ir::{StepKind, StepSpec, WorkflowSpec};
use serde_json::{Value, json};

use super::OptimizationPass;
use crate::error::PassError;

/// USD per 1k prompt tokens.
const INPUT_USD_PER_1K: f64 = 0.003;
/// USD per 1k completion tokens.
const OUTPUT_USD_PER_1K: f64 = 0.015;
const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 512;

/// Stores `metadata.cost_estimate`. Execution is unaffected.
pub struct CostEstimationPass;

fn prompt_tokens(step: &StepSpec) -> u64 {
    let chars = match step.config.get("prompt") {
        None => 0,
        Some(Value::String(s)) => s.chars().count(),
        Some(other) => other.to_string().chars().count(),
    };
    ((chars / 4) as u64).max(1)
}

fn output_tokens(step: &StepSpec) -> Result<u64, PassError> {
    let Some(value) = step.config.get("max_output_tokens") else {
        return Ok(DEFAULT_MAX_OUTPUT_TOKENS);
    };
    let parsed = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        PassError::Failed(format!(
            "step '{}' has invalid max_output_tokens: {value}",
            step.id
        ))
    })
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

impl OptimizationPass for CostEstimationPass {
    fn name(&self) -> &'static str {
        "cost_estimation"
    }

    fn apply(&self, mut spec: WorkflowSpec) -> Result<WorkflowSpec, PassError> {
        let mut llm_steps = 0usize;
        let mut input_tokens = 0u64;
        let mut output_tokens_total = 0u64;

        for step in &spec.steps {
            match step.kind {
                StepKind::Llm => {
                    llm_steps += 1;
                    input_tokens += prompt_tokens(step);
                    output_tokens_total += output_tokens(step)?;
                }
                StepKind::Tool | StepKind::Condition | StepKind::Transform => {}
            }
        }

        let usd = (input_tokens as f64 / 1000.0) * INPUT_USD_PER_1K
            + (output_tokens_total as f64 / 1000.0) * OUTPUT_USD_PER_1K;

        spec.metadata.insert(
            "cost_estimate".to_string(),
            json!({
                "llm_steps": llm_steps,
                "estimated_input_tokens": input_tokens,
                "estimated_output_tokens": output_tokens_total,
                "estimated_total_usd": round6(usd),
            }),
        );
        Ok(spec)
    }
}
