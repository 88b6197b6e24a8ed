// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deterministic answer assembled from step results.

use std::collections::BTreeMap;

use crate::TaskInput;
use crate::plan::WorkflowPlan;
use crate::result::{StepResult, value_text};

pub const NO_ANSWER: &str = "No answer generated.";

/// Summarize the run without calling any model.
///
/// The request line comes first when the input carries a `query`, followed
/// by one line per completed step in plan order. Never fails.
pub fn fallback_synthesis(
    plan: &WorkflowPlan,
    input: &TaskInput,
    results: &BTreeMap<String, StepResult>,
) -> String {
    let mut lines = Vec::new();

    if let Some(query) = input.get("query").map(value_text)
        && !query.trim().is_empty()
    {
        lines.push(format!("Request: {query}"));
    }

    for step in plan.ordered_steps() {
        if let Some(result) = results.get(&step.id) {
            lines.push(format!("- {}: {}", step.label(), result.result.trim()));
        }
    }

    let summary = lines.join("\n");
    let summary = summary.trim();
    if summary.is_empty() {
        NO_ANSWER.to_string()
    } else {
        summary.to_string()
    }
}
