// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Edge activation after a step completes.

use crate::plan::EdgePlan;
use crate::result::StepResult;

/// Targets activated by a finished source step.
///
/// - A source without conditional edges activates all of its edges.
/// - Otherwise every conditional edge whose predicate holds for the
///   result status is activated, so two matching edges fan out to both
///   targets.
/// - When no conditional edge holds, the first unconditional edge is the
///   default route. With no default, nothing is activated.
///
/// `edges` must be the source's outgoing edges in plan order.
pub fn activated_targets<'a>(edges: &[&'a EdgePlan], result: &StepResult) -> Vec<&'a str> {
    if !edges.iter().any(|e| e.is_conditional()) {
        return edges.iter().map(|e| e.target.as_str()).collect();
    }

    let matched: Vec<&str> = edges
        .iter()
        .filter(|e| e.is_conditional())
        .filter(|e| e.condition.is_some_and(|p| p.evaluate(&result.status)))
        .map(|e| e.target.as_str())
        .collect();
    if !matched.is_empty() {
        return matched;
    }

    edges
        .iter()
        .find(|e| !e.is_conditional())
        .map(|e| vec![e.target.as_str()])
        .unwrap_or_default()
}
