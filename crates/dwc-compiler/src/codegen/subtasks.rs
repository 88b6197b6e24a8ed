// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Subtask extraction.
//!
//! Subtasks come from `metadata.subtasks` when present. Otherwise every tool
//! step becomes one. A workflow always has at least one subtask.

use dwc_ir::{StepKind, WorkflowSpec};
use serde::Serialize;
use serde_json::Value;

use super::ast::context::safe_identifier;

/// One unit of work named in the runbook and bound to a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subtask {
    pub id: String,
    pub description: String,
    pub tool: String,
}

fn default_tool(id: &str) -> String {
    format!("tool_{}", safe_identifier(id))
}

fn trimmed_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extract subtasks in declaration order.
///
/// Metadata rows without a description are skipped. Row ids default to
/// `task_<n>` where `n` is the 1-based row position.
pub fn extract_subtasks(spec: &WorkflowSpec) -> Vec<Subtask> {
    let rows = spec.metadata_view().subtask_rows();

    let mut subtasks: Vec<Subtask> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let description = trimmed_str(row.get("description"))?;
            let id = trimmed_str(row.get("id"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("task_{}", index + 1));
            let tool = trimmed_str(row.get("tool_name"))
                .map(str::to_string)
                .unwrap_or_else(|| default_tool(&id));
            Some(Subtask {
                id,
                description: description.to_string(),
                tool,
            })
        })
        .collect();

    if subtasks.is_empty() {
        subtasks = spec
            .steps
            .iter()
            .filter(|step| step.kind == StepKind::Tool)
            .map(|step| {
                let description = trimmed_str(step.config.get("subtask_description"))
                    .or_else(|| trimmed_str(step.config.get("description")))
                    .unwrap_or(&step.id)
                    .to_string();
                let tool = step
                    .config_str("tool_name")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| default_tool(&step.id));
                Subtask {
                    id: step.id.clone(),
                    description,
                    tool,
                }
            })
            .collect();
    }

    if subtasks.is_empty() {
        subtasks.push(Subtask {
            id: "task_1".into(),
            description: "Handle the workflow request.".into(),
            tool: "tool_task_1".into(),
        });
    }
    subtasks
}
