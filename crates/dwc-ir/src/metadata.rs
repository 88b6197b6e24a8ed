// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed access to the metadata keys that upstream collaborators populate.
//!
//! Metadata is free-form JSON. Missing or mistyped keys read as absent.

use std::collections::BTreeMap;

use serde_json::Value;

/// Tool implementation supplied by the tool-building collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFunction {
    pub description: String,
    /// Rust source of the function body module, if any was supplied.
    pub code_text: Option<String>,
}

/// Borrowed view over `WorkflowSpec::metadata`.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowMetadata<'a> {
    raw: &'a BTreeMap<String, Value>,
}

impl<'a> WorkflowMetadata<'a> {
    pub fn new(raw: &'a BTreeMap<String, Value>) -> Self {
        Self { raw }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.raw.get(key)
    }

    /// Read a key as display text. Strings are returned as-is; other
    /// non-null values are rendered as compact JSON.
    pub fn text(&self, key: &str) -> String {
        match self.raw.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn synthesis_prompt(&self) -> String {
        self.text("synthesis_prompt")
    }

    pub fn approved_plan(&self) -> String {
        self.text("approved_plan")
    }

    pub fn intent_summary(&self) -> String {
        self.text("intent_summary")
    }

    pub fn current_task_description(&self) -> String {
        self.text("current_task_description")
    }

    /// Raw `subtasks` rows. Interpretation is left to the code generator.
    pub fn subtask_rows(&self) -> Vec<&'a serde_json::Map<String, Value>> {
        self.raw
            .get("subtasks")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }

    /// Tool functions keyed by tool name. `code` is accepted for `code_text`.
    pub fn tool_functions(&self) -> BTreeMap<String, ToolFunction> {
        let Some(Value::Object(tools)) = self.raw.get("tool_functions") else {
            return BTreeMap::new();
        };

        tools
            .iter()
            .map(|(name, entry)| {
                let description = entry
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let code_text = entry
                    .get("code_text")
                    .or_else(|| entry.get("code"))
                    .and_then(Value::as_str)
                    .filter(|code| !code.trim().is_empty())
                    .map(str::to_string);
                (
                    name.clone(),
                    ToolFunction {
                        description,
                        code_text,
                    },
                )
            })
            .collect()
    }

    /// Extra dependency requirement strings to merge into the manifest.
    pub fn extra_dependencies(&self) -> Vec<String> {
        self.raw
            .get("extra_dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
