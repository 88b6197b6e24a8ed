// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tool registry.
//!
//! Tools are plain synchronous functions. The generated `tools.rs` module
//! defines them and registers each under its tool name.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::TaskInput;
use crate::error::ToolError;
use crate::result::StepResult;

/// Signature every tool function implements.
pub type ToolFn = fn(&TaskInput) -> Result<StepResult, ToolError>;

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolFn>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, tool: ToolFn) -> &mut Self {
        self.tools.insert(name.into(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<ToolFn> {
        self.tools.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// The primary text of a task input: `query`, else `doc`, else `text`.
pub fn input_text(input: &TaskInput) -> String {
    ["query", "doc", "text"]
        .iter()
        .filter_map(|key| input.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(input: &TaskInput) -> Result<StepResult, ToolError> {
        Ok(StepResult::ok("echo", input_text(input)))
    }

    #[test]
    fn test_register_and_call() {
        let mut registry = ToolRegistry::new();
        registry.register("echo", echo);

        let tool = registry.get("echo").unwrap();
        let mut input = TaskInput::new();
        input.insert("query".into(), json!("hello"));
        assert_eq!(tool(&input).unwrap().result, "hello");
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["echo"]);
    }

    #[test]
    fn test_input_text_precedence() {
        let mut input = TaskInput::new();
        input.insert("text".into(), json!("t"));
        assert_eq!(input_text(&input), "t");
        input.insert("doc".into(), json!("d"));
        assert_eq!(input_text(&input), "d");
        input.insert("query".into(), json!(""));
        assert_eq!(input_text(&input), "d");
        input.insert("query".into(), json!("q"));
        assert_eq!(input_text(&input), "q");
    }
}
