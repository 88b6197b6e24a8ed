// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Core IR types: workflow, steps, edges and I/O declarations.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::metadata::WorkflowMetadata;
use crate::predicate::Predicate;
use crate::retry::RetryPolicy;
use crate::{DEFAULT_TIMEOUT_SECONDS, IR_VERSION};

fn default_version() -> String {
    IR_VERSION.to_string()
}

fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_data_type() -> String {
    "string".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Workflow
// ============================================================================

/// A complete workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSpec {
    /// Semantic version of this workflow.
    #[serde(default = "default_version")]
    pub version: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub inputs: Vec<InputSpec>,

    #[serde(default)]
    pub outputs: Vec<OutputSpec>,

    #[serde(default)]
    pub steps: Vec<StepSpec>,

    #[serde(default)]
    pub edges: Vec<EdgeSpec>,

    /// Advisory constraints. Carried through compilation, never enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<ConstraintSpec>>,

    /// Free-form annotations. Upstream collaborators put subtasks and tool
    /// code here; optimization passes add their own keys.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl WorkflowSpec {
    /// Create an empty workflow with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            name: name.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            steps: Vec::new(),
            edges: Vec::new(),
            constraints: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Step ids in declaration order.
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// Steps keyed by id. Later duplicates shadow earlier ones.
    pub fn step_map(&self) -> BTreeMap<&str, &StepSpec> {
        self.steps.iter().map(|s| (s.id.as_str(), s)).collect()
    }

    /// Outgoing edges keyed by source step id, in declaration order.
    pub fn edge_map(&self) -> BTreeMap<&str, Vec<&EdgeSpec>> {
        let mut map: BTreeMap<&str, Vec<&EdgeSpec>> = BTreeMap::new();
        for edge in &self.edges {
            map.entry(edge.source.as_str()).or_default().push(edge);
        }
        map
    }

    /// Incoming edges keyed by target step id, in declaration order.
    pub fn incoming_edge_map(&self) -> BTreeMap<&str, Vec<&EdgeSpec>> {
        let mut map: BTreeMap<&str, Vec<&EdgeSpec>> = BTreeMap::new();
        for edge in &self.edges {
            map.entry(edge.target.as_str()).or_default().push(edge);
        }
        map
    }

    pub fn step(&self, id: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Whether any step is of the given kind.
    pub fn has_kind(&self, kind: StepKind) -> bool {
        self.steps.iter().any(|s| s.kind == kind)
    }

    /// Typed read access to well-known metadata keys.
    pub fn metadata_view(&self) -> WorkflowMetadata<'_> {
        WorkflowMetadata::new(&self.metadata)
    }

    /// Parse `version` as a semantic version.
    pub fn semver(&self) -> Result<semver::Version, semver::Error> {
        semver::Version::parse(&self.version)
    }

    /// Pretty-printed JSON with object keys in sorted order.
    ///
    /// Two specs that compare equal always produce identical text.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        // Round-trip through `Value` so struct fields are ordered like map keys.
        let value = serde_json::to_value(self)?;
        serde_json::to_string_pretty(&value)
    }
}

/// Parse a workflow from its strict JSON form.
pub fn parse_workflow_spec(json: &str) -> Result<WorkflowSpec, serde_json::Error> {
    serde_json::from_str(json)
}

// ============================================================================
// Steps and edges
// ============================================================================

/// The closed set of step kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepKind {
    /// Calls a registered tool function.
    Tool,
    /// Calls a language model.
    Llm,
    /// Evaluates a predicate over an upstream step's status.
    Condition,
    /// Reshapes data without external calls.
    Transform,
}

/// A single dispatch unit in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    pub id: String,

    #[serde(alias = "type")]
    pub kind: StepKind,

    /// Kind-specific payload, e.g. `tool_name` for tools or `model` and
    /// `prompt` for LLM steps.
    #[serde(default)]
    pub config: Map<String, Value>,

    #[serde(default)]
    pub retry_policy: RetryPolicy,

    /// Hard per-attempt timeout. Must be positive.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: i64,
}

impl StepSpec {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            config: Map::new(),
            retry_policy: RetryPolicy::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Builder-style config insertion.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// The tool this step invokes: `tool_name`, falling back to `loader`.
    pub fn tool_name(&self) -> Option<&str> {
        self.config_str("tool_name")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.config_str("loader").filter(|s| !s.trim().is_empty()))
    }
}

/// A directed edge between two steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    /// Absent means the edge is unconditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Predicate>,
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
        }
    }

    pub fn when(mut self, condition: Predicate) -> Self {
        self.condition = Some(condition);
        self
    }

    /// True when the edge carries no condition or an explicit `always`.
    pub fn is_unconditional(&self) -> bool {
        matches!(self.condition, None | Some(Predicate::Always))
    }

    /// Sort key used for canonical edge ordering.
    pub fn sort_key(&self) -> (&str, &str, Option<Predicate>) {
        (&self.source, &self.target, self.condition)
    }
}

// ============================================================================
// Inputs, outputs, constraints
// ============================================================================

/// A declared workflow input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    pub id: String,
    pub name: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A declared workflow output, optionally bound to the step producing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    pub id: String,
    pub name: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

/// An advisory constraint attached to the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSpec {
    pub id: String,
    pub kind: String,
    pub expression: String,
    #[serde(default)]
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied_on_parse() {
        let spec = parse_workflow_spec(
            r#"{"name": "w", "steps": [{"id": "a", "kind": "tool", "config": {"tool_name": "t"}}]}"#,
        )
        .unwrap();

        assert_eq!(spec.version, "1.0.0");
        assert_eq!(spec.steps[0].timeout_seconds, 120);
        assert_eq!(spec.steps[0].retry_policy, RetryPolicy::default());
        assert!(spec.constraints.is_none());
    }

    #[test]
    fn test_type_alias_for_kind() {
        let spec = parse_workflow_spec(
            r#"{"name": "w", "steps": [{"id": "a", "type": "llm"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.steps[0].kind, StepKind::Llm);
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        let err = parse_workflow_spec(r#"{"name": "w", "owner": "someone"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field `owner`"));
    }

    #[test]
    fn test_unknown_step_field_rejected() {
        let err = parse_workflow_spec(
            r#"{"name": "w", "steps": [{"id": "a", "kind": "tool", "priority": 1}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("priority"));
    }

    #[test]
    fn test_unknown_step_kind_rejected() {
        assert!(
            parse_workflow_spec(r#"{"name": "w", "steps": [{"id": "a", "kind": "script"}]}"#)
                .is_err()
        );
    }

    #[test]
    fn test_tool_name_falls_back_to_loader() {
        let step = StepSpec::new("a", StepKind::Tool).with_config("loader", "pdf_loader");
        assert_eq!(step.tool_name(), Some("pdf_loader"));

        let step = step.with_config("tool_name", "search");
        assert_eq!(step.tool_name(), Some("search"));

        let blank = StepSpec::new("b", StepKind::Tool).with_config("tool_name", "  ");
        assert_eq!(blank.tool_name(), None);
    }

    #[test]
    fn test_edge_maps() {
        let mut spec = WorkflowSpec::new("w");
        spec.edges = vec![
            EdgeSpec::new("a", "b"),
            EdgeSpec::new("a", "c"),
            EdgeSpec::new("b", "c"),
        ];

        let out = spec.edge_map();
        assert_eq!(out["a"].len(), 2);
        assert_eq!(out["b"].len(), 1);

        let incoming = spec.incoming_edge_map();
        assert_eq!(incoming["c"].len(), 2);
        assert!(!incoming.contains_key("a"));
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let mut spec = WorkflowSpec::new("w");
        spec.metadata.insert("zeta".into(), json!(1));
        spec.metadata.insert("alpha".into(), json!({"y": 1, "b": 2}));

        let text = spec.to_canonical_json().unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        assert!(alpha < zeta);
        assert!(text.find("\"b\"").unwrap() < text.find("\"y\"").unwrap());
        // Top-level struct fields are sorted too.
        assert!(text.find("\"description\"").unwrap() < text.find("\"version\"").unwrap());
        assert_eq!(text, spec.clone().to_canonical_json().unwrap());
    }

    #[test]
    fn test_semver() {
        let mut spec = WorkflowSpec::new("w");
        spec.version = "2.1.0".into();
        assert_eq!(spec.semver().unwrap().major, 2);

        spec.version = "two".into();
        assert!(spec.semver().is_err());
    }

    #[test]
    fn test_step_kind_display() {
        assert_eq!(StepKind::Llm.to_string(), "llm");
        assert_eq!("transform".parse::<StepKind>().unwrap(), StepKind::Transform);
    }
}
