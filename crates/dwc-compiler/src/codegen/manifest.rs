// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Artifact manifest and IO contract.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use dwc_ir::{IR_VERSION, StepKind, WorkflowSpec};
use semver::VersionReq;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ast::context::doc_extensions;
use super::subtasks::Subtask;
use crate::error::CodegenError;

/// Entry point the generated program exposes.
pub const ENTRYPOINT: &str = "run_workflow";

/// `dwc-runtime` feature that adds PDF, DOCX and DOC loading.
pub const DOCUMENTS_FEATURE: &str = "documents";

const BASE_DEPENDENCIES: &[&str] = &["dwc-runtime", "serde_json", "tokio"];

const DOCUMENT_TOKENS: &[&str] = &["doc", "document", "pdf", "docx", "file"];

/// What the generated program expects from its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoContract {
    pub requires_document: bool,
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    pub supported_doc_extensions: Vec<String>,
}

/// Machine-readable summary written as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub ir_version: String,
    pub entrypoint: String,
    pub dependencies: Vec<String>,
    /// Features enabled on `dwc-runtime` in the generated crate.
    pub runtime_features: Vec<String>,
    pub io_contract: IoContract,
    pub outputs: Vec<String>,
    pub spec_checksum: String,
}

impl Manifest {
    pub fn build(
        spec: &WorkflowSpec,
        io_contract: IoContract,
        spec_json: &str,
    ) -> Result<Self, CodegenError> {
        let runtime_features = if io_contract.requires_document {
            vec![DOCUMENTS_FEATURE.to_string()]
        } else {
            Vec::new()
        };

        Ok(Self {
            name: spec.name.clone(),
            version: spec.version.clone(),
            ir_version: IR_VERSION.to_string(),
            entrypoint: ENTRYPOINT.to_string(),
            dependencies: dependencies(spec)?,
            runtime_features,
            io_contract,
            outputs: spec.outputs.iter().map(|o| o.name.clone()).collect(),
            spec_checksum: spec_checksum(spec_json),
        })
    }
}

/// One crate the generated program depends on.
///
/// Parsed from `name`, `name@version` or `name = "version"`; the version
/// must be a Cargo version requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub version: Option<String>,
}

impl Requirement {
    pub fn parse(text: &str) -> Result<Self, CodegenError> {
        let invalid = |reason: &'static str| CodegenError::InvalidDependency {
            requirement: text.to_string(),
            reason,
        };

        let trimmed = text.trim();
        let (name, version) = match trimmed.find(['@', '=']) {
            Some(at) if trimmed[at..].starts_with('@') => {
                (trimmed[..at].trim(), Some(trimmed[at + 1..].trim()))
            }
            Some(eq) => {
                let name = trimmed[..eq].trim();
                if !is_crate_name(name) {
                    return Err(invalid("not a valid crate name"));
                }
                let quoted = trimmed[eq + 1..]
                    .trim()
                    .strip_prefix('"')
                    .and_then(|r| r.strip_suffix('"'))
                    .ok_or_else(|| invalid("expected name = \"version\""))?;
                (name, Some(quoted.trim()))
            }
            None => (trimmed, None),
        };

        if !is_crate_name(name) {
            return Err(invalid("not a valid crate name"));
        }
        if let Some(version) = version {
            if version.is_empty() {
                return Err(invalid("empty version requirement"));
            }
            if version.contains('"') || VersionReq::parse(version).is_err() {
                return Err(invalid("not a valid version requirement"));
            }
        }

        Ok(Self {
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

fn is_crate_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Hex SHA-256 of the canonical spec JSON.
pub fn spec_checksum(spec_json: &str) -> String {
    format!("{:x}", Sha256::digest(spec_json.as_bytes()))
}

/// Crates the generated program depends on, sorted by crate name.
///
/// `metadata.extra_dependencies` entries are parsed as [`Requirement`]s. A
/// versioned extra replaces the built-in pin for the same crate.
pub fn dependencies(spec: &WorkflowSpec) -> Result<Vec<String>, CodegenError> {
    let mut deps: BTreeMap<String, Option<String>> = BASE_DEPENDENCIES
        .iter()
        .map(|name| (name.to_string(), None))
        .collect();
    if spec.has_kind(StepKind::Llm) {
        deps.insert("reqwest".to_string(), None);
    }

    for extra in spec.metadata_view().extra_dependencies() {
        let requirement = Requirement::parse(&extra)?;
        let pinned = deps.entry(requirement.name).or_default();
        if requirement.version.is_some() {
            *pinned = requirement.version;
        }
    }

    Ok(deps
        .into_iter()
        .map(|(name, version)| Requirement { name, version }.to_string())
        .collect())
}

fn mentions_document(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| DOCUMENT_TOKENS.contains(&token))
}

/// Derive the IO contract from declared inputs and subtasks.
pub fn io_contract(spec: &WorkflowSpec, subtasks: &[Subtask]) -> IoContract {
    let mut required = BTreeSet::new();
    let mut optional = BTreeSet::new();
    let mut requires_document = false;

    for input in &spec.inputs {
        let field = if input.name.trim().is_empty() {
            input.id.trim()
        } else {
            input.name.trim()
        };
        if !field.is_empty() {
            if input.required {
                required.insert(field.to_string());
            } else {
                optional.insert(field.to_string());
            }
        }

        let haystack = format!(
            "{} {} {} {}",
            input.id,
            input.name,
            input.data_type,
            input.description.as_deref().unwrap_or_default()
        );
        requires_document |= mentions_document(&haystack);
    }

    requires_document |= subtasks.iter().any(|s| mentions_document(&s.description));

    IoContract {
        requires_document,
        required_fields: required.into_iter().collect(),
        optional_fields: optional.into_iter().collect(),
        supported_doc_extensions: doc_extensions(requires_document)
            .iter()
            .map(|e| e.to_string())
            .collect(),
    }
}
