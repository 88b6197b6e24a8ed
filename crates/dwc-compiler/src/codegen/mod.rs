// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Code generation for optimized workflows.
//!
//! Lowers an optimized [`WorkflowSpec`] into the sources of a standalone
//! binary crate linked against `dwc-runtime`, plus its manifest, runbook and
//! the canonical spec it was generated from. Generation is deterministic:
//! the same spec always yields byte-identical artifacts.

pub mod ast;
pub mod manifest;
pub mod subtasks;
pub mod templates;

use std::path::PathBuf;

use dwc_ir::WorkflowSpec;
use tracing::debug;

pub use crate::error::CodegenError;
pub use ast::context::{DEFAULT_SYNTHESIS_PROMPT, SUPPORTED_DOC_EXTENSIONS, safe_name};
pub use manifest::{IoContract, Manifest};
pub use subtasks::{Subtask, extract_subtasks};
pub use templates::RuntimeSource;

use ast::EmitContext;

/// Options that affect the generated crate manifest only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Version requirement used for `dwc-runtime` when no path is set.
    pub runtime_version: String,
    /// Local `dwc-runtime` checkout to depend on instead.
    pub runtime_path: Option<PathBuf>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_path: None,
        }
    }
}

impl CodegenOptions {
    fn runtime_source(&self) -> RuntimeSource {
        match &self.runtime_path {
            Some(path) => templates::runtime_path(path),
            None => RuntimeSource::Version(self.runtime_version.clone()),
        }
    }
}

/// Everything generated for one workflow.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// `src/main.rs`
    pub runtime_source: String,
    /// `src/tools.rs`
    pub tool_module: String,
    /// `spec.json`
    pub spec_json: String,
    pub manifest: Manifest,
    /// `manifest.json`
    pub manifest_json: String,
    /// `README.md`
    pub runbook: String,
    /// `Cargo.toml`
    pub cargo_manifest: String,
}

/// Generate with default options.
pub fn generate(spec: &WorkflowSpec) -> Result<Artifact, CodegenError> {
    generate_with(spec, &CodegenOptions::default())
}

pub fn generate_with(spec: &WorkflowSpec, options: &CodegenOptions) -> Result<Artifact, CodegenError> {
    let spec_json = spec
        .to_canonical_json()
        .map_err(|source| CodegenError::Serialize {
            what: "workflow spec",
            source,
        })?;

    let subtasks = extract_subtasks(spec);
    let io_contract = manifest::io_contract(spec, &subtasks);
    let ctx = EmitContext::from_spec(spec, io_contract.requires_document);

    let tools = ast::collect_tools(spec, &subtasks);
    let tool_module = ast::emit_tools(&tools)?.render();
    let runtime_source = ast::emit_program(spec, &ctx)?.render();

    let manifest = Manifest::build(spec, io_contract, &spec_json)?;
    let manifest_json =
        serde_json::to_string_pretty(&manifest).map_err(|source| CodegenError::Serialize {
            what: "manifest",
            source,
        })?;
    let runbook = templates::render_runbook(spec, &subtasks, &manifest)?;
    let cargo_manifest =
        templates::render_cargo_manifest(spec, &manifest, &options.runtime_source())?;

    debug!(
        workflow = %spec.name,
        tools = tools.len(),
        subtasks = subtasks.len(),
        "Generated workflow artifact"
    );

    Ok(Artifact {
        runtime_source,
        tool_module,
        spec_json,
        manifest,
        manifest_json,
        runbook,
        cargo_manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwc_ir::{StepKind, StepSpec};

    fn spec() -> WorkflowSpec {
        let mut spec = WorkflowSpec::new("digest");
        spec.steps = vec![
            StepSpec::new("fetch", StepKind::Tool).with_config("tool_name", "fetch_report"),
            StepSpec::new("summarize", StepKind::Llm).with_config("prompt", "Summarize"),
        ];
        spec.edges = vec![dwc_ir::EdgeSpec::new("fetch", "summarize")];
        spec
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(&spec()).unwrap();
        let b = generate(&spec()).unwrap();
        assert_eq!(a.runtime_source, b.runtime_source);
        assert_eq!(a.tool_module, b.tool_module);
        assert_eq!(a.manifest_json, b.manifest_json);
        assert_eq!(a.runbook, b.runbook);
    }

    #[test]
    fn test_manifest_checksum_matches_spec_json() {
        let artifact = generate(&spec()).unwrap();
        assert_eq!(
            artifact.manifest.spec_checksum,
            manifest::spec_checksum(&artifact.spec_json)
        );
        assert!(artifact.manifest.dependencies.contains(&"reqwest".to_string()));
        assert_eq!(artifact.manifest.entrypoint, "run_workflow");
    }

    #[test]
    fn test_tool_module_registers_step_tools() {
        let artifact = generate(&spec()).unwrap();
        assert!(artifact.tool_module.contains("register (\"fetch_report\" , fetch_report)"));
    }

    #[test]
    fn test_runtime_path_option() {
        let options = CodegenOptions {
            runtime_path: Some(PathBuf::from("/src/dwc-runtime")),
            ..CodegenOptions::default()
        };
        let artifact = generate_with(&spec(), &options).unwrap();
        assert!(artifact.cargo_manifest.contains("path = \"/src/dwc-runtime\""));
    }
}
