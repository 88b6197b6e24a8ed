// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow compilation to an artifact directory.
//!
//! Compilation touches the filesystem only at the very end: the spec is
//! optimized and every artifact rendered in memory first. Artifacts land in
//! `<output_dir>/<safe name>/<safe version>/`, with `manifest.json` written
//! last so its presence marks a complete artifact.

use std::fs;
use std::path::{Path, PathBuf};

use dwc_ir::WorkflowSpec;
use tracing::info;

use crate::codegen::{self, Artifact, CodegenOptions, Manifest, safe_name};
use crate::error::{CodegenError, CompileError};
use crate::optimize::Optimizer;

/// Input for compilation.
#[derive(Debug, Clone)]
pub struct CompilationInput {
    /// The unoptimized workflow.
    pub spec: WorkflowSpec,
    /// Root of the artifact tree.
    pub output_dir: PathBuf,
    pub options: CodegenOptions,
}

impl CompilationInput {
    pub fn new(spec: WorkflowSpec, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            output_dir: output_dir.into(),
            options: CodegenOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodegenOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of writing an artifact directory.
#[derive(Debug, Clone)]
pub struct CompilationResult {
    /// `<output_dir>/<safe name>/<safe version>`
    pub artifact_dir: PathBuf,
    /// Every file written, in write order.
    pub written: Vec<PathBuf>,
    /// The optimized spec the artifact was generated from.
    pub spec: WorkflowSpec,
    pub manifest: Manifest,
}

/// Optimized spec together with its in-memory artifact.
#[derive(Debug, Clone)]
pub struct Translation {
    pub spec: WorkflowSpec,
    pub artifact: Artifact,
}

/// Directory an artifact for `spec` is written to.
pub fn artifact_dir(output_dir: &Path, spec: &WorkflowSpec) -> PathBuf {
    output_dir
        .join(safe_name(&spec.name))
        .join(safe_name(&spec.version))
}

/// Parse, optimize and generate without writing anything.
pub fn translate_json(json: &str, options: &CodegenOptions) -> Result<Translation, CompileError> {
    let spec = dwc_ir::parse_workflow_spec(json)?;
    translate_workflow(spec, options)
}

/// Optimize and generate without writing anything.
pub fn translate_workflow(
    spec: WorkflowSpec,
    options: &CodegenOptions,
) -> Result<Translation, CompileError> {
    let spec = Optimizer::new().optimize(spec)?;
    let artifact = codegen::generate_with(&spec, options)?;
    Ok(Translation { spec, artifact })
}

fn write_file(path: PathBuf, contents: &str, written: &mut Vec<PathBuf>) -> Result<(), CodegenError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CodegenError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, contents).map_err(|source| CodegenError::Write {
        path: path.clone(),
        source,
    })?;
    written.push(path);
    Ok(())
}

/// Optimize, generate and write the artifact directory.
pub fn compile_workflow(input: CompilationInput) -> Result<CompilationResult, CompileError> {
    let Translation { spec, artifact } = translate_workflow(input.spec, &input.options)?;
    let dir = artifact_dir(&input.output_dir, &spec);

    let mut written = Vec::with_capacity(6);
    let files = [
        ("src/main.rs", &artifact.runtime_source),
        ("src/tools.rs", &artifact.tool_module),
        ("spec.json", &artifact.spec_json),
        ("README.md", &artifact.runbook),
        ("Cargo.toml", &artifact.cargo_manifest),
        ("manifest.json", &artifact.manifest_json),
    ];
    for (relative, contents) in files {
        write_file(dir.join(relative), contents, &mut written)?;
    }

    info!(
        workflow = %spec.name,
        version = %spec.version,
        steps = spec.steps.len(),
        path = %dir.display(),
        "Compiled workflow"
    );

    Ok(CompilationResult {
        artifact_dir: dir,
        written,
        spec,
        manifest: artifact.manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_dir() {
        let mut spec = WorkflowSpec::new("Order Sync!");
        spec.version = "1.2.0".into();
        assert_eq!(
            artifact_dir(Path::new("out"), &spec),
            PathBuf::from("out/Order_Sync/1_2_0")
        );
    }

    #[test]
    fn test_translate_json_reports_parse_errors() {
        let err = translate_json("{\"name\": \"w\", \"bogus\": 1}", &CodegenOptions::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_translate_surfaces_validation_errors() {
        let err = translate_workflow(WorkflowSpec::new("empty"), &CodegenOptions::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::Validation(_)));
    }
}
