// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for code generation and the compile driver.

use std::fs;
use std::path::PathBuf;

use dwc_compiler::codegen::manifest::spec_checksum;
use dwc_compiler::{
    CodegenError, CodegenOptions, CompilationInput, CompileError, compile_workflow, translate_json,
    translate_workflow,
};
use dwc_ir::{WorkflowSpec, parse_workflow_spec};

fn fixture_json(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(filename);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

fn load_workflow(filename: &str) -> WorkflowSpec {
    parse_workflow_spec(&fixture_json(filename)).unwrap()
}

#[test]
fn test_generated_sources_parse_as_rust() {
    let translation = translate_json(&fixture_json("document_review.json"), &CodegenOptions::default())
        .unwrap();
    let artifact = &translation.artifact;

    syn::parse_file(&artifact.runtime_source)
        .unwrap_or_else(|e| panic!("main.rs does not parse: {e}\n{}", artifact.runtime_source));
    syn::parse_file(&artifact.tool_module)
        .unwrap_or_else(|e| panic!("tools.rs does not parse: {e}\n{}", artifact.tool_module));
}

#[test]
fn test_runtime_source_content() {
    let translation = translate_workflow(load_workflow("document_review.json"), &CodegenOptions::default())
        .unwrap();
    let main_rs = &translation.artifact.runtime_source;

    assert!(main_rs.contains("const WORKFLOW_NAME : & str = \"Document Review\""));
    assert!(main_rs.contains("const DOCUMENT_REQUIRED : bool = true"));
    assert!(main_rs.contains("\"Summarize contract risks in plain text.\""));
    assert!(main_rs.contains("EdgePlan :: new (\"check\" , \"recover\") . when (Predicate :: StepFailed)"));
    assert!(main_rs.contains("StepKind :: Transform"));
    assert!(main_rs.contains("Some (BackoffStrategy :: Exponential)"));
    assert!(main_rs.contains("async fn run_workflow"));
}

#[test]
fn test_tool_module_content() {
    let translation = translate_workflow(load_workflow("document_review.json"), &CodegenOptions::default())
        .unwrap();
    let tools_rs = &translation.artifact.tool_module;

    // Supplied body for extract_clauses, default stub for the loader.
    assert!(tools_rs.contains("pub fn extract_clauses"));
    assert!(tools_rs.contains("clauses\" , count"));
    assert!(tools_rs.contains("pub fn text_loader"));
    assert!(tools_rs.contains("registry . register (\"text_loader\" , text_loader)"));
}

#[test]
fn test_codegen_is_deterministic() {
    let options = CodegenOptions::default();
    let a = translate_workflow(load_workflow("document_review.json"), &options).unwrap();
    let b = translate_workflow(load_workflow("document_review.json"), &options).unwrap();

    assert_eq!(a.artifact.runtime_source, b.artifact.runtime_source);
    assert_eq!(a.artifact.tool_module, b.artifact.tool_module);
    assert_eq!(a.artifact.spec_json, b.artifact.spec_json);
    assert_eq!(a.artifact.manifest_json, b.artifact.manifest_json);
}

#[test]
fn test_manifest() {
    let translation = translate_workflow(load_workflow("document_review.json"), &CodegenOptions::default())
        .unwrap();
    let manifest = &translation.artifact.manifest;

    assert_eq!(manifest.name, "Document Review");
    assert_eq!(manifest.version, "1.2.0");
    assert_eq!(manifest.entrypoint, "run_workflow");
    assert_eq!(
        manifest.dependencies,
        vec!["dwc-runtime", "regex@1", "reqwest", "serde_json", "tokio"]
    );
    assert!(manifest.io_contract.requires_document);
    assert_eq!(
        manifest.io_contract.supported_doc_extensions,
        vec![".txt", ".md", ".pdf", ".docx", ".doc"]
    );
    assert_eq!(manifest.runtime_features, vec!["documents"]);
    assert_eq!(manifest.io_contract.required_fields, vec!["document"]);
    assert_eq!(manifest.io_contract.optional_fields, vec!["focus"]);
    assert_eq!(manifest.outputs, vec!["answer", "fallback"]);
    assert_eq!(
        manifest.spec_checksum,
        spec_checksum(&translation.artifact.spec_json)
    );

    // spec.json is the optimized spec.
    let reparsed = parse_workflow_spec(&translation.artifact.spec_json).unwrap();
    assert_eq!(reparsed, translation.spec);
}

#[test]
fn test_runbook() {
    let translation = translate_workflow(load_workflow("document_review.json"), &CodegenOptions::default())
        .unwrap();
    let readme = &translation.artifact.runbook;

    assert!(readme.starts_with("# Document Review (1.2.0)"));
    assert!(readme.contains("- `extract`: Extract clauses (tool: `extract_clauses`)"));
    assert!(readme.contains("- Required input fields: document"));
    assert!(readme.contains("- Optional input fields: focus"));
}

#[test]
fn test_unlexable_tool_code_fails_compilation() {
    let mut spec = load_workflow("document_review.json");
    spec.metadata.insert(
        "tool_functions".into(),
        serde_json::json!({"extract_clauses": {"code_text": "Ok(\"unterminated)"}}),
    );

    let err = translate_workflow(spec, &CodegenOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Codegen(CodegenError::UnrenderableToolCode { ref tool, .. }) if tool == "extract_clauses"
    ));
}

#[test]
fn test_compile_writes_artifact_directory() {
    let out = tempfile::tempdir().unwrap();
    let input = CompilationInput::new(load_workflow("document_review.json"), out.path());

    let result = compile_workflow(input).unwrap();

    let dir = out.path().join("Document_Review").join("1_2_0");
    assert_eq!(result.artifact_dir, dir);
    let expected: Vec<PathBuf> = [
        "src/main.rs",
        "src/tools.rs",
        "spec.json",
        "README.md",
        "Cargo.toml",
        "manifest.json",
    ]
    .iter()
    .map(|f| dir.join(f))
    .collect();
    assert_eq!(result.written, expected);
    for path in &expected {
        assert!(path.is_file(), "{} missing", path.display());
    }

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["spec_checksum"], result.manifest.spec_checksum);

    let cargo_toml = fs::read_to_string(dir.join("Cargo.toml")).unwrap();
    assert!(cargo_toml.contains("name = \"dwc-workflow-document-review\""));
    assert!(cargo_toml.contains("regex = \"1\""));
    assert!(cargo_toml.contains("features = [\"documents\"]"));
}

#[test]
fn test_invalid_extra_dependency_fails_before_writing() {
    let out = tempfile::tempdir().unwrap();
    let mut spec = load_workflow("document_review.json");
    spec.metadata.insert(
        "extra_dependencies".into(),
        serde_json::json!(["regex = \"1\"", "pypdf>=4.0.0"]),
    );

    let err = compile_workflow(CompilationInput::new(spec, out.path())).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Codegen(CodegenError::InvalidDependency { ref requirement, .. }) if requirement == "pypdf>=4.0.0"
    ));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_compile_failure_writes_nothing() {
    let out = tempfile::tempdir().unwrap();
    let input = CompilationInput::new(load_workflow("scenario_c_duplicate_id.json"), out.path());

    assert!(compile_workflow(input).is_err());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}
