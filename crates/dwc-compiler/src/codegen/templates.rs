// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Text artifacts rendered with minijinja: the runbook and the generated
//! crate's `Cargo.toml`.

use std::path::Path;

use dwc_ir::WorkflowSpec;
use minijinja::{Environment, context};
use serde::Serialize;

use super::manifest::{Manifest, Requirement};
use super::subtasks::Subtask;
use crate::error::CodegenError;

const README_TEMPLATE: &str = r#"# {{ name }} ({{ version }})

## Capability
{{ description }}

## Subtasks
{% for subtask in subtasks -%}
- `{{ subtask.id }}`: {{ subtask.description }} (tool: `{{ subtask.tool }}`)
{% endfor %}
## Runtime Requirements
{% if contract.requires_document -%}
- Document required: Yes (`--doc /path/to/file` required unless doc/text passed via JSON).
{% else -%}
- Document required: No.
{% endif -%}
- Required input fields: {{ contract.required_fields | join(", ") if contract.required_fields else "none" }}
- Optional input fields: {{ contract.optional_fields | join(", ") if contract.optional_fields else "none" }}
- Supported document extensions: {{ contract.supported_doc_extensions | join(", ") }}

## Run
Default:
```bash
cargo run --release -- --query "Your question"
```

With query:
```bash
cargo run --release -- --query "Summarize the key points"
```

With document:
```bash
cargo run --release -- --query "Summarize this document" --doc /path/to/file.txt
```

LLM steps call `DWC_LLM_ENDPOINT` when it is set and fall back to a local
synthesis otherwise.

## Output
The program prints a plain-text answer to stdout.
"#;

const CARGO_TEMPLATE: &str = r#"[package]
name = "{{ package }}"
version = "{{ version }}"
edition = "2024"
publish = false

[[bin]]
name = "{{ package }}"
path = "src/main.rs"

[dependencies]
{% for dep in dependencies -%}
{{ dep.name }} = {{ dep.spec }}
{% endfor -%}
"#;

/// Versions pinned for crates the generated program is known to need.
const KNOWN_VERSIONS: &[(&str, &str)] = &[
    ("reqwest", r#"{ version = "0.12", features = ["json"] }"#),
    ("serde", r#"{ version = "1.0", features = ["derive"] }"#),
    ("serde_json", r#""1.0""#),
    ("tokio", r#"{ version = "1", features = ["full"] }"#),
];

/// Where the generated crate gets `dwc-runtime` from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeSource {
    Version(String),
    Path(String),
}

#[derive(Debug, Serialize)]
struct DependencyLine {
    name: String,
    spec: String,
}

fn dependency_line(
    requirement: &str,
    runtime: &RuntimeSource,
    runtime_features: &[String],
) -> Result<DependencyLine, CodegenError> {
    let Requirement { name, version } = Requirement::parse(requirement)?;

    let spec = if name == "dwc-runtime" {
        let source = match runtime {
            RuntimeSource::Version(v) => format!("version = {v:?}"),
            RuntimeSource::Path(p) => format!("path = {p:?}"),
        };
        if runtime_features.is_empty() {
            format!("{{ {source}, default-features = false }}")
        } else {
            format!("{{ {source}, features = {runtime_features:?} }}")
        }
    } else if let Some(version) = version {
        format!("{version:?}")
    } else if let Some((_, pinned)) = KNOWN_VERSIONS.iter().find(|(known, _)| *known == name) {
        pinned.to_string()
    } else {
        "\"*\"".to_string()
    };

    Ok(DependencyLine { name, spec })
}

/// Crate name for the generated program.
pub fn package_name(spec: &WorkflowSpec) -> String {
    let name = super::ast::context::safe_identifier(&spec.name).replace('_', "-");
    format!("dwc-workflow-{}", name.trim_matches('-'))
}

/// Cargo package version: the workflow version when it is semver.
fn package_version(spec: &WorkflowSpec) -> String {
    spec.semver()
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "0.1.0".to_string())
}

fn render(name: &'static str, source: &'static str, ctx: minijinja::Value) -> Result<String, CodegenError> {
    let mut env = Environment::new();
    let to_err = |source| CodegenError::Template {
        template: name,
        source,
    };
    env.add_template(name, source).map_err(to_err)?;
    env.get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(to_err)
}

/// Render `README.md`.
pub fn render_runbook(
    spec: &WorkflowSpec,
    subtasks: &[Subtask],
    manifest: &Manifest,
) -> Result<String, CodegenError> {
    let description = if spec.description.trim().is_empty() {
        "No description provided."
    } else {
        spec.description.trim()
    };
    render(
        "README.md",
        README_TEMPLATE,
        context! {
            name => &spec.name,
            version => &spec.version,
            description => description,
            subtasks => subtasks,
            contract => &manifest.io_contract,
        },
    )
}

/// Render the generated crate's `Cargo.toml`.
pub fn render_cargo_manifest(
    spec: &WorkflowSpec,
    manifest: &Manifest,
    runtime: &RuntimeSource,
) -> Result<String, CodegenError> {
    let dependencies = manifest
        .dependencies
        .iter()
        .map(|d| dependency_line(d, runtime, &manifest.runtime_features))
        .collect::<Result<Vec<_>, _>>()?;
    render(
        "Cargo.toml",
        CARGO_TEMPLATE,
        context! {
            package => package_name(spec),
            version => package_version(spec),
            dependencies => dependencies,
        },
    )
}

/// Runtime source for a path on disk.
pub fn runtime_path(path: &Path) -> RuntimeSource {
    RuntimeSource::Path(path.display().to_string())
}
