// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow compiler CLI
//!
//! Compiles a workflow IR JSON file into an artifact directory.
//!
//! Usage:
//!
//! ```text
//! dwc-compile --spec <path> [--output <dir>] [--dry-run]
//! dwc-compile --print-schema
//! ```
//!
//! Example:
//!
//! ```text
//! dwc-compile --spec digest.json --output ./workflows
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dwc_compiler::compile::{CompilationInput, compile_workflow, translate_json};
use dwc_compiler::config::CompilerConfig;

#[derive(Debug, Parser)]
#[command(name = "dwc-compile", version, about = "Compile a workflow IR file into a runnable Rust program")]
struct Args {
    /// Path to the workflow IR JSON file
    #[arg(long, required_unless_present = "print_schema")]
    spec: Option<PathBuf>,

    /// Artifact root directory
    #[arg(long, env = "DWC_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Print the IR JSON schema and exit
    #[arg(long)]
    print_schema: bool,

    /// Optimize and generate, print the manifest, write nothing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    // Initialize minimal logging (default to warn if RUST_LOG not set)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let args = Args::parse();

    if args.print_schema {
        return match serde_json::to_string_pretty(&dwc_ir::generate_ir_schema()) {
            Ok(schema) => {
                println!("{}", schema);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error rendering schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match CompilerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(spec_path) = args.spec else {
        eprintln!("Error: --spec is required");
        return ExitCode::FAILURE;
    };

    let spec_json = match fs::read_to_string(&spec_path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error reading spec file {:?}: {}", spec_path, e);
            return ExitCode::FAILURE;
        }
    };

    let options = config.codegen_options();

    if args.dry_run {
        return match translate_json(&spec_json, &options) {
            Ok(translation) => {
                println!("{}", translation.artifact.manifest_json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Compilation failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let spec = match dwc_ir::parse_workflow_spec(&spec_json) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error parsing workflow JSON: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let output_dir = args.output.unwrap_or(config.output_dir);
    let input = CompilationInput::new(spec, output_dir).with_options(options);

    match compile_workflow(input) {
        Ok(result) => {
            eprintln!("Compilation successful:");
            eprintln!("  Workflow: {} ({})", result.manifest.name, result.manifest.version);
            eprintln!("  Steps: {}", result.spec.steps.len());
            eprintln!("  Checksum: {}", result.manifest.spec_checksum);
            // Print the artifact path to stdout for scripts to capture
            println!("{}", result.artifact_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
