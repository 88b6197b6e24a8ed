// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dynamic Workflow Compiler
//!
//! Validates, optimizes and lowers [`dwc_ir::WorkflowSpec`] graphs into
//! standalone Rust programs built on `dwc-runtime`.
//!
//! # Compilation Pipeline
//!
//! ```text
//!     ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//!     │  Workflow   │      │  Optimized  │      │  Artifact   │
//!     │  IR (JSON)  │─────▶│     IR      │─────▶│  directory  │
//!     │             │      │  (8 passes) │      │  (codegen)  │
//!     └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! 1. **Validate**: structural checks with stable error codes
//! 2. **Optimize**: normalize, annotate, prune, fuse, tag, harden, cost
//! 3. **Generate**: `main.rs`, `tools.rs`, manifest, runbook, `Cargo.toml`
//! 4. **Write**: one directory per workflow name and version
//!
//! # Usage
//!
//! ```ignore
//! use dwc_compiler::{CompilationInput, compile_workflow};
//!
//! let spec = dwc_ir::parse_workflow_spec(&json)?;
//! let result = compile_workflow(CompilationInput::new(spec, ".dwc/workflows"))?;
//! println!("Artifact at: {}", result.artifact_dir.display());
//! ```
//!
//! # Modules
//!
//! - [`validation`]: structural validation
//! - [`dependency_resolver`]: graph algorithms over the step graph
//! - [`optimize`]: the optimization pipeline
//! - [`codegen`]: artifact generation
//! - [`compile`]: end-to-end compilation to disk

pub mod codegen;
pub mod compile;
pub mod config;
pub mod dependency_resolver;
pub mod error;
pub mod optimize;
pub mod validation;

pub use codegen::{Artifact, CodegenOptions, Manifest, generate, generate_with};
pub use compile::{
    CompilationInput, CompilationResult, Translation, artifact_dir, compile_workflow,
    translate_json, translate_workflow,
};
pub use config::CompilerConfig;
pub use error::{CodegenError, CompileError, CycleError, PassError, ValidationError};
pub use optimize::{OptimizationPass, Optimizer};
pub use validation::{check_workflow, validate_workflow};

// Re-export IR types for convenience
pub use dwc_ir::{WorkflowSpec, parse_workflow_spec};
