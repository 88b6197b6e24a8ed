// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! AST-based code generation for workflow programs.
//!
//! Rust source is built with proc-macro2/quote token streams instead of
//! string templating, then rendered section by section.

pub mod context;
pub mod program;
pub mod tools;

pub use context::EmitContext;
pub use program::{EmittedProgram, emit_program};
pub use tools::{ToolSource, collect_tools, emit_tools};
