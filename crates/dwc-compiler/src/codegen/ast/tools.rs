// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tool module generation.
//!
//! Emits `tools.rs`: one function per tool the workflow references and a
//! `registry()` that registers each under its tool name.

use std::collections::{BTreeMap, BTreeSet};

use dwc_ir::{StepKind, WorkflowSpec};
use proc_macro2::TokenStream;
use quote::quote;

use super::context::EmitContext;
use super::program::EmittedProgram;
use crate::codegen::subtasks::Subtask;
use crate::error::CodegenError;

/// A tool to emit, with supplied body code if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSource {
    pub name: String,
    pub description: String,
    pub code: Option<String>,
}

/// Union of tools named by metadata, subtasks and tool steps, keyed by name.
///
/// Supplied tool functions win; otherwise the first description seen is
/// kept.
pub fn collect_tools(spec: &WorkflowSpec, subtasks: &[Subtask]) -> Vec<ToolSource> {
    let mut tools: BTreeMap<String, ToolSource> = BTreeMap::new();

    for (name, function) in spec.metadata_view().tool_functions() {
        let description = if function.description.trim().is_empty() {
            name.clone()
        } else {
            function.description
        };
        tools.insert(
            name.clone(),
            ToolSource {
                name,
                description,
                code: function.code_text,
            },
        );
    }

    for subtask in subtasks {
        tools
            .entry(subtask.tool.clone())
            .or_insert_with(|| ToolSource {
                name: subtask.tool.clone(),
                description: subtask.description.clone(),
                code: None,
            });
    }

    for step in spec.steps.iter().filter(|s| s.kind == StepKind::Tool) {
        let Some(name) = step.tool_name().map(str::trim) else {
            continue;
        };
        let description = step
            .config_str("subtask_description")
            .or_else(|| step.config_str("description"))
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&step.id);
        tools
            .entry(name.to_string())
            .or_insert_with(|| ToolSource {
                name: name.to_string(),
                description: description.to_string(),
                code: None,
            });
    }

    tools.into_values().collect()
}

fn emit_tool(tool: &ToolSource, fn_name: &str) -> Result<TokenStream, CodegenError> {
    let ident = EmitContext::ident(fn_name);
    let name = &tool.name;
    let doc = format!(" {}", tool.description);

    let body = match &tool.code {
        Some(code) => code
            .parse::<TokenStream>()
            .map_err(|e| CodegenError::UnrenderableToolCode {
                tool: tool.name.clone(),
                message: e.to_string(),
            })?,
        None => {
            let description = &tool.description;
            quote! {
                let value = input_text(input);
                Ok(StepResult::ok(#name, format!("{}: {}", #description, value)))
            }
        }
    };

    Ok(quote! {
        #[doc = #doc]
        #[allow(unused_variables)]
        pub fn #ident(input: &TaskInput) -> Result<StepResult, ToolError> {
            #body
        }
    })
}

/// Emit the tool module.
pub fn emit_tools(tools: &[ToolSource]) -> Result<EmittedProgram, CodegenError> {
    let mut used = BTreeSet::new();
    let mut functions = Vec::with_capacity(tools.len());
    let mut registrations = Vec::with_capacity(tools.len());

    for tool in tools {
        let base = EmitContext::tool_fn_name(&tool.name)?;
        let mut fn_name = base.clone();
        let mut suffix = 2;
        while !used.insert(fn_name.clone()) {
            fn_name = format!("{base}_{suffix}");
            suffix += 1;
        }

        functions.push(emit_tool(tool, &fn_name)?);
        let ident = EmitContext::ident(&fn_name);
        let name = &tool.name;
        registrations.push(quote! { registry.register(#name, #ident); });
    }

    let mut program = EmittedProgram::new();
    program.push(
        "header",
        quote! {
            #![allow(unused_imports)]

            use dwc_runtime::prelude::*;
        },
    );
    program.push("tools", quote! { #(#functions)* });
    program.push(
        "registry",
        quote! {
            /// Every tool this workflow can call, keyed by tool name.
            #[allow(unused_mut)]
            pub fn registry() -> ToolRegistry {
                let mut registry = ToolRegistry::new();
                #(#registrations)*
                registry
            }
        },
    );
    Ok(program)
}
