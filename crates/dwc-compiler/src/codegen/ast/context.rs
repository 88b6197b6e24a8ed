// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Emission context for AST-based code generation.
//!
//! Holds the run-context strings baked into the generated program and the
//! identifier utilities shared by every emitter.

use dwc_ir::WorkflowSpec;
use proc_macro2::{Ident, Span};

use crate::error::CodegenError;

/// Prompt used by LLM steps that carry no prompt of their own.
pub const DEFAULT_SYNTHESIS_PROMPT: &str = "You are the synthesis head. Combine subtask outputs into one coherent plain-text answer. Do not return JSON.";

/// Document formats every generated program reads.
pub const TEXT_DOC_EXTENSIONS: &[&str] = &[".txt", ".md"];

/// Document formats read once the runtime's `documents` feature is on.
pub const SUPPORTED_DOC_EXTENSIONS: &[&str] = &[".txt", ".md", ".pdf", ".docx", ".doc"];

/// Extensions a generated program accepts for `--doc`.
pub fn doc_extensions(document_required: bool) -> &'static [&'static str] {
    if document_required {
        SUPPORTED_DOC_EXTENSIONS
    } else {
        TEXT_DOC_EXTENSIONS
    }
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield", "registry",
];

/// Context for code emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitContext {
    pub synthesis_prompt: String,
    pub approved_plan: String,
    pub intent_summary: String,
    pub current_task_description: String,
    pub document_required: bool,
}

impl EmitContext {
    /// Read the run-context strings from spec metadata, applying defaults.
    pub fn from_spec(spec: &WorkflowSpec, document_required: bool) -> Self {
        let metadata = spec.metadata_view();
        let or_default = |value: String, default: &str| {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value
            }
        };

        Self {
            synthesis_prompt: or_default(metadata.synthesis_prompt(), DEFAULT_SYNTHESIS_PROMPT),
            approved_plan: metadata.approved_plan(),
            intent_summary: metadata.intent_summary(),
            current_task_description: or_default(
                metadata.current_task_description(),
                &spec.description,
            ),
            document_required,
        }
    }

    /// Sanitize a string to be a valid Rust identifier.
    /// Replaces invalid characters with underscores.
    pub fn sanitize_ident(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        for (i, c) in s.chars().enumerate() {
            if c.is_ascii_alphanumeric() || c == '_' {
                if i == 0 && c.is_ascii_digit() {
                    result.push('_');
                }
                result.push(c);
            } else {
                result.push('_');
            }
        }
        if result.is_empty() {
            result.push_str("_empty");
        }
        result
    }

    /// Function name for a tool.
    ///
    /// Lowercased and sanitized; names starting with a digit get a `tool_`
    /// prefix and reserved words a `_tool` suffix. A name with no
    /// alphanumeric characters is rejected.
    pub fn tool_fn_name(tool_name: &str) -> Result<String, CodegenError> {
        let lowered = tool_name.trim().to_lowercase();
        if !lowered.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(CodegenError::InvalidIdentifier {
                name: tool_name.to_string(),
            });
        }

        let mut name = Self::sanitize_ident(&lowered);
        if let Some(rest) = name.strip_prefix('_')
            && rest.starts_with(|c: char| c.is_ascii_digit())
        {
            name = format!("tool_{rest}");
        }
        if RUST_KEYWORDS.contains(&name.as_str()) {
            name.push_str("_tool");
        }
        Ok(name)
    }

    pub fn ident(name: &str) -> Ident {
        Ident::new(name, Span::call_site())
    }
}

/// Filesystem-safe form of a name: runs of characters outside
/// `[A-Za-z0-9_]` become `_`, surrounding underscores are trimmed, and an
/// empty result falls back to `workflow`.
pub fn safe_name(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "workflow".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Identifier fragment derived from an id, used for default tool names.
pub fn safe_identifier(value: &str) -> String {
    let candidate = safe_name(value).to_lowercase();
    if candidate.starts_with(|c: char| c.is_ascii_digit()) {
        format!("tool_{candidate}")
    } else {
        candidate
    }
}
