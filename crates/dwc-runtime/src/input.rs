// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command line input for generated workflow programs.

use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;

use crate::TaskInput;
use crate::document::read_document;
use crate::error::{Error, Result};

/// Arguments accepted by every generated workflow binary.
#[derive(Debug, Clone, Default, Parser)]
#[command(about = "Run a compiled workflow")]
pub struct RunArgs {
    /// Primary user question or request text
    #[arg(long)]
    pub query: Option<String>,

    /// Path to an input document
    #[arg(long)]
    pub doc: Option<PathBuf>,

    /// Inline JSON object merged into the workflow input
    #[arg(long = "input-json")]
    pub input_json: Option<String>,

    /// JSON file merged into the workflow input
    #[arg(long = "input-file")]
    pub input_file: Option<PathBuf>,
}

impl RunArgs {
    /// Parse `std::env::args`, exiting with usage on error.
    pub fn from_cli() -> Self {
        Self::parse()
    }
}

/// Assemble the workflow input.
///
/// Merge order: `--input-json`, then `--input-file`, then `--query`, then
/// `--doc` (which sets `doc_path` and `doc`). Later sources overwrite
/// earlier keys.
pub async fn build_input(
    args: &RunArgs,
    document_required: bool,
    supported_extensions: &[&str],
) -> Result<TaskInput> {
    let mut payload = TaskInput::new();

    if let Some(inline) = &args.input_json {
        merge_object(&mut payload, serde_json::from_str(inline)?);
    }
    if let Some(path) = &args.input_file {
        let text = tokio::fs::read_to_string(path).await?;
        merge_object(&mut payload, serde_json::from_str(&text)?);
    }
    if let Some(query) = args.query.as_deref().filter(|q| !q.is_empty()) {
        payload.insert("query".into(), Value::String(query.to_string()));
    }
    if let Some(path) = &args.doc {
        payload.insert(
            "doc_path".into(),
            Value::String(path.display().to_string()),
        );
        payload.insert(
            "doc".into(),
            Value::String(read_document(path, supported_extensions).await?),
        );
    }

    if document_required && !has_document(&payload) {
        return Err(Error::InvalidInput(
            "This workflow requires a document. Use --doc <path> or pass doc/text in JSON."
                .into(),
        ));
    }
    Ok(payload)
}

fn merge_object(payload: &mut TaskInput, value: Value) {
    if let Value::Object(map) = value {
        payload.extend(map);
    }
}

fn has_document(payload: &TaskInput) -> bool {
    ["doc", "document", "text"].iter().any(|key| match payload.get(*key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    })
}
