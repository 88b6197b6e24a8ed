// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document loading for `--doc`.
//!
//! `.txt` and `.md` are read as UTF-8. With the `documents` feature, text is
//! extracted from `.pdf` (pdf-extract) and `.docx` (the `word/document.xml`
//! part, one line per paragraph). Legacy `.doc` files go through the first
//! available external converter: `antiword`, `catdoc`, then `textutil`.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Lowercased extension with a leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Load a document as plain text. Only the listed extensions are accepted.
pub async fn read_document(path: &Path, supported_extensions: &[&str]) -> Result<String> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(Error::Document(format!(
            "Document not found: {}",
            path.display()
        )));
    }

    let ext = extension_of(path);
    if !supported_extensions.contains(&ext.as_str()) {
        return Err(Error::Document(format!(
            "Unsupported document extension '{ext}'. Supported: {}",
            supported_extensions.join(", ")
        )));
    }

    let text = match ext.as_str() {
        ".pdf" => {
            let bytes = tokio::fs::read(path).await?;
            blocking(move || pdf_text(&bytes)).await?
        }
        ".docx" => {
            let bytes = tokio::fs::read(path).await?;
            blocking(move || docx_text(&bytes)).await?
        }
        ".doc" => legacy_doc_text(path).await?,
        _ => tokio::fs::read_to_string(path).await?,
    };
    debug!(path = %path.display(), chars = text.len(), "Loaded document");
    Ok(text)
}

async fn blocking<F>(extract: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(extract)
        .await
        .map_err(|e| Error::Document(format!("Document extraction aborted: {e}")))?
}

#[cfg(feature = "documents")]
fn pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map(|text| text.trim().to_string())
        .map_err(|e| Error::Document(format!("Failed to read PDF: {e}")))
}

#[cfg(not(feature = "documents"))]
fn pdf_text(_bytes: &[u8]) -> Result<String> {
    Err(Error::Document(
        "Reading .pdf files requires the `documents` feature of dwc-runtime".into(),
    ))
}

#[cfg(feature = "documents")]
fn docx_text(bytes: &[u8]) -> Result<String> {
    use std::io::{Cursor, Read};

    const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    let invalid = |e: &dyn std::fmt::Display| Error::Document(format!("Failed to read DOCX: {e}"));

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid(&e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| invalid(&e))?
        .read_to_string(&mut xml)?;

    let doc = roxmltree::Document::parse(&xml).map_err(|e| invalid(&e))?;
    let paragraphs: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name((WORD_NS, "p")))
        .map(|p| {
            p.descendants()
                .filter_map(|n| {
                    if n.has_tag_name((WORD_NS, "t")) {
                        n.text()
                    } else if n.has_tag_name((WORD_NS, "tab")) {
                        Some("\t")
                    } else {
                        None
                    }
                })
                .collect()
        })
        .collect();
    Ok(paragraphs.join("\n").trim().to_string())
}

#[cfg(not(feature = "documents"))]
fn docx_text(_bytes: &[u8]) -> Result<String> {
    Err(Error::Document(
        "Reading .docx files requires the `documents` feature of dwc-runtime".into(),
    ))
}

async fn legacy_doc_text(path: &Path) -> Result<String> {
    let file = path.as_os_str();
    let converters: [(&str, Vec<&std::ffi::OsStr>); 3] = [
        ("antiword", vec![file]),
        ("catdoc", vec![file]),
        (
            "textutil",
            vec!["-convert".as_ref(), "txt".as_ref(), "-stdout".as_ref(), file],
        ),
    ];

    for (program, args) in converters {
        let Ok(output) = Command::new(program).args(&args).output().await else {
            continue;
        };
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() && !text.is_empty() {
            debug!(converter = program, "Converted .doc document");
            return Ok(text);
        }
    }

    Err(Error::Document(
        "Unable to parse .doc file. Install antiword or catdoc, or convert it to .docx".into(),
    ))
}
