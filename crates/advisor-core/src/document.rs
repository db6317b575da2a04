//! Source document loading and plain-text extraction.

use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::traits::TextExtractor;
use crate::types::{DocumentFormat, SourceDocument};

/// Extracts PDF text with `pdf-extract`; text formats must be valid UTF-8.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatExtractor;

impl TextExtractor for FormatExtractor {
    fn extract(&self, document: &SourceDocument) -> Result<String> {
        match document.format {
            // pdf-extract panics on some malformed inputs instead of erroring.
            DocumentFormat::Pdf => std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&document.bytes))
                .map_err(|_| anyhow!("PDF parser aborted on malformed input"))?
                .map_err(|e| anyhow!("not a readable PDF: {}", e)),
            DocumentFormat::PlainText | DocumentFormat::Markdown => std::str::from_utf8(&document.bytes)
                .map(str::to_string)
                .map_err(|e| anyhow!("not valid UTF-8 text: {}", e)),
        }
    }
}

/// A file that could not be turned into a [`SourceDocument`].
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Reads every `*.pdf`, `*.txt` and `*.md` file under `root`, sorted by path.
/// A document's `source_id` is its path relative to `root`, `/`-separated,
/// so same-named files in different folders stay distinct.
pub fn load_documents(root: &Path) -> (Vec<SourceDocument>, Vec<LoadFailure>) {
    let files = list_source_files(root);
    if files.is_empty() {
        info!("No source documents found under {}", root.display());
    }
    let mut documents = Vec::new();
    let mut failures = Vec::new();
    for (path, format) in files {
        let source_id = relative_source_id(root, &path);
        match fs::read(&path) {
            Ok(bytes) => documents.push(SourceDocument::new(source_id, format, bytes)),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                failures.push(LoadFailure { path, reason: e.to_string() });
            }
        }
    }
    (documents, failures)
}

fn relative_source_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn list_source_files(root: &Path) -> Vec<(PathBuf, DocumentFormat)> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if let Some(format) = path.extension().and_then(|s| s.to_str()).and_then(DocumentFormat::from_extension) {
            files.push((path.to_path_buf(), format));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}
