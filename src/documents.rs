//! Document loading for index ingestion.
//!
//! Paths handed to [`Retriever::add_documents`](crate::retriever::Retriever::add_documents)
//! may be files or directories. Directories are walked recursively and
//! filtered with include globs; build and VCS directories are always
//! excluded. Plain text and Markdown are read as UTF-8, PDFs go through
//! `pdf-extract`. Anything else is reported as unsupported and skipped.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::Metadata;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_PDF: &str = "application/pdf";

const INCLUDE_GLOBS: &[&str] = &["**/*.txt", "**/*.md", "**/*.pdf"];
const EXCLUDE_GLOBS: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Text extracted from one file, with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub text: String,
    pub metadata: Metadata,
}

/// Result of [`load_paths`]: extracted documents plus the files that were skipped.
#[derive(Debug, Default)]
pub struct LoadedBatch {
    pub documents: Vec<LoadedDocument>,
    pub unsupported: Vec<PathBuf>,
}

/// Expand `paths` and load every file on the blocking thread pool.
///
/// Directory walks, file reads, and PDF extraction are all synchronous, so
/// the whole batch runs inside [`tokio::task::spawn_blocking`].
pub async fn load_paths(paths: Vec<PathBuf>) -> Result<LoadedBatch> {
    tokio::task::spawn_blocking(move || {
        let mut batch = LoadedBatch::default();
        for path in expand_paths(&paths)? {
            match load_document(&path)? {
                Some(doc) => batch.documents.push(doc),
                None => batch.unsupported.push(path),
            }
        }
        Ok(batch)
    })
    .await?
}

/// Content type for a path, judged by extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        "pdf" => Some(MIME_PDF),
        _ => None,
    }
}

/// Expand directories into the supported files beneath them.
///
/// Explicit file paths are returned as given, even if unsupported, so the
/// caller can report them. Output is sorted and de-duplicated.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(INCLUDE_GLOBS)?;
    let exclude_set = build_globset(EXCLUDE_GLOBS)?;
    let mut out = Vec::new();

    for root in paths {
        if !root.is_dir() {
            out.push(root.clone());
            continue;
        }

        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy();

            if exclude_set.is_match(rel_str.as_ref()) || !include_set.is_match(rel_str.as_ref()) {
                continue;
            }
            out.push(path.to_path_buf());
        }
    }

    out.sort();
    out.dedup();
    Ok(out)
}

/// Read and extract one file. Returns `Ok(None)` for unsupported file types.
pub fn load_document(path: &Path) -> Result<Option<LoadedDocument>> {
    let Some(content_type) = content_type_for(path) else {
        return Ok(None);
    };

    let text = match content_type {
        MIME_PDF => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| anyhow::anyhow!("PDF extraction failed for {}: {}", path.display(), e))?
        }
        _ => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let metadata = Metadata::from([
        ("source".to_string(), path.display().to_string()),
        ("file_name".to_string(), file_name),
        ("content_type".to_string(), content_type.to_string()),
        ("added_at".to_string(), chrono::Utc::now().to_rfc3339()),
    ]);

    Ok(Some(LoadedDocument {
        path: path.to_path_buf(),
        text,
        metadata,
    }))
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
