//! Corpus reading: titles, tags and document text.

use gridsage_core::{AppError, AppResult};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*#\s*(.+)$").expect("title regex is valid"));

static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^Tags:\s*(.+)$").expect("tags regex is valid"));

static TAG_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\[\]]").expect("tag separator regex is valid"));

/// A corpus document, immutable for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Stable identifier
    pub path: PathBuf,

    /// First heading, or the file stem
    pub title: String,

    /// Lowercase tags from the `Tags:` line
    pub tags: Vec<String>,

    /// Full text
    pub text: String,
}

impl Document {
    /// Build a document from its path and raw text.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let text = text.into();
        let title = extract_title(&text).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let tags = extract_tags(&text);

        Self {
            path,
            title,
            tags,
            text,
        }
    }
}

/// First markdown heading of the text, trimmed.
pub fn extract_title(text: &str) -> Option<String> {
    TITLE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Tags from the first `Tags:` line, split on commas and brackets, lowercased.
pub fn extract_tags(text: &str) -> Vec<String> {
    let Some(raw) = TAGS_RE.captures(text).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };

    TAG_SEPARATOR_RE
        .split(raw.as_str().trim())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && t != "tags")
        .collect()
}

/// Read every matching document directly inside `dir`, sorted by file name.
///
/// Unreadable files are skipped with a warning. A missing directory is a
/// build input error.
pub fn read_corpus(dir: &Path, extensions: &[String]) -> AppResult<Vec<Document>> {
    if !dir.is_dir() {
        return Err(AppError::BuildInput(format!(
            "Corpus directory not found: {:?}",
            dir
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, extensions) {
            continue;
        }

        match fs::read_to_string(path) {
            Ok(text) => documents.push(Document::from_text(path, text)),
            Err(e) => tracing::warn!("Skipping unreadable document {:?}: {}", path, e),
        }
    }

    tracing::debug!("Read {} documents from {:?}", documents.len(), dir);
    Ok(documents)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
