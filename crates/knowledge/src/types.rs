//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-chunk metadata persisted alongside each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Display title of the owning document
    pub title: String,

    /// Path of the owning document
    pub path: String,

    /// Lowercase tags declared by the owning document
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ChunkMeta {
    /// Whether this chunk's document declares `tag` (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}

/// Identity and shape of a persisted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Embedding provider used at build time
    pub embedding_provider: String,

    /// Embedding model used at build time; queries must use the same one
    pub embedding_model: String,

    /// Vector dimensions
    pub dimensions: usize,

    /// Number of rows
    pub chunk_count: usize,

    /// SHA-256 over chunk texts and metadata, in row order
    pub corpus_digest: String,

    /// When the index was built
    pub built_at: DateTime<Utc>,
}

/// A ranked retrieval result. Lives for one query only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    /// Chunk text
    pub text: String,

    /// Owning document title
    pub title: String,

    /// Owning document path
    pub path: String,

    /// Owning document tags
    pub tags: Vec<String>,

    /// Cosine similarity plus any tag boost
    pub score: f32,

    /// Cosine similarity before boosting
    pub similarity: f32,
}

/// Statistics from an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Number of documents read from the corpus
    pub documents_count: usize,

    /// Number of chunks embedded and persisted
    pub chunks_count: usize,

    /// Total bytes of document text read
    pub bytes_processed: u64,

    /// Manifest of the freshly written index
    pub manifest: IndexManifest,

    /// Duration in seconds
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(tags: &[&str]) -> ChunkMeta {
        ChunkMeta {
            title: "Réseau".to_string(),
            path: "docs/reseau.md".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_has_tag_ignores_case() {
        let meta = meta(&["glossary", "grid"]);
        assert!(meta.has_tag("Glossary"));
        assert!(meta.has_tag("GRID"));
        assert!(!meta.has_tag("forecast"));
    }

    #[test]
    fn test_has_tag_folds_non_ascii_case() {
        let meta = meta(&["énergie"]);
        assert!(meta.has_tag("ÉNERGIE"));
        assert!(meta.has_tag("Énergie"));
    }
}
