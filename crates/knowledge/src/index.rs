//! In-memory chunk index.
//!
//! Row `i` of the vector matrix, `texts[i]` and `metas[i]` describe the same
//! chunk. An `Index` is immutable once constructed and may be shared across
//! threads behind an `Arc`.

use crate::types::{ChunkMeta, IndexManifest};
use chrono::Utc;
use gridsage_core::{AppError, AppResult};

/// Allowed distance of a stored vector's norm from 1.0.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// Whether `norm` is finite and within tolerance of 1.0.
pub fn is_unit_norm(norm: f32) -> bool {
    norm.is_finite() && (norm - 1.0).abs() <= UNIT_NORM_TOLERANCE
}

#[derive(Debug, Clone)]
pub struct Index {
    manifest: IndexManifest,
    /// Row-major N x D matrix
    vectors: Vec<f32>,
    texts: Vec<String>,
    metas: Vec<ChunkMeta>,
}

impl Index {
    /// Assemble an index, checking that every part agrees with the manifest.
    pub fn new(
        manifest: IndexManifest,
        vectors: Vec<f32>,
        texts: Vec<String>,
        metas: Vec<ChunkMeta>,
    ) -> AppResult<Self> {
        let n = manifest.chunk_count;
        let d = manifest.dimensions;

        if texts.len() != n || metas.len() != n {
            return Err(AppError::IndexConsistency(format!(
                "Manifest declares {} chunks but found {} texts and {} metadata records",
                n,
                texts.len(),
                metas.len()
            )));
        }

        if n > 0 && d == 0 {
            return Err(AppError::IndexConsistency(
                "Index has chunks but zero vector dimensions".to_string(),
            ));
        }

        if vectors.len() != n * d {
            return Err(AppError::IndexConsistency(format!(
                "Vector matrix holds {} values, expected {} x {}",
                vectors.len(),
                n,
                d
            )));
        }

        let index = Self {
            manifest,
            vectors,
            texts,
            metas,
        };

        for i in 0..index.len() {
            let norm = index.row(i).iter().map(|x| x * x).sum::<f32>().sqrt();
            if !is_unit_norm(norm) {
                return Err(AppError::IndexConsistency(format!(
                    "Row {} has norm {:.4}, expected unit length",
                    i, norm
                )));
            }
        }

        Ok(index)
    }

    /// Build an index from per-row vectors, deriving the manifest.
    pub fn from_parts(
        provider: &str,
        model: &str,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metas: Vec<ChunkMeta>,
        corpus_digest: String,
    ) -> AppResult<Self> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);

        if let Some((i, v)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != dimensions)
        {
            return Err(AppError::IndexConsistency(format!(
                "Row {} has {} dimensions, expected {}",
                i,
                v.len(),
                dimensions
            )));
        }

        let manifest = IndexManifest {
            embedding_provider: provider.to_string(),
            embedding_model: model.to_string(),
            dimensions,
            chunk_count: vectors.len(),
            corpus_digest,
            built_at: Utc::now(),
        };

        Self::new(manifest, vectors.concat(), texts, metas)
    }

    /// An index with no rows.
    pub fn empty(provider: &str, model: &str) -> Self {
        Self {
            manifest: IndexManifest {
                embedding_provider: provider.to_string(),
                embedding_model: model.to_string(),
                dimensions: 0,
                chunk_count: 0,
                corpus_digest: String::new(),
                built_at: Utc::now(),
            },
            vectors: Vec::new(),
            texts: Vec::new(),
            metas: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Vector of row `i`. Panics if `i >= len()`.
    pub fn row(&self, i: usize) -> &[f32] {
        let d = self.dimensions();
        &self.vectors[i * d..(i + 1) * d]
    }

    pub fn text(&self, i: usize) -> &str {
        &self.texts[i]
    }

    pub fn meta(&self, i: usize) -> &ChunkMeta {
        &self.metas[i]
    }

    pub(crate) fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    pub(crate) fn texts(&self) -> &[String] {
        &self.texts
    }

    pub(crate) fn metas(&self) -> &[ChunkMeta] {
        &self.metas
    }
}
