//! Embedding client for chunk and query texts.
//!
//! Wraps a provider and guarantees every returned vector is unit length and
//! shares one dimensionality for the life of the client.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use gridsage_core::{AppError, AppResult};
use std::sync::Arc;

/// Added to the norm before dividing, so near-zero vectors stay finite.
pub const NORM_EPSILON: f32 = 1e-9;

/// Scale `vector` in place to unit length.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in vector.iter_mut() {
        *x /= norm + NORM_EPSILON;
    }
}

/// Cosine similarity of two unit vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Normalizing front end over an [`EmbeddingProvider`].
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed texts in order, one request each.
    ///
    /// Fails on the first provider error. A vector whose length differs from
    /// the first one is reported as an embedding error.
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            "Embedding {} texts using provider '{}' (model: {})",
            texts.len(),
            self.provider_name(),
            self.model_name()
        );

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            let mut vector = self.provider.embed_raw(text).await?;

            if let Some(first) = vectors.first() {
                if first.len() != vector.len() {
                    return Err(AppError::Embedding(format!(
                        "Dimension drift at text {}: expected {}, got {}",
                        i,
                        first.len(),
                        vector.len()
                    )));
                }
            }

            normalize(&mut vector);
            vectors.push(vector);
        }

        tracing::debug!(
            "Generated {} embeddings of dimension {}",
            vectors.len(),
            vectors.first().map(Vec::len).unwrap_or(0)
        );

        Ok(vectors)
    }

    /// Embed a single text (typically a query).
    pub async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vector = self.provider.embed_raw(text).await?;
        normalize(&mut vector);
        Ok(vector)
    }
}
