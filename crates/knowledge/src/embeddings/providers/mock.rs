//! Mock embedding provider using trigram-hashed, content-aware vectors.

use crate::embeddings::provider::EmbeddingProvider;
use gridsage_core::AppResult;
use std::collections::{HashMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic offline provider for tests and air-gapped builds.
///
/// Words sharing character trigrams land in shared dimensions, so related
/// texts score higher than unrelated ones. Vectors are returned raw; the
/// embedding client normalizes them.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let lower = text.to_lowercase();
        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let hash = window
                    .iter()
                    .fold(0u64, |acc, c| acc.wrapping_mul(37).wrapping_add(*c as u64));
                embedding[(hash as usize) % self.dimensions] += (*freq as f32).sqrt();
            }

            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(word_hash as usize) % self.dimensions] += *freq as f32;
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    async fn embed_raw(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self.generate(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_identity() {
        let provider = MockEmbeddingProvider::new(384);
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.embed_raw("hello world").await.unwrap().len(), 384);
    }

    #[tokio::test]
    async fn test_mock_provider_deterministic() {
        let provider = MockEmbeddingProvider::new(128);
        let a = provider.embed_raw("carbon intensity forecast").await.unwrap();
        let b = provider.embed_raw("carbon intensity forecast").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_provider_different_texts() {
        let provider = MockEmbeddingProvider::new(128);
        let a = provider.embed_raw("wind curtailment").await.unwrap();
        let b = provider.embed_raw("solar eclipse").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_mock_provider_stop_words_only_is_zero() {
        let provider = MockEmbeddingProvider::new(32);
        let v = provider.embed_raw("the and of it").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_mock_provider_utf8_safety() {
        let provider = MockEmbeddingProvider::new(64);
        let v = provider
            .embed_raw("Gamedex é um aplicativo 🎮 brasileiro")
            .await
            .unwrap();
        assert!(v.iter().any(|&x| x > 0.0));
    }
}
