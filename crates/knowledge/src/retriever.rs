//! Nearest-neighbor retrieval with tag boosting and title deduplication.
//!
//! Similarity is a full linear scan over the index. That is fine for a few
//! thousand chunks and is the first thing to replace with an approximate
//! nearest-neighbor structure for larger corpora.

use crate::config::RetrievalConfig;
use crate::embeddings::{dot, EmbeddingClient};
use crate::index::Index;
use crate::types::RetrievalHit;
use gridsage_core::{AppError, AppResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Answers queries against one loaded index.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<Index>,
    embedder: EmbeddingClient,
    config: RetrievalConfig,
}

struct Candidate {
    row: usize,
    similarity: f32,
    score: f32,
}

impl Retriever {
    pub fn new(index: Arc<Index>, embedder: EmbeddingClient, config: RetrievalConfig) -> Self {
        if !index.is_empty() && index.manifest().embedding_model != embedder.model_name() {
            tracing::warn!(
                "Index built with '{}' is queried with '{}'; similarities are not comparable",
                index.manifest().embedding_model,
                embedder.model_name()
            );
        }

        Self {
            index,
            embedder,
            config,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn default_k(&self) -> usize {
        self.config.default_k
    }

    /// Return at most `k` hits for `query`, no two sharing a title.
    ///
    /// An empty result is a valid outcome. The embedding service is not
    /// called when the index is empty or `k` is zero.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        tag_hint: Option<&str>,
    ) -> AppResult<Vec<RetrievalHit>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;
        let hits = self.rank(&query_vector, k, tag_hint)?;

        tracing::debug!(
            "Retrieved {} hits for query ({} chars, k={}, tag_hint={:?})",
            hits.len(),
            query.len(),
            k,
            tag_hint
        );

        Ok(hits)
    }

    /// Rank the index against an already-normalized query vector.
    pub fn rank(
        &self,
        query_vector: &[f32],
        k: usize,
        tag_hint: Option<&str>,
    ) -> AppResult<Vec<RetrievalHit>> {
        if k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.index.dimensions() {
            return Err(AppError::IndexConsistency(format!(
                "Query vector has {} dimensions, index has {}",
                query_vector.len(),
                self.index.dimensions()
            )));
        }

        let mut pool: Vec<(usize, f32)> = (0..self.index.len())
            .map(|row| (row, dot(self.index.row(row), query_vector)))
            .collect();

        // Stable sorts: equal scores keep row order.
        pool.sort_by(|a, b| b.1.total_cmp(&a.1));
        pool.truncate(self.config.candidate_pool);

        let hint = tag_hint.map(str::trim).filter(|h| !h.is_empty());

        let mut candidates: Vec<Candidate> = pool
            .into_iter()
            .map(|(row, similarity)| {
                let boosted = hint.is_some_and(|h| self.index.meta(row).has_tag(h));
                let score = if boosted {
                    similarity + self.config.tag_boost
                } else {
                    similarity
                };
                Candidate {
                    row,
                    similarity,
                    score,
                }
            })
            .collect();

        if hint.is_some() {
            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        }

        let mut seen_titles: HashSet<&str> = HashSet::new();
        let mut hits = Vec::with_capacity(k);

        for candidate in candidates {
            let meta = self.index.meta(candidate.row);
            if !seen_titles.insert(meta.title.as_str()) {
                continue;
            }

            hits.push(RetrievalHit {
                text: self.index.text(candidate.row).to_string(),
                title: meta.title.clone(),
                path: meta.path.clone(),
                tags: meta.tags.clone(),
                score: candidate.score,
                similarity: candidate.similarity,
            });

            if hits.len() == k {
                break;
            }
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingProvider;
    use crate::types::ChunkMeta;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the same vector for every text and counts calls.
    #[derive(Debug)]
    struct FixedProvider {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(vector: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                vector,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn provider_name(&self) -> &str {
            "fixed"
        }

        fn model_name(&self) -> &str {
            "fixed-v1"
        }

        async fn embed_raw(&self, _text: &str) -> AppResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }
    }

    fn meta(title: &str, tags: &[&str]) -> ChunkMeta {
        ChunkMeta {
            title: title.to_string(),
            path: format!("docs/{}.md", title.to_lowercase().replace(' ', "-")),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn index(rows: Vec<(Vec<f32>, ChunkMeta)>) -> Arc<Index> {
        let texts = rows
            .iter()
            .enumerate()
            .map(|(i, (_, m))| format!("{} chunk {}", m.title, i))
            .collect();
        let (vectors, metas): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        Arc::new(
            Index::from_parts("fixed", "fixed-v1", vectors, texts, metas, String::new()).unwrap(),
        )
    }

    fn retriever(index: Arc<Index>, provider: Arc<FixedProvider>) -> Retriever {
        Retriever::new(
            index,
            EmbeddingClient::new(provider),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_tag_boost_breaks_equal_similarity() {
        let index = index(vec![
            (vec![0.6, 0.0, 0.8], meta("Forecast Notes", &[])),
            (vec![0.6, 0.8, 0.0], meta("Glossary", &["glossary"])),
        ]);
        let retriever = retriever(index, FixedProvider::new(vec![1.0, 0.0, 0.0]));

        let plain = retriever
            .retrieve("what is curtailment", 2, None)
            .await
            .unwrap();
        assert_eq!(plain[0].title, "Forecast Notes");

        let boosted = retriever
            .retrieve("what is curtailment", 2, Some("glossary"))
            .await
            .unwrap();
        assert_eq!(boosted[0].title, "Glossary");
        assert!((boosted[0].score - boosted[0].similarity - 0.05).abs() < 1e-6);
        assert_eq!(boosted[1].score, boosted[1].similarity);
    }

    #[tokio::test]
    async fn test_tag_hint_is_case_insensitive() {
        let index = index(vec![
            (vec![0.6, 0.0, 0.8], meta("Forecast Notes", &[])),
            (vec![0.6, 0.8, 0.0], meta("Glossary", &["glossary"])),
        ]);
        let retriever = retriever(index, FixedProvider::new(vec![1.0, 0.0, 0.0]));

        let hits = retriever.retrieve("q", 1, Some("Glossary")).await.unwrap();
        assert_eq!(hits[0].title, "Glossary");
    }

    #[tokio::test]
    async fn test_boost_cannot_override_large_gap() {
        let index = index(vec![
            (vec![0.6, 0.8, 0.0], meta("Glossary", &["glossary"])),
            (vec![0.9, 0.0, 0.435_889_9], meta("Forecast Notes", &[])),
        ]);
        let retriever = retriever(index, FixedProvider::new(vec![1.0, 0.0, 0.0]));

        let hits = retriever.retrieve("q", 2, Some("glossary")).await.unwrap();
        assert_eq!(hits[0].title, "Forecast Notes");
        assert_eq!(hits[1].title, "Glossary");
    }

    #[tokio::test]
    async fn test_one_hit_per_title() {
        let rows = ["A", "A", "B", "B", "C", "C"]
            .iter()
            .map(|t| (vec![1.0, 0.0], meta(t, &[])))
            .collect();
        let retriever = retriever(index(rows), FixedProvider::new(vec![1.0, 0.0]));

        let hits = retriever.retrieve("q", 2, None).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "A");
        assert_eq!(hits[1].title, "B");
    }

    #[tokio::test]
    async fn test_at_most_k_and_unique_for_all_k() {
        let rows = vec![
            (vec![1.0, 0.0], meta("A", &[])),
            (vec![0.8, 0.6], meta("B", &[])),
            (vec![0.6, 0.8], meta("A", &[])),
            (vec![0.0, 1.0], meta("C", &["x"])),
        ];
        let retriever = retriever(index(rows), FixedProvider::new(vec![0.8, 0.6]));

        for k in 0..6 {
            let hits = retriever.retrieve("q", k, Some("x")).await.unwrap();
            assert!(hits.len() <= k);
            let titles: HashSet<&str> = hits.iter().map(|h| h.title.as_str()).collect();
            assert_eq!(titles.len(), hits.len());
        }

        let all = retriever.retrieve("q", 10, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_candidate_pool_limits_hits() {
        let rows = vec![
            (vec![1.0, 0.0], meta("A", &[])),
            (vec![0.8, 0.6], meta("B", &[])),
            (vec![0.6, 0.8], meta("C", &[])),
        ];
        let retriever = Retriever::new(
            index(rows),
            EmbeddingClient::new(FixedProvider::new(vec![1.0, 0.0])),
            RetrievalConfig {
                candidate_pool: 2,
                ..Default::default()
            },
        );

        let hits = retriever.retrieve("q", 3, None).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_skips_embedding() {
        let provider = FixedProvider::new(vec![1.0]);
        let retriever = retriever(
            Arc::new(Index::empty("fixed", "fixed-v1")),
            Arc::clone(&provider),
        );

        let hits = retriever.retrieve("anything", 3, None).await.unwrap();

        assert!(hits.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_k_skips_embedding() {
        let provider = FixedProvider::new(vec![1.0, 0.0]);
        let retriever = retriever(
            index(vec![(vec![1.0, 0.0], meta("A", &[]))]),
            Arc::clone(&provider),
        );

        assert!(retriever.retrieve("q", 0, None).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let retriever = retriever(
            index(vec![(vec![1.0, 0.0, 0.0], meta("A", &[]))]),
            FixedProvider::new(vec![1.0, 0.0]),
        );

        let result = retriever.rank(&[1.0, 0.0], 1, None);
        assert!(matches!(result, Err(AppError::IndexConsistency(_))));
    }
}
