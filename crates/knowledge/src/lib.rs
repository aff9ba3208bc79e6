//! Retrieval core for the Gridsage assistant.
//!
//! Offline, [`build_index`] reads the corpus, chunks every document, embeds
//! the chunks and publishes them through an [`IndexStore`]. Online, a
//! [`Retriever`] owns a loaded [`Index`] and answers top-k queries with tag
//! boosting and one hit per document title.

pub mod chunker;
pub mod config;
pub mod context;
pub mod document;
pub mod embeddings;
pub mod index;
pub mod retriever;
pub mod store;
pub mod types;

pub use chunker::Chunker;
pub use config::{EmbeddingSettings, KnowledgeConfig, RetrievalConfig};
pub use context::{assemble_context, RagContext, NO_DOCUMENTS_CONTEXT};
pub use document::{read_corpus, Document};
pub use embeddings::{create_provider, EmbeddingClient, EmbeddingProvider};
pub use index::Index;
pub use retriever::Retriever;
pub use store::IndexStore;
pub use types::{BuildStats, ChunkMeta, IndexManifest, RetrievalHit};

use gridsage_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Create the embedding client described by `config`.
pub fn embedding_client(
    config: &KnowledgeConfig,
    fallback_endpoint: &str,
) -> AppResult<EmbeddingClient> {
    let provider = create_provider(&config.embedding, fallback_endpoint)?;
    Ok(EmbeddingClient::new(provider))
}

/// Rebuild the workspace index from scratch.
pub async fn build_index(
    workspace: &Path,
    config: &KnowledgeConfig,
    embedder: &EmbeddingClient,
) -> AppResult<BuildStats> {
    let start = Instant::now();
    config.validate()?;

    let corpus = config.corpus_path(workspace);
    tracing::info!("Building index from {:?}", corpus);

    let documents = read_corpus(&corpus, &config.extensions)?;
    if documents.is_empty() {
        return Err(AppError::BuildInput(format!(
            "No documents with extensions {:?} in {:?}",
            config.extensions, corpus
        )));
    }

    let chunker = Chunker::from_config(config);
    let mut texts = Vec::new();
    let mut metas = Vec::new();
    let mut bytes_processed = 0u64;

    for doc in &documents {
        bytes_processed += doc.text.len() as u64;

        let path = doc
            .path
            .strip_prefix(workspace)
            .unwrap_or(&doc.path)
            .to_string_lossy()
            .into_owned();

        let chunks = chunker.chunk(&doc.text);
        tracing::debug!("{}: '{}' -> {} chunks", path, doc.title, chunks.len());

        for chunk in chunks {
            texts.push(chunk);
            metas.push(ChunkMeta {
                title: doc.title.clone(),
                path: path.clone(),
                tags: doc.tags.clone(),
            });
        }
    }

    let store = IndexStore::new(config.index_path(workspace));
    let index = store.build(texts, metas, embedder).await?;

    let duration = start.elapsed();

    tracing::info!(
        "Index build completed: {} documents, {} chunks, {} bytes in {:.2}s",
        documents.len(),
        index.len(),
        bytes_processed,
        duration.as_secs_f64()
    );

    Ok(BuildStats {
        documents_count: documents.len(),
        chunks_count: index.len(),
        bytes_processed,
        manifest: index.manifest().clone(),
        duration_secs: duration.as_secs_f64(),
    })
}

/// Load the workspace index, rejecting one built by a model other than the
/// one `embedder` queries with.
pub fn open_index(
    workspace: &Path,
    config: &KnowledgeConfig,
    embedder: &EmbeddingClient,
) -> AppResult<Index> {
    IndexStore::new(config.index_path(workspace)).load(Some(embedder.model_name()))
}

/// Load the workspace index and wrap it in a retriever.
pub fn open_retriever(
    workspace: &Path,
    config: &KnowledgeConfig,
    embedder: EmbeddingClient,
) -> AppResult<Retriever> {
    let index = open_index(workspace, config, &embedder)?;
    Ok(Retriever::new(
        Arc::new(index),
        embedder,
        config.retrieval.clone(),
    ))
}

/// Manifest of the workspace index.
pub fn index_stats(workspace: &Path, config: &KnowledgeConfig) -> AppResult<IndexManifest> {
    IndexStore::new(config.index_path(workspace)).stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GLOSSARY: &str = "# Glossary\nTags: [glossary, terms]\n\n\
        Curtailment is the deliberate reduction of output from wind or solar generators \
        when the network cannot absorb the power being produced at that moment in time. \
        Balancing costs rise when curtailment payments are made to generators.";

    const FORECAST: &str = "# Forecast Notes\n\n\
        Carbon intensity forecasts are published for every half hour period across the \
        next two days, and regional forecasts follow the same schedule and methodology \
        used by the national forecast service.";

    fn mock_config() -> KnowledgeConfig {
        KnowledgeConfig {
            embedding: EmbeddingSettings {
                provider: "mock".to_string(),
                model: "trigram-v1".to_string(),
                mock_dimensions: 128,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn workspace_with_docs() -> TempDir {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("glossary.md"), GLOSSARY).unwrap();
        fs::write(docs.join("forecast.md"), FORECAST).unwrap();
        fs::write(docs.join("notes.txt"), "ignored").unwrap();
        temp
    }

    #[tokio::test]
    async fn test_build_then_retrieve() {
        let temp = workspace_with_docs();
        let config = mock_config();
        let embedder = embedding_client(&config, "http://localhost:11434").unwrap();

        let stats = build_index(temp.path(), &config, &embedder).await.unwrap();
        assert_eq!(stats.documents_count, 2);
        assert_eq!(stats.chunks_count, 2);
        assert_eq!(stats.manifest.embedding_model, "trigram-v1");

        let manifest = index_stats(temp.path(), &config).unwrap();
        assert_eq!(manifest, stats.manifest);

        let retriever = open_retriever(temp.path(), &config, embedder).unwrap();
        let hits = retriever
            .retrieve("what is curtailment", 3, Some("glossary"))
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Glossary");
        assert_eq!(hits[0].path, "docs/glossary.md");
        assert_eq!(hits[0].tags, vec!["glossary", "terms"]);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_build_input_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        let config = mock_config();
        let embedder = embedding_client(&config, "http://localhost:11434").unwrap();

        let result = build_index(temp.path(), &config, &embedder).await;

        assert!(matches!(result, Err(AppError::BuildInput(_))));
        assert!(!config.index_path(temp.path()).exists());
    }

    #[tokio::test]
    async fn test_only_short_documents_is_build_input_error() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("short.md"), "# Short\nfifteen words is not enough context for a chunk to survive here at all")
            .unwrap();
        let config = mock_config();
        let embedder = embedding_client(&config, "http://localhost:11434").unwrap();

        let result = build_index(temp.path(), &config, &embedder).await;

        assert!(matches!(result, Err(AppError::BuildInput(_))));
        assert!(!config.index_path(temp.path()).exists());
    }

    #[tokio::test]
    async fn test_open_index_with_other_model_fails() {
        let temp = workspace_with_docs();
        let config = mock_config();
        let embedder = embedding_client(&config, "http://localhost:11434").unwrap();
        build_index(temp.path(), &config, &embedder).await.unwrap();

        let mut other = config.clone();
        other.embedding.provider = "ollama".to_string();
        other.embedding.model = "nomic-embed-text".to_string();
        let other_embedder = embedding_client(&other, "http://localhost:11434").unwrap();

        assert!(matches!(
            open_index(temp.path(), &other, &other_embedder),
            Err(AppError::IndexConsistency(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_provider_with_default_model_reopens_its_index() {
        let temp = workspace_with_docs();
        let config = KnowledgeConfig {
            embedding: EmbeddingSettings {
                provider: "mock".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_ne!(config.embedding.model, "trigram-v1");
        let embedder = embedding_client(&config, "http://localhost:11434").unwrap();

        build_index(temp.path(), &config, &embedder).await.unwrap();
        let retriever = open_retriever(temp.path(), &config, embedder).unwrap();

        assert_eq!(retriever.index().manifest().embedding_model, "trigram-v1");
        assert_eq!(retriever.index().len(), 2);
    }
}
