//! Command handlers for the Gridsage CLI.

pub mod ask;
pub mod index;
pub mod retrieve;

pub use ask::AskCommand;
pub use index::IndexCommand;
pub use retrieve::RetrieveCommand;

use gridsage_core::{config::AppConfig, AppResult};
use gridsage_knowledge::{config::load_config, embedding_client, EmbeddingClient, KnowledgeConfig};

/// Knowledge settings and the embedding client they describe.
pub(crate) fn knowledge_setup(config: &AppConfig) -> AppResult<(KnowledgeConfig, EmbeddingClient)> {
    let knowledge = load_config(&config.workspace)?;
    let embedder = embedding_client(&knowledge, &config.endpoint)?;

    tracing::debug!(
        "Embedding provider: {} (model: {})",
        embedder.provider_name(),
        embedder.model_name()
    );

    Ok((knowledge, embedder))
}
