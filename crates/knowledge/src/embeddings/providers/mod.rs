//! Embedding provider implementations.

pub mod mock;
pub mod ollama;

pub use mock::MockEmbeddingProvider;
pub use ollama::OllamaEmbeddingProvider;
