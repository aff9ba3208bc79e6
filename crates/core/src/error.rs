//! Error types for the Gridsage assistant.
//!
//! One enum covers every failure category: configuration, I/O, index
//! construction, the embedding service, index consistency, the chat model,
//! prompts and the live-data tool.

use thiserror::Error;

/// Unified error type for Gridsage.
///
/// All fallible functions return `Result<T, AppError>`.
/// An empty retrieval result is not an error and never appears here.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing indexable was produced from the corpus
    #[error("Build input error: {0}")]
    BuildInput(String),

    /// The embedding service failed or returned unusable data
    #[error("Embedding service error: {0}")]
    Embedding(String),

    /// An external call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Persisted vectors and metadata disagree, or the index was built with another model
    #[error("Index consistency error: {0}")]
    IndexConsistency(String),

    /// No index has been built at the configured location
    #[error("Index not found: {0}")]
    IndexMissing(String),

    /// Chat model errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Live-data tool errors
    #[error("Tool error: {0}")]
    Tool(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether the caller may retry the whole operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Timeout(_) | AppError::Embedding(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
