//! Knowledge base configuration management.

use gridsage_core::config::STATE_DIR;
use gridsage_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for corpus chunking, embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Corpus directory, relative to the workspace unless absolute
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// File extensions read from the corpus directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Index directory, relative to the workspace unless absolute
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Target chunk size in approximate tokens (words)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words carried from the end of one chunk into the next
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks with this many words or fewer are discarded
    #[serde(default = "default_min_chunk_words")]
    pub min_chunk_words: usize,

    #[serde(default)]
    pub embedding: EmbeddingSettings,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Embedding service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// "ollama" or "mock"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model identifier; must match between build and query
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Service endpoint; falls back to the chat endpoint when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request deadline in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Vector size produced by the mock provider
    #[serde(default = "default_mock_dimensions")]
    pub mock_dimensions: usize,
}

/// Re-ranking knobs. Both are tunable, not derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates kept after the similarity scan
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,

    /// Added to the score of candidates carrying the hinted tag
    #[serde(default = "default_tag_boost")]
    pub tag_boost: f32,

    /// Distinct-title hits returned when the caller does not ask for a count
    #[serde(default = "default_k")]
    pub default_k: usize,
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(STATE_DIR).join("index")
}

fn default_chunk_size() -> usize {
    300
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_min_chunk_words() -> usize {
    20
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_mock_dimensions() -> usize {
    384
}

fn default_candidate_pool() -> usize {
    50
}

fn default_tag_boost() -> f32 {
    0.05
}

fn default_k() -> usize {
    3
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            endpoint: None,
            timeout_secs: default_embedding_timeout(),
            mock_dimensions: default_mock_dimensions(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_pool: default_candidate_pool(),
            tag_boost: default_tag_boost(),
            default_k: default_k(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            extensions: default_extensions(),
            index_dir: default_index_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_words: default_min_chunk_words(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl KnowledgeConfig {
    /// Absolute corpus directory for a workspace.
    pub fn corpus_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.corpus_dir)
    }

    /// Absolute index directory for a workspace.
    pub fn index_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.index_dir)
    }

    /// Reject settings that would make chunking or ranking meaningless.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.retrieval.candidate_pool == 0 {
            return Err(AppError::Config(
                "retrieval.candidate_pool must be positive".to_string(),
            ));
        }
        if !self.retrieval.tag_boost.is_finite() {
            return Err(AppError::Config(
                "retrieval.tag_boost must be a finite number".to_string(),
            ));
        }
        if self.embedding.timeout_secs == 0 {
            return Err(AppError::Config(
                "embedding.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load knowledge configuration.
///
/// Reads `.gridsage/knowledge.yaml` if it exists, otherwise returns defaults.
pub fn load_config(workspace: &Path) -> AppResult<KnowledgeConfig> {
    let config_path = get_config_path(workspace);

    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: KnowledgeConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded knowledge config from {:?}", config_path);
        config
    } else {
        tracing::debug!("No knowledge config at {:?}, using defaults", config_path);
        KnowledgeConfig::default()
    };

    config.validate()?;
    Ok(config)
}

/// Get the path to the knowledge config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge.yaml")
}
