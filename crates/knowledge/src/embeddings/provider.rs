//! Embedding provider trait and factory.

use crate::config::EmbeddingSettings;
use gridsage_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

use super::providers::{MockEmbeddingProvider, OllamaEmbeddingProvider};

/// A service that turns one text into one raw (unnormalized) vector.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed_raw(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Create an embedding provider from settings.
///
/// `fallback_endpoint` is used when the settings do not name an endpoint.
pub fn create_provider(
    settings: &EmbeddingSettings,
    fallback_endpoint: &str,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockEmbeddingProvider::new(settings.mock_dimensions))),

        "ollama" => {
            let endpoint = settings
                .endpoint
                .as_deref()
                .unwrap_or(fallback_endpoint);
            let provider = OllamaEmbeddingProvider::new(
                endpoint,
                &settings.model,
                Duration::from_secs(settings.timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, mock",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let settings = EmbeddingSettings {
            provider: "mock".to_string(),
            mock_dimensions: 64,
            ..Default::default()
        };

        let provider = create_provider(&settings, "http://localhost:11434").unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[test]
    fn test_create_ollama_provider_uses_fallback_endpoint() {
        let settings = EmbeddingSettings::default();
        let provider = create_provider(&settings, "http://10.0.0.2:11434").unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_create_unknown_provider() {
        let settings = EmbeddingSettings {
            provider: "unknown".to_string(),
            ..Default::default()
        };

        let err = create_provider(&settings, "http://localhost:11434").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }
}
