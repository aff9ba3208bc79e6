//! LLM provider factory.
//!
//! Builds a chat client from the application configuration.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use gridsage_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a chat client for the configured provider.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown.
pub fn create_client(
    provider: &str,
    endpoint: &str,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => Ok(Arc::new(OllamaClient::with_timeout(endpoint, timeout))),
        _ => Err(AppError::Config(format!(
            "Unknown provider: {}. Supported: ollama",
            provider
        ))),
    }
}

/// Create a chat client straight from an `AppConfig`.
pub fn client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    create_client(
        &config.provider,
        &config.endpoint,
        Duration::from_secs(config.timeout_secs),
    )
}
