//! Ollama embedding provider.
//!
//! Calls `POST /api/embeddings` once per text. Failures are not retried here;
//! retry policy belongs to whoever started the build or query.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use gridsage_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaEmbeddingProvider {
    /// Create a provider whose requests fail with `AppError::Timeout` after `timeout`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, text), fields(text_len = text.len(), model = %self.model))]
    async fn embed_raw(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("Embedding request to {}", url))
                } else {
                    AppError::Embedding(format!("Failed to send request to Ollama: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(format!("Embedding response from {}", url))
            } else {
                AppError::Embedding(format!("Failed to parse Ollama response: {}", e))
            }
        })?;

        if body.embedding.is_empty() {
            return Err(AppError::Embedding(format!(
                "Ollama returned an empty embedding for model '{}'",
                self.model
            )));
        }

        debug!("Generated {} dimensional embedding", body.embedding.len());

        Ok(body.embedding)
    }
}
