//! Ollama chat provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ChatMessage;
use gridsage_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request deadline.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize, PartialEq)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama chat client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client carrying the per-request deadline
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://127.0.0.1:11434
    pub fn new() -> Self {
        Self::with_base_url(gridsage_core::config::DEFAULT_OLLAMA_ENDPOINT)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client whose requests fail with `AppError::Timeout` after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaChatRequest {
        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        OllamaChatRequest {
            model: request.model.clone(),
            messages: request.messages(),
            stream: false,
            options,
        }
    }

    fn convert_response(&self, response: OllamaChatResponse) -> LlmResponse {
        LlmResponse {
            content: response.message.content,
            model: response.model,
            usage: LlmUsage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending chat request to Ollama (model: {})", request.model);

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("Ollama chat request to {}", url))
                } else {
                    AppError::Llm(format!("Failed to send request to Ollama: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::debug!(
            "Received chat completion from Ollama ({} eval tokens)",
            ollama_response.eval_count.unwrap_or(0)
        );

        Ok(self.convert_response(ollama_response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://localhost:11434/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new("Hello", "llama3")
            .with_system("Be terse")
            .with_temperature(0.2);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "llama3");
        assert_eq!(ollama_req.messages.len(), 2);
        assert!(!ollama_req.stream);
        assert_eq!(
            ollama_req.options,
            Some(OllamaOptions {
                temperature: Some(0.2),
                num_predict: None
            })
        );
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"model": "llama3", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3",
                "message": {"role": "assistant", "content": "RAG"},
                "done": true,
                "prompt_eval_count": 12,
                "eval_count": 1
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        let response = client
            .complete(&LlmRequest::new("why is wind curtailed?", "llama3"))
            .await
            .unwrap();

        assert_eq!(response.content, "RAG");
        assert_eq!(response.usage.total_tokens, 13);
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::with_base_url(server.uri());
        let err = client
            .complete(&LlmRequest::new("hi", "missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(msg) if msg.contains("model not found")));
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({})),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::with_timeout(server.uri(), Duration::from_millis(50));
        let err = client
            .complete(&LlmRequest::new("hi", "llama3"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(matches!(err, AppError::Timeout(_)));
    }
}
