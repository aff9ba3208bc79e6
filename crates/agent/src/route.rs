//! Query routing: which strategy answers a question.

use async_trait::async_trait;
use gridsage_core::{AppError, AppResult};
use gridsage_llm::{LlmClient, LlmRequest};
use gridsage_prompt::{build_prompt, PromptDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The three handling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Route {
    /// Live, time-bound quantitative lookup
    Tool,
    /// Grounded answer from the document index
    Rag,
    /// Conversational reply, no grounding
    Chitchat,
}

impl Route {
    /// Map free-form classifier output onto a route.
    ///
    /// Anything mentioning neither TOOL nor RAG is chitchat.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_uppercase();
        if label.contains("TOOL") {
            Route::Tool
        } else if label.contains("RAG") {
            Route::Rag
        } else {
            Route::Chitchat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Tool => "TOOL",
            Route::Rag => "RAG",
            Route::Chitchat => "CHITCHAT",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tool" => Ok(Route::Tool),
            "rag" => Ok(Route::Rag),
            "chitchat" => Ok(Route::Chitchat),
            other => Err(AppError::Config(format!(
                "Unknown route '{}'. Expected one of: tool, rag, chitchat",
                other
            ))),
        }
    }
}

/// Picks a route for a query.
#[async_trait]
pub trait QueryRouter: Send + Sync {
    async fn route(&self, query: &str) -> AppResult<Route>;
}

/// Classifies queries with the chat model and the router prompt.
pub struct LlmRouter {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl LlmRouter {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
        }
    }
}

#[async_trait]
impl QueryRouter for LlmRouter {
    async fn route(&self, query: &str) -> AppResult<Route> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(built.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = built.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(&request).await?;
        let route = Route::from_label(&response.content);

        tracing::debug!("Router said {:?} -> {}", response.content.trim(), route);

        Ok(route)
    }
}
