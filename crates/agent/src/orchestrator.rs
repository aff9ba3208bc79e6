//! Query orchestration: route, gather context, answer.

use crate::route::{QueryRouter, Route};
use crate::tools::LiveDataTool;
use crate::when::{extract_when, WhenExpr};
use chrono::Utc;
use gridsage_core::AppResult;
use gridsage_knowledge::{assemble_context, RagContext, Retriever};
use gridsage_llm::{LlmClient, LlmRequest};
use gridsage_prompt::{build_prompt, PromptDefinition};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Reply when the live-data source has no value for the requested block.
pub const TOOL_NO_VALUE_MESSAGE: &str = "I couldn't find a carbon-intensity value for that time block. \
     Try another time within today/tomorrow, or check the National Grid API.";

const DEFINITIONAL_MARKERS: &[&str] = &["what is", "define", "meaning"];
const GLOSSARY_TAG: &str = "glossary";

/// Final answer for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub route: Route,
    pub text: String,
    pub citations: Vec<String>,

    /// Retrieval failed and the fallback context was used instead
    #[serde(rename = "retrievalUnavailable")]
    pub retrieval_unavailable: bool,
}

/// Tag to favour for definitional questions.
pub fn tag_hint_for(query: &str) -> Option<&'static str> {
    let lower = query.to_lowercase();
    DEFINITIONAL_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
        .then_some(GLOSSARY_TAG)
}

pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    model: String,
    router: Arc<dyn QueryRouter>,
    retriever: Retriever,
    tool: Arc<dyn LiveDataTool>,
    answer_prompt: PromptDefinition,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        router: Arc<dyn QueryRouter>,
        retriever: Retriever,
        tool: Arc<dyn LiveDataTool>,
        answer_prompt: PromptDefinition,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            router,
            retriever,
            tool,
            answer_prompt,
        }
    }

    /// Classify the query, then answer it.
    pub async fn answer(&self, query: &str) -> AppResult<Answer> {
        let route = self.router.route(query).await?;
        tracing::info!("Routed query to {}", route);
        self.answer_with_route(query, route).await
    }

    /// Answer the query along an already chosen route.
    pub async fn answer_with_route(&self, query: &str, route: Route) -> AppResult<Answer> {
        match route {
            Route::Rag => self.answer_rag(query).await,
            Route::Tool => self.answer_tool(query).await,
            Route::Chitchat => self.answer_chitchat(query).await,
        }
    }

    async fn answer_rag(&self, query: &str) -> AppResult<Answer> {
        let tag_hint = tag_hint_for(query);
        let k = self.retriever.default_k();

        let (context, retrieval_unavailable) =
            match self.retriever.retrieve(query, k, tag_hint).await {
                Ok(hits) => (assemble_context(&hits), false),
                Err(e) => {
                    tracing::warn!("Retrieval unavailable, answering without documents: {}", e);
                    (RagContext::fallback(), true)
                }
            };

        if !context.grounded {
            tracing::info!("No grounding available for this query");
        }

        let text = self.generate(query, &context.text).await?;

        Ok(Answer {
            route: Route::Rag,
            text,
            citations: context.citations,
            retrieval_unavailable,
        })
    }

    async fn answer_tool(&self, query: &str) -> AppResult<Answer> {
        let now = Utc::now();
        let at = match extract_when(query, now.naive_utc()) {
            WhenExpr::At(naive) => naive.and_utc(),
            WhenExpr::Now => now,
        };

        let reading = self.tool.lookup(at).await?;

        if !reading.has_value() {
            return Ok(Answer {
                route: Route::Tool,
                text: TOOL_NO_VALUE_MESSAGE.to_string(),
                citations: vec![reading.source],
                retrieval_unavailable: false,
            });
        }

        let text = self.generate(query, &reading.to_context()).await?;

        Ok(Answer {
            route: Route::Tool,
            text,
            citations: vec![reading.source],
            retrieval_unavailable: false,
        })
    }

    async fn answer_chitchat(&self, query: &str) -> AppResult<Answer> {
        let request = LlmRequest::new(query, &self.model);
        let response = self.llm.complete(&request).await?;

        Ok(Answer {
            route: Route::Chitchat,
            text: response.content,
            citations: Vec::new(),
            retrieval_unavailable: false,
        })
    }

    /// One answer-prompt call over `context`.
    async fn generate(&self, question: &str, context: &str) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("context".to_string(), context.to_string());
        let built = build_prompt(&self.answer_prompt, variables)?;

        let mut request = LlmRequest::new(built.user, &self.model).with_temperature(built.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = built.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.complete(&request).await?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolReading;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use gridsage_core::AppError;
    use gridsage_knowledge::embeddings::providers::MockEmbeddingProvider;
    use gridsage_knowledge::{
        ChunkMeta, EmbeddingClient, EmbeddingProvider, Index, RetrievalConfig,
        NO_DOCUMENTS_CONTEXT,
    };
    use gridsage_llm::{LlmResponse, LlmUsage};
    use gridsage_prompt::{load_prompt, ANSWER_PROMPT_ID};
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        requests: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(LlmResponse {
                content: "model reply".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    struct FixedRouter(Route);

    #[async_trait]
    impl QueryRouter for FixedRouter {
        async fn route(&self, _query: &str) -> AppResult<Route> {
            Ok(self.0)
        }
    }

    struct FakeTool {
        reading: ToolReading,
        asked: Mutex<Vec<DateTime<Utc>>>,
    }

    #[async_trait]
    impl LiveDataTool for FakeTool {
        fn name(&self) -> &str {
            "fake"
        }

        async fn lookup(&self, at: DateTime<Utc>) -> AppResult<ToolReading> {
            self.asked.lock().unwrap().push(at);
            Ok(self.reading.clone())
        }
    }

    #[derive(Debug)]
    struct DownProvider;

    #[async_trait]
    impl EmbeddingProvider for DownProvider {
        fn provider_name(&self) -> &str {
            "down"
        }

        fn model_name(&self) -> &str {
            "trigram-v1"
        }

        async fn embed_raw(&self, _text: &str) -> AppResult<Vec<f32>> {
            Err(AppError::Embedding("connection refused".to_string()))
        }
    }

    fn reading(intensity: Option<i64>) -> ToolReading {
        ToolReading {
            window_from: Some("2025-08-22T18:00Z".to_string()),
            window_to: Some("2025-08-22T18:30Z".to_string()),
            intensity,
            index: intensity.map(|_| "low".to_string()),
            forecast: intensity,
            actual: None,
            source: "https://api.test/intensity/2025-08-22T18:00Z/2025-08-22T18:30Z".to_string(),
        }
    }

    async fn corpus_retriever() -> Retriever {
        let embedder = EmbeddingClient::new(Arc::new(MockEmbeddingProvider::new(128)));
        let texts = vec![
            "Curtailment is the deliberate reduction of wind output when the network is constrained"
                .to_string(),
            "Carbon intensity forecasts are published for each half hour period".to_string(),
        ];
        let metas = vec![
            ChunkMeta {
                title: "Glossary".to_string(),
                path: "docs/glossary.md".to_string(),
                tags: vec!["glossary".to_string()],
            },
            ChunkMeta {
                title: "Forecast Notes".to_string(),
                path: "docs/forecast.md".to_string(),
                tags: Vec::new(),
            },
        ];
        let vectors = embedder.embed(&texts).await.unwrap();
        let index =
            Index::from_parts("mock", "trigram-v1", vectors, texts, metas, String::new()).unwrap();
        Retriever::new(Arc::new(index), embedder, RetrievalConfig::default())
    }

    fn orchestrator(
        llm: Arc<RecordingClient>,
        route: Route,
        retriever: Retriever,
        tool: Arc<FakeTool>,
    ) -> Orchestrator {
        Orchestrator::new(
            llm,
            "llama3:instruct",
            Arc::new(FixedRouter(route)),
            retriever,
            tool,
            load_prompt(Path::new("/nonexistent-workspace"), ANSWER_PROMPT_ID).unwrap(),
        )
    }

    fn idle_tool() -> Arc<FakeTool> {
        Arc::new(FakeTool {
            reading: reading(None),
            asked: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_tag_hint_for_definitional_queries() {
        assert_eq!(tag_hint_for("What is curtailment?"), Some("glossary"));
        assert_eq!(tag_hint_for("Define inertia"), Some("glossary"));
        assert_eq!(tag_hint_for("the meaning of BM units"), Some("glossary"));
        assert_eq!(tag_hint_for("Why did prices spike?"), None);
    }

    #[tokio::test]
    async fn test_rag_answer_cites_retrieved_titles() {
        let llm = Arc::new(RecordingClient::default());
        let orch = orchestrator(llm.clone(), Route::Rag, corpus_retriever().await, idle_tool());

        let answer = orch.answer("What is curtailment?").await.unwrap();

        assert_eq!(answer.route, Route::Rag);
        assert_eq!(answer.text, "model reply");
        assert_eq!(answer.citations.len(), 2);
        assert_eq!(answer.citations[0], "Glossary");
        assert!(!answer.retrieval_unavailable);

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .prompt
            .starts_with("Question: What is curtailment?\n\nContext:\n[Glossary] "));
        assert_eq!(requests[0].temperature, Some(0.2));
        assert!(requests[0].system.as_deref().unwrap().contains("USING ONLY"));
    }

    #[tokio::test]
    async fn test_rag_with_empty_index_uses_fallback_context() {
        let llm = Arc::new(RecordingClient::default());
        let retriever = Retriever::new(
            Arc::new(Index::empty("mock", "trigram-v1")),
            EmbeddingClient::new(Arc::new(MockEmbeddingProvider::new(8))),
            RetrievalConfig::default(),
        );
        let orch = orchestrator(llm.clone(), Route::Rag, retriever, idle_tool());

        let answer = orch.answer("Why is wind curtailed?").await.unwrap();

        assert!(answer.citations.is_empty());
        assert!(!answer.retrieval_unavailable);
        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].prompt.ends_with(NO_DOCUMENTS_CONTEXT));
    }

    #[tokio::test]
    async fn test_retrieval_failure_is_downgraded() {
        let llm = Arc::new(RecordingClient::default());
        let index = Index::from_parts(
            "down",
            "trigram-v1",
            vec![vec![1.0, 0.0]],
            vec!["text".to_string()],
            vec![ChunkMeta {
                title: "Doc".to_string(),
                path: "docs/doc.md".to_string(),
                tags: Vec::new(),
            }],
            String::new(),
        )
        .unwrap();
        let retriever = Retriever::new(
            Arc::new(index),
            EmbeddingClient::new(Arc::new(DownProvider)),
            RetrievalConfig::default(),
        );
        let orch = orchestrator(llm.clone(), Route::Rag, retriever, idle_tool());

        let answer = orch.answer("Why is wind curtailed?").await.unwrap();

        assert!(answer.retrieval_unavailable);
        assert!(answer.citations.is_empty());
        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].prompt.ends_with(NO_DOCUMENTS_CONTEXT));
    }

    #[tokio::test]
    async fn test_tool_answer_uses_reading() {
        let llm = Arc::new(RecordingClient::default());
        let tool = Arc::new(FakeTool {
            reading: reading(Some(120)),
            asked: Mutex::new(Vec::new()),
        });
        let orch = orchestrator(llm.clone(), Route::Tool, corpus_retriever().await, tool.clone());

        let answer = orch
            .answer("Carbon intensity on 2025-08-22 18:10?")
            .await
            .unwrap();

        assert_eq!(answer.route, Route::Tool);
        assert_eq!(answer.text, "model reply");
        assert_eq!(answer.citations, vec![reading(None).source]);

        assert_eq!(
            tool.asked.lock().unwrap()[0],
            Utc.with_ymd_and_hms(2025, 8, 22, 18, 10, 0).unwrap()
        );

        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("Time window: 18:00-18:30 (UTC)"));
        assert!(requests[0].prompt.contains("index: Low"));
    }

    #[tokio::test]
    async fn test_tool_without_value_skips_model() {
        let llm = Arc::new(RecordingClient::default());
        let orch = orchestrator(llm.clone(), Route::Tool, corpus_retriever().await, idle_tool());

        let answer = orch.answer("intensity at 6pm").await.unwrap();

        assert_eq!(answer.text, TOOL_NO_VALUE_MESSAGE);
        assert_eq!(answer.citations.len(), 1);
        assert!(llm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chitchat_sends_raw_query() {
        let llm = Arc::new(RecordingClient::default());
        let orch = orchestrator(
            llm.clone(),
            Route::Chitchat,
            corpus_retriever().await,
            idle_tool(),
        );

        let answer = orch.answer("hello!").await.unwrap();

        assert_eq!(answer.route, Route::Chitchat);
        assert!(answer.citations.is_empty());
        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests[0].prompt, "hello!");
        assert!(requests[0].system.is_none());
        assert!(requests[0].temperature.is_none());
    }

    #[tokio::test]
    async fn test_answer_with_route_bypasses_router() {
        let llm = Arc::new(RecordingClient::default());
        let orch = orchestrator(llm.clone(), Route::Tool, corpus_retriever().await, idle_tool());

        let answer = orch.answer_with_route("hi", Route::Chitchat).await.unwrap();
        assert_eq!(answer.route, Route::Chitchat);
    }
}
