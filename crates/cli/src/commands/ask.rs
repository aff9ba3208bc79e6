//! Ask command handler.
//!
//! Wires the chat model, router, retriever and live-data tool into an
//! orchestrator and answers one question.

use super::knowledge_setup;
use clap::Args;
use gridsage_agent::{CarbonIntensityTool, LlmRouter, Orchestrator, Route};
use gridsage_core::{config::AppConfig, AppError, AppResult};
use gridsage_knowledge::{Index, Retriever};
use gridsage_llm::client_from_config;
use gridsage_prompt::{load_prompt, ANSWER_PROMPT_ID, ROUTER_PROMPT_ID};
use std::sync::Arc;

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Skip classification and use this route (tool, rag, chitchat)
    #[arg(long)]
    pub route: Option<Route>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let llm = client_from_config(config)?;
        let (knowledge, embedder) = knowledge_setup(config)?;

        let retriever = match gridsage_knowledge::open_retriever(
            &config.workspace,
            &knowledge,
            embedder.clone(),
        ) {
            Ok(retriever) => retriever,
            Err(AppError::IndexMissing(msg)) => {
                tracing::warn!("{}", msg);
                Retriever::new(
                    Arc::new(Index::empty(embedder.provider_name(), embedder.model_name())),
                    embedder,
                    knowledge.retrieval.clone(),
                )
            }
            Err(e) => return Err(e),
        };

        let router = LlmRouter::new(
            Arc::clone(&llm),
            &config.model,
            load_prompt(&config.workspace, ROUTER_PROMPT_ID)?,
        );

        let orchestrator = Orchestrator::new(
            llm,
            &config.model,
            Arc::new(router),
            retriever,
            Arc::new(CarbonIntensityTool::new()?),
            load_prompt(&config.workspace, ANSWER_PROMPT_ID)?,
        );

        let answer = match self.route {
            Some(route) => {
                tracing::info!("Route forced to {}", route);
                orchestrator.answer_with_route(&self.question, route).await?
            }
            None => orchestrator.answer(&self.question).await?,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            return Ok(());
        }

        println!("{}", answer.text.trim());

        if answer.retrieval_unavailable {
            eprintln!("(document retrieval was unavailable; answered without documents)");
        }

        if !answer.citations.is_empty() {
            println!();
            println!("Sources:");
            for citation in &answer.citations {
                println!("- {}", citation);
            }
        }

        Ok(())
    }
}
