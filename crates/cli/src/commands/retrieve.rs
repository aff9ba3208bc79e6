//! Retrieve command handler.

use super::knowledge_setup;
use clap::Args;
use gridsage_core::{config::AppConfig, AppResult};

const SNIPPET_CHARS: usize = 200;

/// Retrieve ranked passages, one per document
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// Query text
    pub query: String,

    /// Number of distinct documents to return (default from knowledge.yaml)
    #[arg(short = 'k', long)]
    pub k: Option<usize>,

    /// Boost passages from documents carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing retrieve command");

        let (knowledge, embedder) = knowledge_setup(config)?;
        let retriever = gridsage_knowledge::open_retriever(&config.workspace, &knowledge, embedder)?;

        let k = self.k.unwrap_or(retriever.default_k());
        let hits = retriever.retrieve(&self.query, k, self.tag.as_deref()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No passages found.");
            return Ok(());
        }

        for (rank, hit) in hits.iter().enumerate() {
            println!(
                "{}. [{}] score {:.3} ({})",
                rank + 1,
                hit.title,
                hit.score,
                hit.path
            );

            let snippet: String = hit.text.chars().take(SNIPPET_CHARS).collect();
            let ellipsis = if hit.text.chars().count() > SNIPPET_CHARS { "..." } else { "" };
            println!("   {}{}", snippet, ellipsis);
        }

        Ok(())
    }
}
