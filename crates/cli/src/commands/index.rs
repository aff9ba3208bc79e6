//! Index command handler.

use super::knowledge_setup;
use clap::{Args, Subcommand};
use gridsage_core::{config::AppConfig, AppResult};

/// Build or inspect the document index
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Rebuild the index from the corpus directory
    Build(IndexBuildCommand),
    /// Show the live index manifest
    Stats(IndexStatsCommand),
}

/// Rebuild the index
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index build command");

        let (knowledge, embedder) = knowledge_setup(config)?;
        let stats = gridsage_knowledge::build_index(&config.workspace, &knowledge, &embedder).await?;

        if self.json {
            let output = serde_json::json!({
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
                "manifest": stats.manifest,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} documents ({} chunks, {} bytes) in {:.2}s",
                stats.documents_count, stats.chunks_count, stats.bytes_processed, stats.duration_secs
            );
            println!(
                "  Embedding: {} / {} ({} dims)",
                stats.manifest.embedding_provider,
                stats.manifest.embedding_model,
                stats.manifest.dimensions
            );
        }

        Ok(())
    }
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index stats command");

        let (knowledge, _) = knowledge_setup(config)?;
        let manifest = gridsage_knowledge::index_stats(&config.workspace, &knowledge)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        } else {
            println!("Index: {}", knowledge.index_path(&config.workspace).display());
            println!("  Chunks: {}", manifest.chunk_count);
            println!("  Dimensions: {}", manifest.dimensions);
            println!(
                "  Embedding: {} / {}",
                manifest.embedding_provider, manifest.embedding_model
            );
            println!("  Corpus digest: {}", manifest.corpus_digest);
            println!("  Built at: {}", manifest.built_at.to_rfc3339());
        }

        Ok(())
    }
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}
