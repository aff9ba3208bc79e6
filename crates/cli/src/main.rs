//! Gridsage CLI
//!
//! Main entry point for the gridsage command-line tool: build and inspect
//! the document index, retrieve passages, and ask routed questions.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IndexCommand, RetrieveCommand};
use gridsage_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Gridsage - grounded answers about the electricity grid
#[derive(Parser, Debug)]
#[command(name = "gridsage")]
#[command(about = "Grounded answers about the electricity grid", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "GRIDSAGE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "GRIDSAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Chat provider (ollama)
    #[arg(short, long, global = true, env = "GRIDSAGE_PROVIDER")]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "GRIDSAGE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build or inspect the document index
    Index(IndexCommand),

    /// Retrieve ranked passages for a query
    Retrieve(RetrieveCommand),

    /// Ask a question (routed to live data, documents or chat)
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Gridsage starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Retrieve(_) => "retrieve",
        Commands::Ask(_) => "ask",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Retrieve(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) if e.is_retryable() => {
            tracing::error!("Command failed (retryable): {}", e)
        }
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
