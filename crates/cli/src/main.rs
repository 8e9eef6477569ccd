//! SecureRAG CLI
//!
//! Builds the permission-tagged vector index and answers questions on behalf
//! of a role, returning only what that role is allowed to see.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, IndexCommand, ModelsCommand, RetrieveCommand, StatsCommand};
use securerag_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// SecureRAG - role-aware retrieval over internal documents
#[derive(Parser, Debug)]
#[command(name = "securerag")]
#[command(about = "Role-aware retrieval over internal documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SECURERAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: <workspace>/.securerag/config.yaml)
    #[arg(short, long, global = true, env = "SECURERAG_CONFIG")]
    config: Option<PathBuf>,

    /// Index directory; relative paths resolve against the workspace
    #[arg(long, global = true, env = "SECURERAG_INDEX_PATH")]
    index: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the vector index from a corpus file
    Index(IndexCommand),

    /// Show the passages visible to a role
    Retrieve(RetrieveCommand),

    /// Ask a question as a given role
    Ask(AskCommand),

    /// Show the index manifest
    Stats(StatsCommand),

    /// List Gemini models available to the API key
    Models(ModelsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Flags win over the environment when locating the workspace and config file
    let workspace = cli.workspace.clone();
    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match key {
        "SECURERAG_WORKSPACE" => workspace
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        "SECURERAG_CONFIG" => config_file
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        _ => std::env::var(key).ok(),
    })
    .context("Failed to load configuration")?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.index,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)
        .context("Failed to initialize logging")?;

    config.validate().context("Invalid configuration")?;

    tracing::info!("SecureRAG CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Index: {:?}", config.index_path());

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Retrieve(_) => "retrieve",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Models(_) => "models",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Retrieve(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Models(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("securerag {} failed", command_name))
}
