use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tablerag::cli::handle_ask_command;
use tablerag::cli::handle_cache_stats_command;
use tablerag::cli::handle_config_command;
use tablerag::cli::handle_drop_index_command;
use tablerag::cli::handle_index_command;
use tablerag::cli::handle_run_command;
use tablerag::cli::Cli;
use tablerag::cli::Commands;
use tablerag::config::AppConfig;
use tracing::error;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load configuration")?,
    };

    // Initialize logging; the guard flushes the log file on exit
    let level = cli.verbose.then_some("debug");
    let _guard = tablerag::logging::init_logging_with_config(&config.logging, level)?;
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Run { source, query } => handle_run_command(&config, source, &query).await?,
        Commands::Index { source, strict } => {
            handle_index_command(&config, source, strict).await?;
        }
        Commands::Ask {
            query,
            k,
            show_context,
        } => handle_ask_command(&config, &query, k, show_context).await?,
        Commands::DropIndex { force } => handle_drop_index_command(&config, force).await?,
        Commands::CacheStats => handle_cache_stats_command(&config).await?,
        Commands::Config => handle_config_command(&config).await?,
    }

    Ok(())
}
