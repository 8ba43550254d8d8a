//! RAG query handlers

use tracing::info;

use crate::cli::commands::SourceArgs;
use crate::cli::output::*;
use crate::rag::RagPipeline;
use crate::AppConfig;
use crate::Result;

/// Handle the full extract-to-answer run
pub async fn handle_run_command(config: &AppConfig, source: SourceArgs, query: &str) -> Result<()> {
    let source = source.into_source()?;
    let pipeline = RagPipeline::from_config(config).await?;

    let outcome = pipeline.run(&source, query).await?;
    if !outcome.report.is_complete() {
        print_indexing_report(&outcome.report);
    }
    print_answer(&outcome.answer, false);
    Ok(())
}

/// Handle a query against an existing index
pub async fn handle_ask_command(
    config: &AppConfig,
    query: &str,
    k: Option<usize>,
    show_context: bool,
) -> Result<()> {
    let pipeline = RagPipeline::from_config(config).await?;
    let k = k.unwrap_or_else(|| config.top_k());

    let answer = pipeline.ask_with_k(query, k).await?;
    if answer.contexts.is_empty() {
        info!("Index '{}' returned no contexts", config.index_name());
    }
    print_answer(&answer, show_context);
    Ok(())
}
