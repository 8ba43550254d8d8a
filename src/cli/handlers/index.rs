//! Index management handlers

use std::io::stdin;

use crate::cli::commands::SourceArgs;
use crate::cli::output::*;
use crate::extract::extract;
use crate::index::store_from_config;
use crate::rag::RagPipeline;
use crate::timeouts::bounded;
use crate::AppConfig;
use crate::Result;

/// Handle extract-and-index without answering
///
/// With `strict`, any per-document write failure turns into an error exit
/// after the report is printed.
pub async fn handle_index_command(
    config: &AppConfig,
    source: SourceArgs,
    strict: bool,
) -> Result<()> {
    let source = source.into_source()?;
    let texts = extract(&source).await?;

    let pipeline = RagPipeline::from_config(config).await?;
    let report = pipeline.index_texts(&texts).await?;
    print_indexing_report(&report);
    if strict {
        report.ensure_complete()?;
    }
    Ok(())
}

/// Handle index removal
pub async fn handle_drop_index_command(config: &AppConfig, force: bool) -> Result<()> {
    let name = config.index_name();
    if !force {
        print_warning(&format!(
            "This will delete index '{name}' and every document in it!"
        ));
        print_prompt("Are you sure you want to continue? (y/N) ");

        let mut input = String::new();
        stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            print_info("Operation cancelled.");
            return Ok(());
        }
    }

    let store = store_from_config(config).await?;
    if bounded("index delete", config.index_timeout(), store.delete_index(name)).await? {
        print_success(&format!("Deleted index '{name}'"));
    } else {
        print_info(&format!("Index '{name}' does not exist"));
    }
    Ok(())
}
