//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::errors::Result;
use crate::errors::TableRagError;
use crate::extract::ExtractSource;

#[derive(Parser, Debug)]
#[command(name = "tablerag")]
#[command(about = "Retrieval-augmented answers over text columns of CSV files and SQLite tables")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose debug logging (default: level from the config file)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract, chunk, embed and index a source, then answer one query
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// Question to answer once indexing completes
        #[arg(short, long)]
        query: String,
    },
    /// Extract, chunk, embed and index a source without answering
    Index {
        #[command(flatten)]
        source: SourceArgs,
        /// Exit with an error if any document fails to write
        #[arg(long)]
        strict: bool,
    },
    /// Answer a question against an existing index
    Ask {
        /// Question to answer
        query: String,
        /// Number of contexts to retrieve (default: retrieval.top_k)
        #[arg(short)]
        k: Option<usize>,
        /// Print the retrieved contexts after the answer
        #[arg(long)]
        show_context: bool,
    },
    /// Delete the configured index and all its documents
    DropIndex {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Show the number of cached answers
    CacheStats,
    /// Show current configuration
    Config,
}

/// Where to extract text from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// CSV file with a header row
    #[arg(long, conflicts_with_all = ["sqlite", "table"])]
    pub csv: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, requires = "table")]
    pub sqlite: Option<PathBuf>,

    /// Table to read from the SQLite database
    #[arg(long)]
    pub table: Option<String>,

    /// Column holding the text to index
    #[arg(long)]
    pub column: String,
}

impl SourceArgs {
    pub fn into_source(self) -> Result<ExtractSource> {
        match (self.csv, self.sqlite, self.table) {
            (Some(path), None, None) => Ok(ExtractSource::Csv {
                path,
                column: self.column,
            }),
            (None, Some(path), Some(table)) => Ok(ExtractSource::Sqlite {
                path,
                table,
                column: self.column,
            }),
            _ => Err(TableRagError::InvalidArgument(
                "specify either --csv PATH or --sqlite PATH --table TABLE".to_string(),
            )),
        }
    }
}
