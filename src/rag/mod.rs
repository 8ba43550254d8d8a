//! RAG (Retrieval-Augmented Generation) module
//!
//! This module wires the pipeline stages together:
//! - Semantic retrieval over the index store
//! - The grounding prompt template
//! - The end-to-end pipeline (extract, chunk, embed, index, retrieve, generate)
//!
//! # Examples
//!
//! ```rust,no_run
//! use tablerag::config::AppConfig;
//! use tablerag::extract::ExtractSource;
//! use tablerag::rag::RagPipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let pipeline = RagPipeline::from_config(&config).await?;
//!
//!     let source = ExtractSource::Csv {
//!         path: "data/products.csv".into(),
//!         column: "description".to_string(),
//!     };
//!     let outcome = pipeline.run(&source, "Which products sell best?").await?;
//!     println!("Answer: {}", outcome.answer.answer);
//!     println!("Indexed: {}", outcome.report);
//!
//!     Ok(())
//! }
//! ```

pub mod pipeline;
pub mod prompts;
pub mod retriever;

pub use pipeline::IndexingReport;
pub use pipeline::RagAnswer;
pub use pipeline::RagPipeline;
pub use pipeline::RunOutcome;
pub use retriever::Retriever;
