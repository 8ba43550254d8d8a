//! Embeddings generation module
//!
//! This module turns chunk text into fixed-dimension vectors:
//! - [`EmbeddingModel`] is the collaborator seam (HTTP model, or a test double)
//! - [`EmbeddingClient`] talks to Ollama or OpenAI-compatible endpoints
//! - [`EmbeddingService`] enforces dimension, timeout and batch semantics
//!
//! # Examples
//!
//! ```rust,no_run
//! use tablerag::config::AppConfig;
//! use tablerag::embeddings::EmbeddingService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = EmbeddingService::new(&config)?;
//!
//!     let embedding = service.embed("The red shoe sells well").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod generator;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use generator::EmbeddingService;

use crate::errors::Result;

/// Default dimension of the MiniLM family of sentence embedders
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// A chunk paired with its embedding, ready to be indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Fresh UUID assigned at embedding time
    pub id: String,
    pub text: String,
    pub source_order: usize,
    pub embedding: Vec<f32>,
}

/// Text to vector function provided by an external model
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}
