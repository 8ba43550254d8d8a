//! Embedding generation service with dimension checks and batch processing

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use futures::stream;
use futures::stream::StreamExt;
use futures::stream::TryStreamExt;
use tracing::info;
use uuid::Uuid;

use super::client::EmbeddingClient;
use super::EmbeddedChunk;
use super::EmbeddingModel;
use crate::chunking::Chunk;
use crate::errors::Result;
use crate::errors::TableRagError;
use crate::timeouts::bounded;

/// Service for generating embeddings of a fixed dimension
pub struct EmbeddingService {
    model: Arc<dyn EmbeddingModel>,
    dimension: usize,
    timeout: Duration,
    parallel_tasks: usize,
}

impl EmbeddingService {
    /// Create a new embedding service backed by the configured HTTP model
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        let client = EmbeddingClient::from_config(config)?;
        Ok(Self::with_model(
            Arc::new(client),
            config.embedding_dimension(),
            config.embed_timeout(),
        )
        .with_parallelism(config.embeddings.parallel_tasks))
    }

    /// Create a service around any embedding model
    pub fn with_model(model: Arc<dyn EmbeddingModel>, dimension: usize, timeout: Duration) -> Self {
        Self {
            model,
            dimension,
            timeout,
            parallel_tasks: 1,
        }
    }

    /// Allow up to `parallel_tasks` embedding requests in flight during a batch
    #[must_use]
    pub fn with_parallelism(mut self, parallel_tasks: usize) -> Self {
        self.parallel_tasks = parallel_tasks.max(1);
        self
    }

    /// Embed one text, enforcing the configured dimension
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = bounded("embedding", self.timeout, self.model.embed(text)).await?;

        if embedding.len() != self.dimension {
            return Err(TableRagError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(TableRagError::EmbeddingError(format!(
                "model {} returned non-finite values",
                self.model.model_name()
            )));
        }

        Ok(embedding)
    }

    /// Embed every chunk, in order, each under a fresh id
    ///
    /// The first failure aborts the batch and nothing is returned, so callers
    /// never index a partial batch by accident.
    pub async fn embed_batch(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddedChunk>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let embedded: Vec<EmbeddedChunk> = stream::iter(chunks)
            .map(|chunk| async move {
                let embedding = self.embed(&chunk.text).await?;
                Ok::<_, TableRagError>(EmbeddedChunk {
                    id: Uuid::new_v4().to_string(),
                    text: chunk.text.clone(),
                    source_order: chunk.source_order,
                    embedding,
                })
            })
            .buffered(self.parallel_tasks)
            .try_collect()
            .await?;

        info!(
            "Embedded {} chunks with {} in {:.2?}",
            embedded.len(),
            self.model.model_name(),
            started.elapsed()
        );
        Ok(embedded)
    }

    /// Get the embedding dimension
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the model name
    #[must_use]
    pub fn model(&self) -> &str {
        self.model.model_name()
    }
}
