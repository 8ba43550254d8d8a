//! Nearest-neighbour retrieval over the index store

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::index::IndexStore;
use crate::index::SearchHit;
use crate::timeouts::bounded;

/// Retriever for semantic search
pub struct Retriever {
    embedding_service: Arc<EmbeddingService>,
    store: Arc<dyn IndexStore>,
    index_name: String,
    timeout: Duration,
}

impl Retriever {
    /// Create a new retriever over one named index
    pub fn new(
        embedding_service: Arc<EmbeddingService>,
        store: Arc<dyn IndexStore>,
        index_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            embedding_service,
            store,
            index_name: index_name.into(),
            timeout,
        }
    }

    /// The `k` nearest hits to `query`, nearest first
    ///
    /// Returns fewer than `k` hits when the index holds fewer documents.
    pub async fn retrieve_hits(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        debug!("Performing semantic search: {}", query);

        let query_embedding = self.embedding_service.embed(query).await?;
        let hits = bounded(
            "index search",
            self.timeout,
            self.store.search(&self.index_name, &query_embedding, k),
        )
        .await?;

        debug!("Retrieved {} of {} requested documents", hits.len(), k);
        Ok(hits)
    }

    /// Text of the `k` nearest documents to `query`, nearest first
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve_hits(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.document.text)
            .collect())
    }

    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}
