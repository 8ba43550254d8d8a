//! Complete RAG pipeline: Extract -> Chunk -> Embed -> Index -> Retrieve -> Generate

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::chunking::chunk_texts;
use crate::config::AppConfig;
use crate::embeddings::EmbeddedChunk;
use crate::embeddings::EmbeddingService;
use crate::errors::Result;
use crate::errors::TableRagError;
use crate::extract::extract;
use crate::extract::ExtractSource;
use crate::index::store_from_config;
use crate::index::EnsureOutcome;
use crate::index::IndexSpec;
use crate::index::IndexStore;
use crate::index::IndexWriteFailure;
use crate::index::UpsertReport;
use crate::llm::AnswerGenerator;
use crate::rag::Retriever;
use crate::timeouts::bounded;

/// Outcome of one indexing pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    pub index: String,
    pub created: bool,
    pub chunks: usize,
    pub written: usize,
    pub failed: Vec<IndexWriteFailure>,
}

impl IndexingReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    /// Fail with [`TableRagError::IndexWrite`] for the first rejected document
    pub fn ensure_complete(&self) -> Result<()> {
        match self.failed.first() {
            None => Ok(()),
            Some(failure) => Err(failure.clone().into()),
        }
    }
}

impl fmt::Display for IndexingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index '{}'{}: {} chunks, {} written, {} failed",
            self.index,
            if self.created { " (created)" } else { "" },
            self.chunks,
            self.written,
            self.failed.len()
        )
    }
}

/// A generated answer and the contexts it was grounded in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub contexts: Vec<String>,
}

/// Result of a full extract-to-answer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub report: IndexingReport,
    pub answer: RagAnswer,
}

/// Components for one pipeline run
pub struct RagPipeline {
    spec: IndexSpec,
    max_words: usize,
    top_k: usize,
    recreate: bool,
    index_timeout: Duration,
    embedding_service: Arc<EmbeddingService>,
    store: Arc<dyn IndexStore>,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagPipeline {
    /// Build every component from configuration
    ///
    /// # Errors
    /// - Invalid embedding or language model endpoints
    /// - Index database connection errors (pgvector backend)
    /// - Response cache database errors
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let embedding_service = EmbeddingService::new(config)?;
        let store = store_from_config(config).await?;
        let generator = AnswerGenerator::from_config(config).await?;

        Ok(Self::from_parts(config, embedding_service, store, generator))
    }

    /// Assemble a pipeline from existing components
    pub fn from_parts(
        config: &AppConfig,
        embedding_service: EmbeddingService,
        store: Arc<dyn IndexStore>,
        generator: AnswerGenerator,
    ) -> Self {
        let embedding_service = Arc::new(embedding_service);
        let retriever = Retriever::new(
            embedding_service.clone(),
            store.clone(),
            config.index_name(),
            config.index_timeout(),
        );

        Self {
            spec: IndexSpec::from_config(config),
            max_words: config.max_words(),
            top_k: config.top_k(),
            recreate: config.index.recreate,
            index_timeout: config.index_timeout(),
            embedding_service,
            store,
            retriever,
            generator,
        }
    }

    /// Chunk, embed and index `texts`
    ///
    /// Embedding failures abort before anything is written. Per-document write
    /// failures are reported in the returned [`IndexingReport`].
    pub async fn index_texts<S: AsRef<str>>(&self, texts: &[S]) -> Result<IndexingReport> {
        let started = Instant::now();

        debug!("Step 1: Chunking {} text units", texts.len());
        let chunks = chunk_texts(texts, self.max_words)?;
        info!("Chunked into {} segments", chunks.len());

        debug!("Step 2: Embedding chunks");
        let embedded = self.embedding_service.embed_batch(&chunks).await?;

        debug!("Step 3: Preparing index '{}'", self.spec.name);
        if self.recreate {
            let existed = bounded(
                "index delete",
                self.index_timeout,
                self.store.delete_index(&self.spec.name),
            )
            .await?;
            if existed {
                info!("Dropped existing index '{}' for recreation", self.spec.name);
            }
        }
        let outcome = bounded(
            "index creation",
            self.index_timeout,
            self.store.ensure_index(&self.spec),
        )
        .await?;

        debug!("Step 4: Writing {} documents", embedded.len());
        let upsert = self.write_documents(&embedded).await?;
        bounded(
            "index refresh",
            self.index_timeout,
            self.store.refresh(&self.spec.name),
        )
        .await?;

        let report = IndexingReport {
            index: self.spec.name.clone(),
            created: outcome == EnsureOutcome::Created,
            chunks: chunks.len(),
            written: upsert.written,
            failed: upsert.failed,
        };

        if report.is_complete() {
            info!("Documents embedded & indexed in {:.2?}: {}", started.elapsed(), report);
        } else {
            warn!(
                "Indexing finished with failures: {}; failed ids: {}",
                report,
                report.failed_ids().join(", ")
            );
        }
        Ok(report)
    }

    /// Upsert one document per call so the write timeout bounds each document
    ///
    /// An expired write is recorded as a failure for that document and the
    /// batch carries on. Other store errors abort.
    async fn write_documents(&self, documents: &[EmbeddedChunk]) -> Result<UpsertReport> {
        let mut report = UpsertReport::default();
        for document in documents {
            let written = bounded(
                "index write",
                self.index_timeout,
                self.store.upsert(&self.spec.name, std::slice::from_ref(document)),
            )
            .await;

            match written {
                Ok(single) => {
                    report.written += single.written;
                    report.failed.extend(single.failed);
                }
                Err(e @ TableRagError::TimeoutExceeded { .. }) => {
                    warn!("Write of document {} timed out: {}", document.id, e);
                    report.reject(&document.id, e.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Retrieve the nearest contexts for `query` and generate a grounded answer
    pub async fn ask(&self, query: &str) -> Result<RagAnswer> {
        self.ask_with_k(query, self.top_k).await
    }

    /// [`Self::ask`] with an explicit neighbour count
    pub async fn ask_with_k(&self, query: &str, k: usize) -> Result<RagAnswer> {
        if query.trim().is_empty() {
            return Err(TableRagError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }
        info!("Processing RAG query: {}", query);

        debug!("Step 1: Retrieving top {} contexts", k);
        let contexts = self.retriever.retrieve(query, k).await?;
        info!("Retrieved {} relevant contexts", contexts.len());

        debug!("Step 2: Generating answer");
        let answer = self.generator.generate(&contexts, query).await?;

        Ok(RagAnswer { answer, contexts })
    }

    /// Extract from `source`, index it, then answer `query` once
    pub async fn run(&self, source: &ExtractSource, query: &str) -> Result<RunOutcome> {
        let texts = extract(source).await?;
        let report = self.index_texts(&texts).await?;
        let answer = self.ask(query).await?;
        Ok(RunOutcome { report, answer })
    }

    /// Remove the configured index; returns whether it existed
    pub async fn drop_index(&self) -> Result<bool> {
        bounded(
            "index delete",
            self.index_timeout,
            self.store.delete_index(&self.spec.name),
        )
        .await
    }

    /// Number of searchable documents in the configured index
    pub async fn document_count(&self) -> Result<usize> {
        bounded(
            "index count",
            self.index_timeout,
            self.store.count(&self.spec.name),
        )
        .await
    }

    #[must_use]
    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    #[must_use]
    pub const fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    #[must_use]
    pub const fn index_spec(&self) -> &IndexSpec {
        &self.spec
    }
}
