//! Vector index store
//!
//! The [`IndexStore`] trait is the contract the rest of the crate relies on:
//! - `ensure_index` is idempotent and refuses conflicting configuration
//! - `upsert` writes documents independently and reports failures per document
//! - `search` returns nearest-first hits, ties ordered by id
//! - `refresh` makes prior writes visible to `search`
//!
//! Two backends implement it: [`PgVectorStore`] (PostgreSQL + pgvector, HNSW)
//! and [`MemoryIndexStore`] (in-process, exact search, buffered writes).

pub mod memory;
pub mod postgres;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

pub use memory::MemoryIndexStore;
pub use postgres::PgVectorStore;

use crate::config::IndexBackend;
use crate::embeddings::EmbeddedChunk;
use crate::errors::Result;
use crate::errors::TableRagError;

/// Longest index name; prefixed table and HNSW identifiers must stay under
/// PostgreSQL's 63-byte limit
pub const MAX_INDEX_NAME_LEN: usize = 40;

/// Distance used for nearest-neighbour ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance
    #[default]
    L2,
    /// 1 - cosine similarity
    Cosine,
    /// Negative inner product
    InnerProduct,
}

impl DistanceMetric {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::Cosine => "cosine",
            Self::InnerProduct => "inner_product",
        }
    }

    /// Distance between two equal-length vectors; smaller is nearer
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        let pairs = a.iter().zip(b.iter()).map(|(x, y)| (f64::from(*x), f64::from(*y)));
        match self {
            Self::L2 => pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            Self::Cosine => {
                let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
                for (x, y) in pairs {
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
                }
            }
            Self::InnerProduct => -pairs.map(|(x, y)| x * y).sum::<f64>(),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = TableRagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "l2" => Ok(Self::L2),
            "cosine" => Ok(Self::Cosine),
            "inner_product" => Ok(Self::InnerProduct),
            other => Err(TableRagError::ConfigError(format!(
                "unknown distance metric '{other}'"
            ))),
        }
    }
}

/// HNSW build parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    pub m: u32,
    pub ef_construction: u32,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 64,
        }
    }
}

/// Typed index creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub hnsw: HnswParams,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: DistanceMetric::L2,
            hnsw: HnswParams::default(),
        }
    }

    #[must_use]
    pub const fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub const fn with_hnsw(mut self, hnsw: HnswParams) -> Self {
        self.hnsw = hnsw;
        self
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(config.index_name(), config.embedding_dimension())
            .with_metric(config.index.metric)
            .with_hnsw(HnswParams {
                m: config.index.hnsw_m,
                ef_construction: config.index.hnsw_ef_construction,
            })
    }

    /// Validate the request before it reaches a backend
    pub fn validate(&self) -> Result<()> {
        validate_index_name(&self.name)?;
        if self.dimension == 0 {
            return Err(TableRagError::InvalidArgument(
                "index dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fail with `ConfigurationConflict` if an existing index differs from `self`
    ///
    /// HNSW parameters only tune the graph build and are not compared.
    pub fn check_compatible(
        &self,
        existing_dimension: usize,
        existing_metric: DistanceMetric,
    ) -> Result<()> {
        if existing_dimension != self.dimension {
            return Err(TableRagError::ConfigurationConflict(format!(
                "index '{}' exists with dimension {}, requested {}; recreate the index to change it",
                self.name, existing_dimension, self.dimension
            )));
        }
        if existing_metric != self.metric {
            return Err(TableRagError::ConfigurationConflict(format!(
                "index '{}' exists with metric {}, requested {}; recreate the index to change it",
                self.name, existing_metric, self.metric
            )));
        }
        Ok(())
    }
}

/// Result of [`IndexStore::ensure_index`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

/// A document as persisted in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub text: String,
    pub source_order: i64,
    pub embedding: Vec<f32>,
}

impl From<&EmbeddedChunk> for IndexedDocument {
    fn from(chunk: &EmbeddedChunk) -> Self {
        Self {
            id: chunk.id.clone(),
            text: chunk.text.clone(),
            source_order: chunk.source_order as i64,
            embedding: chunk.embedding.clone(),
        }
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: IndexedDocument,
    pub distance: f64,
}

/// A document that could not be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWriteFailure {
    pub id: String,
    pub reason: String,
}

impl From<IndexWriteFailure> for TableRagError {
    fn from(failure: IndexWriteFailure) -> Self {
        Self::IndexWrite {
            id: failure.id,
            reason: failure.reason,
        }
    }
}

/// Outcome of an upsert batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub written: usize,
    pub failed: Vec<IndexWriteFailure>,
}

impl UpsertReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }

    /// Record a rejected document
    pub fn reject(&mut self, id: &str, reason: impl Into<String>) {
        self.failed.push(IndexWriteFailure {
            id: id.to_string(),
            reason: reason.into(),
        });
    }
}

/// Storage backend for embedded chunks
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Create the index if absent; no-op when it exists with the same configuration
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<EnsureOutcome>;

    /// Remove the index and all its documents; returns whether it existed
    async fn delete_index(&self, name: &str) -> Result<bool>;

    /// Insert or overwrite documents by id
    async fn upsert(&self, name: &str, documents: &[EmbeddedChunk]) -> Result<UpsertReport>;

    /// The `k` nearest documents to `query`, nearest first
    async fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Make all prior writes visible to `search`
    async fn refresh(&self, name: &str) -> Result<()>;

    /// Number of searchable documents
    async fn count(&self, name: &str) -> Result<usize>;
}

/// Open the configured backend
pub async fn store_from_config(config: &crate::config::AppConfig) -> Result<Arc<dyn IndexStore>> {
    Ok(match config.index.backend {
        IndexBackend::Pgvector => Arc::new(PgVectorStore::from_config(config).await?),
        IndexBackend::Memory => Arc::new(MemoryIndexStore::new()),
    })
}

/// Index names become SQL identifiers, so keep them to a safe alphabet
pub fn validate_index_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TableRagError::InvalidArgument(
            "index name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_INDEX_NAME_LEN {
        return Err(TableRagError::InvalidArgument(format!(
            "index name '{name}' is longer than {MAX_INDEX_NAME_LEN} bytes"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TableRagError::InvalidArgument(format!(
            "index name '{name}' may only contain ASCII letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

/// Reason a vector cannot be stored in an index of `dimension`, if any
pub fn vector_problem(embedding: &[f32], dimension: usize) -> Option<String> {
    if embedding.len() != dimension {
        return Some(
            TableRagError::DimensionMismatch {
                expected: dimension,
                actual: embedding.len(),
            }
            .to_string(),
        );
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Some("embedding contains non-finite values".to_string());
    }
    None
}

/// Shared argument checks for `search`
pub(crate) fn check_search_args(query: &[f32], k: usize, dimension: usize) -> Result<()> {
    if k == 0 {
        return Err(TableRagError::InvalidArgument(
            "k must be at least 1".to_string(),
        ));
    }
    if query.len() != dimension {
        return Err(TableRagError::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }
    Ok(())
}

/// Order hits nearest-first, ties by id
pub(crate) fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
}
