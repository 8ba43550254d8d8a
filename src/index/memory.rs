//! In-process index store with exact search
//!
//! Writes land in a pending buffer and only become searchable after
//! [`IndexStore::refresh`], the same visibility rule a remote store with
//! near-real-time refresh imposes. Useful for tests and small corpora.

use std::collections::BTreeMap;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::check_search_args;
use super::sort_hits;
use super::vector_problem;
use super::EnsureOutcome;
use super::IndexSpec;
use super::IndexStore;
use super::IndexedDocument;
use super::SearchHit;
use super::UpsertReport;
use crate::embeddings::EmbeddedChunk;
use crate::errors::Result;
use crate::errors::TableRagError;

#[derive(Debug)]
struct MemoryIndex {
    spec: IndexSpec,
    visible: BTreeMap<String, IndexedDocument>,
    pending: Vec<IndexedDocument>,
}

/// Index store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes waiting for a refresh
    pub async fn pending(&self, name: &str) -> Result<usize> {
        let indexes = self.indexes.read().await;
        let index = indexes
            .get(name)
            .ok_or_else(|| TableRagError::IndexNotFound(name.to_string()))?;
        Ok(index.pending.len())
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<EnsureOutcome> {
        spec.validate()?;
        let mut indexes = self.indexes.write().await;

        if let Some(existing) = indexes.get(&spec.name) {
            spec.check_compatible(existing.spec.dimension, existing.spec.metric)?;
            return Ok(EnsureOutcome::AlreadyExists);
        }

        indexes.insert(
            spec.name.clone(),
            MemoryIndex {
                spec: spec.clone(),
                visible: BTreeMap::new(),
                pending: Vec::new(),
            },
        );
        debug!("Created in-memory index '{}' (dim {})", spec.name, spec.dimension);
        Ok(EnsureOutcome::Created)
    }

    async fn delete_index(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.write().await.remove(name).is_some())
    }

    async fn upsert(&self, name: &str, documents: &[EmbeddedChunk]) -> Result<UpsertReport> {
        let mut indexes = self.indexes.write().await;
        let index = indexes
            .get_mut(name)
            .ok_or_else(|| TableRagError::IndexNotFound(name.to_string()))?;

        let mut report = UpsertReport::default();
        for document in documents {
            if let Some(reason) = vector_problem(&document.embedding, index.spec.dimension) {
                report.reject(&document.id, reason);
                continue;
            }
            index.pending.push(IndexedDocument::from(document));
            report.written += 1;
        }
        Ok(report)
    }

    async fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let indexes = self.indexes.read().await;
        let index = indexes
            .get(name)
            .ok_or_else(|| TableRagError::IndexNotFound(name.to_string()))?;
        check_search_args(query, k, index.spec.dimension)?;

        let metric = index.spec.metric;
        let mut hits: Vec<SearchHit> = index
            .visible
            .values()
            .map(|document| SearchHit {
                distance: metric.distance(query, &document.embedding),
                document: document.clone(),
            })
            .collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn refresh(&self, name: &str) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        let index = indexes
            .get_mut(name)
            .ok_or_else(|| TableRagError::IndexNotFound(name.to_string()))?;

        let flushed = index.pending.len();
        // Applied in write order so a later write of the same id wins
        for document in index.pending.drain(..) {
            index.visible.insert(document.id.clone(), document);
        }
        debug!("Refreshed index '{}': {} writes now visible", name, flushed);
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let indexes = self.indexes.read().await;
        let index = indexes
            .get(name)
            .ok_or_else(|| TableRagError::IndexNotFound(name.to_string()))?;
        Ok(index.visible.len())
    }
}
