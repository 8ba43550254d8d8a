//! PostgreSQL + pgvector index store
//!
//! Each index is a table `tablerag_idx_<name>` with an HNSW index over its
//! `embedding vector(N)` column. The `tablerag_indexes` catalogue records the
//! dimension and metric each index was created with so `ensure_index` can
//! detect conflicting requests.

use ::pgvector::Vector;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::check_search_args;
use super::sort_hits;
use super::validate_index_name;
use super::vector_problem;
use super::DistanceMetric;
use super::EnsureOutcome;
use super::IndexSpec;
use super::IndexStore;
use super::IndexedDocument;
use super::SearchHit;
use super::UpsertReport;
use crate::embeddings::EmbeddedChunk;
use crate::errors::Result;
use crate::errors::TableRagError;

const CATALOGUE_TABLE: &str = "tablerag_indexes";
const TABLE_PREFIX: &str = "tablerag_idx_";
const EF_SEARCH_DEFAULT: usize = 40;
const EF_SEARCH_MAX: usize = 1000;

/// Index store backed by pgvector
#[derive(Debug, Clone)]
pub struct PgVectorStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CatalogueRow {
    dimension: i32,
    metric: String,
}

#[derive(sqlx::FromRow)]
struct HitRow {
    id: String,
    text: String,
    source_order: i64,
    embedding: Vector,
    distance: f64,
}

impl PgVectorStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a store from configuration
    pub async fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.index.max_connections)
            .min_connections(config.index.min_connections)
            .acquire_timeout(config.index_timeout())
            .connect(&config.index.database_url)
            .await?;

        info!(
            "Index database pool configured: max_connections={}, min_connections={}",
            config.index.max_connections, config.index.min_connections
        );

        let store = Self::new(pool);
        store.init_catalogue().await?;
        Ok(store)
    }

    /// Get a reference to the database pool for raw queries
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the pgvector extension and the index catalogue
    pub async fn init_catalogue(&self) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {CATALOGUE_TABLE} (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                metric TEXT NOT NULL,
                hnsw_m INTEGER NOT NULL,
                hnsw_ef_construction INTEGER NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn catalogue_entry(&self, name: &str) -> Result<Option<(usize, DistanceMetric)>> {
        let row: Option<CatalogueRow> = sqlx::query_as(&format!(
            "SELECT dimension, metric FROM {CATALOGUE_TABLE} WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Ok((r.dimension as usize, r.metric.parse::<DistanceMetric>()?)))
            .transpose()
    }

    async fn require_entry(&self, name: &str) -> Result<(usize, DistanceMetric)> {
        validate_index_name(name)?;
        self.catalogue_entry(name)
            .await?
            .ok_or_else(|| TableRagError::IndexNotFound(name.to_string()))
    }
}

/// Quoted table identifier for an index; `name` must already be validated
fn table_ident(name: &str) -> String {
    format!("\"{TABLE_PREFIX}{name}\"")
}

fn hnsw_index_ident(name: &str) -> String {
    format!("\"{TABLE_PREFIX}{name}_hnsw\"")
}

const fn operator_class(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::L2 => "vector_l2_ops",
        DistanceMetric::Cosine => "vector_cosine_ops",
        DistanceMetric::InnerProduct => "vector_ip_ops",
    }
}

const fn distance_operator(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::L2 => "<->",
        DistanceMetric::Cosine => "<=>",
        DistanceMetric::InnerProduct => "<#>",
    }
}

/// Transaction-local setting that lets a search return `k` rows
///
/// An HNSW scan yields at most `hnsw.ef_search` candidates. Up to pgvector's
/// ceiling the candidate list is widened to `k`; past it the index scan is
/// disabled and the search is exact.
fn scan_setting(k: usize) -> String {
    if k <= EF_SEARCH_MAX {
        format!("SET LOCAL hnsw.ef_search = {}", k.max(EF_SEARCH_DEFAULT))
    } else {
        "SET LOCAL enable_indexscan = off".to_string()
    }
}

#[async_trait]
impl IndexStore for PgVectorStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<EnsureOutcome> {
        spec.validate()?;

        let mut tx = self.pool.begin().await?;

        let existing: Option<CatalogueRow> = sqlx::query_as(&format!(
            "SELECT dimension, metric FROM {CATALOGUE_TABLE} WHERE name = $1"
        ))
        .bind(&spec.name)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            spec.check_compatible(row.dimension as usize, row.metric.parse::<DistanceMetric>()?)?;
            tx.commit().await?;
            return Ok(EnsureOutcome::AlreadyExists);
        }

        let table = table_ident(&spec.name);
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                source_order BIGINT NOT NULL,
                embedding VECTOR({dimension}) NOT NULL,
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            ",
            dimension = spec.dimension
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {table} USING hnsw (embedding {}) WITH (m = {}, ef_construction = {})",
            hnsw_index_ident(&spec.name),
            operator_class(spec.metric),
            spec.hnsw.m,
            spec.hnsw.ef_construction
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            r"
            INSERT INTO {CATALOGUE_TABLE} (name, dimension, metric, hnsw_m, hnsw_ef_construction)
            VALUES ($1, $2, $3, $4, $5)
            "
        ))
        .bind(&spec.name)
        .bind(spec.dimension as i32)
        .bind(spec.metric.as_str())
        .bind(spec.hnsw.m as i32)
        .bind(spec.hnsw.ef_construction as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Created index '{}' (dim {}, metric {}, hnsw m={} ef_construction={})",
            spec.name, spec.dimension, spec.metric, spec.hnsw.m, spec.hnsw.ef_construction
        );
        Ok(EnsureOutcome::Created)
    }

    async fn delete_index(&self, name: &str) -> Result<bool> {
        validate_index_name(name)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", table_ident(name)))
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query(&format!("DELETE FROM {CATALOGUE_TABLE} WHERE name = $1"))
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        if removed > 0 {
            info!("Deleted index '{}'", name);
        }
        Ok(removed > 0)
    }

    async fn upsert(&self, name: &str, documents: &[EmbeddedChunk]) -> Result<UpsertReport> {
        let (dimension, _) = self.require_entry(name).await?;
        let statement = format!(
            r"
            INSERT INTO {} (id, text, source_order, embedding)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                text = EXCLUDED.text,
                source_order = EXCLUDED.source_order,
                embedding = EXCLUDED.embedding,
                updated_at = NOW()
            ",
            table_ident(name)
        );

        let mut report = UpsertReport::default();
        for document in documents {
            if let Some(reason) = vector_problem(&document.embedding, dimension) {
                report.reject(&document.id, reason);
                continue;
            }

            let result = sqlx::query(&statement)
                .bind(&document.id)
                .bind(&document.text)
                .bind(document.source_order as i64)
                .bind(Vector::from(document.embedding.clone()))
                .execute(&self.pool)
                .await;

            match result {
                Ok(_) => report.written += 1,
                Err(e) => {
                    warn!("Failed to write document {}: {}", document.id, e);
                    report.reject(&document.id, e.to_string());
                }
            }
        }

        debug!(
            "Upserted {} documents into '{}' ({} failed)",
            report.written,
            name,
            report.failed.len()
        );
        Ok(report)
    }

    async fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let (dimension, metric) = self.require_entry(name).await?;
        check_search_args(query, k, dimension)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(&scan_setting(k)).execute(&mut *tx).await?;

        // ORDER BY must be the bare distance expression for the HNSW index to be used
        let rows: Vec<HitRow> = sqlx::query_as(&format!(
            r"
            SELECT id, text, source_order, embedding, (embedding {op} $1)::float8 AS distance
            FROM {table}
            ORDER BY embedding {op} $1
            LIMIT $2
            ",
            op = distance_operator(metric),
            table = table_ident(name)
        ))
        .bind(Vector::from(query.to_vec()))
        .bind(k as i64)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut hits: Vec<SearchHit> = rows
            .into_iter()
            .map(|row| SearchHit {
                document: IndexedDocument {
                    id: row.id,
                    text: row.text,
                    source_order: row.source_order,
                    embedding: row.embedding.to_vec(),
                },
                distance: row.distance,
            })
            .collect();
        sort_hits(&mut hits);
        Ok(hits)
    }

    /// Committed rows are visible on return from `upsert`; refreshing updates
    /// planner statistics so searches over a freshly loaded table stay on the
    /// HNSW index.
    async fn refresh(&self, name: &str) -> Result<()> {
        self.require_entry(name).await?;
        sqlx::query(&format!("ANALYZE {}", table_ident(name)))
            .execute(&self.pool)
            .await?;
        debug!("Refreshed index '{}'", name);
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<usize> {
        self.require_entry(name).await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table_ident(name)))
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ident_is_quoted_and_prefixed() {
        assert_eq!(table_ident("rag-lmstudio-index"), "\"tablerag_idx_rag-lmstudio-index\"");
        assert_eq!(hnsw_index_ident("idx"), "\"tablerag_idx_idx_hnsw\"");
    }

    #[test]
    fn test_metric_sql_mapping() {
        assert_eq!(distance_operator(DistanceMetric::L2), "<->");
        assert_eq!(operator_class(DistanceMetric::L2), "vector_l2_ops");
        assert_eq!(distance_operator(DistanceMetric::Cosine), "<=>");
        assert_eq!(operator_class(DistanceMetric::InnerProduct), "vector_ip_ops");
    }

    #[test]
    fn test_scan_setting_covers_k() {
        assert_eq!(scan_setting(3), "SET LOCAL hnsw.ef_search = 40");
        assert_eq!(scan_setting(41), "SET LOCAL hnsw.ef_search = 41");
        assert_eq!(scan_setting(1000), "SET LOCAL hnsw.ef_search = 1000");
        assert_eq!(scan_setting(1001), "SET LOCAL enable_indexscan = off");
    }
}
