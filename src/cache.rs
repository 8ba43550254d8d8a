//! Durable response cache for generated answers
//!
//! Entries live in an embedded SQLite database keyed by the SHA-256 of the
//! exact prompt, so they survive restarts. There is no eviction or versioning:
//! changing the model or the prompt template does not invalidate old answers.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use sha2::Digest;
use sha2::Sha256;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::sqlite::SqliteSynchronous;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;

use crate::errors::Result;

/// Cache statistics for the current process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lowercase hex SHA-256 of the prompt bytes, without any normalisation
#[must_use]
pub fn cache_key(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}

/// Prompt to answer cache backed by SQLite
#[derive(Clone)]
pub struct ResponseCache {
    pool: SqlitePool,
    stats: Arc<RwLock<CacheStats>>,
}

impl ResponseCache {
    /// Open (or create) the cache database at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS response_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&pool)
        .await?;

        info!("Response cache opened at {}", path.display());
        Ok(Self {
            pool,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    /// Open the cache at the configured location
    pub async fn from_config(config: &crate::config::AppConfig) -> Result<Self> {
        Self::open(config.cache_path()).await
    }

    /// Stored answer for `prompt`, if any
    pub async fn get(&self, prompt: &str) -> Result<Option<String>> {
        let key = cache_key(prompt);
        let mut tx = self.pool.begin().await?;
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM response_cache WHERE key = ?1")
                .bind(&key)
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;

        let mut stats = self.stats.write().await;
        if value.is_some() {
            stats.hits += 1;
            debug!("Response cache hit for key {}", key);
        } else {
            stats.misses += 1;
            debug!("Response cache miss for key {}", key);
        }
        Ok(value)
    }

    /// Store `value` for `prompt`; a later write for the same prompt wins
    pub async fn put(&self, prompt: &str, value: &str) -> Result<()> {
        let key = cache_key(prompt);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            INSERT INTO response_cache (key, value, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                created_at = excluded.created_at
            ",
        )
        .bind(&key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!("Cached response for key {}", key);
        Ok(())
    }

    /// Return the cached answer for `prompt`, or compute, store and return it
    ///
    /// `compute` runs at most once per call and only on a miss. Two concurrent
    /// misses for the same prompt may both compute; the last write is kept.
    /// A failed computation stores nothing.
    pub async fn get_or_compute<F, Fut>(&self, prompt: &str, compute: F) -> Result<String>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(value) = self.get(prompt).await? {
            return Ok(value);
        }

        let value = compute(prompt.to_string()).await?;
        self.put(prompt, &value).await?;
        Ok(value)
    }

    /// Number of stored answers
    pub async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM response_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Hit and miss counters since this cache was opened
    pub async fn stats(&self) -> CacheStats {
        *self.stats.read().await
    }

    /// Close the underlying pool, flushing the WAL
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use tempfile::TempDir;

    use super::*;
    use crate::errors::TableRagError;

    #[test]
    fn test_cache_key_is_sha256_hex() {
        assert_eq!(
            cache_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(cache_key("A").len(), 64);
        assert_eq!(cache_key("A"), cache_key("A"));
    }

    #[test]
    fn test_cache_key_does_not_normalise() {
        assert_ne!(cache_key("A"), cache_key("A "));
        assert_ne!(cache_key("A"), cache_key("a"));
    }

    #[tokio::test]
    async fn test_get_or_compute_calls_compute_once() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(dir.path().join("responses.db")).await.unwrap();
        let calls = AtomicUsize::new(0);

        let compute = |prompt: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(format!("answer to {prompt}")) }
        };
        let first = cache.get_or_compute("What sells?", compute).await.unwrap();
        let second = cache
            .get_or_compute("What sells?", |_| async {
                Err(TableRagError::Custom("must not be called".to_string()))
            })
            .await
            .unwrap();

        assert_eq!(first, "answer to What sells?");
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().await, CacheStats { hits: 1, misses: 1 });
        assert!((cache.stats().await.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_trailing_space_is_a_different_entry() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(dir.path().join("responses.db")).await.unwrap();

        cache.put("A", "first").await.unwrap();
        assert_eq!(cache.get("A ").await.unwrap(), None);
        cache.put("A ", "second").await.unwrap();

        assert_eq!(cache.get("A").await.unwrap().as_deref(), Some("first"));
        assert_eq!(cache.get("A ").await.unwrap().as_deref(), Some("second"));
        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_compute_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(dir.path().join("responses.db")).await.unwrap();

        let result = cache
            .get_or_compute("prompt", |_| async {
                Err(TableRagError::GenerationFailed {
                    status: Some(500),
                    detail: "boom".to_string(),
                })
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::open(dir.path().join("responses.db")).await.unwrap();

        cache.put("p", "old").await.unwrap();
        cache.put("p", "new").await.unwrap();
        assert_eq!(cache.get("p").await.unwrap().as_deref(), Some("new"));
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("responses.db");

        let cache = ResponseCache::open(&path).await.unwrap();
        cache.put("prompt", "kept").await.unwrap();
        cache.close().await;

        let reopened = ResponseCache::open(&path).await.unwrap();
        assert_eq!(reopened.get("prompt").await.unwrap().as_deref(), Some("kept"));
    }
}
