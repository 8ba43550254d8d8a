//! Deadlines for collaborator calls
//!
//! Every network-bound call the pipeline makes (embedding, index, generation)
//! runs under an explicit limit and surfaces expiry as `TimeoutExceeded`.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::Result;
use crate::errors::TableRagError;

/// Run `future` with `limit`, mapping expiry to [`TableRagError::TimeoutExceeded`]
pub async fn bounded<T, F>(operation: &str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} timed out after {:?}", operation, limit);
            Err(TableRagError::TimeoutExceeded {
                operation: operation.to_string(),
                limit_ms: limit.as_millis(),
            })
        }
    }
}
