use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableRagError {
    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Index write failed for document {id}: {reason}")]
    IndexWrite { id: String, reason: String },

    #[error("Generation failed{}: {detail}", status_suffix(.status))]
    GenerationFailed { status: Option<u16>, detail: String },

    #[error("{operation} exceeded its timeout of {limit_ms}ms")]
    TimeoutExceeded { operation: String, limit_ms: u128 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl TableRagError {
    /// Errors that abort the whole run: nothing useful can follow them.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Extraction(_)
                | Self::ConfigurationConflict(_)
                | Self::ConfigError(_)
                | Self::InvalidArgument(_)
        )
    }

    /// Errors after which repeating the same call is safe.
    ///
    /// Index writes are keyed by document id and cache writes by prompt hash,
    /// so a retried call never duplicates state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TimeoutExceeded { .. } | Self::ModelUnavailable(_))
    }
}

impl From<config::ConfigError> for TableRagError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<csv::Error> for TableRagError {
    fn from(err: csv::Error) -> Self {
        Self::Extraction(err.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (status {code})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, TableRagError>;
