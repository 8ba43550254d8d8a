//! Unit tests for error handling
//!
//! Tests error types, conversions, classification and message formatting.

#[cfg(test)]
mod tests {
    use std::io;

    use crate::errors::TableRagError;

    // ====== Error Type Tests ======

    #[test]
    fn test_custom_error() {
        let error = TableRagError::Custom("Test error message".to_string());
        assert_eq!(format!("{error}"), "Test error message");
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let error = TableRagError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            error.to_string(),
            "Dimension mismatch: expected 384, got 768"
        );
    }

    #[test]
    fn test_generation_failed_with_and_without_status() {
        let with_status = TableRagError::GenerationFailed {
            status: Some(503),
            detail: "model loading".to_string(),
        };
        assert_eq!(
            with_status.to_string(),
            "Generation failed (status 503): model loading"
        );

        let without_status = TableRagError::GenerationFailed {
            status: None,
            detail: "connection reset".to_string(),
        };
        assert_eq!(
            without_status.to_string(),
            "Generation failed: connection reset"
        );
    }

    #[test]
    fn test_timeout_message() {
        let error = TableRagError::TimeoutExceeded {
            operation: "embedding".to_string(),
            limit_ms: 1500,
        };
        assert_eq!(error.to_string(), "embedding exceeded its timeout of 1500ms");
    }

    #[test]
    fn test_index_write_message() {
        let error = TableRagError::IndexWrite {
            id: "abc".to_string(),
            reason: "bad vector".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("abc"));
        assert!(display.contains("bad vector"));
    }

    // ====== Classification Tests ======

    #[test]
    fn test_fatal_errors() {
        assert!(TableRagError::Extraction("missing column".to_string()).is_fatal());
        assert!(TableRagError::ConfigurationConflict("dim".to_string()).is_fatal());
        assert!(TableRagError::ConfigError("bad".to_string()).is_fatal());
        assert!(!TableRagError::ModelUnavailable("down".to_string()).is_fatal());
        assert!(!TableRagError::IndexWrite {
            id: "a".to_string(),
            reason: "r".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(TableRagError::TimeoutExceeded {
            operation: "search".to_string(),
            limit_ms: 10
        }
        .is_retryable());
        assert!(TableRagError::ModelUnavailable("down".to_string()).is_retryable());
        assert!(!TableRagError::GenerationFailed {
            status: Some(500),
            detail: String::new()
        }
        .is_retryable());
        assert!(!TableRagError::Extraction("x".to_string()).is_retryable());
    }

    // ====== Conversion Tests ======

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: TableRagError = io_error.into();
        assert!(matches!(error, TableRagError::Io(_)));
        assert!(error.to_string().contains("File not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let error: TableRagError = json_error.into();
        assert!(matches!(error, TableRagError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("key = ").unwrap_err();
        let error: TableRagError = toml_error.into();
        assert!(matches!(error, TableRagError::TomlParsing(_)));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let error: TableRagError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, TableRagError::Database(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TableRagError>();
    }
}
