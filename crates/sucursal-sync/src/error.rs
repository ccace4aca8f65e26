//! # Sync Error Types
//!
//! Error handling for the replication layer.
//!
//! Transport failures are deliberately NOT errors: the append-log
//! methods return `Option`/`None` on network trouble and the
//! orchestrator treats that as "offline, queue and move on". The
//! variants here cover the failures that DO abort an operation:
//! bad configuration, local storage trouble, serialization bugs and
//! refused (invalid) change payloads.

use sucursal_core::ValidationError;
use sucursal_db::DbError;
use thiserror::Error;

/// Errors raised by the sync layer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Offline queue file could not be read or written.
    #[error("Queue I/O error: {0}")]
    Queue(#[from] std::io::Error),

    /// Change payload failed validation and was refused.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl SyncError {
    /// Returns true if this is a configuration error (the caller should
    /// surface it to the operator rather than retry).
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::Config(_))
    }
}

/// Convenience type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_detection() {
        let err = SyncError::Config("missing auth token".to_string());
        assert!(err.is_config_error());
        assert!(err.to_string().contains("missing auth token"));

        let err: SyncError = serde_json::from_str::<i64>("not json").unwrap_err().into();
        assert!(!err.is_config_error());
    }
}
