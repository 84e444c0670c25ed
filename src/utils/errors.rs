// src/utils/errors.rs
//! Error types for the tracing engine
//!
//! None of these ever reach the instrumented operation. They are produced on
//! internal paths (sink, reader, config) and either logged and counted there
//! or returned to callers that explicitly asked for them (CLI, config load).

use thiserror::Error;

/// Errors raised by internal trace machinery
#[derive(Debug, Error)]
pub enum TraceError {
    /// Destination could not be created or written
    #[error("storage failed: {0}")]
    StorageFailed(String),

    /// A record could not be encoded or decoded
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Configuration could not be loaded or applied
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A correlation key stashed in a call context was not usable
    #[error("invalid correlation key: {0}")]
    InvalidKey(String),
}

impl From<config::ConfigError> for TraceError {
    fn from(e: config::ConfigError) -> Self {
        TraceError::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TraceError::StorageFailed("disk full".to_string());
        assert_eq!(err.to_string(), "storage failed: disk full");

        let err = TraceError::InvalidKey("zzz".to_string());
        assert!(err.to_string().contains("zzz"));
    }
}
