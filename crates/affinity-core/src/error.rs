//! Error types for Affinity Core

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types
#[derive(Error, Debug)]
pub enum Error {
    // Storage errors
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    // Lookup errors
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("No model snapshot has been published yet")]
    NotReady,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    // Model lifecycle errors
    #[error("Model refresh failed: {0}")]
    RefreshFailure(String),

    #[error("Invalid model state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a storage error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::DataUnavailable(msg.into())
    }

    /// Create an invalid-configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::ConfigurationInvalid(msg.into())
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DataUnavailable(_)
                | Error::NotReady
                | Error::RefreshFailure(_)
                | Error::Cache(_)
        )
    }

    /// Returns the error code for logs and API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::DataUnavailable(_) => "DATA_UNAVAILABLE",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::NotReady => "NOT_READY",
            Error::ConfigurationInvalid(_) => "INVALID_CONFIG",
            Error::RefreshFailure(_) => "REFRESH_FAILURE",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::Cache(_) => "CACHE",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::unavailable("db down").error_code(), "DATA_UNAVAILABLE");
        assert_eq!(Error::config("bad weights").error_code(), "INVALID_CONFIG");
        assert_eq!(
            Error::NotFound { kind: "item", id: 7 }.to_string(),
            "item not found: 7"
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::unavailable("timeout").is_recoverable());
        assert!(Error::RefreshFailure("boom".into()).is_recoverable());
        assert!(!Error::config("weights").is_recoverable());
        assert!(!Error::NotFound { kind: "item", id: 1 }.is_recoverable());
    }
}
