//! WolfFiles Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for WolfFiles operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfFiles error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Client input errors
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String, input: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    // Storage backend errors
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage backend did not answer within {0:?}")]
    BackendTimeout(Duration),

    // Content generation errors
    #[error("Content generation is not configured")]
    GenerationDisabled,

    #[error("Content generation failed: {0}")]
    Generation(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an `InvalidQuery` error for the offending input value
    pub fn invalid_query(reason: impl Into<String>, input: impl Into<String>) -> Self {
        Error::InvalidQuery {
            reason: reason.into(),
            input: input.into(),
        }
    }

    /// Check if this error was caused by the caller and can be fixed by them
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidQuery { .. } | Error::InvalidRequest(_) | Error::FileNotFound(_)
        )
    }

    /// Check if this error came from the storage backend
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Error::Backend(_) | Error::BackendTimeout(_))
    }
}

impl From<s3::error::S3Error> for Error {
    fn from(e: s3::error::S3Error) -> Self {
        Error::Backend(e.to_string())
    }
}
