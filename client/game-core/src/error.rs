use std::time::Duration;
use thiserror::Error;

/// Errors raised synchronously by the round engine and the simulation games.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Zero-length sessions or malformed round data. Never recoverable by retrying.
    #[error("invalid game configuration: {0}")]
    InvalidConfiguration(String),

    /// A player move rejected by a simulation (negative amounts, spending more than available...)
    #[error("invalid move: {0}")]
    InvalidMove(String),
}

/// Failure of a single call against the remote REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} failed to reach the server: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned HTTP {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{operation} returned an invalid response: {reason}")]
    InvalidResponse {
        operation: &'static str,
        reason: String,
    },
}

impl ApiError {
    pub fn operation(&self) -> &'static str {
        match self {
            ApiError::Timeout { operation, .. }
            | ApiError::Transport { operation, .. }
            | ApiError::Status { operation, .. }
            | ApiError::InvalidResponse { operation, .. } => operation,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}
