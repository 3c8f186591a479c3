//! Error types for the governance ingestion engine

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by a `ChainRpc` transport
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Server asked us to slow down (HTTP 429 or equivalent JSON-RPC error)
    #[error("Rate limited by RPC endpoint (retry after {retry_after:?})")]
    RateLimited {
        /// Server-advised delay, if one was supplied
        retry_after: Option<Duration>,
    },

    /// Network or node failure
    #[error("RPC transport error: {0}")]
    Transport(String),

    /// Log payload could not be decoded into the expected event
    #[error("Failed to decode contract event: {0}")]
    Decode(String),

    /// The limiter's concurrency gate was shut down
    #[error("Rate limiter closed")]
    LimiterClosed,
}

impl RpcError {
    /// Check if this error is a server-side rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Errors that can occur while syncing governance data
#[derive(Debug, Error)]
pub enum SyncError {
    /// Blockchain RPC failure
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Persistence layer failure (read, insert or update)
    #[error("Store error: {0}")]
    Store(String),

    /// Orchestrator directory or reference data endpoint failure
    #[error("Directory error: {0}")]
    Directory(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Numeric conversion error (stake weight, block number, ...)
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// Check if this error came from the network (RPC or directory endpoint)
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Directory(_))
    }

    /// Check if this error came from the persistence layer
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
