//! Error types for cassmetrics
//!
//! A namespace pattern that resolves to nothing is not an error: the query
//! layer returns an empty result for it. Everything that can actually go
//! wrong while talking to the managed server or the tree cache lives here.

use thiserror::Error;

/// Common result type for cassmetrics operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for cassmetrics
#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Connectivity errors
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timeout")]
    Timeout,

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Response errors
    #[error("parse error: {0}")]
    Parse(String),

    // Tree cache errors
    #[error("cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid cache snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a connection error
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Check if this is a retryable error
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ServiceUnavailable(_) | Self::ConnectionFailed(_)
        )
    }

    /// Check if this error came from the tree cache
    #[must_use]
    pub const fn is_cache(&self) -> bool {
        matches!(
            self,
            Self::CacheIo(_) | Self::Serialization(_) | Self::InvalidSnapshot(_)
        )
    }
}
