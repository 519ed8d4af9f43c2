//! Error types for the monitoring core

use thiserror::Error;

/// Result type for monitoring operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors raised by the monitoring core
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The domain data source could not answer
    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    /// An aggregate could not be computed
    #[error("Computation failed: {0}")]
    Computation(String),

    /// Prometheus registry or encoder failure
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No monitor is registered for the requested model
    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

impl MonitorError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a computation error
    pub fn computation<S: Into<String>>(msg: S) -> Self {
        Self::Computation(msg.into())
    }
}

/// Errors raised at the domain data source boundary
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Backing store is unreachable
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// Reading the backing store failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Stored data could not be decoded
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
