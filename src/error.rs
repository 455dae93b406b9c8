//! Error types for the Metis governance engine
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for propagation at the boundaries.
//!
//! Gated skips (observation window, abuse freeze, transparency budget) are
//! deliberately NOT errors: a skipped cycle returns `Ok(None)` with a
//! logged reason.

use thiserror::Error;

/// Main error type for Metis operations
#[derive(Error, Debug)]
pub enum MetisError {
    /// Adaptation record not found (rollback target missing)
    #[error("Adaptation not found: {0}")]
    AdaptationNotFound(String),

    /// Proposal not found (consent resolution against unknown id)
    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    /// A parameter value failed per-field validation
    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidParameterValue {
        parameter: &'static str,
        reason: String,
    },

    /// Persistence collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid operation (e.g., rolling back an already-reverted change)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Metis operations
pub type Result<T> = std::result::Result<T, MetisError>;

/// Convert anyhow::Error to MetisError
impl From<anyhow::Error> for MetisError {
    fn from(err: anyhow::Error) -> Self {
        MetisError::Other(err.to_string())
    }
}
