//! Error types for rollout collection

use thiserror::Error;

/// Core error type for rollout operations
#[derive(Error, Debug)]
pub enum RolloutError {
    /// Invalid configuration, detected at construction or dispatch time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Invalid action for the action space
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No type registered under the requested name
    #[error("Unknown {kind} type: {name}")]
    UnknownType { kind: &'static str, name: String },

    /// Statistics requested before any episode completed
    #[error("No completed episodes recorded yet")]
    NoCompletedEpisodes,

    /// Extension point invoked without a concrete implementation
    #[error("{0} is not implemented for this executor")]
    NotImplemented(&'static str),

    /// A worker task is gone or dropped its reply
    #[error("Worker {0} is unavailable")]
    WorkerUnavailable(String),

    /// Compression or binary encoding error
    #[error("Compression error: {0}")]
    Compression(#[from] bincode::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for rollout operations
pub type Result<T> = std::result::Result<T, RolloutError>;
