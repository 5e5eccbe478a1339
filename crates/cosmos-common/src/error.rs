//! COSMOS Common Error Types
//!
//! Centralized error handling for all COSMOS components

use std::fmt;

/// Main error type for COSMOS operations
#[derive(Debug)]
pub enum CosmosError {
    /// Connection or channel failure while talking to the Answer Service
    Transport(String),
    /// Explicit failure reported by the Answer Service
    Service(String),
    /// A mutation attempted while the conversation protocol forbids it
    /// (a pending message already exists, or a handle is already finalized)
    Concurrency(String),
    /// Invalid request shape or engine configuration
    Config(String),
    /// IO-related errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serde(serde_json::Error),
}

impl fmt::Display for CosmosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CosmosError::Transport(msg) => write!(f, "transport error: {}", msg),
            CosmosError::Service(msg) => write!(f, "service error: {}", msg),
            CosmosError::Concurrency(msg) => write!(f, "concurrency violation: {}", msg),
            CosmosError::Config(msg) => write!(f, "configuration error: {}", msg),
            CosmosError::Io(err) => write!(f, "IO error: {}", err),
            CosmosError::Serde(err) => write!(f, "serialization error: {}", err),
        }
    }
}

impl std::error::Error for CosmosError {}

/// Convenience result type for COSMOS operations
pub type Result<T> = std::result::Result<T, CosmosError>;

// Implement From traits for common error types
impl From<std::io::Error> for CosmosError {
    fn from(err: std::io::Error) -> Self {
        CosmosError::Io(err)
    }
}

impl From<serde_json::Error> for CosmosError {
    fn from(err: serde_json::Error) -> Self {
        CosmosError::Serde(err)
    }
}

impl From<anyhow::Error> for CosmosError {
    fn from(err: anyhow::Error) -> Self {
        CosmosError::Config(err.to_string())
    }
}

impl CosmosError {
    /// Whether this error is a submission-protocol violation rather than a
    /// transport/service failure. Callers use this to distinguish "retry
    /// later" from "a turn is already in flight".
    pub fn is_concurrency(&self) -> bool {
        matches!(self, CosmosError::Concurrency(_))
    }
}
