//! Error types for policy rotation

use thiserror::Error;

/// Policy operation result type
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Policy rotation errors
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Identity or object storage call failed
    #[error("{operation} failed: {message}")]
    Remote {
        operation: &'static str,
        message: String,
    },

    /// Policy document text does not have the expected shape
    #[error("Failed to decode policy document: {0}")]
    Decode(String),

    /// Policy document violates a mutation precondition
    #[error("Malformed policy document: {0}")]
    MalformedDocument(String),

    /// Policy has no stored versions
    #[error("No policy versions found: {0}")]
    NotFound(String),

    /// Baseline document missing or invalid
    #[error("Failed to fetch baseline document: {0}")]
    Fetch(String),

    /// Publishing would exceed the stored version limit
    #[error("Policy {policy_arn} would exceed {max} stored versions ({count} present)")]
    VersionQuota {
        policy_arn: String,
        count: usize,
        max: usize,
    },

    /// Missing or invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PolicyError {
    /// Build a remote error for the named service operation
    pub fn remote(operation: &'static str, message: impl Into<String>) -> Self {
        PolicyError::Remote {
            operation,
            message: message.into(),
        }
    }

    /// Whether the error came from a remote service call
    pub fn is_remote(&self) -> bool {
        matches!(self, PolicyError::Remote { .. })
    }
}
