//! Error types for collaborator calls.

use thiserror::Error;

/// Errors surfaced by external collaborators (authentication, telemetry,
/// analytics, session encryption).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Call exceeded the caller-supplied deadline.
    #[error("Deadline exceeded after {0}ms")]
    Timeout(u64),

    /// Collaborator answered with an error of its own.
    #[error("Collaborator error {code}: {message}")]
    Upstream { code: String, message: String },

    /// Collaborator has no data or capacity for the request.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Collaborator configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
