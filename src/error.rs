//! Error types for agent-tools.

use thiserror::Error;

/// Main error type for agent-tools operations.
///
/// Command execution itself never produces one of these: timeouts and
/// launch failures are reported inside [`crate::CommandResult`]. These
/// errors cover invalid requests, tool dispatch and the server.
#[derive(Error, Debug)]
pub enum ToolError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command string was empty or whitespace.
    #[error("command cannot be empty")]
    EmptyCommand,

    /// Timeout must be a positive number of seconds.
    #[error("invalid timeout: {0}s (must be positive)")]
    InvalidTimeout(u64),

    /// Request rejected by the command validator.
    #[error("validation failed: {0}")]
    Validation(#[from] crate::security::ValidationError),

    /// File tool failure.
    #[error("file operation failed: {0}")]
    File(#[from] crate::files::FileError),

    /// Tool input did not match the tool's schema.
    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    /// JSON encoding of a tool result failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No tool registered under the given name.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Background task failed to complete.
    #[error("task join error: {0}")]
    Join(String),

    /// HTTP server error.
    #[error("server error: {0}")]
    Server(String),
}

/// Convenience Result type for agent-tools operations.
pub type Result<T> = std::result::Result<T, ToolError>;
