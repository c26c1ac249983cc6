//! Runtime error types.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur while driving the container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The requested host port is already bound. Indicates stale state
    /// from a previous failed run; surfaced to the operator, never
    /// auto-resolved.
    #[error("port {port} is already bound by {held_by}")]
    PortConflict { port: u16, held_by: String },

    #[error("failed to start {name}: {detail}")]
    Start { name: String, detail: String },

    #[error("runtime command failed: {0}")]
    Command(String),

    #[error("failed to parse runtime output: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
