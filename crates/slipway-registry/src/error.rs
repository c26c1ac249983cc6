//! Registry error types.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while driving the artifact registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("build failed: {0}")]
    Build(String),

    /// The selector points past retained history or at an unknown tag.
    /// Retention cleanup bounds how far back rollback can reach; the
    /// message surfaces that bound instead of silently truncating.
    #[error("no such artifact: {0}")]
    NoSuchArtifact(String),

    #[error("registry command failed: {0}")]
    Command(String),

    #[error("failed to parse registry output: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
