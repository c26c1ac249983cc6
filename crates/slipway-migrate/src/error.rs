//! Migration gate error types.
//!
//! Every variant is fatal for the whole deployment and is raised before
//! any instance replacement begins.

use thiserror::Error;

/// Result type alias for migration gate operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// The pre-migration database dump failed; schema left untouched.
    #[error("pre-migration backup failed: {0}")]
    Backup(String),

    /// Applying pending changes failed; no instances were replaced.
    #[error("migration apply failed: {0}")]
    Apply(String),

    /// An operator-requested restore of a recorded dump failed.
    #[error("restore failed: {0}")]
    Restore(String),

    #[error("runtime error during migration check: {0}")]
    Runtime(#[from] slipway_runtime::RuntimeError),
}
