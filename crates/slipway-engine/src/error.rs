//! Engine error taxonomy.
//!
//! Two families matter to the operator: precondition failures (nothing
//! was mutated; fix the input and retry) and mid-deployment failures
//! (the fleet may be partially updated; look before retrying). The CLI
//! maps them to distinct exit codes.

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad scale, unknown artifact name, missing config. Rejected before
    /// any mutation.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A concurrent deployment or sync holds the lock. Surfaced
    /// immediately, never queued.
    #[error(transparent)]
    Lock(#[from] slipway_core::LockError),

    #[error(transparent)]
    Runtime(#[from] slipway_runtime::RuntimeError),

    #[error(transparent)]
    Registry(#[from] slipway_registry::RegistryError),

    #[error(transparent)]
    Migration(#[from] slipway_migrate::MigrateError),

    #[error(transparent)]
    Proxy(#[from] slipway_proxy::ProxyError),

    #[error(transparent)]
    State(#[from] slipway_state::StateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether the failure happened before any mutation.
    ///
    /// Port conflicts and unknown artifacts are precondition-class: the
    /// engine checks them before touching a single instance.
    pub fn is_precondition(&self) -> bool {
        match self {
            EngineError::Precondition(_) | EngineError::Lock(_) => true,
            EngineError::Registry(slipway_registry::RegistryError::NoSuchArtifact(_)) => true,
            EngineError::Runtime(slipway_runtime::RuntimeError::PortConflict { .. }) => true,
            // A failed dump aborts before the schema or any instance is
            // touched; a failed apply does not.
            EngineError::Migration(slipway_migrate::MigrateError::Backup(_)) => true,
            _ => false,
        }
    }
}
