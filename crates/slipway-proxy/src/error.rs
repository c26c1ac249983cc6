//! Proxy synchronizer error types.

use thiserror::Error;

/// Result type alias for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Another sync holds the proxy-config lock.
    #[error(transparent)]
    Lock(#[from] slipway_core::LockError),

    /// The graceful reload itself failed after validation passed.
    #[error("proxy reload failed: {0}")]
    Reload(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
