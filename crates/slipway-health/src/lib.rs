//! slipway-health — the health check gate.
//!
//! A candidate instance may only receive production traffic after
//! [`HealthGate::await_healthy`] returns [`HealthVerdict::Healthy`].
//! The gate polls a list of HTTP paths in order (dedicated health path
//! first, then the root) until one answers 2xx/3xx or the timeout
//! elapses. Connection failures and 4xx/5xx both count as "not yet":
//! a booting instance refuses connections before it serves errors.
//!
//! The gate has no side effects beyond the probe requests and never
//! errors on normal failure; the caller inspects the returned verdict.

pub mod gate;
pub mod probe;

pub use gate::{GateConfig, HealthGate, HttpHealthGate};
pub use probe::{ProbeResult, http_probe};

/// Outcome of waiting on the health gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthVerdict {
    /// A probe answered 2xx/3xx on `path` after `attempts` probes.
    Healthy { path: String, attempts: u32 },
    /// The timeout elapsed without a healthy answer.
    TimedOut { attempts: u32 },
}

impl HealthVerdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthVerdict::Healthy { .. })
    }
}
