//! The bounded-retry gate built on the single-shot probe.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::probe::{ProbeResult, http_probe};
use crate::HealthVerdict;

/// Gate parameters. Defaults: 60s budget, 2s interval, probe paths
/// supplied by the application profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Candidate paths, tried in order on every round.
    pub paths: Vec<String>,
    /// Total budget before giving up.
    pub timeout: Duration,
    /// Pause between probe rounds; also the per-probe timeout.
    pub interval: Duration,
}

impl GateConfig {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Seam between the deployment engine and health probing, so engine
/// tests can script verdicts without opening sockets.
pub trait HealthGate: Send + Sync {
    fn await_healthy(&self, address: &str) -> impl Future<Output = HealthVerdict> + Send;
}

/// Production gate: real HTTP probes per [`GateConfig`].
#[derive(Debug, Clone)]
pub struct HttpHealthGate {
    config: GateConfig,
}

impl HttpHealthGate {
    /// Non-positive timeout or interval is a programming error, not a
    /// runtime condition, and panics here.
    pub fn new(config: GateConfig) -> Self {
        assert!(!config.timeout.is_zero(), "health gate timeout must be positive");
        assert!(!config.interval.is_zero(), "health gate interval must be positive");
        assert!(!config.paths.is_empty(), "health gate needs at least one path");
        Self { config }
    }
}

impl HealthGate for HttpHealthGate {
    async fn await_healthy(&self, address: &str) -> HealthVerdict {
        let deadline = Instant::now() + self.config.timeout;
        let mut attempts = 0u32;

        loop {
            for path in &self.config.paths {
                attempts += 1;
                match http_probe(address, path, self.config.interval).await {
                    ProbeResult::Healthy => {
                        info!(%address, %path, attempts, "instance healthy");
                        return HealthVerdict::Healthy { path: path.clone(), attempts };
                    }
                    result => {
                        debug!(%address, %path, ?result, "not healthy yet");
                    }
                }
            }

            if Instant::now() + self.config.interval >= deadline {
                warn!(%address, attempts, "health gate timed out");
                return HealthVerdict::TimedOut { attempts };
            }
            tokio::time::sleep(self.config.interval).await;
        }
    }
}
