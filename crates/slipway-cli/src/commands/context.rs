//! Wires the production collaborators into one orchestrator.

use std::path::Path;
use std::time::Duration;

use slipway_core::{AppConfig, Application, LogNotifier};
use slipway_engine::{Orchestrator, OrchestratorConfig};
use slipway_health::{GateConfig, HttpHealthGate};
use slipway_migrate::PgDump;
use slipway_proxy::{NginxControl, ProxySync};
use slipway_registry::DockerRegistry;
use slipway_runtime::DockerRuntime;

/// The fully wired orchestrator: Docker runtime and registry, HTTP
/// health gate, pg_dump backups, nginx proxy control.
pub type SlipOrchestrator =
    Orchestrator<DockerRuntime, HttpHealthGate, DockerRegistry, PgDump, NginxControl>;

pub struct Context {
    pub config: AppConfig,
    pub app: Application,
    pub orchestrator: SlipOrchestrator,
}

impl Context {
    pub fn build(config_path: &Path, state_dir: &Path, conf_dir: &Path) -> anyhow::Result<Self> {
        let config = AppConfig::from_file(config_path)?;
        let app = config.to_application()?;

        std::fs::create_dir_all(state_dir)?;
        tracing::debug!(config = %config_path.display(), state = %state_dir.display(), "context ready");
        let lock_dir = state_dir.join("locks");
        let history = slipway_state::HistoryStore::open(&state_dir.join("history.redb"))?;

        let (timeout, interval, settle) = match &config.health {
            Some(h) => (
                h.timeout_secs.unwrap_or(60),
                h.interval_secs.unwrap_or(2),
                h.settle_secs.unwrap_or(5),
            ),
            None => (60, 2, 5),
        };
        let gate = HttpHealthGate::new(
            GateConfig::new(app.profile.health_paths())
                .with_timeout(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval)),
        );

        let proxy = ProxySync::new(conf_dir, &lock_dir, NginxControl::default());
        let orchestrator = Orchestrator::new(
            DockerRuntime::new("docker"),
            gate,
            DockerRegistry::new("docker"),
            PgDump::new(&state_dir.join("backups")),
            proxy,
            history,
            Box::new(LogNotifier),
            OrchestratorConfig {
                lock_dir,
                settle: Duration::from_secs(settle),
            },
        );

        Ok(Self { config, app, orchestrator })
    }

    /// Retention settings with defaults applied.
    pub fn retention(&self) -> (usize, u64) {
        match &self.config.retention {
            Some(r) => (
                r.keep_artifacts.unwrap_or(5) as usize,
                r.keep_backup_days.unwrap_or(7),
            ),
            None => (5, 7),
        }
    }
}
