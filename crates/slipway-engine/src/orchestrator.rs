//! Top-level deployment orchestration.
//!
//! Sequences one operator action end to end: acquire the application
//! lock, build/resolve the artifact, run the migration safety gate,
//! roll the slots, sync the proxy when the scale changed, then record
//! and notify the terminal outcome. Each invocation is one sequential
//! control flow; independent applications can run concurrently because
//! they occupy disjoint port ranges and name prefixes.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use slipway_core::{AdvisoryLock, Application, DeployEvent, LockTag, Notifier};
use slipway_health::HealthGate;
use slipway_migrate::{DatabaseBackup, MigrationGate, MigrationOutcome};
use slipway_proxy::{ProxyControl, ProxySync, SyncOutcome};
use slipway_registry::ArtifactRegistry;
use slipway_runtime::{ContainerRuntime, Instance};
use slipway_state::{
    BackupRecord, DeploymentOutcome, DeploymentRecord, HistoryStore, OperationKind,
};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::roll::RollingEngine;

/// Orchestrator-wide settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory holding the advisory lock files.
    pub lock_dir: PathBuf,
    /// Settle pause between slots.
    pub settle: Duration,
}

/// Drives a deployment through all its gates. Generic over every
/// collaborator so tests run fully in memory.
pub struct Orchestrator<R, G, B, D, C> {
    runtime: R,
    gate: G,
    registry: B,
    backup: D,
    proxy: ProxySync<C>,
    history: HistoryStore,
    notifier: Box<dyn Notifier>,
    config: OrchestratorConfig,
}

impl<R, G, B, D, C> Orchestrator<R, G, B, D, C>
where
    R: ContainerRuntime,
    G: HealthGate,
    B: ArtifactRegistry,
    D: DatabaseBackup,
    C: ProxyControl,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime: R,
        gate: G,
        registry: B,
        backup: D,
        proxy: ProxySync<C>,
        history: HistoryStore,
        notifier: Box<dyn Notifier>,
        config: OrchestratorConfig,
    ) -> Self {
        Self { runtime, gate, registry, backup, proxy, history, notifier, config }
    }

    /// Build a new artifact and roll it out.
    pub async fn deploy(
        &self,
        app: &Application,
        source_ref: &str,
        scale_override: Option<u32>,
    ) -> EngineResult<DeploymentRecord> {
        let target_scale = scale_override.unwrap_or(app.scale);
        if target_scale == 0 {
            return Err(EngineError::Precondition("scale must be at least 1".into()));
        }

        let _lock = self.lock(app)?;
        let tag = self.registry.build(app, source_ref).await?;
        self.registry.promote(&app.repository, &tag).await?;

        self.run_rollout(app, OperationKind::Deploy, target_scale, &tag, true)
            .await
    }

    /// Redeploy the current artifact at the current scale.
    pub async fn restart(&self, app: &Application) -> EngineResult<DeploymentRecord> {
        let _lock = self.lock(app)?;
        let tag = self.current_artifact(app).await?;
        let scale = self.live_scale(app).await?;
        if scale == 0 {
            return Err(EngineError::Precondition(format!(
                "{} has no running instances to restart",
                app.name
            )));
        }
        self.run_rollout(app, OperationKind::Restart, scale, &tag, false)
            .await
    }

    /// Change the web scale, keeping the current artifact.
    pub async fn scale(&self, app: &Application, new_scale: u32) -> EngineResult<DeploymentRecord> {
        if new_scale == 0 {
            return Err(EngineError::Precondition(
                "scale must be at least 1; use `stop` to take the application down".into(),
            ));
        }
        let _lock = self.lock(app)?;
        let tag = self.current_artifact(app).await?;
        self.run_rollout(app, OperationKind::Scale, new_scale, &tag, false)
            .await
    }

    /// Roll back to a previously retained artifact at the current scale.
    pub async fn rollback(
        &self,
        app: &Application,
        selector: &slipway_registry::ArtifactSelector,
    ) -> EngineResult<DeploymentRecord> {
        let _lock = self.lock(app)?;

        let artifacts = self.registry.list(&app.repository).await?;
        let target = selector.resolve(&artifacts)?.clone();
        let scale = self.live_scale(app).await?;
        if scale == 0 {
            return Err(EngineError::Precondition(format!(
                "{} has no running instances; deploy instead of rolling back",
                app.name
            )));
        }

        self.registry.promote(&app.repository, &target.tag).await?;
        let record = self
            .run_rollout(app, OperationKind::Rollback, scale, &target.tag, true)
            .await?;

        if record.outcome == DeploymentOutcome::Succeeded {
            self.notifier.notify(&DeployEvent::RolledBack {
                app: app.name.clone(),
                artifact: target.tag.clone(),
            });
        }
        Ok(record)
    }

    /// Stop and remove every managed instance of the application.
    ///
    /// The prefix listing can pick up foreign containers that merely
    /// share the name prefix (a hand-run `shop-postgres` next to the
    /// `shop` fleet); only names that parse as `{app}-{role}-{index}`
    /// are touched.
    pub async fn stop(&self, app: &Application) -> EngineResult<u32> {
        let _lock = self.lock(app)?;
        let instances = self.runtime.list(&app.name_prefix()).await?;
        let mut stopped = 0;
        for instance in instances
            .iter()
            .filter(|i| Instance::parse_name(&i.name).is_some())
        {
            self.runtime.stop(&instance.name).await?;
            self.runtime.remove(&instance.name).await?;
            stopped += 1;
        }
        info!(app = %app.name, stopped, "application stopped");
        Ok(stopped)
    }

    /// Live instance set — the source of truth for current state.
    pub async fn status(&self, app: &Application) -> EngineResult<Vec<Instance>> {
        Ok(self.runtime.list(&app.name_prefix()).await?)
    }

    /// Retained release artifacts, newest-first.
    pub async fn artifacts(
        &self,
        app: &Application,
    ) -> EngineResult<Vec<slipway_registry::ArtifactInfo>> {
        Ok(self.registry.list(&app.repository).await?)
    }

    /// Deployment history, newest-first. Visibility only.
    pub fn deployment_history(&self, app: &Application) -> EngineResult<Vec<DeploymentRecord>> {
        Ok(self.history.list_deployments(&app.name)?)
    }

    /// Log passthrough for one instance.
    pub async fn logs(&self, name: &str, tail: u32) -> EngineResult<String> {
        Ok(self.runtime.logs(name, tail).await?)
    }

    /// Restore the newest recorded database backup. Destructive and
    /// explicit: never invoked by any deployment path.
    pub async fn restore_backup(&self, app: &Application) -> EngineResult<BackupRecord> {
        let _lock = self.lock(app)?;
        let newest = self
            .history
            .list_backups(&app.name)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EngineError::Precondition(format!("no backups recorded for {}", app.name))
            })?;
        self.backup
            .restore(app, std::path::Path::new(&newest.path))
            .await?;
        info!(app = %app.name, path = %newest.path, "database restored from backup");
        Ok(newest)
    }

    /// Run both retention jobs under the application lock.
    pub async fn prune(
        &self,
        app: &Application,
        keep_artifacts: usize,
        keep_backup_days: u64,
    ) -> EngineResult<crate::jobs::PruneSummary> {
        let _lock = self.lock(app)?;
        let artifacts =
            crate::jobs::prune_artifacts(&self.registry, &app.repository, keep_artifacts).await?;
        let backups =
            crate::jobs::prune_backups(&self.history, &app.name, keep_backup_days, epoch_secs())?;
        Ok(crate::jobs::PruneSummary { artifacts, backups })
    }

    // ── internals ─────────────────────────────────────────────────

    fn lock(&self, app: &Application) -> EngineResult<AdvisoryLock> {
        Ok(AdvisoryLock::try_acquire(
            &self.config.lock_dir,
            LockTag::App(app.name.clone()),
        )?)
    }

    async fn live_scale(&self, app: &Application) -> EngineResult<u32> {
        let engine = RollingEngine::new(&self.runtime, &self.gate, self.config.settle);
        engine.current_scale(app).await
    }

    /// The artifact the `current` alias points at. After a rollback the
    /// alias sits on an older release, so the newest retained tag is
    /// only a fallback for fleets that predate the alias.
    async fn current_artifact(&self, app: &Application) -> EngineResult<String> {
        if let Some(tag) = self.registry.current(&app.repository).await? {
            return Ok(tag);
        }
        let artifacts = self.registry.list(&app.repository).await?;
        artifacts
            .first()
            .map(|a| a.tag.clone())
            .ok_or_else(|| {
                EngineError::Precondition(format!("no artifacts built for {}", app.name))
            })
    }

    /// The shared gate → roll → sync → record → notify sequence.
    /// Callers hold the application lock.
    async fn run_rollout(
        &self,
        app: &Application,
        kind: OperationKind,
        target_scale: u32,
        tag: &str,
        run_migrations: bool,
    ) -> EngineResult<DeploymentRecord> {
        let started_at = epoch_secs();
        self.notifier.notify(&DeployEvent::Started {
            app: app.name.clone(),
            artifact: tag.to_string(),
        });

        // Migration gate strictly before any instance replacement: a
        // half-migrated schema must never be visible to only part of
        // the fleet.
        if run_migrations {
            let image = format!("{}:{tag}", app.repository);
            let gate = MigrationGate::new(&self.runtime, &self.backup);
            match gate.ensure_schema_current(app, &image).await {
                Ok(MigrationOutcome::UpToDate) => {}
                Ok(MigrationOutcome::Applied { backup }) => {
                    self.history.append_backup(&BackupRecord {
                        app: app.name.clone(),
                        path: backup.path.display().to_string(),
                        size_bytes: backup.size_bytes,
                        created_at: backup.created_at,
                    })?;
                }
                Err(e) => {
                    self.finish(
                        app,
                        kind,
                        tag,
                        target_scale,
                        started_at,
                        Vec::new(),
                        DeploymentOutcome::Failed,
                        Some(e.to_string()),
                    )?;
                    return Err(e.into());
                }
            }
        }

        let engine = RollingEngine::new(&self.runtime, &self.gate, self.config.settle);
        let previous_scale = engine.current_scale(app).await?;

        let report = match engine.roll(app, target_scale, tag).await {
            Ok(report) => report,
            Err(e) => {
                self.finish(
                    app,
                    kind,
                    tag,
                    target_scale,
                    started_at,
                    Vec::new(),
                    DeploymentOutcome::Failed,
                    Some(e.to_string()),
                )?;
                return Err(e);
            }
        };

        let mut outcome = report.outcome;
        let mut failure_reason = None;

        // The routing table changes only when the port set changes.
        if outcome == DeploymentOutcome::Succeeded && target_scale != previous_scale {
            match self.proxy.sync(app, target_scale).await {
                Ok(SyncOutcome::Synced) => {}
                Ok(SyncOutcome::Reverted { reason }) => {
                    // Instances are healthy but routing still reflects
                    // the old scale; the operator must fix the config.
                    warn!(app = %app.name, %reason, "proxy config reverted");
                    outcome = DeploymentOutcome::Failed;
                    failure_reason = Some(format!("proxy config validation failed: {reason}"));
                }
                // A failed reload or lock contention is just as terminal
                // as a reverted config; it still gets recorded and
                // notified before the error surfaces.
                Err(e) => {
                    self.finish(
                        app,
                        kind,
                        tag,
                        target_scale,
                        started_at,
                        report.slots,
                        DeploymentOutcome::Failed,
                        Some(e.to_string()),
                    )?;
                    return Err(e.into());
                }
            }
        }

        self.finish(
            app,
            kind,
            tag,
            target_scale,
            started_at,
            report.slots,
            outcome,
            failure_reason.or(match outcome {
                DeploymentOutcome::Aborted => Some("staging health check failed".to_string()),
                DeploymentOutcome::Failed => Some("production re-check failed".to_string()),
                DeploymentOutcome::Succeeded => None,
            }),
        )
    }

    /// Record the terminal outcome and notify. The log is never read
    /// back for control decisions.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        app: &Application,
        kind: OperationKind,
        tag: &str,
        target_scale: u32,
        started_at: u64,
        slots: Vec<slipway_state::SlotRecord>,
        outcome: DeploymentOutcome,
        reason: Option<String>,
    ) -> EngineResult<DeploymentRecord> {
        let record = DeploymentRecord {
            app: app.name.clone(),
            kind,
            artifact: tag.to_string(),
            target_scale,
            started_at,
            finished_at: epoch_secs(),
            slots,
            outcome,
        };
        self.history.append_deployment(&record)?;

        let event = match outcome {
            DeploymentOutcome::Succeeded => DeployEvent::Succeeded {
                app: app.name.clone(),
                artifact: tag.to_string(),
            },
            DeploymentOutcome::Aborted => DeployEvent::Aborted {
                app: app.name.clone(),
                artifact: tag.to_string(),
                reason: reason.unwrap_or_default(),
            },
            DeploymentOutcome::Failed => DeployEvent::Failed {
                app: app.name.clone(),
                artifact: tag.to_string(),
                reason: reason.unwrap_or_default(),
            },
        };
        self.notifier.notify(&event);
        Ok(record)
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use slipway_proxy::upstream_ports;
    use slipway_registry::ArtifactSelector;
    use std::sync::{Arc, Mutex};

    /// Notifier that captures event kinds.
    struct CapturingNotifier(Arc<Mutex<Vec<String>>>);

    impl Notifier for CapturingNotifier {
        fn notify(&self, event: &DeployEvent) {
            self.0.lock().unwrap().push(event.kind().to_string());
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        events: Arc<Mutex<Vec<String>>>,
        control: &'static CountingControl,
    }

    fn orchestrator(
        runtime: FakeRuntime,
        gate: FakeGate,
        registry: FakeRegistry,
        backup: FakeBackup,
    ) -> (
        Orchestrator<FakeRuntime, FakeGate, FakeRegistry, FakeBackup, &'static CountingControl>,
        Harness,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let control: &'static CountingControl = Box::leak(Box::new(CountingControl::new()));
        let proxy = ProxySync::new(
            &dir.path().join("conf.d"),
            &dir.path().join("locks"),
            control,
        );
        let events = Arc::new(Mutex::new(Vec::new()));
        let orch = Orchestrator::new(
            runtime,
            gate,
            registry,
            backup,
            proxy,
            HistoryStore::open_in_memory().unwrap(),
            Box::new(CapturingNotifier(events.clone())),
            OrchestratorConfig {
                lock_dir: dir.path().join("locks"),
                settle: Duration::ZERO,
            },
        );
        (orch, Harness { dir, events, control })
    }

    #[tokio::test]
    async fn deploy_builds_promotes_and_records() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 3, "release-1");
        let registry = FakeRegistry::with_releases(1);
        let (orch, h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let record = orch.deploy(&app, ".", None).await.unwrap();

        assert_eq!(record.outcome, DeploymentOutcome::Succeeded);
        assert_eq!(record.kind, OperationKind::Deploy);
        assert_eq!(record.artifact, "release-2");
        assert_eq!(orch.deployment_history(&app).unwrap().len(), 1);
        assert_eq!(
            h.events.lock().unwrap().as_slice(),
            ["started", "succeeded"]
        );
        // Same scale: no proxy reload.
        assert_eq!(*h.control.reloads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn deploy_scale_change_syncs_proxy() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-1");
        let registry = FakeRegistry::with_releases(1);
        let (orch, h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let record = orch.deploy(&app, ".", Some(4)).await.unwrap();
        assert_eq!(record.outcome, DeploymentOutcome::Succeeded);
        assert_eq!(*h.control.reloads.lock().unwrap(), 1);

        let fragment =
            std::fs::read_to_string(h.dir.path().join("conf.d").join("shop.conf")).unwrap();
        assert_eq!(upstream_ports(&fragment), vec![3020, 3021, 3022, 3023]);
    }

    #[tokio::test]
    async fn migration_gate_runs_before_any_replacement() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-1");
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        orch.deploy(&app, ".", None).await.unwrap();

        let ops = orch.runtime.ops();
        let first_exec = ops.iter().position(|o| o.starts_with("exec")).unwrap();
        let first_start = ops.iter().position(|o| o.starts_with("start")).unwrap();
        assert!(first_exec < first_start, "migration check must precede instance starts");
    }

    #[tokio::test]
    async fn backup_failure_aborts_with_no_replacement() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-1");
        runtime.set_exec_exit("db:abort_if_pending_migrations", 1);
        let registry = FakeRegistry::with_releases(1);
        let (orch, h) =
            orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::failing());

        let err = orch.deploy(&app, ".", None).await.unwrap_err();
        assert!(matches!(err, EngineError::Migration(_)));
        assert_eq!(*orch.backup.dumps.lock().unwrap(), 1);

        // No instance was started or stopped.
        assert!(orch.runtime.ops().iter().all(|o| o.starts_with("exec")));
        // The failure is still recorded and notified.
        let history = orch.deployment_history(&app).unwrap();
        assert_eq!(history[0].outcome, DeploymentOutcome::Failed);
        assert_eq!(h.events.lock().unwrap().as_slice(), ["started", "failed"]);
    }

    #[tokio::test]
    async fn pending_migrations_record_a_backup() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-1");
        runtime.set_exec_exit("db:abort_if_pending_migrations", 1);
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        orch.deploy(&app, ".", None).await.unwrap();
        assert_eq!(orch.history.list_backups("shop").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn aborted_deploy_is_recorded_and_notified() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 3, "release-1");
        let registry = FakeRegistry::with_releases(1);
        let (orch, h) =
            orchestrator(runtime, FakeGate::unhealthy_on(&[13022]), registry, FakeBackup::ok());

        let record = orch.deploy(&app, ".", None).await.unwrap();
        assert_eq!(record.outcome, DeploymentOutcome::Aborted);
        assert_eq!(h.events.lock().unwrap().as_slice(), ["started", "aborted"]);
    }

    #[tokio::test]
    async fn concurrent_deploy_contends_on_app_lock() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-1");
        let registry = FakeRegistry::with_releases(1);
        let (orch, h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let _held = AdvisoryLock::try_acquire(
            &h.dir.path().join("locks"),
            LockTag::App("shop".into()),
        )
        .unwrap();

        let err = orch.deploy(&app, ".", None).await.unwrap_err();
        assert!(matches!(err, EngineError::Lock(_)));
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn restart_reuses_current_artifact_and_scale() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-3");
        let registry = FakeRegistry::with_releases(3);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let record = orch.restart(&app).await.unwrap();
        assert_eq!(record.kind, OperationKind::Restart);
        assert_eq!(record.artifact, "release-3");
        assert_eq!(record.target_scale, 2);
        // No new artifact was built.
        assert_eq!(orch.registry.tags().len(), 3);
    }

    #[tokio::test]
    async fn restart_after_rollback_keeps_the_promoted_artifact() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-3");
        let registry = FakeRegistry::with_releases(3);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        orch.rollback(&app, &ArtifactSelector::Offset(1))
            .await
            .unwrap();
        let record = orch.restart(&app).await.unwrap();

        // release-3 is still the newest retained tag, but the alias
        // points at release-2; a restart must not undo the rollback.
        assert_eq!(record.artifact, "release-2");
        assert_eq!(
            orch.runtime.running_on(3020).unwrap().image,
            "registry.local/shop:release-2"
        );
    }

    #[tokio::test]
    async fn scale_after_rollback_keeps_the_promoted_artifact() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-3");
        let registry = FakeRegistry::with_releases(3);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        orch.rollback(&app, &ArtifactSelector::Offset(1))
            .await
            .unwrap();
        let record = orch.scale(&app, 3).await.unwrap();

        assert_eq!(record.artifact, "release-2");
        assert_eq!(
            orch.runtime.running_on(3022).unwrap().image,
            "registry.local/shop:release-2"
        );
    }

    #[tokio::test]
    async fn restart_with_nothing_running_is_a_precondition_error() {
        let app = test_app();
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) =
            orchestrator(FakeRuntime::new(), FakeGate::all_healthy(), registry, FakeBackup::ok());

        let err = orch.restart(&app).await.unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));
    }

    #[tokio::test]
    async fn scale_zero_is_rejected_before_any_mutation() {
        let app = test_app();
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) =
            orchestrator(FakeRuntime::new(), FakeGate::all_healthy(), registry, FakeBackup::ok());

        let err = orch.scale(&app, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));
        assert!(orch.runtime.ops().is_empty());
    }

    #[tokio::test]
    async fn stop_removes_every_instance() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 3, "release-1");
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let stopped = orch.stop(&app).await.unwrap();
        assert_eq!(stopped, 3);
        assert!(orch.status(&app).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_leaves_unmanaged_containers_alone() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 3, "release-1");
        runtime.insert_unmanaged("shop-postgres", "postgres:16");
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let stopped = orch.stop(&app).await.unwrap();
        assert_eq!(stopped, 3);
        assert_eq!(orch.runtime.names(), vec!["shop-postgres"]);
    }

    #[tokio::test]
    async fn proxy_reload_failure_is_recorded_and_notified() {
        struct BrokenReload;

        impl ProxyControl for &BrokenReload {
            async fn validate(&self) -> Result<(), String> {
                Ok(())
            }
            async fn reload(&self) -> Result<(), String> {
                Err("signal process not running".into())
            }
        }

        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-1");
        let dir = tempfile::tempdir().unwrap();
        let control: &'static BrokenReload = Box::leak(Box::new(BrokenReload));
        let proxy = ProxySync::new(
            &dir.path().join("conf.d"),
            &dir.path().join("locks"),
            control,
        );
        let events = Arc::new(Mutex::new(Vec::new()));
        let orch = Orchestrator::new(
            runtime,
            FakeGate::all_healthy(),
            FakeRegistry::with_releases(1),
            FakeBackup::ok(),
            proxy,
            HistoryStore::open_in_memory().unwrap(),
            Box::new(CapturingNotifier(events.clone())),
            OrchestratorConfig {
                lock_dir: dir.path().join("locks"),
                settle: Duration::ZERO,
            },
        );

        // The scale change forces a sync, whose reload then fails.
        let err = orch.deploy(&app, ".", Some(4)).await.unwrap_err();
        assert!(matches!(err, EngineError::Proxy(_)));

        let history = orch.deployment_history(&app).unwrap();
        assert_eq!(history[0].outcome, DeploymentOutcome::Failed);
        assert_eq!(events.lock().unwrap().as_slice(), ["started", "failed"]);
    }

    #[tokio::test]
    async fn rollback_promotes_and_redeploys_prior_artifact() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-3");
        let registry = FakeRegistry::with_releases(3);
        let (orch, h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let record = orch
            .rollback(&app, &ArtifactSelector::Offset(1))
            .await
            .unwrap();

        assert_eq!(record.kind, OperationKind::Rollback);
        assert_eq!(record.artifact, "release-2");
        assert_eq!(record.target_scale, 2);
        assert_eq!(orch.registry.promoted(), vec!["release-2"]);
        assert_eq!(orch.runtime.running_on(3020).unwrap().image, "registry.local/shop:release-2");
        assert!(h.events.lock().unwrap().contains(&"rolled_back".to_string()));
    }

    #[tokio::test]
    async fn restore_uses_the_newest_backup() {
        let app = test_app();
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) =
            orchestrator(FakeRuntime::new(), FakeGate::all_healthy(), registry, FakeBackup::ok());

        for created_at in [100, 300, 200] {
            orch.history
                .append_backup(&BackupRecord {
                    app: "shop".into(),
                    path: format!("/backups/shop-{created_at}.dump"),
                    size_bytes: 1,
                    created_at,
                })
                .unwrap();
        }

        let restored = orch.restore_backup(&app).await.unwrap();
        assert_eq!(restored.created_at, 300);
        assert_eq!(
            orch.backup.restored.lock().unwrap().as_slice(),
            ["/backups/shop-300.dump"]
        );
    }

    #[tokio::test]
    async fn restore_without_backups_is_a_precondition_error() {
        let app = test_app();
        let registry = FakeRegistry::with_releases(1);
        let (orch, _h) =
            orchestrator(FakeRuntime::new(), FakeGate::all_healthy(), registry, FakeBackup::ok());

        let err = orch.restore_backup(&app).await.unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));
    }

    #[tokio::test]
    async fn rollback_past_retention_fails_without_mutation() {
        let app = test_app();
        let runtime = FakeRuntime::with_running_fleet(&app, 2, "release-2");
        let registry = FakeRegistry::with_releases(2);
        let (orch, _h) = orchestrator(runtime, FakeGate::all_healthy(), registry, FakeBackup::ok());

        let err = orch
            .rollback(&app, &ArtifactSelector::Offset(2))
            .await
            .unwrap_err();
        assert!(err.is_precondition());
        assert!(orch.registry.promoted().is_empty());
        assert!(orch.runtime.ops().is_empty());
        assert_eq!(orch.runtime.running_on(3020).unwrap().image, "registry.local/shop:release-2");
    }
}
