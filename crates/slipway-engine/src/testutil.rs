//! In-memory fakes for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use slipway_core::{Application, ApplicationProfile, Role, production_port};
use slipway_health::{HealthGate, HealthVerdict};
use slipway_migrate::{BackupFile, DatabaseBackup, MigrateError, MigrateResult};
use slipway_registry::{ArtifactInfo, ArtifactRegistry, RegistryResult, release_tag};
use slipway_runtime::{
    ContainerRuntime, ExecOutput, Instance, InstanceSpec, RuntimeError, RuntimeResult,
};

pub fn test_app() -> Application {
    Application {
        name: "shop".into(),
        domain: "shop.example.com".into(),
        base_port: 3020,
        scale: 3,
        repository: "registry.local/shop".into(),
        profile: ApplicationProfile::RailsLike,
        env: HashMap::new(),
    }
}

// ── Runtime ───────────────────────────────────────────────────────

/// In-memory container runtime. Tracks a name→instance map, an
/// operation log, and a timeline of bound-port snapshots taken after
/// every mutation (for the at-most-one-down property).
pub struct FakeRuntime {
    instances: Mutex<HashMap<String, Instance>>,
    ops: Mutex<Vec<String>>,
    snapshots: Mutex<Vec<HashSet<u16>>>,
    exec_exits: Mutex<HashMap<String, i32>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            ops: Mutex::new(Vec::new()),
            snapshots: Mutex::new(Vec::new()),
            exec_exits: Mutex::new(HashMap::new()),
        }
    }

    /// A fleet of `scale` running web instances of `tag` on the
    /// application's production ports.
    pub fn with_running_fleet(app: &Application, scale: u32, tag: &str) -> Self {
        let fake = Self::new();
        {
            let mut instances = fake.instances.lock().unwrap();
            for slot in 1..=scale {
                let name = app.instance_name(Role::Web, slot);
                instances.insert(
                    name.clone(),
                    Instance {
                        name,
                        image: format!("{}:{tag}", app.repository),
                        host_port: Some(production_port(app.base_port, slot)),
                        role: Some(Role::Web),
                        state: "running".into(),
                    },
                );
            }
        }
        fake
    }

    /// Plant a running container outside the managed naming scheme
    /// (a sidecar like `shop-postgres`).
    pub fn insert_unmanaged(&self, name: &str, image: &str) {
        self.instances.lock().unwrap().insert(
            name.to_string(),
            Instance {
                name: name.to_string(),
                image: image.to_string(),
                host_port: None,
                role: None,
                state: "running".into(),
            },
        );
    }

    /// Script an exit code for `exec_once` commands whose last word is `key`.
    pub fn set_exec_exit(&self, key: &str, exit_code: i32) {
        self.exec_exits.lock().unwrap().insert(key.to_string(), exit_code);
    }

    pub fn running_on(&self, port: u16) -> Option<Instance> {
        self.instances
            .lock()
            .unwrap()
            .values()
            .find(|i| i.is_running() && i.host_port == Some(port))
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.instances.lock().unwrap().keys().cloned().collect()
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    /// How many of `ports` were bound by a running instance after each
    /// mutation, in order.
    pub fn production_bound_timeline(&self, ports: &[u16]) -> Vec<usize> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .map(|bound| ports.iter().filter(|p| bound.contains(p)).count())
            .collect()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
        let bound: HashSet<u16> = self
            .instances
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.is_running())
            .filter_map(|i| i.host_port)
            .collect();
        self.snapshots.lock().unwrap().push(bound);
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn start(&self, spec: &InstanceSpec) -> RuntimeResult<()> {
        {
            let mut instances = self.instances.lock().unwrap();
            if let Some(holder) = instances
                .values()
                .find(|i| i.is_running() && i.host_port == Some(spec.host_port))
            {
                return Err(RuntimeError::PortConflict {
                    port: spec.host_port,
                    held_by: holder.name.clone(),
                });
            }
            instances.insert(
                spec.name.clone(),
                Instance {
                    name: spec.name.clone(),
                    image: spec.image.clone(),
                    host_port: Some(spec.host_port),
                    role: Some(spec.role),
                    state: "running".into(),
                },
            );
        }
        self.record(format!("start {}", spec.name));
        Ok(())
    }

    async fn stop(&self, name: &str) -> RuntimeResult<()> {
        {
            let mut instances = self.instances.lock().unwrap();
            if let Some(instance) = instances.get_mut(name) {
                instance.state = "exited".into();
            }
        }
        self.record(format!("stop {name}"));
        Ok(())
    }

    async fn remove(&self, name: &str) -> RuntimeResult<()> {
        self.instances.lock().unwrap().remove(name);
        self.record(format!("remove {name}"));
        Ok(())
    }

    async fn list(&self, prefix: &str) -> RuntimeResult<Vec<Instance>> {
        Ok(self
            .instances
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn exec_once(
        &self,
        _image: &str,
        command: &[String],
        _env: &HashMap<String, String>,
    ) -> RuntimeResult<ExecOutput> {
        let key = command.last().cloned().unwrap_or_default();
        self.ops.lock().unwrap().push(format!("exec {key}"));
        let exit_code = self.exec_exits.lock().unwrap().get(&key).copied().unwrap_or(0);
        Ok(ExecOutput { exit_code, stdout: String::new(), stderr: String::new() })
    }

    async fn logs(&self, name: &str, _tail: u32) -> RuntimeResult<String> {
        Ok(format!("logs for {name}\n"))
    }
}

// ── Health gate ───────────────────────────────────────────────────

/// Scripted health gate: every port is healthy except the listed ones.
pub struct FakeGate {
    unhealthy_ports: HashSet<u16>,
    probes: Mutex<Vec<String>>,
}

impl FakeGate {
    pub fn all_healthy() -> Self {
        Self::unhealthy_on(&[])
    }

    pub fn unhealthy_on(ports: &[u16]) -> Self {
        Self {
            unhealthy_ports: ports.iter().copied().collect(),
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn probed(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

impl HealthGate for FakeGate {
    async fn await_healthy(&self, address: &str) -> HealthVerdict {
        self.probes.lock().unwrap().push(address.to_string());
        let port: u16 = address
            .rsplit_once(':')
            .and_then(|(_, p)| p.parse().ok())
            .unwrap_or(0);
        if self.unhealthy_ports.contains(&port) {
            HealthVerdict::TimedOut { attempts: 30 }
        } else {
            HealthVerdict::Healthy { path: "/up".into(), attempts: 1 }
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────

/// In-memory artifact registry with monotonically increasing epochs.
pub struct FakeRegistry {
    artifacts: Mutex<Vec<ArtifactInfo>>,
    promoted: Mutex<Vec<String>>,
    next_epoch: AtomicU64,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            artifacts: Mutex::new(Vec::new()),
            promoted: Mutex::new(Vec::new()),
            next_epoch: AtomicU64::new(1),
        }
    }

    /// Pre-populate with `n` releases, epochs `1..=n`.
    pub fn with_releases(n: u64) -> Self {
        let fake = Self::new();
        {
            let mut artifacts = fake.artifacts.lock().unwrap();
            for epoch in 1..=n {
                artifacts.push(ArtifactInfo {
                    tag: release_tag(epoch),
                    created_at: epoch,
                    size: "100MB".into(),
                });
            }
        }
        fake.next_epoch.store(n + 1, Ordering::SeqCst);
        fake
    }

    pub fn promoted(&self) -> Vec<String> {
        self.promoted.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<String> {
        let mut list = self.artifacts.lock().unwrap().clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.into_iter().map(|a| a.tag).collect()
    }
}

impl ArtifactRegistry for FakeRegistry {
    async fn build(&self, _app: &Application, _source_ref: &str) -> RegistryResult<String> {
        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst);
        let tag = release_tag(epoch);
        self.artifacts.lock().unwrap().push(ArtifactInfo {
            tag: tag.clone(),
            created_at: epoch,
            size: "100MB".into(),
        });
        Ok(tag)
    }

    async fn promote(&self, _repository: &str, tag: &str) -> RegistryResult<()> {
        self.promoted.lock().unwrap().push(tag.to_string());
        Ok(())
    }

    async fn list(&self, _repository: &str) -> RegistryResult<Vec<ArtifactInfo>> {
        let mut list = self.artifacts.lock().unwrap().clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn current(&self, _repository: &str) -> RegistryResult<Option<String>> {
        // The alias follows promotions, not builds.
        Ok(self.promoted.lock().unwrap().last().cloned())
    }

    async fn remove(&self, _repository: &str, tag: &str) -> RegistryResult<()> {
        self.artifacts.lock().unwrap().retain(|a| a.tag != tag);
        Ok(())
    }
}

// ── Backup ────────────────────────────────────────────────────────

pub struct FakeBackup {
    fail: bool,
    pub dumps: Mutex<u32>,
    pub restored: Mutex<Vec<String>>,
}

impl FakeBackup {
    pub fn ok() -> Self {
        Self { fail: false, dumps: Mutex::new(0), restored: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { fail: true, dumps: Mutex::new(0), restored: Mutex::new(Vec::new()) }
    }
}

impl DatabaseBackup for FakeBackup {
    async fn dump(&self, app: &Application) -> MigrateResult<BackupFile> {
        *self.dumps.lock().unwrap() += 1;
        if self.fail {
            return Err(MigrateError::Backup("disk full".into()));
        }
        Ok(BackupFile {
            path: format!("/backups/{}-1.dump", app.name).into(),
            size_bytes: 2048,
            created_at: 1,
        })
    }

    async fn restore(&self, _app: &Application, path: &std::path::Path) -> MigrateResult<()> {
        if self.fail {
            return Err(MigrateError::Restore("corrupt dump".into()));
        }
        self.restored
            .lock()
            .unwrap()
            .push(path.display().to_string());
        Ok(())
    }
}

// ── Proxy control ─────────────────────────────────────────────────

/// Always-valid proxy control that counts reloads.
pub struct CountingControl {
    pub reloads: Mutex<u32>,
}

impl CountingControl {
    pub fn new() -> Self {
        Self { reloads: Mutex::new(0) }
    }
}

impl slipway_proxy::ProxyControl for &CountingControl {
    async fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    async fn reload(&self) -> Result<(), String> {
        *self.reloads.lock().unwrap() += 1;
        Ok(())
    }
}
