//! slipway-runtime — container lifecycle management.
//!
//! The deployment engine talks to the container runtime only through the
//! [`ContainerRuntime`] trait, so tests drive it with an in-memory fake
//! and production uses the [`DockerRuntime`] CLI driver.
//!
//! Lifecycle rules the trait implementations must uphold:
//! - `start` fails fast on a bound port, no retries.
//! - `stop` and `remove` are idempotent; unknown names are a no-op.
//! - every started instance carries the runtime's restart policy so a
//!   crash unrelated to a deployment is retried by the supervisor, not
//!   by the deployment engine.

pub mod docker;
pub mod error;
pub mod types;

pub use docker::DockerRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use types::{ExecOutput, Instance, InstanceSpec, RestartPolicy};

/// Operations the deployment engine needs from a container runtime.
pub trait ContainerRuntime: Send + Sync {
    /// Launch an instance bound to `spec.host_port`.
    ///
    /// Fails fast with [`RuntimeError::PortConflict`] if the port is
    /// already bound; never retries.
    fn start(&self, spec: &InstanceSpec) -> impl Future<Output = RuntimeResult<()>> + Send;

    /// Stop a running instance. No-op if the name does not exist.
    fn stop(&self, name: &str) -> impl Future<Output = RuntimeResult<()>> + Send;

    /// Remove a stopped instance, releasing the name for reuse.
    /// No-op if the name does not exist.
    fn remove(&self, name: &str) -> impl Future<Output = RuntimeResult<()>> + Send;

    /// Introspect running instances whose name starts with `prefix`.
    fn list(&self, prefix: &str) -> impl Future<Output = RuntimeResult<Vec<Instance>>> + Send;

    /// Run a disposable one-shot container to completion and capture its
    /// exit code and output. Used for migration status/apply checks.
    fn exec_once(
        &self,
        image: &str,
        command: &[String],
        env: &std::collections::HashMap<String, String>,
    ) -> impl Future<Output = RuntimeResult<ExecOutput>> + Send;

    /// Fetch recent log output for an instance.
    fn logs(&self, name: &str, tail: u32) -> impl Future<Output = RuntimeResult<String>> + Send;
}
