//! Instance and launch types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slipway_core::Role;

/// Supervisor restart policy attached at start time.
///
/// Crash recovery belongs to the process supervisor; the deployment
/// engine itself never retries a failed start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    No,
    OnFailure,
    Always,
}

impl RestartPolicy {
    /// Flag value understood by the Docker CLI.
    pub fn as_flag(&self) -> &'static str {
        match self {
            RestartPolicy::No => "no",
            RestartPolicy::OnFailure => "on-failure",
            RestartPolicy::Always => "always",
        }
    }
}

/// Everything needed to launch one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub name: String,
    /// Full image reference including tag.
    pub image: String,
    /// Host port the instance binds.
    pub host_port: u16,
    /// Port the application listens on inside the container.
    pub container_port: u16,
    pub role: Role,
    pub env: HashMap<String, String>,
    pub restart: RestartPolicy,
}

/// A running (or stopping) instance as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub image: String,
    /// Bound host port, if any (worker roles bind none).
    pub host_port: Option<u16>,
    pub role: Option<Role>,
    /// Runtime-reported state string ("running", "exited", ...).
    pub state: String,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// Parse role and slot out of a deterministic instance name
    /// (`{app}-{role}-{slot}` or `{app}-{role}-{slot}-next`).
    pub fn parse_name(name: &str) -> Option<(Role, u32)> {
        let trimmed = name.strip_suffix("-next").unwrap_or(name);
        let mut parts = trimmed.rsplitn(3, '-');
        let slot = parts.next()?.parse().ok()?;
        let role = Role::parse(parts.next()?)?;
        Some((role, slot))
    }
}

/// Captured result of a one-shot container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
