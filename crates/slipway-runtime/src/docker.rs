//! Docker CLI driver for the container runtime trait.
//!
//! Shells out to `docker` with `tokio::process::Command` and parses the
//! `--format '{{json .}}'` line output of `docker ps`. One-shot work
//! (migration checks) runs under `docker run --rm` so the disposable
//! container is destroyed regardless of outcome.

use std::collections::HashMap;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{ExecOutput, Instance, InstanceSpec};
use crate::ContainerRuntime;

/// Container runtime backed by the local Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    binary: String,
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerRuntime {
    pub fn new(binary: &str) -> Self {
        Self { binary: binary.to_string() }
    }

    async fn run(&self, args: &[&str]) -> RuntimeResult<std::process::Output> {
        debug!(binary = %self.binary, ?args, "docker invocation");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        Ok(output)
    }

    /// Run a docker subcommand that must succeed, returning stdout.
    async fn run_checked(&self, args: &[&str]) -> RuntimeResult<String> {
        let output = self.run(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RuntimeError::Command(format!(
                "docker {} exited with {}: {}",
                args.first().copied().unwrap_or(""),
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// One line of `docker ps --format '{{json .}}'` output.
#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Ports", default)]
    ports: String,
    #[serde(rename = "State")]
    state: String,
}

impl ContainerRuntime for DockerRuntime {
    async fn start(&self, spec: &InstanceSpec) -> RuntimeResult<()> {
        // Reconcile against the live instance set before mutating: a bound
        // production port means stale state from a previous failed run.
        let live = self.list("").await?;
        if let Some(holder) = live
            .iter()
            .filter(|i| i.is_running())
            .find(|i| i.host_port == Some(spec.host_port))
        {
            return Err(RuntimeError::PortConflict {
                port: spec.host_port,
                held_by: holder.name.clone(),
            });
        }

        let port_binding = format!("{}:{}", spec.host_port, spec.container_port);
        let restart = format!("--restart={}", spec.restart.as_flag());
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            spec.name.clone(),
            restart,
            "-p".into(),
            port_binding,
            "--label".into(),
            format!("slipway.role={}", spec.role.as_str()),
        ];
        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run(&arg_refs).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            // The pre-check races against other processes; map the daemon's
            // own port error so the caller sees a conflict either way.
            if stderr.contains("port is already allocated") {
                return Err(RuntimeError::PortConflict {
                    port: spec.host_port,
                    held_by: "unknown".to_string(),
                });
            }
            return Err(RuntimeError::Start { name: spec.name.clone(), detail: stderr });
        }

        info!(
            name = %spec.name,
            image = %spec.image,
            port = spec.host_port,
            "instance started"
        );
        Ok(())
    }

    async fn stop(&self, name: &str) -> RuntimeResult<()> {
        let output = self.run(&["stop", name]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such container") {
                debug!(%name, "stop: no such instance, treating as no-op");
                return Ok(());
            }
            return Err(RuntimeError::Command(format!(
                "docker stop {name}: {}",
                stderr.trim()
            )));
        }
        info!(%name, "instance stopped");
        Ok(())
    }

    async fn remove(&self, name: &str) -> RuntimeResult<()> {
        let output = self.run(&["rm", "-f", name]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such container") {
                debug!(%name, "remove: no such instance, treating as no-op");
                return Ok(());
            }
            return Err(RuntimeError::Command(format!(
                "docker rm {name}: {}",
                stderr.trim()
            )));
        }
        debug!(%name, "instance removed");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> RuntimeResult<Vec<Instance>> {
        let filter = format!("name=^{prefix}");
        let stdout = self
            .run_checked(&["ps", "--all", "--filter", &filter, "--format", "{{json .}}"])
            .await?;

        let mut instances = Vec::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            let ps: PsLine = serde_json::from_str(line)
                .map_err(|e| RuntimeError::Parse(format!("{e}: {line}")))?;
            let role = Instance::parse_name(&ps.names).map(|(role, _)| role);
            instances.push(Instance {
                name: ps.names,
                image: ps.image,
                host_port: parse_host_port(&ps.ports),
                role,
                state: ps.state,
            });
        }
        Ok(instances)
    }

    async fn exec_once(
        &self,
        image: &str,
        command: &[String],
        env: &HashMap<String, String>,
    ) -> RuntimeResult<ExecOutput> {
        let mut args: Vec<String> = vec!["run".into(), "--rm".into()];
        for (key, value) in env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(image.to_string());
        args.extend(command.iter().cloned());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run(&arg_refs).await?;

        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            warn!(%image, ?command, exit_code, "one-shot run exited non-zero");
        }
        Ok(ExecOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn logs(&self, name: &str, tail: u32) -> RuntimeResult<String> {
        let tail = tail.to_string();
        let output = self.run(&["logs", "--tail", &tail, name]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RuntimeError::Command(format!(
                "docker logs {name}: {}",
                stderr.trim()
            )));
        }
        // Docker interleaves app output across stdout and stderr.
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }
}

/// Extract the host port from a Docker `Ports` column value like
/// `"0.0.0.0:3020->3000/tcp, :::3020->3000/tcp"`.
fn parse_host_port(ports: &str) -> Option<u16> {
    for mapping in ports.split(',') {
        let mapping = mapping.trim();
        let Some((host_part, _)) = mapping.split_once("->") else {
            continue;
        };
        if let Some((_, port)) = host_part.rsplit_once(':') {
            if let Ok(port) = port.parse() {
                return Some(port);
            }
        }
    }
    None
}
