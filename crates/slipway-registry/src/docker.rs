//! Docker CLI driver for the artifact registry.
//!
//! `build` produces `{repo}:release-{epoch}`; `promote` re-points the
//! `current` alias tag; `list` parses `docker image ls` JSON lines and
//! orders by the epoch embedded in the release tag, newest first.

use std::process::Stdio;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use slipway_core::Application;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::types::{ArtifactInfo, CURRENT_TAG, release_tag};
use crate::ArtifactRegistry;

/// Artifact registry backed by the local Docker image store.
#[derive(Debug, Clone)]
pub struct DockerRegistry {
    binary: String,
}

impl Default for DockerRegistry {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerRegistry {
    pub fn new(binary: &str) -> Self {
        Self { binary: binary.to_string() }
    }

    async fn run_checked(&self, args: &[&str]) -> RegistryResult<String> {
        debug!(binary = %self.binary, ?args, "registry invocation");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RegistryError::Command(format!(
                "docker {} exited with {}: {}",
                args.first().copied().unwrap_or(""),
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// One line of `docker image ls --format '{{json .}}'` output.
#[derive(Debug, Deserialize)]
struct ImageLine {
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Size", default)]
    size: String,
}

/// Parse image-list JSON lines into release artifacts, newest-first.
/// Alias tags (`current`) and foreign tags are skipped.
fn parse_artifacts(stdout: &str) -> RegistryResult<Vec<ArtifactInfo>> {
    let mut artifacts = Vec::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let image: ImageLine = serde_json::from_str(line)
            .map_err(|e| RegistryError::Parse(format!("{e}: {line}")))?;
        if let Some(epoch) = ArtifactInfo::epoch_of(&image.tag) {
            artifacts.push(ArtifactInfo {
                tag: image.tag,
                created_at: epoch,
                size: image.size,
            });
        }
    }
    artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(artifacts)
}

/// Find the release tag whose image id matches the `current` alias.
///
/// The alias and the release it was promoted from share an image id, so
/// matching ids recovers the tag. Ties (a re-promoted old release) break
/// toward the newest matching release.
fn resolve_current(stdout: &str) -> RegistryResult<Option<String>> {
    let mut current_id = None;
    let mut releases: Vec<(u64, String, String)> = Vec::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let image: ImageLine = serde_json::from_str(line)
            .map_err(|e| RegistryError::Parse(format!("{e}: {line}")))?;
        if image.tag == CURRENT_TAG {
            current_id = Some(image.id);
        } else if let Some(epoch) = ArtifactInfo::epoch_of(&image.tag) {
            releases.push((epoch, image.id, image.tag));
        }
    }
    let Some(id) = current_id else {
        return Ok(None);
    };
    releases.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(releases
        .into_iter()
        .find(|(_, release_id, _)| *release_id == id)
        .map(|(_, _, tag)| tag))
}

impl ArtifactRegistry for DockerRegistry {
    async fn build(&self, app: &Application, source_ref: &str) -> RegistryResult<String> {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let tag = release_tag(epoch);
        let image = format!("{}:{}", app.repository, tag);

        info!(app = %app.name, %image, %source_ref, "building artifact");

        let mut args: Vec<String> = vec!["build".into(), "-t".into(), image.clone()];
        args.extend(app.profile.build_args());
        args.push(source_ref.to_string());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_checked(&arg_refs)
            .await
            .map_err(|e| RegistryError::Build(e.to_string()))?;

        info!(%tag, "artifact built");
        Ok(tag)
    }

    async fn promote(&self, repository: &str, tag: &str) -> RegistryResult<()> {
        let source = format!("{repository}:{tag}");
        let current = format!("{repository}:{CURRENT_TAG}");
        self.run_checked(&["tag", &source, &current]).await?;
        info!(%source, "promoted to current");
        Ok(())
    }

    async fn list(&self, repository: &str) -> RegistryResult<Vec<ArtifactInfo>> {
        let stdout = self
            .run_checked(&["image", "ls", repository, "--format", "{{json .}}"])
            .await?;
        parse_artifacts(&stdout)
    }

    async fn current(&self, repository: &str) -> RegistryResult<Option<String>> {
        let stdout = self
            .run_checked(&["image", "ls", repository, "--format", "{{json .}}"])
            .await?;
        resolve_current(&stdout)
    }

    async fn remove(&self, repository: &str, tag: &str) -> RegistryResult<()> {
        let image = format!("{repository}:{tag}");
        self.run_checked(&["rmi", &image]).await?;
        info!(%image, "artifact removed");
        Ok(())
    }
}
