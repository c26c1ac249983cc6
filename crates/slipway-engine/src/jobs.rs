//! Retention jobs.
//!
//! Periodic cleanup run from the CLI (cron or a post-deploy hook):
//! prune old release artifacts beyond the keep-last window and expire
//! database backups past their age limit. Both are idempotent; a
//! half-finished run leaves nothing inconsistent, the next run picks up
//! where it stopped.

use std::fs;
use std::io::ErrorKind;

use slipway_registry::ArtifactRegistry;
use slipway_state::{BackupRecord, HistoryStore};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

const SECS_PER_DAY: u64 = 86_400;

/// What one retention pass removed.
#[derive(Debug, Clone, Default)]
pub struct PruneSummary {
    /// Artifact tags removed, oldest first.
    pub artifacts: Vec<String>,
    /// Backup records expired (dump files deleted alongside).
    pub backups: Vec<BackupRecord>,
}

/// Remove release artifacts beyond the `keep_last` newest.
///
/// The `current` alias always points at a retained release because
/// promotion happens on every deploy; only unaliased older releases are
/// eligible. Returns the removed tags, oldest first.
pub async fn prune_artifacts<B: ArtifactRegistry>(
    registry: &B,
    repository: &str,
    keep_last: usize,
) -> EngineResult<Vec<String>> {
    if keep_last == 0 {
        return Err(EngineError::Precondition(
            "artifact retention must keep at least one release".into(),
        ));
    }

    let artifacts = registry.list(repository).await?;
    let mut removed = Vec::new();
    // list() is newest-first; everything past the window goes, oldest
    // removed first so an interrupted run keeps the newest survivors.
    for artifact in artifacts.iter().skip(keep_last).rev() {
        registry.remove(repository, &artifact.tag).await?;
        debug!(%repository, tag = %artifact.tag, "artifact pruned");
        removed.push(artifact.tag.clone());
    }

    if !removed.is_empty() {
        info!(%repository, count = removed.len(), "artifacts pruned");
    }
    Ok(removed)
}

/// Expire backups older than `keep_days`, deleting the dump file and
/// its record. A dump file already gone is not an error; the record is
/// removed either way.
pub fn prune_backups(
    history: &HistoryStore,
    app: &str,
    keep_days: u64,
    now: u64,
) -> EngineResult<Vec<BackupRecord>> {
    let cutoff = now.saturating_sub(keep_days * SECS_PER_DAY);
    let mut removed = Vec::new();

    for backup in history.list_backups(app)? {
        if backup.created_at >= cutoff {
            continue;
        }
        match fs::remove_file(&backup.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        history.delete_backup(app, backup.created_at)?;
        debug!(%app, path = %backup.path, "backup expired");
        removed.push(backup);
    }

    if !removed.is_empty() {
        info!(%app, count = removed.len(), "backups expired");
    }
    Ok(removed)
}
