//! Domain types for the Slipway history store.
//!
//! `DeploymentRecord` is one row per deploy/restart/scale/rollback
//! invocation; `BackupRecord` is one row per pre-migration database dump.
//! Both are append-only: written once at completion, never mutated.

use serde::{Deserialize, Serialize};

/// Which operator action produced a deployment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deploy,
    Restart,
    Scale,
    Rollback,
}

/// Overall outcome of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOutcome {
    /// Every slot reached the target artifact.
    Succeeded,
    /// A staging health check failed; earlier slots run the new artifact,
    /// later slots still serve the prior one.
    Aborted,
    /// A production-bound re-check or a consistency gate failed.
    Failed,
}

/// Per-slot result within one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOutcome {
    /// Slot replaced and re-checked healthy on its production port.
    Replaced,
    /// Staging check failed; the prior instance kept serving.
    Failed,
    /// Never reached because an earlier slot aborted the deployment.
    Skipped,
    /// Removed by a scale-down after all replacements succeeded.
    Removed,
}

/// One slot's entry in a deployment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    /// 1-based slot index.
    pub slot: u32,
    /// Production port owned by the slot.
    pub port: u16,
    pub outcome: SlotOutcome,
}

/// One per deploy/restart/scale/rollback invocation. Append-only log,
/// consulted only for operator visibility, never for control decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub app: String,
    pub kind: OperationKind,
    /// Target artifact tag.
    pub artifact: String,
    pub target_scale: u32,
    /// Unix seconds.
    pub started_at: u64,
    pub finished_at: u64,
    pub slots: Vec<SlotRecord>,
    pub outcome: DeploymentOutcome,
}

/// A timestamped database dump taken before applying schema changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub app: String,
    /// Path of the dump file on disk.
    pub path: String,
    pub size_bytes: u64,
    /// Unix seconds.
    pub created_at: u64,
}

impl DeploymentRecord {
    /// Composite key for the deployments table.
    pub fn table_key(&self) -> String {
        record_key(&self.app, self.started_at)
    }
}

impl BackupRecord {
    /// Composite key for the backups table.
    pub fn table_key(&self) -> String {
        record_key(&self.app, self.created_at)
    }
}

/// Build a `{app}:{epoch}` key, zero-padding the epoch so lexicographic
/// order matches chronological order.
pub fn record_key(app: &str, epoch: u64) -> String {
    format!("{app}:{epoch:020}")
}
