//! Pre-migration database dumps.
//!
//! The dump step is intentionally unbounded in time: interrupting a
//! half-written backup is worse than waiting, and the per-application
//! lock already prevents concurrent deployments from piling up.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{SystemTime, UNIX_EPOCH};

use slipway_core::Application;
use tokio::process::Command;
use tracing::info;

use crate::error::{MigrateError, MigrateResult};

/// A completed dump on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Unix seconds.
    pub created_at: u64,
}

/// Seam over the database dump/restore tooling.
pub trait DatabaseBackup: Send + Sync {
    fn dump(&self, app: &Application) -> impl Future<Output = MigrateResult<BackupFile>> + Send;

    /// Restore a previously taken dump over the application's database.
    /// Destructive; only invoked by an explicit operator command.
    fn restore(
        &self,
        app: &Application,
        path: &Path,
    ) -> impl Future<Output = MigrateResult<()>> + Send;
}

/// `pg_dump`/`pg_restore`-backed implementation. The connection string
/// comes from the application's `DATABASE_URL` environment entry.
#[derive(Debug, Clone)]
pub struct PgDump {
    binary: String,
    restore_binary: String,
    backup_dir: PathBuf,
}

impl PgDump {
    pub fn new(backup_dir: &Path) -> Self {
        Self {
            binary: "pg_dump".to_string(),
            restore_binary: "pg_restore".to_string(),
            backup_dir: backup_dir.to_path_buf(),
        }
    }

    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }
}

fn database_url(app: &Application) -> MigrateResult<&str> {
    app.env
        .get("DATABASE_URL")
        .map(String::as_str)
        .ok_or_else(|| MigrateError::Backup("no DATABASE_URL configured".into()))
}

impl DatabaseBackup for PgDump {
    async fn dump(&self, app: &Application) -> MigrateResult<BackupFile> {
        let database_url = database_url(app)?;

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = self
            .backup_dir
            .join(format!("{}-{created_at}.dump", app.name));

        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|e| MigrateError::Backup(e.to_string()))?;

        info!(app = %app.name, path = %path.display(), "dumping database");

        let output = Command::new(&self.binary)
            .arg("--format=custom")
            .arg("--file")
            .arg(&path)
            .arg(database_url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MigrateError::Backup(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Do not leave a partial dump behind.
            let _ = std::fs::remove_file(&path);
            return Err(MigrateError::Backup(format!(
                "pg_dump exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let size_bytes = std::fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| MigrateError::Backup(e.to_string()))?;

        info!(path = %path.display(), size_bytes, "backup complete");
        Ok(BackupFile { path, size_bytes, created_at })
    }

    async fn restore(&self, app: &Application, path: &Path) -> MigrateResult<()> {
        let database_url = database_url(app)?;
        if !path.is_file() {
            return Err(MigrateError::Restore(format!(
                "dump file not found: {}",
                path.display()
            )));
        }

        info!(app = %app.name, path = %path.display(), "restoring database");

        let output = Command::new(&self.restore_binary)
            .arg("--clean")
            .arg("--if-exists")
            .arg("--dbname")
            .arg(database_url)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MigrateError::Restore(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrateError::Restore(format!(
                "pg_restore exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        info!(app = %app.name, "restore complete");
        Ok(())
    }
}
