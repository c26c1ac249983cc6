//! The migration gate itself.

use slipway_core::Application;
use slipway_runtime::ContainerRuntime;
use tracing::{debug, info, warn};

use crate::backup::{BackupFile, DatabaseBackup};
use crate::error::{MigrateError, MigrateResult};

/// Phases the gate moves through, for logging and post-mortems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    NoOp,
    PendingDetected,
    BackedUp,
    Applied,
    Done,
}

/// What the gate did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No pending schema changes; nothing was backed up or applied.
    UpToDate,
    /// Changes were applied after a successful backup.
    Applied { backup: BackupFile },
}

/// Runs the candidate artifact's own migration tooling inside disposable
/// one-shot containers; no production traffic ever reaches them.
pub struct MigrationGate<'a, R, B> {
    runtime: &'a R,
    backup: &'a B,
}

impl<'a, R: ContainerRuntime, B: DatabaseBackup> MigrationGate<'a, R, B> {
    pub fn new(runtime: &'a R, backup: &'a B) -> Self {
        Self { runtime, backup }
    }

    /// Ensure the schema matches what `candidate_image` expects.
    ///
    /// Exit code 0 from the profile's status command means up to date;
    /// any other exit means pending changes. Profiles without framework
    /// migrations short-circuit to `UpToDate`.
    pub async fn ensure_schema_current(
        &self,
        app: &Application,
        candidate_image: &str,
    ) -> MigrateResult<MigrationOutcome> {
        let Some(status_cmd) = app.profile.migration_status_command() else {
            debug!(app = %app.name, phase = ?MigrationPhase::NoOp, "profile has no migrations, gate is a no-op");
            return Ok(MigrationOutcome::UpToDate);
        };

        let status = self
            .runtime
            .exec_once(candidate_image, &status_cmd, &app.env)
            .await?;
        if status.success() {
            debug!(app = %app.name, phase = ?MigrationPhase::Done, "schema up to date");
            return Ok(MigrationOutcome::UpToDate);
        }

        info!(
            app = %app.name,
            phase = ?MigrationPhase::PendingDetected,
            "pending schema changes detected"
        );

        // Backup before touching the schema. A failed dump aborts the
        // whole deployment: never apply unverified migrations without a
        // fallback.
        let backup = self.backup.dump(app).await?;
        debug!(
            app = %app.name,
            phase = ?MigrationPhase::BackedUp,
            path = %backup.path.display(),
            "backup taken"
        );

        let migrate_cmd = app
            .profile
            .migrate_command()
            .expect("profiles with a status command define a migrate command");
        let applied = self
            .runtime
            .exec_once(candidate_image, &migrate_cmd, &app.env)
            .await?;
        if !applied.success() {
            warn!(
                app = %app.name,
                exit_code = applied.exit_code,
                "migration apply failed, aborting deployment"
            );
            return Err(MigrateError::Apply(format!(
                "exit code {}: {}",
                applied.exit_code,
                applied.stderr.trim()
            )));
        }

        info!(app = %app.name, phase = ?MigrationPhase::Applied, "migrations applied");
        Ok(MigrationOutcome::Applied { backup })
    }
}
