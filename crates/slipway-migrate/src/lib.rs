//! slipway-migrate — the migration safety gate.
//!
//! Runs exactly once per deployment, strictly before any instance is
//! replaced: a half-migrated schema must never be exposed to only some
//! of the running instances.
//!
//! Phase machine: `NoOp → PendingDetected → BackedUp → Applied`, or
//! `NoOp → Done` when nothing is pending (the common case, which must
//! add negligible latency — one disposable status check, no backup).
//!
//! The backup is non-negotiable: if the dump fails, the deployment
//! aborts before the schema is touched. Unverified migrations without a
//! fallback are never applied.

pub mod backup;
pub mod error;
pub mod gate;

pub use backup::{BackupFile, DatabaseBackup, PgDump};
pub use error::{MigrateError, MigrateResult};
pub use gate::{MigrationGate, MigrationOutcome, MigrationPhase};
