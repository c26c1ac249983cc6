//! slipway-core — shared model for the Slipway deployment orchestrator.
//!
//! Defines the application model (identity, reserved port range, profile),
//! the `slipway.toml` configuration parser, deterministic instance naming
//! and port assignment, tagged advisory locks, and the notification seam.
//!
//! Everything here is collaborator-free: no subprocesses, no network. The
//! crates that drive Docker, nginx, and the database build on these types.

pub mod app;
pub mod config;
pub mod lock;
pub mod notify;

pub use app::{Application, ApplicationProfile, Role, production_port, staging_port};
pub use config::{AppConfig, ConfigError};
pub use lock::{AdvisoryLock, LockError, LockTag};
pub use notify::{DeployEvent, LogNotifier, Notifier};
