//! Tagged advisory locks.
//!
//! Two serialization domains exist: per-application (two deployments of the
//! same application must never interleave) and the proxy config directory
//! (concurrent `sync` calls across applications would clobber each other's
//! backup/validate/reload sequence). Both use a lock file created with
//! `create_new`, which is atomic on every platform we care about; the file
//! records the holder's pid for the contention error message.
//!
//! Contention is surfaced immediately, never queued.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("{tag} is locked (held by {holder}); a deployment is already in progress")]
    Contended { tag: String, holder: String },

    #[error("lock io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a lock protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTag {
    /// All mutating operations on one application.
    App(String),
    /// The shared reverse-proxy configuration directory.
    ProxyConfig,
}

impl LockTag {
    fn file_name(&self) -> String {
        match self {
            LockTag::App(name) => format!("app-{name}.lock"),
            LockTag::ProxyConfig => "proxy.lock".to_string(),
        }
    }
}

impl std::fmt::Display for LockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockTag::App(name) => write!(f, "application {name}"),
            LockTag::ProxyConfig => write!(f, "proxy configuration"),
        }
    }
}

/// A held advisory lock. Released on drop.
#[derive(Debug)]
pub struct AdvisoryLock {
    path: PathBuf,
    tag: LockTag,
}

impl AdvisoryLock {
    /// Try to acquire the lock for `tag` under `lock_dir`.
    ///
    /// Fails with `Contended` if another holder exists; never blocks.
    pub fn try_acquire(lock_dir: &Path, tag: LockTag) -> Result<Self, LockError> {
        fs::create_dir_all(lock_dir)?;
        let path = lock_dir.join(tag.file_name());

        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                use std::io::Write;
                let mut file = file;
                let _ = writeln!(file, "pid {}", std::process::id());
                debug!(%tag, path = %path.display(), "lock acquired");
                Ok(AdvisoryLock { path, tag })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                Err(LockError::Contended {
                    tag: tag.to_string(),
                    holder,
                })
            }
            Err(e) => Err(LockError::Io(e)),
        }
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            // Leaving a stale lock file is preferable to panicking in drop;
            // the operator can remove it by hand.
            tracing::warn!(tag = %self.tag, error = %e, "failed to release lock file");
        } else {
            debug!(tag = %self.tag, "lock released");
        }
    }
}
