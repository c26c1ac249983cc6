//! The synchronizer: backup, write, validate, reload — or revert.

use std::fs;
use std::path::{Path, PathBuf};

use slipway_core::{AdvisoryLock, Application, LockTag};
use tracing::{info, warn};

use crate::control::ProxyControl;
use crate::error::ProxyResult;
use crate::upstream::render_fragment;

/// What a `sync` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New fragment live, proxy reloaded.
    Synced,
    /// Validation failed; prior fragment restored byte-for-byte, proxy
    /// process untouched.
    Reverted { reason: String },
}

/// Regenerates and swaps in one application's upstream fragment.
pub struct ProxySync<C> {
    conf_dir: PathBuf,
    lock_dir: PathBuf,
    control: C,
}

impl<C: ProxyControl> ProxySync<C> {
    pub fn new(conf_dir: &Path, lock_dir: &Path, control: C) -> Self {
        Self {
            conf_dir: conf_dir.to_path_buf(),
            lock_dir: lock_dir.to_path_buf(),
            control,
        }
    }

    /// Path of the application's fragment.
    pub fn fragment_path(&self, app: &Application) -> PathBuf {
        self.conf_dir.join(format!("{}.conf", app.name))
    }

    /// Regenerate the fragment for `new_scale` and swap it in.
    ///
    /// Callers invoke this only when the scale actually changed; a
    /// same-scale redeploy reuses the same ports and needs no config
    /// change. Holds the proxy-config lock for the whole
    /// backup/write/validate/reload sequence.
    pub async fn sync(&self, app: &Application, new_scale: u32) -> ProxyResult<SyncOutcome> {
        let _lock = AdvisoryLock::try_acquire(&self.lock_dir, LockTag::ProxyConfig)?;

        fs::create_dir_all(&self.conf_dir)?;
        let path = self.fragment_path(app);
        let backup_path = path.with_extension("conf.bak");

        // Keep the previous fragment until the new one is validated.
        let previous: Option<Vec<u8>> = match fs::read(&path) {
            Ok(bytes) => {
                fs::write(&backup_path, &bytes)?;
                Some(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let fragment = render_fragment(app, new_scale);
        fs::write(&path, fragment.as_bytes())?;

        if let Err(reason) = self.control.validate().await {
            // Restore exactly what was there before; never touch the
            // live proxy process on a validation failure.
            match &previous {
                Some(bytes) => fs::write(&path, bytes)?,
                None => fs::remove_file(&path)?,
            }
            let _ = fs::remove_file(&backup_path);
            warn!(app = %app.name, %reason, "proxy config rejected, reverted");
            return Ok(SyncOutcome::Reverted { reason });
        }

        self.control
            .reload()
            .await
            .map_err(crate::error::ProxyError::Reload)?;
        let _ = fs::remove_file(&backup_path);

        info!(app = %app.name, scale = new_scale, "proxy config synced");
        Ok(SyncOutcome::Synced)
    }
}
