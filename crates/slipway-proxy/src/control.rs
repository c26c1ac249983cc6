//! Proxy process control seam.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

/// Validate/reload operations on the proxy process. Validation always
/// covers the entire merged configuration: a syntax error anywhere
/// blocks the reload, not just errors in one application's fragment.
pub trait ProxyControl: Send + Sync {
    /// Check the complete proxy configuration. `Err` carries the
    /// validator's diagnostic.
    fn validate(&self) -> impl Future<Output = Result<(), String>> + Send;

    /// Graceful reload: in-flight connections on unrelated upstreams are
    /// unaffected. Never a restart.
    fn reload(&self) -> impl Future<Output = Result<(), String>> + Send;
}

/// nginx-backed control: `nginx -t` and `nginx -s reload`.
#[derive(Debug, Clone)]
pub struct NginxControl {
    binary: String,
}

impl Default for NginxControl {
    fn default() -> Self {
        Self::new("nginx")
    }
}

impl NginxControl {
    pub fn new(binary: &str) -> Self {
        Self { binary: binary.to_string() }
    }

    async fn run(&self, args: &[&str]) -> Result<(), String> {
        debug!(binary = %self.binary, ?args, "nginx invocation");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            // nginx writes diagnostics to stderr.
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }
        Ok(())
    }
}

impl ProxyControl for NginxControl {
    async fn validate(&self) -> Result<(), String> {
        self.run(&["-t"]).await
    }

    async fn reload(&self) -> Result<(), String> {
        self.run(&["-s", "reload"]).await?;
        info!("proxy reloaded");
        Ok(())
    }
}
