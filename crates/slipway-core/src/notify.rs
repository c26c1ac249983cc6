//! Deployment event notifications.
//!
//! Fire-and-forget by contract: a notifier that fails must never fail a
//! deployment, so the trait is infallible and implementations swallow
//! their own errors.

use tracing::info;

/// Terminal (and start) events emitted by the deployment engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    Started { app: String, artifact: String },
    Succeeded { app: String, artifact: String },
    Aborted { app: String, artifact: String, reason: String },
    Failed { app: String, artifact: String, reason: String },
    RolledBack { app: String, artifact: String },
}

impl DeployEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DeployEvent::Started { .. } => "started",
            DeployEvent::Succeeded { .. } => "succeeded",
            DeployEvent::Aborted { .. } => "aborted",
            DeployEvent::Failed { .. } => "failed",
            DeployEvent::RolledBack { .. } => "rolled_back",
        }
    }
}

/// Outbound notification seam.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &DeployEvent);
}

/// Default notifier: structured log lines only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &DeployEvent) {
        match event {
            DeployEvent::Started { app, artifact } => {
                info!(%app, %artifact, "deployment started");
            }
            DeployEvent::Succeeded { app, artifact } => {
                info!(%app, %artifact, "deployment succeeded");
            }
            DeployEvent::Aborted { app, artifact, reason } => {
                info!(%app, %artifact, %reason, "deployment aborted");
            }
            DeployEvent::Failed { app, artifact, reason } => {
                info!(%app, %artifact, %reason, "deployment failed");
            }
            DeployEvent::RolledBack { app, artifact } => {
                info!(%app, %artifact, "rolled back");
            }
        }
    }
}
