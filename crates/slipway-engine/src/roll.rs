//! Slot-by-slot rolling replacement.
//!
//! For each slot: start the candidate on the slot's staging port, gate
//! it, and only then replace the production occupant. The staging probe
//! is meant to catch almost all failures before anything is destroyed;
//! the second gate against the production-bound instance is a narrow
//! safety net for port-binding-specific failures, and its failure is
//! fatal because the old instance is already gone.

use std::collections::HashMap;
use std::time::Duration;

use slipway_core::{Application, Role, production_port, staging_port};
use slipway_health::{HealthGate, HealthVerdict};
use slipway_runtime::{ContainerRuntime, InstanceSpec, RestartPolicy};
use slipway_state::{DeploymentOutcome, SlotOutcome, SlotRecord};
use tracing::{info, warn};

use crate::error::EngineResult;

/// Per-slot and overall result of one rolling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RollReport {
    pub outcome: DeploymentOutcome,
    pub slots: Vec<SlotRecord>,
    /// Target artifact tag the pass was rolling to.
    pub artifact: String,
}

impl RollReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == DeploymentOutcome::Succeeded
    }
}

/// The rolling engine. Generic over runtime and gate so tests drive it
/// with in-memory fakes.
pub struct RollingEngine<'a, R, G> {
    runtime: &'a R,
    gate: &'a G,
    /// Pause between slots so the proxy's passive health monitoring
    /// stabilizes before the next slot goes down.
    settle: Duration,
}

impl<'a, R: ContainerRuntime, G: HealthGate> RollingEngine<'a, R, G> {
    pub fn new(runtime: &'a R, gate: &'a G, settle: Duration) -> Self {
        Self { runtime, gate, settle }
    }

    /// Current web scale, re-derived from the live instance set.
    ///
    /// The highest slot index bound by a running web instance, so a
    /// crashed middle slot does not shrink the perceived scale.
    pub async fn current_scale(&self, app: &Application) -> EngineResult<u32> {
        let instances = self.runtime.list(&app.name_prefix()).await?;
        let scale = instances
            .iter()
            .filter(|i| i.is_running())
            .filter_map(|i| slipway_runtime::Instance::parse_name(&i.name))
            .filter(|(role, _)| *role == Role::Web)
            .map(|(_, slot)| slot)
            .max()
            .unwrap_or(0);
        Ok(scale)
    }

    /// Replace every slot with `tag`, growing or shrinking to
    /// `target_scale`.
    ///
    /// Returns a report rather than an error for health-gate failures:
    /// an aborted deployment is a normal, recoverable outcome, not a
    /// bug. Infrastructure errors (runtime failures, port conflicts)
    /// propagate as errors.
    pub async fn roll(
        &self,
        app: &Application,
        target_scale: u32,
        tag: &str,
    ) -> EngineResult<RollReport> {
        let image = format!("{}:{}", app.repository, tag);
        let current_scale = self.current_scale(app).await?;

        info!(
            app = %app.name,
            %tag,
            current_scale,
            target_scale,
            "rolling deployment starting"
        );

        let mut slots = Vec::new();

        for slot in 1..=target_scale {
            let port = production_port(app.base_port, slot);

            match self.replace_slot(app, slot, &image).await? {
                SlotStep::Replaced => {
                    slots.push(SlotRecord { slot, port, outcome: SlotOutcome::Replaced });
                    // Let passive health routing stabilize before taking
                    // the next slot down.
                    if slot < target_scale && !self.settle.is_zero() {
                        tokio::time::sleep(self.settle).await;
                    }
                }
                SlotStep::StagingUnhealthy => {
                    warn!(app = %app.name, slot, "staging check failed, aborting remaining slots");
                    slots.push(SlotRecord { slot, port, outcome: SlotOutcome::Failed });
                    mark_skipped(&mut slots, app, slot + 1, target_scale);
                    return Ok(RollReport {
                        outcome: DeploymentOutcome::Aborted,
                        slots,
                        artifact: tag.to_string(),
                    });
                }
                SlotStep::ProductionUnhealthy => {
                    // The old instance is already gone; this is the fatal
                    // branch of the intentional staging/production
                    // asymmetry.
                    warn!(app = %app.name, slot, "production re-check failed, deployment failed");
                    slots.push(SlotRecord { slot, port, outcome: SlotOutcome::Failed });
                    mark_skipped(&mut slots, app, slot + 1, target_scale);
                    return Ok(RollReport {
                        outcome: DeploymentOutcome::Failed,
                        slots,
                        artifact: tag.to_string(),
                    });
                }
            }
        }

        // Shrink only once growth/replacement is confirmed healthy.
        for slot in (target_scale + 1)..=current_scale {
            let name = app.instance_name(Role::Web, slot);
            self.runtime.stop(&name).await?;
            self.runtime.remove(&name).await?;
            slots.push(SlotRecord {
                slot,
                port: production_port(app.base_port, slot),
                outcome: SlotOutcome::Removed,
            });
            info!(app = %app.name, slot, "slot removed by scale-down");
        }

        info!(app = %app.name, %tag, "rolling deployment succeeded");
        Ok(RollReport {
            outcome: DeploymentOutcome::Succeeded,
            slots,
            artifact: tag.to_string(),
        })
    }

    /// Replace one slot. The staging instance is removed on every path.
    async fn replace_slot(
        &self,
        app: &Application,
        slot: u32,
        image: &str,
    ) -> EngineResult<SlotStep> {
        let staging = staging_port(app.base_port, slot);
        let staging_name = app.staging_name(slot);

        self.runtime
            .start(&staging_spec(app, &staging_name, image, staging))
            .await?;

        let verdict = self
            .gate
            .await_healthy(&format!("127.0.0.1:{staging}"))
            .await;
        self.runtime.stop(&staging_name).await?;
        self.runtime.remove(&staging_name).await?;

        if !verdict.is_healthy() {
            // The production instance at this slot was never touched.
            return Ok(SlotStep::StagingUnhealthy);
        }

        let port = production_port(app.base_port, slot);
        let name = app.instance_name(Role::Web, slot);
        self.runtime.stop(&name).await?;
        self.runtime.remove(&name).await?;
        self.runtime
            .start(&production_spec(app, &name, image, port))
            .await?;

        // Catches port-binding-specific failures the staging probe could
        // not see.
        let verdict = self.gate.await_healthy(&format!("127.0.0.1:{port}")).await;
        match verdict {
            HealthVerdict::Healthy { .. } => Ok(SlotStep::Replaced),
            HealthVerdict::TimedOut { .. } => Ok(SlotStep::ProductionUnhealthy),
        }
    }
}

enum SlotStep {
    Replaced,
    StagingUnhealthy,
    ProductionUnhealthy,
}

fn mark_skipped(slots: &mut Vec<SlotRecord>, app: &Application, from: u32, to: u32) {
    for slot in from..=to {
        slots.push(SlotRecord {
            slot,
            port: production_port(app.base_port, slot),
            outcome: SlotOutcome::Skipped,
        });
    }
}

fn staging_spec(app: &Application, name: &str, image: &str, port: u16) -> InstanceSpec {
    InstanceSpec {
        name: name.to_string(),
        image: image.to_string(),
        host_port: port,
        container_port: app.profile.container_port(),
        role: Role::Web,
        env: instance_env(app),
        // A probe vehicle; the supervisor must not resurrect it.
        restart: RestartPolicy::No,
    }
}

fn production_spec(app: &Application, name: &str, image: &str, port: u16) -> InstanceSpec {
    InstanceSpec {
        name: name.to_string(),
        image: image.to_string(),
        host_port: port,
        container_port: app.profile.container_port(),
        role: Role::Web,
        env: instance_env(app),
        // Crash recovery between deployments belongs to the supervisor.
        restart: RestartPolicy::OnFailure,
    }
}

fn instance_env(app: &Application) -> HashMap<String, String> {
    let mut env = app.env.clone();
    env.insert("PORT".to_string(), app.profile.container_port().to_string());
    env
}
