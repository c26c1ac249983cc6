//! slipway-engine — the rolling deployment engine.
//!
//! Replaces an application's instances one slot at a time, each
//! replacement gated by a live health check against a staging port
//! before anything serving production traffic is touched. Partial
//! failures always leave the system serving: an unhealthy candidate
//! aborts the remaining slots while every slot not yet reached keeps
//! its prior artifact.
//!
//! The engine is the only component with cross-instance state during a
//! deployment, and it runs strictly sequentially: at most one slot is
//! down at any instant, by construction.

pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod roll;

#[cfg(test)]
mod testutil;

pub use error::{EngineError, EngineResult};
pub use jobs::PruneSummary;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use roll::{RollReport, RollingEngine};
