//! Deployment-shaped commands. Exit codes: 0 = success, 1 = rejected
//! before any mutation, 2 = the fleet may be partially updated.

use std::process::ExitCode;

use slipway_engine::{EngineError, EngineResult};
use slipway_registry::ArtifactSelector;
use slipway_state::{DeploymentOutcome, DeploymentRecord, SlotOutcome};

use super::context::Context;

pub async fn deploy(ctx: &Context, path: &str, scale: Option<u32>) -> ExitCode {
    report(ctx.orchestrator.deploy(&ctx.app, path, scale).await)
}

pub async fn restart(ctx: &Context) -> ExitCode {
    report(ctx.orchestrator.restart(&ctx.app).await)
}

pub async fn scale(ctx: &Context, scale: u32) -> ExitCode {
    report(ctx.orchestrator.scale(&ctx.app, scale).await)
}

pub async fn rollback(ctx: &Context, target: &str) -> ExitCode {
    let selector = match ArtifactSelector::parse(target) {
        Ok(selector) => selector,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };
    report(ctx.orchestrator.rollback(&ctx.app, &selector).await)
}

pub async fn stop(ctx: &Context) -> ExitCode {
    match ctx.orchestrator.stop(&ctx.app).await {
        Ok(stopped) => {
            println!("✓ Stopped {stopped} instance(s) of {}", ctx.app.name);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub async fn restore(ctx: &Context, confirmed: bool) -> ExitCode {
    if !confirmed {
        eprintln!("Error: restore overwrites the live database; re-run with --yes to confirm");
        return ExitCode::from(1);
    }
    match ctx.orchestrator.restore_backup(&ctx.app).await {
        Ok(backup) => {
            println!("✓ Restored {} from {}", ctx.app.name, backup.path);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub async fn prune(ctx: &Context) -> ExitCode {
    let (keep_artifacts, keep_backup_days) = ctx.retention();
    match ctx
        .orchestrator
        .prune(&ctx.app, keep_artifacts, keep_backup_days)
        .await
    {
        Ok(summary) => {
            println!(
                "✓ Pruned {} artifact(s), {} backup(s)",
                summary.artifacts.len(),
                summary.backups.len()
            );
            for tag in &summary.artifacts {
                println!("  removed {tag}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn report(result: EngineResult<DeploymentRecord>) -> ExitCode {
    match result {
        Ok(record) => {
            print_slots(&record);
            match record.outcome {
                DeploymentOutcome::Succeeded => {
                    println!(
                        "✓ {} now serving {} on {} slot(s)",
                        record.app, record.artifact, record.target_scale
                    );
                    ExitCode::SUCCESS
                }
                DeploymentOutcome::Aborted => {
                    eprintln!("✗ Aborted: the previous artifact is still serving every slot not replaced");
                    ExitCode::from(2)
                }
                DeploymentOutcome::Failed => {
                    eprintln!("✗ Failed: inspect instance state before retrying");
                    ExitCode::from(2)
                }
            }
        }
        Err(e) => fail(e),
    }
}

fn fail(e: EngineError) -> ExitCode {
    eprintln!("Error: {e}");
    if e.is_precondition() {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    }
}

fn print_slots(record: &DeploymentRecord) {
    for slot in &record.slots {
        let mark = match slot.outcome {
            SlotOutcome::Replaced => "✓ replaced",
            SlotOutcome::Failed => "✗ failed",
            SlotOutcome::Skipped => "- skipped",
            SlotOutcome::Removed => "✓ removed",
        };
        println!("  slot {} (:{}) {mark}", slot.slot, slot.port);
    }
}
