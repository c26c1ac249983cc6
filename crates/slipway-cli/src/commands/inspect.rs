//! Read-only commands: status, history, logs.

use std::process::ExitCode;

use slipway_core::Role;

use super::context::Context;

pub async fn status(ctx: &Context, format: &str) -> anyhow::Result<ExitCode> {
    let mut instances = ctx.orchestrator.status(&ctx.app).await?;
    instances.sort_by(|a, b| a.name.cmp(&b.name));

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&instances)?),
        "text" => {
            if instances.is_empty() {
                println!("{}: no instances", ctx.app.name);
            }
            for i in &instances {
                let port = i
                    .host_port
                    .map(|p| format!(":{p}"))
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<24} {:<8} {:<6} {}", i.name, port, i.state, i.image);
            }
        }
        other => anyhow::bail!("unknown format {other:?} (expected \"text\" or \"json\")"),
    }
    Ok(ExitCode::SUCCESS)
}

pub fn history(ctx: &Context) -> anyhow::Result<ExitCode> {
    let records = ctx.orchestrator.deployment_history(&ctx.app)?;
    if records.is_empty() {
        println!("{}: no deployments recorded", ctx.app.name);
        return Ok(ExitCode::SUCCESS);
    }
    for r in &records {
        println!(
            "{:>12}  {:<8} {:<24} scale={:<3} {:?} ({}s)",
            r.started_at,
            format!("{:?}", r.kind).to_lowercase(),
            r.artifact,
            r.target_scale,
            r.outcome,
            r.finished_at.saturating_sub(r.started_at),
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn releases(ctx: &Context) -> anyhow::Result<ExitCode> {
    let artifacts = ctx.orchestrator.artifacts(&ctx.app).await?;
    if artifacts.is_empty() {
        println!("{}: no artifacts built", ctx.app.name);
        return Ok(ExitCode::SUCCESS);
    }
    for (offset, a) in artifacts.iter().enumerate() {
        // The third column is the rollback selector for that release.
        let selector = if offset == 0 {
            "current".to_string()
        } else {
            format!("-{offset}")
        };
        println!("{:<24} {:>8}  {selector}", a.tag, a.size);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn logs(ctx: &Context, slot: u32, tail: u32) -> ExitCode {
    let name = ctx.app.instance_name(Role::Web, slot);
    match ctx.orchestrator.logs(&name, tail).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}
