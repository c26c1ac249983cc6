use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "slip",
    about = "Slipway — single-host rolling deployments behind nginx",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Application config file
    #[arg(short, long, default_value = "slipway.toml", global = true)]
    config: PathBuf,

    /// State directory (history database, locks, backups)
    #[arg(long, default_value = "/var/lib/slipway", global = true)]
    state_dir: PathBuf,

    /// Directory the reverse proxy includes upstream fragments from
    #[arg(long, default_value = "/etc/nginx/conf.d", global = true)]
    conf_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a slipway.toml for a new application
    Init {
        name: String,
        /// Public domain the proxy serves the application under
        #[arg(short, long)]
        domain: String,
        /// First production port of the reserved range
        #[arg(short, long)]
        base_port: u16,
        /// Framework profile: rails or node
        #[arg(short, long, default_value = "rails")]
        profile: String,
    },
    /// Build a new artifact and roll it out slot by slot
    Deploy {
        /// Build context directory
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Deploy at this scale instead of the configured one
        #[arg(short, long)]
        scale: Option<u32>,
    },
    /// Redeploy the current artifact at the current scale
    Restart,
    /// Change the web scale, keeping the current artifact
    Scale {
        scale: u32,
    },
    /// Roll back to a retained artifact (-1 = previous, -2 = two back, or a tag)
    Rollback {
        #[arg(default_value = "-1")]
        target: String,
    },
    /// Stop and remove every instance of the application
    Stop,
    /// Restore the newest pre-migration database backup (destructive)
    Restore {
        /// Required confirmation; the restore overwrites the live database
        #[arg(long)]
        yes: bool,
    },
    /// Live instance state, straight from the container runtime
    Status {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Deployment history, newest first
    History,
    /// Retained release artifacts, newest first
    Releases,
    /// Tail one instance's logs
    Logs {
        /// 1-based web slot
        #[arg(default_value_t = 1)]
        slot: u32,
        #[arg(long, default_value_t = 100)]
        tail: u32,
    },
    /// Prune old artifacts and expired backups per the retention config
    Prune,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {e}");
        return ExitCode::from(1);
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        // Anything that errors before the engine runs left nothing mutated.
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("slip=info".parse()?)
                .add_directive("slipway=info".parse()?),
        )
        .init();
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Commands::Init { name, domain, base_port, profile } = &cli.command {
        return commands::init::init(&cli.config, name, domain, *base_port, profile);
    }

    let ctx = commands::context::Context::build(&cli.config, &cli.state_dir, &cli.conf_dir)?;

    Ok(match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Deploy { path, scale } => commands::app::deploy(&ctx, &path, scale).await,
        Commands::Restart => commands::app::restart(&ctx).await,
        Commands::Scale { scale } => commands::app::scale(&ctx, scale).await,
        Commands::Rollback { target } => commands::app::rollback(&ctx, &target).await,
        Commands::Stop => commands::app::stop(&ctx).await,
        Commands::Restore { yes } => commands::app::restore(&ctx, yes).await,
        Commands::Status { format } => commands::inspect::status(&ctx, &format).await?,
        Commands::History => commands::inspect::history(&ctx)?,
        Commands::Releases => commands::inspect::releases(&ctx).await?,
        Commands::Logs { slot, tail } => commands::inspect::logs(&ctx, slot, tail).await,
        Commands::Prune => commands::app::prune(&ctx).await,
    })
}
