//! `slip init` — scaffold a slipway.toml.

use std::path::Path;
use std::process::ExitCode;

use slipway_core::AppConfig;

pub fn init(
    path: &Path,
    name: &str,
    domain: &str,
    base_port: u16,
    profile: &str,
) -> anyhow::Result<ExitCode> {
    if path.exists() {
        anyhow::bail!("{} already exists, not overwriting", path.display());
    }

    let config = AppConfig::scaffold(name, domain, base_port, profile);
    // Surfaces an unknown profile before anything is written.
    config.to_application()?;

    std::fs::write(path, config.to_toml_string()?)?;
    println!("✓ Wrote {}", path.display());
    println!("  Edit the scale, repository, and env sections, then run `slip deploy`.");
    Ok(ExitCode::SUCCESS)
}
