//! slipway.toml configuration parser.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::{Application, ApplicationProfile, STAGING_PORT_OFFSET};

/// Errors raised while loading an application configuration.
///
/// All of these are precondition failures: nothing has been mutated yet.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// On-disk representation of `slipway.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub health: Option<HealthSection>,
    pub retention: Option<RetentionSection>,
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub name: String,
    pub domain: String,
    pub base_port: u16,
    pub scale: u32,
    pub repository: String,
    /// "rails" or "node".
    pub profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSection {
    /// Probe timeout in seconds (default 60).
    pub timeout_secs: Option<u64>,
    /// Probe interval in seconds (default 2).
    pub interval_secs: Option<u64>,
    /// Settle pause between slots in seconds (default 5).
    pub settle_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSection {
    /// Artifacts to keep per application (default 5).
    pub keep_artifacts: Option<u32>,
    /// Days to keep database backups (default 7).
    pub keep_backup_days: Option<u64>,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Invalid("app.name must not be empty".into()));
        }
        if self.app.scale == 0 {
            return Err(ConfigError::Invalid("app.scale must be at least 1".into()));
        }
        // Every slot needs both its production port and its staging
        // port (production + offset) to fit in the port space.
        let highest_staging = u64::from(self.app.base_port) + u64::from(self.app.scale) - 1
            + u64::from(STAGING_PORT_OFFSET);
        if highest_staging > u64::from(u16::MAX) {
            return Err(ConfigError::Invalid(format!(
                "app.base_port {} with scale {} needs staging port {highest_staging}, \
                 beyond the 65535 maximum",
                self.app.base_port, self.app.scale
            )));
        }
        parse_profile(&self.app.profile)?;
        Ok(())
    }

    /// Materialize the validated config into the domain model.
    pub fn to_application(&self) -> Result<Application, ConfigError> {
        Ok(Application {
            name: self.app.name.clone(),
            domain: self.app.domain.clone(),
            base_port: self.app.base_port,
            scale: self.app.scale,
            repository: self.app.repository.clone(),
            profile: parse_profile(&self.app.profile)?,
            env: self.env.clone().unwrap_or_default(),
        })
    }

    /// Scaffold a minimal slipway.toml for a new application.
    pub fn scaffold(name: &str, domain: &str, base_port: u16, profile: &str) -> Self {
        AppConfig {
            app: AppSection {
                name: name.to_string(),
                domain: domain.to_string(),
                base_port,
                scale: 2,
                repository: format!("registry.local/{name}"),
                profile: profile.to_string(),
            },
            health: Some(HealthSection {
                timeout_secs: Some(60),
                interval_secs: Some(2),
                settle_secs: Some(5),
            }),
            retention: Some(RetentionSection {
                keep_artifacts: Some(5),
                keep_backup_days: Some(7),
            }),
            env: None,
        }
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn parse_profile(s: &str) -> Result<ApplicationProfile, ConfigError> {
    match s {
        "rails" => Ok(ApplicationProfile::RailsLike),
        "node" => Ok(ApplicationProfile::NodeLike),
        other => Err(ConfigError::Invalid(format!(
            "unknown profile {other:?} (expected \"rails\" or \"node\")"
        ))),
    }
}
