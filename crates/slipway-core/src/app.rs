//! Application model — identity, reserved ports, profiles, naming.
//!
//! An application owns a contiguous production port range
//! `[base_port, base_port + scale)`. Slot `i` (1-based) always maps to
//! production port `base_port + i - 1`; during replacement a transient
//! instance briefly runs on the slot's staging port, `10_000` above the
//! production port and therefore outside every reserved range.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Offset added to a production port to obtain the slot's staging port.
pub const STAGING_PORT_OFFSET: u16 = 10_000;

/// An application managed by Slipway.
///
/// Immutable after creation except `scale` (changed by `slip scale`) and
/// the `current` artifact alias, which lives in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub name: String,
    /// Public domain the reverse proxy serves this application under.
    pub domain: String,
    /// First production port of the reserved range.
    pub base_port: u16,
    /// Declared number of web slots.
    pub scale: u32,
    /// Image repository reference (e.g. `registry.local/shop`).
    pub repository: String,
    /// Framework profile selected at creation time.
    pub profile: ApplicationProfile,
    /// Environment injected into every instance.
    pub env: HashMap<String, String>,
}

impl Application {
    /// Deterministic name for the permanent instance at `slot` (1-based).
    pub fn instance_name(&self, role: Role, slot: u32) -> String {
        format!("{}-{}-{}", self.name, role.as_str(), slot)
    }

    /// Name for the transient staging instance at `slot`.
    pub fn staging_name(&self, slot: u32) -> String {
        format!("{}-{}-{}-next", self.name, Role::Web.as_str(), slot)
    }

    /// Prefix matching every instance of this application.
    pub fn name_prefix(&self) -> String {
        format!("{}-", self.name)
    }

    /// Production ports for the given scale, ascending.
    pub fn production_ports(&self, scale: u32) -> Vec<u16> {
        (1..=scale).map(|i| production_port(self.base_port, i)).collect()
    }
}

/// Production port for a 1-based slot index.
///
/// Configuration loading rejects ranges that leave the port space
/// (staging offsets included), so an out-of-range input here is a
/// programming error, not silent wraparound.
pub fn production_port(base_port: u16, slot: u32) -> u16 {
    let port = u64::from(base_port) + u64::from(slot) - 1;
    assert!(
        port <= u64::from(u16::MAX),
        "production port {port} for slot {slot} leaves the port space"
    );
    port as u16
}

/// Staging port for a 1-based slot index.
pub fn staging_port(base_port: u16, slot: u32) -> u16 {
    let port = u64::from(production_port(base_port, slot)) + u64::from(STAGING_PORT_OFFSET);
    assert!(
        port <= u64::from(u16::MAX),
        "staging port {port} for slot {slot} leaves the port space"
    );
    port as u16
}

/// Role of an instance within an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Web,
    Worker,
    Scheduler,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Web => "web",
            Role::Worker => "worker",
            Role::Scheduler => "scheduler",
        }
    }

    /// Parse a role from an instance name segment.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "web" => Some(Role::Web),
            "worker" => Some(Role::Worker),
            "scheduler" => Some(Role::Scheduler),
            _ => None,
        }
    }
}

/// Framework profile — how to build, migrate, and probe an application.
///
/// Selected by configuration at application creation time; the deployment
/// engine never branches on framework anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationProfile {
    /// Rails-style: ActiveRecord migrations, `/up` health endpoint.
    RailsLike,
    /// Node-style: no framework migrations by default, `/healthz` endpoint.
    NodeLike,
}

impl ApplicationProfile {
    /// Port the application listens on inside the container.
    pub fn container_port(&self) -> u16 {
        match self {
            ApplicationProfile::RailsLike => 3000,
            ApplicationProfile::NodeLike => 8080,
        }
    }

    /// Health probe paths, tried in order.
    pub fn health_paths(&self) -> Vec<String> {
        let dedicated = match self {
            ApplicationProfile::RailsLike => "/up",
            ApplicationProfile::NodeLike => "/healthz",
        };
        vec![dedicated.to_string(), "/".to_string()]
    }

    /// Command that exits non-zero when schema changes are pending.
    ///
    /// `None` means the profile has no framework migrations and the
    /// migration gate is a no-op.
    pub fn migration_status_command(&self) -> Option<Vec<String>> {
        match self {
            ApplicationProfile::RailsLike => Some(vec![
                "bin/rails".into(),
                "db:abort_if_pending_migrations".into(),
            ]),
            ApplicationProfile::NodeLike => None,
        }
    }

    /// Command that applies pending schema changes.
    pub fn migrate_command(&self) -> Option<Vec<String>> {
        match self {
            ApplicationProfile::RailsLike => {
                Some(vec!["bin/rails".into(), "db:migrate".into()])
            }
            ApplicationProfile::NodeLike => None,
        }
    }

    /// Extra `docker build` arguments for this framework.
    pub fn build_args(&self) -> Vec<String> {
        match self {
            ApplicationProfile::RailsLike => {
                vec!["--build-arg".into(), "RAILS_ENV=production".into()]
            }
            ApplicationProfile::NodeLike => {
                vec!["--build-arg".into(), "NODE_ENV=production".into()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> Application {
        Application {
            name: "shop".into(),
            domain: "shop.example.com".into(),
            base_port: 3020,
            scale: 3,
            repository: "registry.local/shop".into(),
            profile: ApplicationProfile::RailsLike,
            env: HashMap::new(),
        }
    }

    #[test]
    fn slot_ports_are_contiguous_from_base() {
        assert_eq!(production_port(3020, 1), 3020);
        assert_eq!(production_port(3020, 2), 3021);
        assert_eq!(production_port(3020, 3), 3022);
    }

    #[test]
    fn staging_port_is_outside_production_range() {
        assert_eq!(staging_port(3020, 1), 13020);
        assert_eq!(staging_port(3020, 3), 13022);
    }

    #[test]
    fn highest_valid_base_port_fills_the_port_space() {
        assert_eq!(staging_port(55_535, 1), 65_535);
    }

    #[test]
    #[should_panic(expected = "staging port")]
    fn staging_port_past_the_port_space_is_a_programming_error() {
        staging_port(60_000, 1);
    }

    #[test]
    fn instance_names_are_deterministic() {
        let a = app();
        assert_eq!(a.instance_name(Role::Web, 1), "shop-web-1");
        assert_eq!(a.instance_name(Role::Worker, 2), "shop-worker-2");
        assert_eq!(a.staging_name(1), "shop-web-1-next");
        assert_eq!(a.name_prefix(), "shop-");
    }

    #[test]
    fn production_ports_ascending() {
        let a = app();
        assert_eq!(a.production_ports(3), vec![3020, 3021, 3022]);
        assert_eq!(a.production_ports(1), vec![3020]);
    }

    #[test]
    fn rails_profile_has_migrations() {
        let p = ApplicationProfile::RailsLike;
        assert!(p.migration_status_command().is_some());
        assert!(p.migrate_command().is_some());
        assert_eq!(p.health_paths()[0], "/up");
    }

    #[test]
    fn node_profile_has_no_migrations() {
        let p = ApplicationProfile::NodeLike;
        assert!(p.migration_status_command().is_none());
        assert_eq!(p.health_paths(), vec!["/healthz".to_string(), "/".to_string()]);
    }

    #[test]
    fn role_round_trip() {
        for role in [Role::Web, Role::Worker, Role::Scheduler] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("cron"), None);
    }
}
