//! Upstream fragment generation.
//!
//! One fragment per application: an `upstream` block listing every
//! production port in ascending order, plus the `server` block routing
//! the application's domain to it. Entries carry passive-health
//! parameters (`max_fails`, `fail_timeout`) so the proxy stops routing
//! to a slot that degrades between deployments, independent of the
//! orchestrator.

use slipway_core::Application;

/// Consecutive failures before the proxy stops routing to a server.
const MAX_FAILS: u32 = 3;

/// Cool-down before a failed server is probed again.
const FAIL_TIMEOUT: &str = "10s";

/// Render the full config fragment for `app` at `scale`.
pub fn render_fragment(app: &Application, scale: u32) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Generated by slipway for {}; regenerated wholesale, do not edit.\n",
        app.name
    ));
    out.push_str(&format!("upstream {} {{\n", app.name));
    for port in app.production_ports(scale) {
        out.push_str(&format!(
            "    server 127.0.0.1:{port} max_fails={MAX_FAILS} fail_timeout={FAIL_TIMEOUT};\n"
        ));
    }
    out.push_str("}\n\n");

    out.push_str("server {\n");
    out.push_str("    listen 80;\n");
    out.push_str(&format!("    server_name {};\n", app.domain));
    out.push_str("    location / {\n");
    out.push_str(&format!("        proxy_pass http://{};\n", app.name));
    out.push_str("        proxy_set_header Host $host;\n");
    out.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out
}

/// Read the server ports back out of a rendered fragment, in file order.
pub fn upstream_ports(fragment: &str) -> Vec<u16> {
    fragment
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let rest = line.strip_prefix("server 127.0.0.1:")?;
            let port = rest.split_whitespace().next()?;
            port.parse().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_core::ApplicationProfile;
    use std::collections::HashMap;

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
    fn round_trip_exact_port_set() {
        for scale in 1..=5u32 {
            let fragment = render_fragment(&app(), scale);
            let ports = upstream_ports(&fragment);
            let expected: Vec<u16> = (0..scale as u16).map(|i| 3020 + i).collect();
            assert_eq!(ports, expected, "scale {scale}");
        }
    }

    #[test]
    fn ports_are_ascending() {
        let ports = upstream_ports(&render_fragment(&app(), 4));
        let mut sorted = ports.clone();
        sorted.sort_unstable();
        assert_eq!(ports, sorted);
    }

    #[test]
    fn carries_passive_health_parameters() {
        let fragment = render_fragment(&app(), 2);
        assert!(fragment.contains("max_fails=3"));
        assert!(fragment.contains("fail_timeout=10s"));
    }

    #[test]
    fn routes_the_domain_to_the_upstream() {
        let fragment = render_fragment(&app(), 2);
        assert!(fragment.contains("server_name shop.example.com;"));
        assert!(fragment.contains("proxy_pass http://shop;"));
    }
}
