//! slipway-proxy — keeps the reverse proxy's routing table consistent
//! with the live instance set.
//!
//! The synchronizer regenerates an application's upstream fragment
//! wholesale on every scale change (never patched incrementally),
//! validates the entire merged proxy configuration, and either reloads
//! gracefully or restores the previous fragment byte-for-byte. A broken
//! config is never left live, and the running proxy process is never
//! touched when validation fails.
//!
//! Writes are serialized across applications by the proxy-config
//! advisory lock: two concurrent syncs racing on backup/write/validate/
//! reload could otherwise clobber each other's backup or reload a
//! hybrid of two in-flight writes.

pub mod control;
pub mod error;
pub mod sync;
pub mod upstream;

pub use control::{NginxControl, ProxyControl};
pub use error::{ProxyError, ProxyResult};
pub use sync::{ProxySync, SyncOutcome};
pub use upstream::{render_fragment, upstream_ports};
