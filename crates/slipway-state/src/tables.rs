//! redb table definitions for the Slipway history store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Keys follow `{app}:{started_at:020}` so records for one
//! application sort oldest-first under a prefix scan.

use redb::TableDefinition;

/// Deployment records keyed by `{app}:{started_at}`.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");

/// Backup records keyed by `{app}:{created_at}`.
pub const BACKUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("backups");
