//! slipway-state — embedded history store for Slipway.
//!
//! Backed by [redb](https://docs.rs/redb), holds the append-only
//! deployment log and backup records. Both logs exist for operator
//! visibility and retention bookkeeping only: current state is always
//! re-derived from the live instance set, never from this store.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`{app}:{zero-padded epoch}`) keep one application's
//! records contiguous and time-ordered under prefix scans.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::HistoryStore;
pub use types::*;
