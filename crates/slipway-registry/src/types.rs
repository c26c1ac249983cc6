//! Artifact metadata.

use serde::{Deserialize, Serialize};

/// Tag prefix for release artifacts.
pub const RELEASE_PREFIX: &str = "release-";

/// Alias tag for the currently promoted artifact.
pub const CURRENT_TAG: &str = "current";

/// Build a release tag from a unix-seconds timestamp. Numeric epochs
/// keep tags sortable without a date-time dependency.
pub fn release_tag(epoch_secs: u64) -> String {
    format!("{RELEASE_PREFIX}{epoch_secs}")
}

/// One immutable artifact as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub tag: String,
    /// Unix seconds, derived from the release tag.
    pub created_at: u64,
    /// Human-readable size as reported by the registry (e.g. "142MB").
    pub size: String,
}

impl ArtifactInfo {
    /// Parse the creation epoch out of a release tag, if it is one.
    pub fn epoch_of(tag: &str) -> Option<u64> {
        tag.strip_prefix(RELEASE_PREFIX)?.parse().ok()
    }
}
