//! slipway-registry — the artifact store.
//!
//! Artifacts are immutable, tagged images: `{repo}:release-{epoch-secs}`.
//! Exactly one artifact per application carries the `current` alias tag.
//! Artifacts are created by `build`, never mutated, and deleted only by
//! retention cleanup (oldest-first, keep last K).

pub mod docker;
pub mod error;
pub mod selector;
pub mod types;

pub use docker::DockerRegistry;
pub use error::{RegistryError, RegistryResult};
pub use selector::ArtifactSelector;
pub use types::{ArtifactInfo, CURRENT_TAG, RELEASE_PREFIX, release_tag};

use slipway_core::Application;

/// Operations the deployment engine needs from the artifact registry.
pub trait ArtifactRegistry: Send + Sync {
    /// Build a new immutable artifact from `source_ref` and return its tag.
    fn build(
        &self,
        app: &Application,
        source_ref: &str,
    ) -> impl Future<Output = RegistryResult<String>> + Send;

    /// Point the `current` alias at `tag`.
    fn promote(
        &self,
        repository: &str,
        tag: &str,
    ) -> impl Future<Output = RegistryResult<()>> + Send;

    /// Release artifacts for `repository`, newest-first.
    fn list(&self, repository: &str)
    -> impl Future<Output = RegistryResult<Vec<ArtifactInfo>>> + Send;

    /// Resolve the `current` alias back to the release tag it points at.
    ///
    /// `None` when no alias exists yet, or when it no longer matches a
    /// retained release. The alias survives later builds untouched, so
    /// after a rollback this is the rolled-back-to tag, not the newest.
    fn current(&self, repository: &str)
    -> impl Future<Output = RegistryResult<Option<String>>> + Send;

    /// Delete one artifact (retention cleanup only).
    fn remove(
        &self,
        repository: &str,
        tag: &str,
    ) -> impl Future<Output = RegistryResult<()>> + Send;
}
