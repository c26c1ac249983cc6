//! Rollback target selection.
//!
//! An operator picks a prior artifact either by relative offset
//! (`-1` = previous release, `-2` = two back) or by explicit tag.

use crate::error::{RegistryError, RegistryResult};
use crate::types::ArtifactInfo;

/// How the operator names a rollback target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSelector {
    /// `k` releases back from the newest (`k >= 1`).
    Offset(u32),
    /// An explicit release tag.
    Tag(String),
}

impl ArtifactSelector {
    /// Parse a CLI argument: `-1`, `-2`, ... or a literal tag.
    pub fn parse(s: &str) -> RegistryResult<Self> {
        if let Some(digits) = s.strip_prefix('-') {
            let offset: u32 = digits.parse().map_err(|_| {
                RegistryError::NoSuchArtifact(format!("invalid offset {s:?}"))
            })?;
            if offset == 0 {
                return Err(RegistryError::NoSuchArtifact(
                    "offset must be -1 or further back".into(),
                ));
            }
            return Ok(ArtifactSelector::Offset(offset));
        }
        Ok(ArtifactSelector::Tag(s.to_string()))
    }

    /// Resolve against a newest-first artifact list.
    pub fn resolve<'a>(&self, artifacts: &'a [ArtifactInfo]) -> RegistryResult<&'a ArtifactInfo> {
        match self {
            ArtifactSelector::Offset(k) => {
                artifacts.get(*k as usize).ok_or_else(|| {
                    RegistryError::NoSuchArtifact(format!(
                        "offset -{k} is out of range: only {} artifacts retained \
                         (retention cleanup bounds rollback depth)",
                        artifacts.len()
                    ))
                })
            }
            ArtifactSelector::Tag(tag) => artifacts
                .iter()
                .find(|a| &a.tag == tag)
                .ok_or_else(|| {
                    RegistryError::NoSuchArtifact(format!(
                        "tag {tag:?} not among the {} retained artifacts",
                        artifacts.len()
                    ))
                }),
        }
    }
}
