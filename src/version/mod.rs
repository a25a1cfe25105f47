//! Version resolution.
//!
//! The version is either given explicitly or taken from the tag of the
//! latest published release of the project. An explicit version is taken
//! as given; whether it works as an image tag is checked by the build.

use crate::error::{ConfigurationError, ResolutionError, Result};
use crate::github::CodeHost;
use crate::repo::RepoSlug;

/// Resolves the release version for a run
pub struct VersionResolver<'a, H: CodeHost> {
    host: &'a H,
    release_repo: Option<&'a RepoSlug>,
}

impl<'a, H: CodeHost> VersionResolver<'a, H> {
    /// Create a resolver reading releases of `release_repo`
    pub fn new(host: &'a H, release_repo: Option<&'a RepoSlug>) -> Self {
        Self { host, release_repo }
    }

    /// Return `explicit` unchanged when it is not blank, otherwise the
    /// latest release tag.
    ///
    /// Single attempt; no retries.
    pub async fn resolve(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(version) = explicit.filter(|v| !v.trim().is_empty()) {
            return Ok(version.to_string());
        }

        let project = self
            .release_repo
            .ok_or_else(|| ConfigurationError::InvalidValue {
                field: "--version".to_string(),
                reason: "no version given and no --release-repo to look it up".to_string(),
            })?;

        log::info!("Looking up latest release of {project}");
        let tag = self
            .host
            .latest_release_tag(project)
            .await
            .map_err(|source| ResolutionError::FeedUnavailable {
                project: project.to_string(),
                source,
            })?
            .ok_or_else(|| ResolutionError::MissingTag {
                project: project.to_string(),
            })?;

        Ok(tag)
    }
}
