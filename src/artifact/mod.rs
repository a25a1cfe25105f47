//! Artifact identification: obtain the content digest for a version.
//!
//! The [`ArtifactLocator`] either publishes the image through an
//! [`ArtifactBuilder`] and reads its digest back from the registry, accepts
//! a caller-supplied digest, or (in dry runs) synthesizes a deterministic
//! placeholder. It is the only component that publishes to a registry.

mod digest;
mod docker;

pub use digest::ContentDigest;
pub use docker::DockerBuildx;

use crate::cli::RuntimeConfig;
use crate::error::{BuildError, ConfigurationError, DigestError, Result};
use regex::Regex;
use std::future::Future;
use std::sync::LazyLock;

/// Alias tag published alongside every version
pub const LATEST_TAG: &str = "latest";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag regex is valid")
});

/// Build service collaborator
pub trait ArtifactBuilder {
    /// Build for all `platforms` and push `image:<tag>` for every tag.
    ///
    /// Must fail on a non-zero exit of the build.
    fn build_and_publish(
        &self,
        image: &str,
        tags: &[&str],
        platforms: &[String],
    ) -> impl Future<Output = std::result::Result<(), BuildError>>;

    /// Return the raw digest string the registry reports for `image_ref`
    fn inspect_digest(
        &self,
        image_ref: &str,
    ) -> impl Future<Output = std::result::Result<String, DigestError>>;
}

/// Resolves the content digest of the image for a version
pub struct ArtifactLocator<'a, B: ArtifactBuilder> {
    builder: &'a B,
    image: &'a str,
    platforms: &'a [String],
    runtime: &'a RuntimeConfig,
}

impl<'a, B: ArtifactBuilder> ArtifactLocator<'a, B> {
    /// Create a locator publishing `image` for `platforms`
    pub fn new(
        builder: &'a B,
        image: &'a str,
        platforms: &'a [String],
        runtime: &'a RuntimeConfig,
    ) -> Self {
        Self {
            builder,
            image,
            platforms,
            runtime,
        }
    }

    /// Obtain the digest for `version`.
    ///
    /// - `skip_build`: `supplied` is required and validated
    /// - `dry_run`: placeholder digest, no side effects
    /// - otherwise: `version` must be a valid docker tag; build, publish
    ///   `version` and `latest`, inspect the tag
    pub async fn locate(
        &self,
        version: &str,
        skip_build: bool,
        supplied: Option<&str>,
        dry_run: bool,
    ) -> Result<ContentDigest> {
        if skip_build {
            let value = supplied.ok_or_else(|| ConfigurationError::MissingRequirement {
                flag: "skip-build".to_string(),
                required: "digest".to_string(),
            })?;
            let digest = ContentDigest::parse(value)?;
            self.runtime
                .println(&format!("Skipping build, using supplied digest {digest}"));
            return Ok(digest);
        }

        if dry_run {
            let digest = ContentDigest::placeholder(version);
            self.runtime.println(&format!(
                "[dry-run] would build and push {}:{} and {}:{} for {}",
                self.image,
                version,
                self.image,
                LATEST_TAG,
                self.platforms.join(",")
            ));
            self.runtime
                .verbose_println(&format!("[dry-run] using placeholder digest {digest}"));
            return Ok(digest);
        }

        if !TAG_RE.is_match(version) {
            return Err(BuildError::InvalidTag {
                version: version.to_string(),
            }
            .into());
        }

        self.runtime.progress(&format!(
            "Building and pushing {}:{} ({})",
            self.image,
            version,
            self.platforms.join(",")
        ));
        self.builder
            .build_and_publish(self.image, &[version, LATEST_TAG], self.platforms)
            .await?;
        self.runtime
            .success(&format!("Pushed {}:{}", self.image, version));

        let image_ref = format!("{}:{}", self.image, version);
        let raw = self.builder.inspect_digest(&image_ref).await?;
        let digest = ContentDigest::parse(&raw)?;
        log::info!("{image_ref} resolved to {digest}");
        Ok(digest)
    }
}
