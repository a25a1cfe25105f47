//! `docker buildx` backed [`ArtifactBuilder`].

use super::ArtifactBuilder;
use crate::cli::RuntimeConfig;
use crate::error::{BuildError, DigestError};
use crate::process;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Multi-platform build and publish through `docker buildx`
#[derive(Debug, Clone)]
pub struct DockerBuildx {
    context: PathBuf,
    dockerfile: Option<PathBuf>,
    build_timeout: Duration,
    inspect_timeout: Duration,
    runtime: RuntimeConfig,
}

impl DockerBuildx {
    /// Create a builder for `context`
    pub fn new(
        context: PathBuf,
        dockerfile: Option<PathBuf>,
        build_timeout: Duration,
        inspect_timeout: Duration,
        runtime: RuntimeConfig,
    ) -> Self {
        Self {
            context,
            dockerfile,
            build_timeout,
            inspect_timeout,
            runtime,
        }
    }

    fn build_command(&self, image: &str, tags: &[&str], platforms: &[String]) -> Command {
        let mut cmd = Command::new("docker");
        cmd.args(["buildx", "build", "--progress=plain", "--push"]);
        cmd.arg("--platform").arg(platforms.join(","));
        for tag in tags {
            cmd.arg("-t").arg(format!("{image}:{tag}"));
        }
        if let Some(dockerfile) = &self.dockerfile {
            cmd.arg("-f").arg(dockerfile);
        }
        cmd.arg(&self.context);
        cmd
    }
}

/// Extract the top-level digest from `imagetools inspect --format '{{json .Manifest}}'`
fn parse_manifest_digest(raw: &str, image_ref: &str) -> Result<String, DigestError> {
    let manifest: serde_json::Value =
        serde_json::from_str(raw.trim()).map_err(|e| DigestError::InspectFailed {
            image_ref: image_ref.to_string(),
            reason: format!("manifest is not JSON: {e}"),
        })?;

    manifest
        .get("digest")
        .and_then(|d| d.as_str())
        .map(str::to_string)
        .ok_or_else(|| DigestError::InspectFailed {
            image_ref: image_ref.to_string(),
            reason: "manifest has no digest field".to_string(),
        })
}

impl ArtifactBuilder for DockerBuildx {
    async fn build_and_publish(
        &self,
        image: &str,
        tags: &[&str],
        platforms: &[String],
    ) -> Result<(), BuildError> {
        let cmd = self.build_command(image, tags, platforms);
        let runtime = &self.runtime;
        let output = process::stream(cmd, self.build_timeout, |line| {
            runtime.verbose_indent(line);
        })
        .await?;

        if !output.success() {
            return Err(BuildError::Failed {
                image_ref: format!("{image}:{}", tags.first().copied().unwrap_or_default()),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    async fn inspect_digest(&self, image_ref: &str) -> Result<String, DigestError> {
        let mut cmd = Command::new("docker");
        cmd.args(["buildx", "imagetools", "inspect", image_ref, "--format", "{{json .Manifest}}"]);
        let output = process::run(cmd, self.inspect_timeout).await?;

        if !output.success() {
            return Err(DigestError::InspectFailed {
                image_ref: image_ref.to_string(),
                reason: output.stderr_trimmed().to_string(),
            });
        }
        parse_manifest_digest(&output.stdout, image_ref)
    }
}
