//! Deadlines for external calls.
//!
//! Every process and HTTP request runs under one of these deadlines, so a
//! stuck collaborator fails its stage instead of blocking the run forever.

use std::time::Duration;

/// Per-kind deadlines for external operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Git invocations (clone and fetch included)
    pub git: Duration,

    /// Multi-platform image build and publish
    pub build: Duration,

    /// Registry manifest inspection
    pub inspect: Duration,

    /// External lint step
    pub lint: Duration,

    /// Single HTTP request to the hosting API
    pub http: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            git: Duration::from_secs(600),
            build: Duration::from_secs(3600),
            inspect: Duration::from_secs(120),
            lint: Duration::from_secs(600),
            http: Duration::from_secs(60),
        }
    }
}

impl TimeoutConfig {
    /// Parse a timeout in seconds from an environment value, clamped to
    /// `[1, max]`
    fn parse_secs(value: Option<String>, default: Duration, max: u64) -> Duration {
        value
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|v| Duration::from_secs(v.clamp(1, max)))
            .unwrap_or(default)
    }

    /// Build from `CATALOG_SYNC_TIMEOUT_*` variables with fallback to
    /// defaults
    pub fn from_env(env: &crate::EnvConfig) -> Self {
        let defaults = Self::default();
        Self {
            git: Self::parse_secs(env.get("CATALOG_SYNC_TIMEOUT_GIT"), defaults.git, 3600),
            build: Self::parse_secs(env.get("CATALOG_SYNC_TIMEOUT_BUILD"), defaults.build, 4 * 3600),
            inspect: Self::parse_secs(
                env.get("CATALOG_SYNC_TIMEOUT_INSPECT"),
                defaults.inspect,
                3600,
            ),
            lint: Self::parse_secs(env.get("CATALOG_SYNC_TIMEOUT_LINT"), defaults.lint, 3600),
            http: Self::parse_secs(env.get("CATALOG_SYNC_TIMEOUT_HTTP"), defaults.http, 600),
        }
    }
}
