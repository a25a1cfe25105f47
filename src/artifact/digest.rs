//! Content digest (`<algorithm>:<hex>`) validation.

use crate::error::DigestError;
use regex::Regex;
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static DIGEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[+._-][a-z0-9]+)*:[a-fA-F0-9]+$").expect("digest regex is valid")
});

/// A content digest such as `sha256:9f86d08...`.
///
/// Can only be constructed from a string of the `<algorithm>:<hex>` shape,
/// so a partial or mismatched registry response is never accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Validate and wrap a digest string
    pub fn parse(value: &str) -> Result<Self, DigestError> {
        let trimmed = value.trim();
        if DIGEST_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DigestError::Malformed {
                value: value.to_string(),
            })
        }
    }

    /// Deterministic stand-in used by dry runs: the sha256 of the version.
    ///
    /// Well-formed, so downstream stages run their real logic against it.
    pub fn placeholder(version: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"dry-run:");
        hasher.update(version.as_bytes());
        Self(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    /// Algorithm part
    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map(|(a, _)| a).unwrap_or_default()
    }

    /// Hex part
    pub fn hex(&self) -> &str {
        self.0.split_once(':').map(|(_, h)| h).unwrap_or_default()
    }

    /// Full string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
