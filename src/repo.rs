//! Repository identifiers (`owner/name`) and GitHub remote URL handling.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Base URL repositories are cloned from
pub const DEFAULT_GIT_BASE: &str = "https://github.com";

/// A GitHub repository identified as `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    /// Account or organization
    pub owner: String,
    /// Repository name, without `.git`
    pub name: String,
}

static SLUG_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+$").expect("slug regex is valid")
});

impl RepoSlug {
    /// Create a slug from its parts
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Clone URL below a git host base, e.g. [`DEFAULT_GIT_BASE`] or
    /// `file:///srv/git`.
    ///
    /// Credentials are left to git's credential helpers so tokens never
    /// end up in `.git/config`.
    pub fn clone_url_on(&self, base: &str) -> String {
        format!("{}/{}/{}.git", base.trim_end_matches('/'), self.owner, self.name)
    }

    /// Parse owner/repo from a git remote URL.
    ///
    /// Supports Git URL formats:
    /// - SSH SCP-like: git@github.com:owner/repo.git
    /// - HTTPS: https://github.com/owner/repo.git
    /// - SSH protocol: ssh://git@github.com/owner/repo.git
    /// - Any other `scheme://` URL, by its last two path segments
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let url = url.trim();

        // SCP-like: git@github.com:owner/repo.git
        if url.contains('@') && url.contains(':') && !url.contains("://") {
            let (_, path) = url.split_once(':')?;
            return Self::from_path(path);
        }

        if let Some(path_start) = url.find("github.com/") {
            return Self::from_path(&url[path_start + "github.com/".len()..]);
        }

        // Other hosts and file:// URLs: the last two path segments
        let (_, rest) = url.split_once("://")?;
        let path = rest.trim_end_matches('/').trim_end_matches(".git");
        let mut segments = path.rsplitn(3, '/');
        let name = segments.next()?;
        let owner = segments.next()?;
        segments.next()?;
        Self::from_path(&format!("{owner}/{name}"))
    }

    fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/').trim_end_matches(".git");
        let mut parts = path.split('/');
        let owner = parts.next()?;
        let name = parts.next()?;
        if parts.next().is_some() || !Self::valid_part(owner) || !Self::valid_part(name) {
            return None;
        }
        Some(Self::new(owner, name))
    }

    fn valid_part(part: &str) -> bool {
        SLUG_PART_RE.is_match(part) && part != "." && part != ".."
    }
}

impl FromStr for RepoSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches(".git");
        match trimmed.split_once('/') {
            Some((owner, name)) if Self::valid_part(owner) && Self::valid_part(name) => {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!(
                "Invalid repository '{s}'. Expected: owner/repo"
            )),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
