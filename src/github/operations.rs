//! Code hosting operations trait and types.

use crate::error::HostError;
use crate::repo::RepoSlug;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// An open or closed pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Pull request number
    pub number: u64,
    /// Browser URL
    pub html_url: String,
    /// `open` or `closed`
    pub state: String,
    /// Head branch name
    pub head_ref: String,
    /// Commit the head branch points at
    pub head_sha: String,
}

/// Parameters of a pull request to open
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProposal {
    /// Title line
    pub title: String,
    /// Markdown body
    pub body: String,
    /// `owner:branch` of the proposed changes
    pub head: String,
    /// Branch the changes are proposed against
    pub base: String,
}

/// Code hosting collaborator: releases, forks and pull requests.
///
/// A missing resource is `Ok(None)` or an empty list wherever the caller
/// can act on absence; everything else surfaces as [`HostError`].
pub trait CodeHost {
    /// Whether requests carry a token
    fn is_authenticated(&self) -> bool;

    /// Tag of the latest published release, `None` when the release has no tag
    fn latest_release_tag(
        &self,
        project: &RepoSlug,
    ) -> impl Future<Output = Result<Option<String>, HostError>>;

    /// Login of the token's user
    fn current_user(&self) -> impl Future<Output = Result<String, HostError>>;

    /// `owner`'s fork of `upstream`, if there is one
    fn find_fork(
        &self,
        upstream: &RepoSlug,
        owner: &str,
    ) -> impl Future<Output = Result<Option<RepoSlug>, HostError>>;

    /// Open pull requests against `repo` whose head is `head` (`owner:branch`)
    fn list_open_proposals(
        &self,
        repo: &RepoSlug,
        head: &str,
    ) -> impl Future<Output = Result<Vec<Proposal>, HostError>>;

    /// Open a pull request
    fn create_proposal(
        &self,
        repo: &RepoSlug,
        proposal: &NewProposal,
    ) -> impl Future<Output = Result<Proposal, HostError>>;

    /// Fetch a pull request by number
    fn view_proposal(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> impl Future<Output = Result<Proposal, HostError>>;
}

/// `GET /repos/{owner}/{repo}/releases/latest`
#[derive(Debug, Deserialize)]
pub(crate) struct ReleaseResponse {
    #[serde(default)]
    pub tag_name: Option<String>,
}

/// `GET /user`
#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoRef {
    pub full_name: String,
}

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryResponse {
    pub full_name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub parent: Option<RepoRef>,
    #[serde(default)]
    pub source: Option<RepoRef>,
}

impl RepositoryResponse {
    /// Whether this repository is a fork of `upstream`, directly or transitively
    pub fn is_fork_of(&self, upstream: &RepoSlug) -> bool {
        let wanted = upstream.to_string();
        self.fork
            && [&self.parent, &self.source]
                .into_iter()
                .flatten()
                .any(|r| r.full_name.eq_ignore_ascii_case(&wanted))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeadRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: String,
}

/// Pull request object
#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestResponse {
    pub number: u64,
    pub html_url: String,
    pub state: String,
    pub head: HeadRef,
}

impl From<PullRequestResponse> for Proposal {
    fn from(pr: PullRequestResponse) -> Self {
        Self {
            number: pr.number,
            html_url: pr.html_url,
            state: pr.state,
            head_ref: pr.head.name,
            head_sha: pr.head.sha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_decodes_head() {
        let json = r#"{
            "number": 4512,
            "html_url": "https://github.com/getumbrel/umbrel-apps/pull/4512",
            "state": "open",
            "title": "Update myapp to v1.2.3",
            "head": {"label": "alice:update-myapp-v1.2.3", "ref": "update-myapp-v1.2.3", "sha": "abc123"},
            "base": {"ref": "master", "sha": "def456"}
        }"#;
        let pr: PullRequestResponse = serde_json::from_str(json).unwrap();
        let proposal = Proposal::from(pr);
        assert_eq!(proposal.number, 4512);
        assert_eq!(proposal.head_ref, "update-myapp-v1.2.3");
        assert_eq!(proposal.head_sha, "abc123");
    }

    #[test]
    fn test_release_without_tag() {
        let release: ReleaseResponse = serde_json::from_str(r#"{"name": "draft"}"#).unwrap();
        assert!(release.tag_name.is_none());
    }

    #[test]
    fn test_fork_detection() {
        let upstream = RepoSlug::new("getumbrel", "umbrel-apps");
        let fork: RepositoryResponse = serde_json::from_str(
            r#"{"full_name": "alice/umbrel-apps", "fork": true,
                "parent": {"full_name": "getumbrel/umbrel-apps"},
                "source": {"full_name": "getumbrel/umbrel-apps"}}"#,
        )
        .unwrap();
        assert!(fork.is_fork_of(&upstream));

        let unrelated: RepositoryResponse =
            serde_json::from_str(r#"{"full_name": "alice/umbrel-apps", "fork": false}"#).unwrap();
        assert!(!unrelated.is_fork_of(&upstream));
    }
}
