//! GitHub REST API client over `reqwest`.

use super::operations::{
    NewProposal, Proposal, PullRequestResponse, ReleaseResponse, RepositoryResponse, UserResponse,
};
use super::CodeHost;
use crate::error::HostError;
use crate::repo::RepoSlug;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Public GitHub API
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Longest response body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// GitHub client authenticated with an optional token.
///
/// The token lives only in memory and is sent as a bearer header.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl GitHubClient {
    /// Create a client for `api_base`, each request bounded by `timeout`
    pub fn new(api_base: &str, token: Option<String>, timeout: Duration) -> Result<Self, HostError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&NewProposal>,
    ) -> Result<(String, Response), HostError> {
        let url = self.url(path);
        log::debug!("{method} {url} {query:?}");

        let mut request = self.http.request(method, &url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| HostError::Request {
            url: url.clone(),
            source,
        })?;
        Ok((url, response))
    }

    /// Issue a request and decode a success body; 404 becomes `None`
    async fn request_optional<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&NewProposal>,
    ) -> Result<Option<T>, HostError> {
        let (url, response) = self.send(method.clone(), path, query, body).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = response.text().await.map_err(|source| HostError::Request {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(HostError::Status {
                method: method.to_string(),
                url,
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| HostError::Decode {
                url,
                reason: e.to_string(),
            })
    }

    /// Issue a request where 404 is an error like any other status
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&NewProposal>,
    ) -> Result<T, HostError> {
        match self.request_optional(method.clone(), path, query, body).await? {
            Some(value) => Ok(value),
            None => Err(HostError::Status {
                method: method.to_string(),
                url: self.url(path),
                status: StatusCode::NOT_FOUND.as_u16(),
                body: "Not Found".to_string(),
            }),
        }
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

impl CodeHost for GitHubClient {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn latest_release_tag(&self, project: &RepoSlug) -> Result<Option<String>, HostError> {
        let release: ReleaseResponse = self
            .request(Method::GET, &format!("/repos/{project}/releases/latest"), &[], None)
            .await?;
        Ok(release
            .tag_name
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    async fn current_user(&self) -> Result<String, HostError> {
        let user: UserResponse = self.request(Method::GET, "/user", &[], None).await?;
        Ok(user.login)
    }

    async fn find_fork(&self, upstream: &RepoSlug, owner: &str) -> Result<Option<RepoSlug>, HostError> {
        let path = format!("/repos/{owner}/{}", upstream.name);
        let repo: Option<RepositoryResponse> = self.request_optional(Method::GET, &path, &[], None).await?;
        Ok(repo
            .filter(|r| r.is_fork_of(upstream))
            .and_then(|r| r.full_name.parse().ok()))
    }

    async fn list_open_proposals(&self, repo: &RepoSlug, head: &str) -> Result<Vec<Proposal>, HostError> {
        let prs: Vec<PullRequestResponse> = self
            .request(
                Method::GET,
                &format!("/repos/{repo}/pulls"),
                &[("state", "open"), ("head", head)],
                None,
            )
            .await?;
        Ok(prs.into_iter().map(Proposal::from).collect())
    }

    async fn create_proposal(&self, repo: &RepoSlug, proposal: &NewProposal) -> Result<Proposal, HostError> {
        let pr: PullRequestResponse = self
            .request(Method::POST, &format!("/repos/{repo}/pulls"), &[], Some(proposal))
            .await?;
        Ok(pr.into())
    }

    async fn view_proposal(&self, repo: &RepoSlug, number: u64) -> Result<Proposal, HostError> {
        let pr: PullRequestResponse = self
            .request(Method::GET, &format!("/repos/{repo}/pulls/{number}"), &[], None)
            .await?;
        Ok(pr.into())
    }
}
