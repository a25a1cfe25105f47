//! GitHub integration: release feed, fork discovery and pull requests

mod client;
mod operations;

pub use client::{DEFAULT_API_BASE, GitHubClient};
pub use operations::{CodeHost, NewProposal, Proposal};
