//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the baseline protocol and the
//! host platform adapters.

use crate::Result;
use crate::context::RepoSlug;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to a commit by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Commit metadata, reduced to what ancestry resolution needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    /// Parents in the order the host reports them.
    #[serde(default)]
    pub parents: Vec<CommitRef>,
}

/// Head and base branches of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRefs {
    pub head_ref: String,
    pub base_ref: String,
}

/// A cache entry as enumerated by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntrySummary {
    pub id: u64,
    pub key: String,
}

/// Everything the comment renderer needs to compare two coverage reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageComparison {
    pub commit_id: String,
    pub current_artifact: PathBuf,
    pub previous_commit_id: Option<String>,
    pub previous_artifact: PathBuf,
}

/// Commit metadata service.
#[async_trait]
pub trait CommitService: Send + Sync {
    /// Get a commit by sha or ref.
    async fn get_commit(&self, repo: &RepoSlug, reference: &str) -> Result<CommitInfo>;
}

/// Pull request lookup.
#[async_trait]
pub trait PullRequestService: Send + Sync {
    async fn get_pull_request(&self, repo: &RepoSlug, number: u64) -> Result<PullRequestRefs>;
}

/// Cache entry enumeration and deletion.
#[async_trait]
pub trait CacheAdmin: Send + Sync {
    /// List the most recent cache entries, at most `page_size` of them.
    async fn list_entries(&self, repo: &RepoSlug, page_size: u32)
    -> Result<Vec<CacheEntrySummary>>;

    /// Delete a cache entry by id.
    async fn delete_entry(&self, repo: &RepoSlug, id: u64) -> Result<()>;
}

/// Turns a coverage comparison into comment text.
pub trait CommentRenderer: Send + Sync {
    fn render(&self, comparison: &CoverageComparison) -> Result<String>;
}
