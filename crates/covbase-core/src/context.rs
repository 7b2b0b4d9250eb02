//! Trigger context captured from the CI environment.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Event name the host uses for pull request triggers.
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// Owner and name of the repository the run belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse an `owner/repo` string.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, repo) = slug.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::new(owner, repo))
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Read-only metadata about the event that triggered this run.
///
/// Built once at startup and handed to each resolver explicitly, so the
/// protocol can be driven by synthetic contexts in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerContext {
    /// Event name (e.g. "push", "pull_request").
    pub event_name: String,
    /// Fully qualified ref (e.g. "refs/heads/main").
    pub git_ref: String,
    /// Commit the run was triggered for.
    pub sha: String,
    pub repo: RepoSlug,
    /// Pull request number, when the event carries one.
    pub pull_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: u64,
}

impl TriggerContext {
    pub fn is_pull_request(&self) -> bool {
        self.event_name == PULL_REQUEST_EVENT
    }

    /// Capture the context from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Capture the context through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::MissingContext(format!("{name} is not set")))
        };

        let event_name = required("GITHUB_EVENT_NAME")?;
        let git_ref = lookup("GITHUB_REF").unwrap_or_default();
        let sha = required("GITHUB_SHA")?;
        let slug = required("GITHUB_REPOSITORY")?;
        let repo = RepoSlug::parse(&slug).ok_or_else(|| {
            Error::MissingContext(format!("GITHUB_REPOSITORY is not owner/repo: {slug}"))
        })?;

        let pull_number = match lookup("GITHUB_EVENT_PATH").filter(|p| !p.is_empty()) {
            Some(path) => read_pull_number(Path::new(&path))?,
            None => None,
        }
        .or_else(|| parse_pull_number(&git_ref));

        Ok(Self {
            event_name,
            git_ref,
            sha,
            repo,
            pull_number,
        })
    }
}

impl fmt::Display for TriggerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} ({})",
            self.repo,
            self.event_name,
            self.git_ref,
            self.sha.get(..7).unwrap_or(&self.sha)
        )
    }
}

fn read_pull_number(path: &Path) -> Result<Option<u64>> {
    if !path.exists() {
        debug!(path = %path.display(), "Event payload not found");
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let payload: EventPayload = serde_json::from_str(&content)?;
    Ok(payload.pull_request.map(|pr| pr.number).or(payload.number))
}

/// Extract the pull request number from a ref like "refs/pull/123/merge".
fn parse_pull_number(git_ref: &str) -> Option<u64> {
    git_ref
        .strip_prefix("refs/pull/")?
        .split('/')
        .next()?
        .parse()
        .ok()
}
