//! Parent-commit fallback when no cached baseline names its commit.

use covbase_core::context::RepoSlug;
use covbase_core::ports::CommitService;
use tracing::{info, warn};

pub struct CommitAncestryResolver<'a> {
    commits: &'a dyn CommitService,
    repo: &'a RepoSlug,
}

impl<'a> CommitAncestryResolver<'a> {
    pub fn new(commits: &'a dyn CommitService, repo: &'a RepoSlug) -> Self {
        Self { commits, repo }
    }

    /// First parent of `commit_id`, or `None` for root commits and failed lookups.
    pub async fn resolve_parent(&self, commit_id: &str) -> Option<String> {
        let commit = match self.commits.get_commit(self.repo, commit_id).await {
            Ok(commit) => commit,
            Err(e) => {
                warn!("Failed to fetch parent commit via API: {}", e);
                return None;
            }
        };

        match commit.parents.into_iter().next() {
            Some(parent) => {
                info!("Using parent commit {} as previousCommitId", parent.sha);
                Some(parent.sha)
            }
            None => {
                warn!("No parent commit found for current commit");
                None
            }
        }
    }
}
