//! Current and baseline branch derivation.

use covbase_core::context::TriggerContext;
use covbase_core::ports::PullRequestService;
use covbase_core::{Error, Result};
use tracing::debug;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Branch the run publishes for, and branch it compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub current_branch: String,
    pub baseline_branch: String,
}

/// Strip the `refs/heads/` namespace from a fully qualified branch ref.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(git_ref)
}

pub struct BranchContextResolver<'a> {
    pulls: &'a dyn PullRequestService,
}

impl<'a> BranchContextResolver<'a> {
    pub fn new(pulls: &'a dyn PullRequestService) -> Self {
        Self { pulls }
    }

    /// Pull requests compare the head branch against the base branch; every
    /// other event compares the pushed branch against itself.
    pub async fn resolve(&self, ctx: &TriggerContext) -> Result<BranchContext> {
        if ctx.is_pull_request() {
            let number = ctx.pull_number.ok_or_else(|| {
                Error::MissingContext("pull request event without a pull request number".into())
            })?;
            let pr = self.pulls.get_pull_request(&ctx.repo, number).await?;
            debug!(number, head = %pr.head_ref, base = %pr.base_ref, "Resolved pull request refs");
            return Ok(BranchContext {
                current_branch: pr.head_ref,
                baseline_branch: pr.base_ref,
            });
        }

        let branch = branch_from_ref(&ctx.git_ref).to_string();
        Ok(BranchContext {
            current_branch: branch.clone(),
            baseline_branch: branch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use covbase_core::context::RepoSlug;
    use covbase_core::ports::PullRequestRefs;
    use pretty_assertions::assert_eq;

    struct Pulls;

    #[async_trait]
    impl PullRequestService for Pulls {
        async fn get_pull_request(&self, _repo: &RepoSlug, number: u64) -> Result<PullRequestRefs> {
            assert_eq!(number, 12);
            Ok(PullRequestRefs {
                head_ref: "feature-x".into(),
                base_ref: "main".into(),
            })
        }
    }

    fn context(event_name: &str, git_ref: &str, pull_number: Option<u64>) -> TriggerContext {
        TriggerContext {
            event_name: event_name.into(),
            git_ref: git_ref.into(),
            sha: "abc123".into(),
            repo: RepoSlug::new("acme", "app"),
            pull_number,
        }
    }

    #[tokio::test]
    async fn test_pull_request_uses_head_and_base() {
        let resolved = BranchContextResolver::new(&Pulls)
            .resolve(&context("pull_request", "refs/pull/12/merge", Some(12)))
            .await
            .unwrap();

        assert_eq!(
            resolved,
            BranchContext {
                current_branch: "feature-x".into(),
                baseline_branch: "main".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_push_strips_heads_prefix() {
        let resolved = BranchContextResolver::new(&Pulls)
            .resolve(&context("push", "refs/heads/release-1", None))
            .await
            .unwrap();

        assert_eq!(resolved.current_branch, "release-1");
        assert_eq!(resolved.baseline_branch, "release-1");
    }

    #[tokio::test]
    async fn test_pull_request_without_number_fails() {
        let err = BranchContextResolver::new(&Pulls)
            .resolve(&context("pull_request", "", None))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingContext(_)));
    }

    #[test]
    fn test_branch_from_ref() {
        assert_eq!(branch_from_ref("refs/heads/feature/login"), "feature/login");
        assert_eq!(branch_from_ref("refs/tags/v1.0.0"), "refs/tags/v1.0.0");
        assert_eq!(branch_from_ref("main"), "main");
    }
}
