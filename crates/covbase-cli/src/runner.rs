//! One run of the step: resolve the baseline, render the comparison and
//! publish the current report as the next baseline.

use crate::config::ActionConfig;
use covbase_cache::{BaselineResolver, BaselineStore, CacheKey, CacheKeyCodec, CacheLifecycleManager};
use covbase_core::ports::{CommentRenderer, CommitService, CoverageComparison, PullRequestService};
use covbase_core::{Result, TriggerContext};
use covbase_github::{BranchContextResolver, CommitAncestryResolver};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File the rendered comment is written to, relative to the working directory.
pub const COMMENT_FILE: &str = "comment.md";

/// Host services a run talks to.
pub struct Collaborators<'a> {
    /// Baseline store, also checked for an existing entry before publishing.
    pub store: &'a dyn BaselineStore,
    pub commits: &'a dyn CommitService,
    pub pulls: &'a dyn PullRequestService,
    pub renderer: &'a dyn CommentRenderer,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub comment: String,
    pub comment_file: PathBuf,
    pub previous_commit_id: Option<String>,
    pub published_key: CacheKey,
}

pub struct Runner<'a> {
    ctx: &'a TriggerContext,
    config: &'a ActionConfig,
    codec: CacheKeyCodec,
    deps: Collaborators<'a>,
    workdir: PathBuf,
}

impl<'a> Runner<'a> {
    pub fn new(
        ctx: &'a TriggerContext,
        config: &'a ActionConfig,
        codec: CacheKeyCodec,
        deps: Collaborators<'a>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ctx,
            config,
            codec,
            deps,
            workdir: workdir.into(),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        info!("Starting coverage comparison for {}", self.ctx);

        let branches = BranchContextResolver::new(self.deps.pulls)
            .resolve(self.ctx)
            .await?;
        debug!(
            current = %branches.current_branch,
            baseline = %branches.baseline_branch,
            "Resolved branches"
        );

        let prefix = self.codec.restore_prefix(&branches.baseline_branch)?;
        let restored = BaselineResolver::new(self.deps.store.as_provider(), &self.codec)
            .with_base_dir(&self.workdir)
            .resolve(&prefix, &self.config.reference_coverage_path)
            .await?;
        let mut previous_commit_id = restored.sha;
        info!(
            "previous commit id resolved to {}",
            previous_commit_id.as_deref().unwrap_or("undefined")
        );

        if !self.ctx.is_pull_request() && previous_commit_id.is_none() {
            previous_commit_id = CommitAncestryResolver::new(self.deps.commits, &self.ctx.repo)
                .resolve_parent(&self.ctx.sha)
                .await;
        }

        let comment = self.deps.renderer.render(&CoverageComparison {
            commit_id: self.ctx.sha.clone(),
            current_artifact: self.config.coverage_path.clone(),
            previous_commit_id: previous_commit_id.clone(),
            previous_artifact: self.config.reference_coverage_path.clone(),
        })?;
        info!("{}", comment);

        let comment_file = PathBuf::from(COMMENT_FILE);
        tokio::fs::write(self.workdir.join(&comment_file), &comment).await?;

        move_file(
            &self.workdir.join(&self.config.coverage_path),
            &self.workdir.join(&self.config.reference_coverage_path),
        )
        .await?;

        let key = self
            .codec
            .publish_key(&branches.current_branch, &self.ctx.sha)?;
        CacheLifecycleManager::new(self.deps.store, &self.ctx.repo)
            .with_base_dir(&self.workdir)
            .publish(&self.config.reference_coverage_path, &key)
            .await?;

        Ok(RunOutcome {
            comment,
            comment_file,
            previous_commit_id,
            published_key: key,
        })
    }
}

/// Move `from` onto `to`, replacing whatever is there.
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if tokio::fs::rename(from, to).await.is_err() {
        // Rename fails across filesystems; fall back to copy and remove
        tokio::fs::copy(from, to).await?;
        tokio::fs::remove_file(from).await?;
    }
    debug!(from = %from.display(), to = %to.display(), "Moved coverage report");
    Ok(())
}
