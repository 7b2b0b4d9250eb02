use crate::config::ActionConfig;
use crate::render::SummaryRenderer;
use crate::runner::{COMMENT_FILE, Collaborators, Runner};
use async_trait::async_trait;
use covbase_cache::{CacheKeyCodec, CacheProvider, CacheSaveRequest, FilesystemProvider};
use covbase_core::context::RepoSlug;
use covbase_core::ports::{
    CommentRenderer, CommitInfo, CommitRef, CommitService, CoverageComparison, PullRequestRefs,
    PullRequestService,
};
use covbase_core::{Error, Result, TriggerContext};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Commit history keyed by sha, recording every lookup.
#[derive(Default)]
struct FakeHost {
    parents: HashMap<String, Vec<String>>,
    pull: Option<PullRequestRefs>,
    commit_lookups: Mutex<Vec<String>>,
}

#[async_trait]
impl CommitService for FakeHost {
    async fn get_commit(&self, _repo: &RepoSlug, reference: &str) -> Result<CommitInfo> {
        self.commit_lookups.lock().unwrap().push(reference.to_string());
        let parents = self
            .parents
            .get(reference)
            .ok_or_else(|| Error::NotFound(format!("commit {reference}")))?;
        Ok(CommitInfo {
            sha: reference.to_string(),
            parents: parents
                .iter()
                .map(|sha| CommitRef { sha: sha.clone() })
                .collect(),
        })
    }
}

#[async_trait]
impl PullRequestService for FakeHost {
    async fn get_pull_request(&self, _repo: &RepoSlug, _number: u64) -> Result<PullRequestRefs> {
        self.pull
            .clone()
            .ok_or_else(|| Error::NotFound("pull request".into()))
    }
}

/// Captures what it was asked to render.
#[derive(Default)]
struct CapturingRenderer {
    seen: Mutex<Vec<CoverageComparison>>,
}

impl CommentRenderer for CapturingRenderer {
    fn render(&self, comparison: &CoverageComparison) -> Result<String> {
        self.seen.lock().unwrap().push(comparison.clone());
        Ok(format!(
            "coverage {} vs {}",
            comparison.commit_id,
            comparison.previous_commit_id.as_deref().unwrap_or("none")
        ))
    }
}

fn config() -> ActionConfig {
    ActionConfig {
        coverage_path: PathBuf::from("coverage.txt"),
        reference_coverage_path: PathBuf::from("__prev-text-summary.txt"),
        token: "t".into(),
        cache_dir: None,
        api_url: "http://localhost".into(),
    }
}

fn push_context(branch: &str, sha: &str) -> TriggerContext {
    TriggerContext {
        event_name: "push".into(),
        git_ref: format!("refs/heads/{branch}"),
        sha: sha.into(),
        repo: RepoSlug::new("acme", "app"),
        pull_number: None,
    }
}

async fn seed_baseline(store: &FilesystemProvider, key: &str, contents: &str) {
    let seed = tempfile::tempdir().unwrap();
    std::fs::write(seed.path().join("__prev-text-summary.txt"), contents).unwrap();
    store
        .save(&CacheSaveRequest {
            key: key.to_string(),
            paths: vec![PathBuf::from("__prev-text-summary.txt")],
            base_dir: Some(seed.path().to_path_buf()),
        })
        .await
        .unwrap();
}

fn write_report(workdir: &Path, contents: &str) {
    std::fs::write(workdir.join("coverage.txt"), contents).unwrap();
}

#[tokio::test]
async fn test_push_without_cache_falls_back_to_parent() {
    let store_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    write_report(workdir.path(), "Lines : 75%");

    let store = FilesystemProvider::new(store_dir.path().to_path_buf());
    let host = FakeHost {
        parents: HashMap::from([("c2".to_string(), vec!["c1".to_string()])]),
        ..Default::default()
    };
    let renderer = CapturingRenderer::default();
    let ctx = push_context("release-1", "c2");
    let config = config();

    let outcome = Runner::new(
        &ctx,
        &config,
        CacheKeyCodec::new("linux"),
        Collaborators {
            store: &store,
            commits: &host,
            pulls: &host,
            renderer: &renderer,
        },
        workdir.path(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(*host.commit_lookups.lock().unwrap(), vec!["c2".to_string()]);

    let seen = renderer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].commit_id, "c2");
    assert_eq!(seen[0].previous_commit_id.as_deref(), Some("c1"));

    assert_eq!(outcome.previous_commit_id.as_deref(), Some("c1"));
    assert_eq!(outcome.published_key.as_str(), "linux-release-1-prev-c2");
    assert_eq!(outcome.comment_file, PathBuf::from(COMMENT_FILE));
    assert_eq!(
        std::fs::read_to_string(workdir.path().join(COMMENT_FILE)).unwrap(),
        "coverage c2 vs c1"
    );

    // The report moved onto the baseline path
    assert!(!workdir.path().join("coverage.txt").exists());
    assert_eq!(
        std::fs::read_to_string(workdir.path().join("__prev-text-summary.txt")).unwrap(),
        "Lines : 75%"
    );

    let keys: Vec<String> = store
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys, vec!["linux-release-1-prev-c2".to_string()]);
}

#[tokio::test]
async fn test_push_with_cache_hit_skips_ancestry() {
    let store_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    write_report(workdir.path(), "Lines : 80%");

    let store = FilesystemProvider::new(store_dir.path().to_path_buf());
    seed_baseline(&store, "linux-main-prev-abc123", "Lines : 70%").await;

    let host = FakeHost::default();
    let renderer = CapturingRenderer::default();
    let ctx = push_context("main", "def456");
    let config = config();

    let outcome = Runner::new(
        &ctx,
        &config,
        CacheKeyCodec::new("linux"),
        Collaborators {
            store: &store,
            commits: &host,
            pulls: &host,
            renderer: &renderer,
        },
        workdir.path(),
    )
    .run()
    .await
    .unwrap();

    assert!(host.commit_lookups.lock().unwrap().is_empty());
    assert_eq!(outcome.previous_commit_id.as_deref(), Some("abc123"));
    assert_eq!(outcome.published_key.as_str(), "linux-main-prev-def456");
}

#[tokio::test]
async fn test_pull_request_compares_against_base_branch() {
    let store_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    write_report(workdir.path(), "Lines : 90%");

    let store = FilesystemProvider::new(store_dir.path().to_path_buf());
    seed_baseline(&store, "linux-main-prev-abc123", "Lines : 88%").await;

    let host = FakeHost {
        pull: Some(PullRequestRefs {
            head_ref: "feature-x".into(),
            base_ref: "main".into(),
        }),
        ..Default::default()
    };
    let renderer = CapturingRenderer::default();
    let ctx = TriggerContext {
        event_name: "pull_request".into(),
        git_ref: "refs/pull/12/merge".into(),
        sha: "fe11".into(),
        repo: RepoSlug::new("acme", "app"),
        pull_number: Some(12),
    };
    let config = config();

    let outcome = Runner::new(
        &ctx,
        &config,
        CacheKeyCodec::new("linux"),
        Collaborators {
            store: &store,
            commits: &host,
            pulls: &host,
            renderer: &renderer,
        },
        workdir.path(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(outcome.previous_commit_id.as_deref(), Some("abc123"));
    assert_eq!(outcome.published_key.as_str(), "linux-feature-x-prev-fe11");
    assert_eq!(
        std::fs::read_to_string(workdir.path().join("__prev-text-summary.txt")).unwrap(),
        "Lines : 90%"
    );
}

#[tokio::test]
async fn test_pull_request_miss_never_consults_ancestry() {
    let store_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    write_report(workdir.path(), "Lines : 90%");

    let store = FilesystemProvider::new(store_dir.path().to_path_buf());
    let host = FakeHost {
        pull: Some(PullRequestRefs {
            head_ref: "feature-x".into(),
            base_ref: "main".into(),
        }),
        ..Default::default()
    };
    let renderer = CapturingRenderer::default();
    let ctx = TriggerContext {
        event_name: "pull_request".into(),
        git_ref: "refs/pull/12/merge".into(),
        sha: "fe11".into(),
        repo: RepoSlug::new("acme", "app"),
        pull_number: Some(12),
    };
    let config = config();

    let outcome = Runner::new(
        &ctx,
        &config,
        CacheKeyCodec::new("linux"),
        Collaborators {
            store: &store,
            commits: &host,
            pulls: &host,
            renderer: &renderer,
        },
        workdir.path(),
    )
    .run()
    .await
    .unwrap();

    assert!(host.commit_lookups.lock().unwrap().is_empty());
    assert_eq!(outcome.previous_commit_id, None);
}

#[tokio::test]
async fn test_rerun_on_same_commit_replaces_entry() {
    let store_dir = tempfile::tempdir().unwrap();
    let store = FilesystemProvider::new(store_dir.path().to_path_buf());
    let host = FakeHost {
        parents: HashMap::from([("c2".to_string(), vec!["c1".to_string()])]),
        ..Default::default()
    };
    let renderer = CapturingRenderer::default();
    let ctx = push_context("release-1", "c2");
    let config = config();

    for report in ["Lines : 60%", "Lines : 61%"] {
        let workdir = tempfile::tempdir().unwrap();
        write_report(workdir.path(), report);
        Runner::new(
            &ctx,
            &config,
            CacheKeyCodec::new("linux"),
            Collaborators {
                store: &store,
                commits: &host,
                pulls: &host,
                renderer: &renderer,
            },
            workdir.path(),
        )
        .run()
        .await
        .unwrap();
    }

    let entries = store.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "linux-release-1-prev-c2");
}

#[tokio::test]
async fn test_missing_report_fails_the_run() {
    let store_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let store = FilesystemProvider::new(store_dir.path().to_path_buf());
    let host = FakeHost::default();
    let renderer = CapturingRenderer::default();
    let ctx = push_context("main", "abc");
    let config = config();

    let err = Runner::new(
        &ctx,
        &config,
        CacheKeyCodec::new("linux"),
        Collaborators {
            store: &store,
            commits: &host,
            pulls: &host,
            renderer: &renderer,
        },
        workdir.path(),
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert!(store.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reference_path_outside_workdir() {
    let elsewhere = tempfile::tempdir().unwrap();

    for reference in [PathBuf::from("../prev.txt"), elsewhere.path().join("prev.txt")] {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("work");
        std::fs::create_dir(&workdir).unwrap();
        let store_dir = tempfile::tempdir().unwrap();
        let store = FilesystemProvider::new(store_dir.path().to_path_buf());
        let host = FakeHost {
            parents: HashMap::from([("c1".to_string(), vec!["c0".to_string()])]),
            ..Default::default()
        };
        let renderer = SummaryRenderer::new(&workdir);
        let config = ActionConfig {
            reference_coverage_path: reference.clone(),
            ..config()
        };
        let on_disk = workdir.join(&reference);

        let mut outcomes = vec![];
        for (sha, report) in [("c1", "Lines : 70%"), ("c2", "Lines : 75%")] {
            // Each run starts from a clean checkout
            if on_disk.exists() {
                std::fs::remove_file(&on_disk).unwrap();
            }
            write_report(&workdir, report);
            let ctx = push_context("main", sha);
            let outcome = Runner::new(
                &ctx,
                &config,
                CacheKeyCodec::new("linux"),
                Collaborators {
                    store: &store,
                    commits: &host,
                    pulls: &host,
                    renderer: &renderer,
                },
                &workdir,
            )
            .run()
            .await
            .unwrap();
            outcomes.push(outcome);
        }

        assert_eq!(outcomes[0].published_key.as_str(), "linux-main-prev-c1");
        assert_eq!(outcomes[1].previous_commit_id.as_deref(), Some("c1"));
        assert!(outcomes[1].comment.contains("#### Baseline `c1`"));
        assert!(outcomes[1].comment.contains("Lines : 70%"));
        assert_eq!(std::fs::read_to_string(&on_disk).unwrap(), "Lines : 75%");
        assert_eq!(store.entries().await.unwrap().len(), 2);
    }
}
