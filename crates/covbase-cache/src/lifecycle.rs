//! Re-publishing the current artifact as the next baseline.

use crate::keys::CacheKey;
use crate::provider::BaselineStore;
use crate::types::CacheSaveRequest;
use covbase_core::Result;
use covbase_core::context::RepoSlug;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How many of the most recent entries are checked for a key collision.
///
/// Entries older than this window are not seen, so a collision with one of
/// them still fails the save.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Publishes baselines, clearing a previous entry under the same key first.
///
/// The collision check and the save go to the same store.
pub struct CacheLifecycleManager<'a> {
    store: &'a dyn BaselineStore,
    repo: &'a RepoSlug,
    page_size: u32,
    base_dir: Option<PathBuf>,
}

impl<'a> CacheLifecycleManager<'a> {
    pub fn new(store: &'a dyn BaselineStore, repo: &'a RepoSlug) -> Self {
        Self {
            store,
            repo,
            page_size: DEFAULT_PAGE_SIZE,
            base_dir: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Save `artifact_path` under `key`.
    ///
    /// The save is always attempted, even when the existing entries could
    /// not be listed or the colliding one could not be deleted.
    pub async fn publish(&self, artifact_path: &Path, key: &CacheKey) -> Result<()> {
        if let Err(e) = self.clear_existing(key).await {
            warn!("Could not verify existing cache keys: {}", e);
        }

        let saved = self
            .store
            .save(&CacheSaveRequest {
                key: key.to_string(),
                paths: vec![artifact_path.to_path_buf()],
                base_dir: self.base_dir.clone(),
            })
            .await?;

        info!(
            key = %saved.entry.key,
            size_bytes = saved.entry.size_bytes,
            duration_ms = saved.duration_ms,
            "Saved baseline to cache"
        );
        Ok(())
    }

    async fn clear_existing(&self, key: &CacheKey) -> Result<()> {
        let entries = self.store.list_entries(self.repo, self.page_size).await?;

        match entries.iter().find(|e| e.key == key.as_str()) {
            Some(existing) => {
                info!(
                    "Cache key {} already exists (id={}), deleting it before saving new one.",
                    key, existing.id
                );
                self.store.delete_entry(self.repo, existing.id).await
            }
            None => {
                info!("Cache key {} does not exist yet; will create new cache.", key);
                Ok(())
            }
        }
    }
}
