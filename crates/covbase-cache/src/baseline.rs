//! Recovery of the previous baseline artifact.

use crate::keys::{CacheKeyCodec, RestorePrefix};
use crate::provider::CacheProvider;
use crate::types::CacheRestoreRequest;
use covbase_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a restore attempt recovered.
///
/// The fields are independent: a hit on a key without a parseable commit id
/// yields a `recovered_key` but no `sha`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineResult {
    /// Commit the recovered artifact was produced for.
    pub sha: Option<String>,
    /// Key the artifact was found under.
    pub recovered_key: Option<String>,
}

/// Restores the most recent baseline for a branch from the artifact cache.
pub struct BaselineResolver<'a> {
    cache: &'a dyn CacheProvider,
    codec: &'a CacheKeyCodec,
    base_dir: Option<PathBuf>,
}

impl<'a> BaselineResolver<'a> {
    pub fn new(cache: &'a dyn CacheProvider, codec: &'a CacheKeyCodec) -> Self {
        Self {
            cache,
            codec,
            base_dir: None,
        }
    }

    /// Directory the artifact path is relative to. Defaults to the working directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Restore `artifact_path` from the newest entry under `prefix`.
    ///
    /// A miss, an unreadable archive or an unparseable key is not an error.
    /// Only failures of the cache store itself are returned.
    pub async fn resolve(&self, prefix: &RestorePrefix, artifact_path: &Path) -> Result<BaselineResult> {
        let request = CacheRestoreRequest {
            key: prefix.to_string(),
            restore_keys: vec![prefix.to_string()],
            paths: vec![artifact_path.to_path_buf()],
            base_dir: self.base_dir.clone(),
        };

        let restored = match self.cache.restore(&request).await {
            Ok(restored) => restored,
            Err(Error::Archive(reason)) => {
                warn!("Failed to restore previous coverage: {}", reason);
                return Ok(BaselineResult::default());
            }
            Err(e) => return Err(e),
        };
        let Some(recovered_key) = restored.matched_key else {
            warn!("Couldn't get previous coverage from cache key {}", prefix);
            return Ok(BaselineResult::default());
        };

        info!("Restoring previous coverage from cache key {}...", recovered_key);
        match self.codec.extract_commit_id(&recovered_key) {
            Some(sha) => {
                info!("Parsed previous commit id {} from cache key", sha);
                Ok(BaselineResult {
                    sha: Some(sha),
                    recovered_key: Some(recovered_key),
                })
            }
            None => {
                warn!(
                    "Could not parse commit id from cache key '{}'",
                    recovered_key
                );
                Ok(BaselineResult {
                    sha: None,
                    recovered_key: Some(recovered_key),
                })
            }
        }
    }
}
