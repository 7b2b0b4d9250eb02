//! Cache types and requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request to restore a cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRestoreRequest {
    /// Primary cache key.
    pub key: String,
    /// Prefixes to try, in order, if the primary key misses.
    #[serde(default)]
    pub restore_keys: Vec<String>,
    /// Paths to restore to, in the order they were saved.
    pub paths: Vec<PathBuf>,
    /// Directory relative paths are resolved against.
    pub base_dir: Option<PathBuf>,
}

/// Request to save a cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSaveRequest {
    /// Cache key. Saving fails if it already exists.
    pub key: String,
    /// Paths to cache.
    pub paths: Vec<PathBuf>,
    /// Directory relative paths are resolved against.
    pub base_dir: Option<PathBuf>,
}

/// A stored cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: u64,
    pub key: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    /// Sha256 of the archive, checked before unpacking.
    pub checksum: String,
}

/// Result of a cache restore operation.
#[derive(Debug, Clone)]
pub struct RestoreResult {
    /// The matched cache entry, if any.
    pub entry: Option<CacheEntry>,
    /// The key that matched (may come from a restore key).
    pub matched_key: Option<String>,
    /// Whether it was an exact match.
    pub exact_match: bool,
    /// Time taken to restore in milliseconds.
    pub duration_ms: u64,
}

impl RestoreResult {
    pub fn miss(duration_ms: u64) -> Self {
        Self {
            entry: None,
            matched_key: None,
            exact_match: false,
            duration_ms,
        }
    }
}

/// Result of a cache save operation.
#[derive(Debug, Clone)]
pub struct SaveResult {
    /// The saved cache entry.
    pub entry: CacheEntry,
    /// Time taken to save in milliseconds.
    pub duration_ms: u64,
}
