//! Cache storage provider trait and the filesystem store.

use crate::archiver::{create_archive, extract_archive};
use crate::types::{CacheEntry, CacheRestoreRequest, CacheSaveRequest, RestoreResult, SaveResult};
use async_trait::async_trait;
use covbase_core::context::RepoSlug;
use covbase_core::ports::{CacheAdmin, CacheEntrySummary};
use covbase_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Trait for artifact cache backends.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Restore a cache entry. Tries the exact key, then each restore key as
    /// a prefix, newest entry first.
    async fn restore(&self, request: &CacheRestoreRequest) -> Result<RestoreResult>;

    /// Save a cache entry. Fails with [`Error::CacheKeyExists`] if the key is taken.
    async fn save(&self, request: &CacheSaveRequest) -> Result<SaveResult>;
}

/// A cache store that can also enumerate and delete its own entries.
///
/// Publishing lists, deletes and saves through one `BaselineStore`.
pub trait BaselineStore: CacheProvider + CacheAdmin {
    fn as_provider(&self) -> &dyn CacheProvider;
}

impl<T: CacheProvider + CacheAdmin> BaselineStore for T {
    fn as_provider(&self) -> &dyn CacheProvider {
        self
    }
}

/// Filesystem-backed cache store.
///
/// Each entry is a `.tar.zst` archive plus a JSON sidecar holding its
/// metadata, both named after the sha256 of the key so any key is a valid
/// file name.
pub struct FilesystemProvider {
    root_dir: PathBuf,
}

impl FilesystemProvider {
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    /// Store under the user cache directory.
    pub fn default_root() -> PathBuf {
        directories::ProjectDirs::from("dev", "covbase", "covbase")
            .map(|dirs| dirs.cache_dir().join("baselines"))
            .unwrap_or_else(|| std::env::temp_dir().join("covbase-baselines"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn key_digest(key: &str) -> [u8; 32] {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(key.as_bytes()));
        digest
    }

    fn entry_id(key: &str) -> u64 {
        let digest = Self::key_digest(key);
        let mut id = [0u8; 8];
        id.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(id)
    }

    fn stem(key: &str) -> String {
        hex::encode(Self::key_digest(key))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(format!("{}.json", Self::stem(key)))
    }

    fn archive_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(format!("{}.tar.zst", Self::stem(key)))
    }

    async fn load_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.meta_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// All entries, most recent first.
    pub async fn entries(&self) -> Result<Vec<CacheEntry>> {
        if !self.root_dir.exists() {
            return Ok(vec![]);
        }

        let mut entries = vec![];
        let mut read_dir = tokio::fs::read_dir(&self.root_dir).await.map_err(|e| {
            Error::CacheTransport(format!("Failed to read cache dir: {}", e))
        })?;

        while let Some(dir_entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Error::CacheTransport(format!("Failed to read entry: {}", e)))?
        {
            let path = dir_entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = tokio::fs::read_to_string(&path).await?;
                match serde_json::from_str::<CacheEntry>(&content) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => debug!(path = %path.display(), "Skipping unreadable entry: {}", e),
                }
            }
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.key.cmp(&a.key))
        });
        Ok(entries)
    }

    /// Entries whose key starts with `prefix`, most recent first.
    pub async fn list(&self, prefix: &str) -> Result<Vec<CacheEntry>> {
        let mut entries = self.entries().await?;
        entries.retain(|e| e.key.starts_with(prefix));
        Ok(entries)
    }

    async fn remove_entry(&self, entry: &CacheEntry) -> Result<()> {
        let archive = self.archive_path(&entry.key);
        if archive.exists() {
            tokio::fs::remove_file(&archive).await?;
        }
        tokio::fs::remove_file(self.meta_path(&entry.key)).await?;
        debug!(key = %entry.key, id = entry.id, "Removed cache entry");
        Ok(())
    }

    /// Unpack an entry onto `paths`.
    ///
    /// A vanished or corrupt archive is an [`Error::Archive`]; any other
    /// read failure is a transport error.
    async fn unpack(&self, entry: &CacheEntry, paths: &[PathBuf], base_dir: &Path) -> Result<()> {
        let archive = self.archive_path(&entry.key);
        let bytes = tokio::fs::read(&archive).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::Archive(format!("Archive for {} has disappeared", entry.key))
            }
            _ => Error::CacheTransport(format!("Archive for {} is unreadable: {}", entry.key, e)),
        })?;

        let checksum = hex::encode(Sha256::digest(&bytes));
        if checksum != entry.checksum {
            return Err(Error::Archive(format!(
                "Checksum mismatch for {}: expected {}, got {}",
                entry.key, entry.checksum, checksum
            )));
        }

        let paths = paths.to_vec();
        let dest = base_dir.to_path_buf();
        let restored = tokio::task::spawn_blocking(move || {
            extract_archive(bytes.as_slice(), &paths, &dest)
        })
        .await
        .map_err(|e| Error::Internal(format!("Extraction task failed: {}", e)))??;
        debug!(key = %entry.key, restored, "Unpacked cache entry");
        Ok(())
    }
}

fn resolve_base_dir(base_dir: Option<&PathBuf>) -> Result<PathBuf> {
    match base_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

#[async_trait]
impl CacheProvider for FilesystemProvider {
    async fn restore(&self, request: &CacheRestoreRequest) -> Result<RestoreResult> {
        let start = Instant::now();
        let base_dir = resolve_base_dir(request.base_dir.as_ref())?;

        // Try exact key match first
        if let Some(entry) = self.load_entry(&request.key).await? {
            self.unpack(&entry, &request.paths, &base_dir).await?;
            return Ok(RestoreResult {
                matched_key: Some(entry.key.clone()),
                entry: Some(entry),
                exact_match: true,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        // Try restore keys
        for restore_key in &request.restore_keys {
            let entries = self.list(restore_key).await?;
            if let Some(entry) = entries.into_iter().next() {
                self.unpack(&entry, &request.paths, &base_dir).await?;
                return Ok(RestoreResult {
                    matched_key: Some(entry.key.clone()),
                    entry: Some(entry),
                    exact_match: false,
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }
        }

        Ok(RestoreResult::miss(start.elapsed().as_millis() as u64))
    }

    async fn save(&self, request: &CacheSaveRequest) -> Result<SaveResult> {
        let start = Instant::now();
        if self.load_entry(&request.key).await?.is_some() {
            return Err(Error::CacheKeyExists(request.key.clone()));
        }

        let base_dir = resolve_base_dir(request.base_dir.as_ref())?;
        let paths = request.paths.clone();
        let archive = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            let packed = create_archive(&mut buf, &paths, &base_dir)?;
            Ok::<_, Error>((buf, packed))
        })
        .await
        .map_err(|e| Error::Internal(format!("Archive task failed: {}", e)))??;

        let (bytes, packed) = archive;
        if packed == 0 {
            return Err(Error::Archive(format!(
                "None of the paths to cache exist: {:?}",
                request.paths
            )));
        }

        tokio::fs::create_dir_all(&self.root_dir).await.map_err(|e| {
            Error::CacheTransport(format!("Failed to create cache dir: {}", e))
        })?;

        let entry = CacheEntry {
            id: Self::entry_id(&request.key),
            key: request.key.clone(),
            size_bytes: bytes.len() as u64,
            created_at: chrono::Utc::now(),
            checksum: hex::encode(Sha256::digest(&bytes)),
        };

        tokio::fs::write(self.archive_path(&entry.key), &bytes)
            .await
            .map_err(|e| Error::CacheTransport(format!("Failed to write cache: {}", e)))?;
        // The sidecar is written last; an entry without one is invisible.
        tokio::fs::write(self.meta_path(&entry.key), serde_json::to_vec(&entry)?)
            .await
            .map_err(|e| Error::CacheTransport(format!("Failed to write cache: {}", e)))?;

        Ok(SaveResult {
            entry,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// The store enumerates itself; repository scoping is implicit in its root.
#[async_trait]
impl CacheAdmin for FilesystemProvider {
    async fn list_entries(
        &self,
        _repo: &RepoSlug,
        page_size: u32,
    ) -> Result<Vec<CacheEntrySummary>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .take(page_size as usize)
            .map(|e| CacheEntrySummary { id: e.id, key: e.key })
            .collect())
    }

    async fn delete_entry(&self, _repo: &RepoSlug, id: u64) -> Result<()> {
        let entry = self
            .entries()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("cache entry {id}")))?;
        self.remove_entry(&entry).await
    }
}

impl Default for FilesystemProvider {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}
