//! Baseline cache for covbase: key codec, filesystem store, restore and
//! publish protocol.

pub mod archiver;
pub mod baseline;
pub mod keys;
pub mod lifecycle;
pub mod provider;
pub mod types;

pub use baseline::{BaselineResolver, BaselineResult};
pub use keys::{CacheKey, CacheKeyCodec, RestorePrefix, host_platform};
pub use lifecycle::{CacheLifecycleManager, DEFAULT_PAGE_SIZE};
pub use provider::{BaselineStore, CacheProvider, FilesystemProvider};
pub use types::{
    CacheEntry, CacheRestoreRequest, CacheSaveRequest, RestoreResult, SaveResult,
};
