//! Cache key composition and parsing.
//!
//! Baseline keys have the shape `<platform>-<branch>-prev-<sha>`. Restores
//! look up the key without its sha (the restore prefix) and recover the sha
//! of whatever entry matched by parsing the `-prev-<hex>` fragment.

use covbase_core::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

const PREV_MARKER: &str = "-prev-";

static SHA_FROM_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"prev-([0-9a-fA-F]+)(?:-|$)").unwrap());

/// Full key a baseline artifact is published under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

/// Key with the trailing sha omitted, used for prefix lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestorePrefix(String);

macro_rules! string_key {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_key!(CacheKey);
string_key!(RestorePrefix);

/// Platform segment of cache keys for the machine we run on.
///
/// Uses Node-style names so keys match those written by the JavaScript
/// release of this step.
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Builds and parses baseline cache keys for one platform.
#[derive(Debug, Clone)]
pub struct CacheKeyCodec {
    platform: String,
    pattern: Regex,
}

impl CacheKeyCodec {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            pattern: SHA_FROM_KEY.clone(),
        }
    }

    pub fn for_host() -> Self {
        Self::new(host_platform())
    }

    /// Replace the commit id pattern. The first capture group must hold the sha.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = pattern;
        self
    }

    /// `<platform>-<branch>-prev-`
    pub fn restore_prefix(&self, branch: &str) -> Result<RestorePrefix> {
        if branch.is_empty() {
            return Err(Error::InvalidKey("branch must not be empty".into()));
        }
        Ok(RestorePrefix(format!(
            "{}-{}{}",
            self.platform, branch, PREV_MARKER
        )))
    }

    /// `<platform>-<branch>-prev-<sha>`
    pub fn publish_key(&self, branch: &str, sha: &str) -> Result<CacheKey> {
        if sha.is_empty() {
            return Err(Error::InvalidKey("commit sha must not be empty".into()));
        }
        let prefix = self.restore_prefix(branch)?;

        if branch.contains(PREV_MARKER) || sha.contains(PREV_MARKER) {
            warn!(
                branch,
                sha,
                "Cache key segment contains '-prev-'; commit id parsing may be ambiguous"
            );
        } else if !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            warn!(
                sha,
                "Commit id is not hexadecimal; it will not be recoverable from the key"
            );
        }

        Ok(CacheKey(format!("{}{}", prefix, sha)))
    }

    /// Recover the commit id embedded in a key, if the key has one.
    ///
    /// Only the `prev-<hex>` fragment is matched, so keys carrying extra
    /// trailing fields still parse.
    pub fn extract_commit_id(&self, key: &str) -> Option<String> {
        self.pattern
            .captures(key)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl Default for CacheKeyCodec {
    fn default() -> Self {
        Self::for_host()
    }
}
