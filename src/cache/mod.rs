//! Local tool cache holding extracted bundles keyed by version.
//!
//! Entries live at `<cache_dir>/<tool>/<version>/` and become visible only
//! once a `.complete` marker is written. The cache is append-only from the
//! resolver's point of view: lookups never mutate it and each successful
//! download stores one entry.
//!
//! # Cache Location
//!
//! The cache directory is resolved in the following order:
//!
//! 1. `RUNNER_TOOL_CACHE` environment variable if set
//! 2. `$XDG_CACHE_HOME/codeql-bundle/toolcache` if `XDG_CACHE_HOME` is set
//! 3. `~/.cache/codeql-bundle/toolcache` as fallback

mod config;
mod lock;
mod operations;

use camino::{Utf8Path, Utf8PathBuf};

pub use config::{RUNNER_TOOL_CACHE_ENV, ToolCacheConfig, resolve_cache_dir};
pub use lock::CacheLock;
pub use operations::{CacheLookupResult, check_cache, list_cached_versions, populate_cache};

use crate::error::FetchResult;

/// Name under which bundles are stored in the tool cache.
pub const TOOL_NAME: &str = "CodeQL";

/// Name-and-version keyed tool cache collaborator.
pub trait ToolCache {
    /// Returns the directory cached for `tool` at exactly `version`.
    fn find(&self, tool: &str, version: &str) -> Option<Utf8PathBuf>;

    /// Lists every version cached for `tool`.
    fn find_all_versions(&self, tool: &str) -> Vec<String>;

    /// Stores a copy of `source` under `tool`/`version` and returns the cached
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the copy cannot be written.
    fn cache_dir(
        &self,
        source: &Utf8Path,
        tool: &str,
        version: &str,
    ) -> FetchResult<Utf8PathBuf>;
}

/// Filesystem-backed [`ToolCache`].
#[derive(Debug, Clone)]
pub struct LocalToolCache {
    config: ToolCacheConfig,
}

impl LocalToolCache {
    /// Creates a cache rooted at the configured directory.
    #[must_use]
    pub const fn new(config: ToolCacheConfig) -> Self {
        Self { config }
    }

    /// Returns the cache root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.config.cache_dir
    }
}

impl ToolCache for LocalToolCache {
    fn find(&self, tool: &str, version: &str) -> Option<Utf8PathBuf> {
        match check_cache(self.root(), tool, version) {
            CacheLookupResult::Hit { source_dir } => Some(source_dir),
            CacheLookupResult::Miss => None,
        }
    }

    fn find_all_versions(&self, tool: &str) -> Vec<String> {
        list_cached_versions(self.root(), tool)
    }

    fn cache_dir(
        &self,
        source: &Utf8Path,
        tool: &str,
        version: &str,
    ) -> FetchResult<Utf8PathBuf> {
        populate_cache(source, self.root(), tool, version)
    }
}
