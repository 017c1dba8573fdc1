//! Where the tool cache lives when the runner does not say.

use camino::Utf8PathBuf;
use std::env;

/// Environment variable GitHub runners use to advertise the tool cache.
pub const RUNNER_TOOL_CACHE_ENV: &str = "RUNNER_TOOL_CACHE";

/// Directory created under the user cache root for self-hosted runs.
const CACHE_SUBDIR: &str = "codeql-bundle/toolcache";

/// Root of the tool cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCacheConfig {
    /// Root directory holding one subdirectory per cached tool.
    pub cache_dir: Utf8PathBuf,
}

impl ToolCacheConfig {
    /// Uses the directory picked by [`resolve_cache_dir`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_dir(resolve_cache_dir())
    }

    /// Uses `cache_dir` as given.
    #[must_use]
    pub const fn with_dir(cache_dir: Utf8PathBuf) -> Self {
        Self { cache_dir }
    }
}

impl Default for ToolCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the tool cache root.
///
/// `RUNNER_TOOL_CACHE` wins when it holds a non-blank UTF-8 path. Otherwise
/// the bundle cache sits under the platform user cache directory
/// (`$XDG_CACHE_HOME` or `~/.cache` on Linux), and under the system temp
/// directory when even that is unavailable.
///
/// # Examples
///
/// ```
/// use codeql_bundle_setup::cache::resolve_cache_dir;
///
/// assert!(!resolve_cache_dir().as_str().is_empty());
/// ```
#[must_use]
pub fn resolve_cache_dir() -> Utf8PathBuf {
    runner_tool_cache()
        .or_else(|| utf8(dirs::cache_dir()?).map(|base| base.join(CACHE_SUBDIR)))
        .unwrap_or_else(|| {
            utf8(env::temp_dir())
                .unwrap_or_else(|| Utf8PathBuf::from("/tmp"))
                .join(CACHE_SUBDIR)
        })
}

fn runner_tool_cache() -> Option<Utf8PathBuf> {
    let raw = env::var_os(RUNNER_TOOL_CACHE_ENV)?;
    let text = raw.to_str()?.trim();
    (!text.is_empty()).then(|| Utf8PathBuf::from(text))
}

fn utf8(path: std::path::PathBuf) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).ok()
}
