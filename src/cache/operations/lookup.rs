//! Cache lookup and hit/miss detection.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use std::fs;
use tracing::debug;

use super::{COMPLETION_MARKER, LOG_TARGET};

/// Result of a cache lookup operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookupResult {
    /// Cache hit: a complete entry exists for the key.
    Hit {
        /// Path to the cached version directory.
        source_dir: Utf8PathBuf,
    },
    /// Cache miss: nothing usable is stored under the key.
    Miss,
}

/// Returns true if the cache entry at the given path is complete.
pub(super) fn is_cache_entry_complete(version_dir: &Utf8Path) -> bool {
    version_dir.is_dir() && version_dir.join(COMPLETION_MARKER).is_file()
}

/// Checks whether the cache holds a complete entry for `tool` at `version`.
///
/// Entries without the `.complete` marker are partial writes from an
/// interrupted store and count as misses.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use codeql_bundle_setup::cache::{check_cache, CacheLookupResult};
///
/// let cache_dir = Utf8Path::new("/opt/hostedtoolcache");
/// if let CacheLookupResult::Hit { source_dir } = check_cache(cache_dir, "CodeQL", "2.14.6") {
///     println!("bundle cached at {source_dir}");
/// }
/// ```
#[must_use]
pub fn check_cache(cache_dir: &Utf8Path, tool: &str, version: &str) -> CacheLookupResult {
    let version_dir = cache_dir.join(tool).join(version);

    if is_cache_entry_complete(&version_dir) {
        debug!(
            target: LOG_TARGET,
            tool = %tool,
            version = %version,
            path = %version_dir,
            "cache hit"
        );
        CacheLookupResult::Hit {
            source_dir: version_dir,
        }
    } else {
        debug!(
            target: LOG_TARGET,
            tool = %tool,
            version = %version,
            dir_exists = version_dir.is_dir(),
            "cache miss"
        );
        CacheLookupResult::Miss
    }
}

/// Lists every complete, semantically versioned cache key stored for `tool`.
///
/// Keys are returned in ascending semantic-version order. Hidden directories
/// and names that are not semantic versions are skipped.
#[must_use]
pub fn list_cached_versions(cache_dir: &Utf8Path, tool: &str) -> Vec<String> {
    let tool_dir = cache_dir.join(tool);
    let entries = match fs::read_dir(&tool_dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(
                target: LOG_TARGET,
                tool_dir = %tool_dir,
                error = %err,
                "failed to read tool cache directory"
            );
            return Vec::new();
        }
    };

    let mut versions: Vec<(Version, String)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| try_parse_cache_entry(&tool_dir, &entry))
        .collect();
    versions.sort_by(|left, right| left.0.cmp(&right.0));
    versions.into_iter().map(|(_, name)| name).collect()
}

fn try_parse_cache_entry(tool_dir: &Utf8Path, entry: &fs::DirEntry) -> Option<(Version, String)> {
    let name = entry.file_name().into_string().ok()?;
    if name.starts_with('.') {
        return None;
    }
    let version = Version::parse(&name).ok()?;
    is_cache_entry_complete(&tool_dir.join(&name)).then_some((version, name))
}
