//! Cache population after successful downloads.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::Context;
use std::fs;
use tracing::{debug, warn};

use super::copy::copy_bundle_tree;
use super::lookup::is_cache_entry_complete;
use super::{COMPLETION_MARKER, LOG_TARGET};
use crate::cache::CacheLock;
use crate::cleanup_helpers::try_remove_dir_all;
use crate::error::FetchResult;
use crate::fs::ensure_dir_exists;

/// Copies `source` into the cache under `tool`/`version` and returns the
/// cached directory.
///
/// Stores are serialised per key with [`CacheLock`]. When another process
/// completes the same key first, its entry is returned untouched. Incomplete
/// leftovers from an interrupted store are discarded before copying.
///
/// # Errors
///
/// Returns an error if:
/// - The lock cannot be acquired
/// - The cache directory cannot be created
/// - Copying the bundle fails
/// - Writing the completion marker fails
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use codeql_bundle_setup::cache::populate_cache;
///
/// let source = Utf8Path::new("/runner/_temp/4f0c/extracted");
/// let cache_dir = Utf8Path::new("/opt/hostedtoolcache");
/// let cached = populate_cache(source, cache_dir, "CodeQL", "2.14.6-2.14.6")?;
/// # Ok::<(), codeql_bundle_setup::FetchError>(())
/// ```
pub fn populate_cache(
    source: &Utf8Path,
    cache_dir: &Utf8Path,
    tool: &str,
    version: &str,
) -> FetchResult<Utf8PathBuf> {
    let version_dir = cache_dir.join(tool).join(version);

    debug!(
        target: LOG_TARGET,
        source = %source,
        cache_dir = %cache_dir,
        tool = %tool,
        version = %version,
        "populating cache"
    );

    ensure_dir_exists(cache_dir)?;
    let _lock = CacheLock::acquire_exclusive(cache_dir, tool, version)
        .with_context(|| format!("failed to lock cache entry {tool}/{version}"))?;

    if is_cache_entry_complete(&version_dir) {
        debug!(
            target: LOG_TARGET,
            version = %version,
            "version cached by another process"
        );
        return Ok(version_dir);
    }

    discard_partial_entry(&version_dir);

    let files = copy_bundle_tree(source, &version_dir)
        .with_context(|| format!("failed to copy bundle to cache: {version_dir}"))?;
    write_completion_marker(&version_dir)?;

    debug!(
        target: LOG_TARGET,
        version = %version,
        path = %version_dir,
        files,
        "cache population completed"
    );
    Ok(version_dir)
}

/// Removes an incomplete entry left behind by an interrupted store.
fn discard_partial_entry(version_dir: &Utf8Path) {
    if !version_dir.exists() {
        return;
    }
    if let Err(err) = try_remove_dir_all(version_dir.as_std_path()) {
        warn!(
            target: LOG_TARGET,
            path = %version_dir,
            error = %err,
            "failed to discard incomplete cache entry"
        );
    }
}

/// Writes the completion marker to indicate a valid cache entry.
fn write_completion_marker(version_dir: &Utf8Path) -> FetchResult<()> {
    let marker = version_dir.join(COMPLETION_MARKER);
    fs::write(&marker, "")
        .with_context(|| format!("failed to write cache completion marker: {marker}"))?;
    Ok(())
}
