//! Three-tier tool cache probe.
//!
//! Tiers run in order and the first hit wins:
//!
//! 1. the exact CLI version, then a unique `<cli>-*` compound key;
//! 2. the bundle-only fallback key `0.0.0-<bundle>`, then the normalised
//!    bundle version under which pre-release bundles are stored;
//! 3. otherwise the caller downloads.

use camino::Utf8PathBuf;
use tracing::{debug, warn};

use crate::cache::{TOOL_NAME, ToolCache};
use crate::version::{fallback_cache_key, normalize_version};

use super::LOG_TARGET;

/// A usable cache entry found by [`probe_toolcache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CacheHit {
    pub(crate) tools_dir: Utf8PathBuf,
    pub(crate) cache_key: String,
}

/// Runs the cache tiers for a release identity.
pub(crate) fn probe_toolcache<C: ToolCache>(
    cache: &C,
    cli_version: Option<&str>,
    bundle_version: Option<&str>,
) -> Option<CacheHit> {
    if let Some(hit) = cli_version.and_then(|cli| probe_cli_version(cache, cli)) {
        return Some(hit);
    }
    if let Some(hit) = bundle_version.and_then(|bundle| probe_bundle_version(cache, bundle, cli_version)) {
        return Some(hit);
    }
    debug!(
        target: LOG_TARGET,
        cli_version = ?cli_version,
        bundle_version = ?bundle_version,
        "no cached bundle matched"
    );
    None
}

fn probe_cli_version<C: ToolCache>(cache: &C, cli_version: &str) -> Option<CacheHit> {
    if let Some(tools_dir) = cache.find(TOOL_NAME, cli_version) {
        return Some(CacheHit {
            tools_dir,
            cache_key: cli_version.to_owned(),
        });
    }

    let prefix = format!("{cli_version}-");
    let candidates: Vec<String> = cache
        .find_all_versions(TOOL_NAME)
        .into_iter()
        .filter(|version| version.starts_with(&prefix))
        .collect();

    match candidates.as_slice() {
        [] => {
            debug!(
                target: LOG_TARGET,
                cli_version = %cli_version,
                "no compound cache key for CLI version"
            );
            None
        }
        [only] => cache.find(TOOL_NAME, only).map(|tools_dir| CacheHit {
            tools_dir,
            cache_key: only.clone(),
        }),
        _ => {
            warn!(
                target: LOG_TARGET,
                cli_version = %cli_version,
                candidates = ?candidates,
                "multiple cached bundles match the CLI version, ignoring them"
            );
            None
        }
    }
}

fn probe_bundle_version<C: ToolCache>(
    cache: &C,
    bundle_version: &str,
    cli_version: Option<&str>,
) -> Option<CacheHit> {
    let fallback = fallback_cache_key(bundle_version);
    let normalised = normalize_version(bundle_version)
        .ok()
        .map(|version| version.to_string())
        .filter(|key| *key != fallback && Some(key.as_str()) != cli_version);

    std::iter::once(fallback)
        .chain(normalised)
        .find_map(|key| {
            cache
                .find(TOOL_NAME, &key)
                .map(|tools_dir| CacheHit {
                    tools_dir,
                    cache_key: key,
                })
        })
}
