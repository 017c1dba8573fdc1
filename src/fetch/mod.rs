//! Downloads, extracts, and caches CodeQL bundles.
//!
//! The pipeline downloads an archive into a uniquely named location under the
//! runner's temporary directory, unpacks it next to the archive, removes the
//! archive, and stores the unpacked tree in the tool cache under its canonical
//! key. Cleanup problems are logged and never fail a run that already has a
//! usable bundle.

mod request;
mod transport;

use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub(crate) use transport::unpack_tar_gz;
pub use transport::{BundleTransport, HttpTransport};

use crate::cache::{TOOL_NAME, ToolCache};
use crate::cleanup_helpers::{RemovalOutcome, remove_matching, try_remove_dir_all};
use crate::config::ActionConfig;
use crate::error::{FetchError, FetchResult};
use crate::fs::ensure_dir_exists;
use crate::version::{bundle_version_from_tag, canonical_cache_key, tag_from_url};

use self::request::{download_headers, should_attach_credential};

/// Observability target for download and extraction.
pub(crate) const LOG_TARGET: &str = "codeql_setup::fetch";

/// Label used when no version can be attributed to a bundle.
const UNKNOWN_VERSION: &str = "unknown";

/// Label reported for bundles taken from a local archive.
pub const LOCAL_VERSION_LABEL: &str = "local";

/// Result of fetching or unpacking a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Directory holding the unpacked bundle; inside the tool cache when
    /// `cache_key` is set.
    pub tools_dir: Utf8PathBuf,
    /// Human-readable version for logs and outputs.
    pub tools_version: String,
    /// Key the bundle was cached under, if it was cached.
    pub cache_key: Option<String>,
    /// Time spent downloading the archive.
    pub download_duration: Duration,
    /// Time spent unpacking the archive.
    pub extraction_duration: Duration,
}

#[derive(Debug, Default)]
struct Timings {
    download: Duration,
    extraction: Duration,
}

/// Runs the download-extract-cache pipeline against one transport and cache.
#[derive(Debug)]
pub struct BundleFetcher<'a, T, C> {
    transport: &'a T,
    cache: &'a C,
    config: &'a ActionConfig,
}

impl<'a, T: BundleTransport, C: ToolCache> BundleFetcher<'a, T, C> {
    /// Creates a fetcher that works under `config.temp_dir`.
    #[must_use]
    pub const fn new(transport: &'a T, cache: &'a C, config: &'a ActionConfig) -> Self {
        Self {
            transport,
            cache,
            config,
        }
    }

    /// Downloads the bundle at `url`, unpacks it, and stores it in the tool
    /// cache.
    ///
    /// `bundle_version` and `cli_version` are hints from resolution. Without a
    /// bundle version the URL is searched for a release tag; when that also
    /// fails the unpacked directory is returned uncached.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the download or extraction fails.
    pub async fn download_and_cache(
        &self,
        url: &str,
        bundle_version: Option<&str>,
        cli_version: Option<&str>,
    ) -> FetchResult<FetchOutcome> {
        ensure_dir_exists(&self.config.temp_dir).map_err(FetchError::from)?;
        let id = Uuid::new_v4();
        let archive = self.config.temp_dir.join(id.to_string());
        let extract_dir = self.config.temp_dir.join(format!("{id}-extracted"));

        let mut timings = Timings::default();
        let transferred = self
            .download_then_extract(url, &archive, &extract_dir, &mut timings)
            .await;
        discard_archive(&archive);
        let extracted = match transferred {
            Ok(extracted) => extracted,
            Err(err) => {
                discard_failed_extraction(&extract_dir);
                return Err(err);
            }
        };

        info!(
            target: LOG_TARGET,
            url = %url,
            download_ms = timings.download.as_millis(),
            extraction_ms = timings.extraction.as_millis(),
            "bundle downloaded and unpacked"
        );

        let Some(bundle) = bundle_version
            .map(str::to_owned)
            .or_else(|| bundle_version_from_url(url))
        else {
            warn!(
                target: LOG_TARGET,
                url = %url,
                "could not determine the bundle version, skipping the tool cache"
            );
            return Ok(FetchOutcome {
                tools_dir: extracted,
                tools_version: cli_version.unwrap_or(UNKNOWN_VERSION).to_owned(),
                cache_key: None,
                download_duration: timings.download,
                extraction_duration: timings.extraction,
            });
        };

        let (tools_dir, cache_key) = self.store(&extracted, cli_version, &bundle);
        let tools_version = cli_version
            .map(str::to_owned)
            .or_else(|| cache_key.clone())
            .unwrap_or(bundle);
        Ok(FetchOutcome {
            tools_dir,
            tools_version,
            cache_key,
            download_duration: timings.download,
            extraction_duration: timings.extraction,
        })
    }

    /// Unpacks a local bundle archive without caching it.
    ///
    /// The archive itself is left in place.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the archive cannot be unpacked.
    pub async fn extract_local(&self, archive: &Utf8Path) -> FetchResult<FetchOutcome> {
        ensure_dir_exists(&self.config.temp_dir).map_err(FetchError::from)?;
        let extract_dir = self
            .config
            .temp_dir
            .join(format!("{}-extracted", Uuid::new_v4()));

        let started = Instant::now();
        let tools_dir = match self.transport.extract(archive, &extract_dir).await {
            Ok(tools_dir) => tools_dir,
            Err(err) => {
                discard_failed_extraction(&extract_dir);
                return Err(err);
            }
        };
        let extraction_duration = started.elapsed();
        info!(
            target: LOG_TARGET,
            archive = %archive,
            extraction_ms = extraction_duration.as_millis(),
            "local bundle unpacked"
        );

        Ok(FetchOutcome {
            tools_dir,
            tools_version: LOCAL_VERSION_LABEL.to_owned(),
            cache_key: None,
            download_duration: Duration::ZERO,
            extraction_duration,
        })
    }

    async fn download_then_extract(
        &self,
        url: &str,
        archive: &Utf8Path,
        extract_dir: &Utf8Path,
        timings: &mut Timings,
    ) -> FetchResult<Utf8PathBuf> {
        let auth = self
            .config
            .token
            .as_ref()
            .filter(|_| should_attach_credential(url, &self.config.instance_urls()));
        debug!(
            target: LOG_TARGET,
            url = %url,
            credential = auth.is_some(),
            "downloading bundle"
        );

        let download_started = Instant::now();
        let downloaded = self
            .transport
            .download(url, archive, auth, &download_headers())
            .await;
        timings.download = download_started.elapsed();
        let archive_path = downloaded?;

        let extraction_started = Instant::now();
        let extracted = self.transport.extract(&archive_path, extract_dir).await;
        timings.extraction = extraction_started.elapsed();
        extracted
    }

    /// Copies `extracted` into the cache and returns the directory to use.
    ///
    /// Falls back to `extracted` itself when the key cannot be computed or the
    /// store fails.
    fn store(
        &self,
        extracted: &Utf8Path,
        cli_version: Option<&str>,
        bundle: &str,
    ) -> (Utf8PathBuf, Option<String>) {
        let key = match canonical_cache_key(cli_version, bundle) {
            Ok(key) => key,
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    bundle_version = %bundle,
                    error = %err,
                    "cannot derive a cache key, skipping the tool cache"
                );
                return (extracted.to_owned(), None);
            }
        };

        let cached = match self.cache.cache_dir(extracted, TOOL_NAME, &key) {
            Ok(cached) => cached,
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    cache_key = %key,
                    error = %err,
                    "failed to store bundle in the tool cache, using the unpacked copy"
                );
                return (extracted.to_owned(), None);
            }
        };

        info!(
            target: LOG_TARGET,
            cache_key = %key,
            tools_dir = %cached,
            "bundle stored in the tool cache"
        );
        if cached != extracted {
            discard_extracted(extracted);
        }
        (cached, Some(key))
    }
}

fn bundle_version_from_url(url: &str) -> Option<String> {
    let tag = tag_from_url(url)?;
    bundle_version_from_tag(&tag).map(str::to_owned)
}

fn discard_archive(archive: &Utf8Path) {
    let pattern = glob::Pattern::escape(archive.as_str());
    match remove_matching(&pattern) {
        Ok(0) => warn!(
            target: LOG_TARGET,
            path = %archive,
            "downloaded archive was already gone"
        ),
        Ok(_) => debug!(target: LOG_TARGET, path = %archive, "downloaded archive removed"),
        Err(err) => warn!(
            target: LOG_TARGET,
            path = %archive,
            error = %err,
            "failed to remove downloaded archive"
        ),
    }
}

/// Removes whatever a failed extraction left behind; a download that failed
/// before extraction started leaves nothing.
fn discard_failed_extraction(extract_dir: &Utf8Path) {
    if extract_dir.exists() {
        discard_extracted(extract_dir);
    }
}

fn discard_extracted(extracted: &Utf8Path) {
    match try_remove_dir_all(extracted.as_std_path()) {
        Ok(RemovalOutcome::Removed) => {
            debug!(target: LOG_TARGET, path = %extracted, "unpacked copy removed");
        }
        Ok(RemovalOutcome::Missing) => warn!(
            target: LOG_TARGET,
            path = %extracted,
            "unpacked copy was already gone"
        ),
        Err(err) => warn!(
            target: LOG_TARGET,
            path = %extracted,
            error = %err,
            "failed to remove unpacked copy"
        ),
    }
}
