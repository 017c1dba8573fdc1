//! In-memory collaborators for exercising resolution and fetching without a
//! network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Context, eyre};
use reqwest::header::{ACCEPT, HeaderMap};
use secrecy::SecretString;

use crate::cache::{LocalToolCache, ToolCache, ToolCacheConfig};
use crate::error::{FetchError, FetchResult, RegistryError, RegistryResult};
use crate::fetch::{BundleTransport, unpack_tar_gz};
use crate::release::{Release, ReleaseAsset, ReleaseRegistry, Repository};

/// Release registry answering from a fixed list of releases.
///
/// The most recently added release is reported as the latest one.
#[derive(Debug, Default)]
pub struct FakeRegistry {
    releases: Vec<Release>,
    requests: AtomicUsize,
}

impl FakeRegistry {
    /// Host reported in diagnostics and used in asset URLs.
    pub const HOST: &'static str = "github.example";

    /// Adds a release carrying assets with the given names.
    #[must_use]
    pub fn with_release(mut self, tag: &str, assets: &[&str]) -> Self {
        self.releases.push(Release {
            tag_name: tag.to_owned(),
            assets: assets
                .iter()
                .map(|name| ReleaseAsset {
                    name: (*name).to_owned(),
                    url: Self::asset_url(tag, name),
                })
                .collect(),
        });
        self
    }

    /// Download URL the registry reports for `name` in release `tag`.
    #[must_use]
    pub fn asset_url(tag: &str, name: &str) -> String {
        format!(
            "https://{}/github/codeql-action/releases/download/{tag}/{name}",
            Self::HOST
        )
    }

    /// Number of registry requests served so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn not_found(repository: &Repository, release: &str) -> RegistryError {
        RegistryError::NotFound {
            repository: repository.to_string(),
            release: release.to_owned(),
            host: Self::HOST.to_owned(),
        }
    }
}

impl ReleaseRegistry for FakeRegistry {
    fn host(&self) -> &str {
        Self::HOST
    }

    async fn release_by_tag(&self, repository: &Repository, tag: &str) -> RegistryResult<Release> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.releases
            .iter()
            .find(|release| release.tag_name == tag)
            .cloned()
            .ok_or_else(|| Self::not_found(repository, tag))
    }

    async fn latest_release(&self, repository: &Repository) -> RegistryResult<Release> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.releases
            .last()
            .cloned()
            .ok_or_else(|| Self::not_found(repository, "latest"))
    }
}

/// One call observed by [`FakeTransport::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Requested URL.
    pub url: String,
    /// Destination the caller asked for.
    pub dest: Utf8PathBuf,
    /// Whether a credential was supplied.
    pub authenticated: bool,
    /// `Accept` header sent with the request.
    pub accept: Option<String>,
}

/// Transport that "downloads" by copying a prepared bundle archive.
#[derive(Debug)]
pub struct FakeTransport {
    archive: Utf8PathBuf,
    fail_download: bool,
    lose_archive: bool,
    downloads: Mutex<Vec<DownloadRequest>>,
}

impl FakeTransport {
    /// Serves every download from the tarball at `archive`.
    #[must_use]
    pub const fn new(archive: Utf8PathBuf) -> Self {
        Self {
            archive,
            fail_download: false,
            lose_archive: false,
            downloads: Mutex::new(Vec::new()),
        }
    }

    /// Makes every download fail.
    #[must_use]
    pub const fn failing_download(mut self) -> Self {
        self.fail_download = true;
        self
    }

    /// Deletes the downloaded archive during extraction so the later cleanup
    /// finds nothing to remove.
    #[must_use]
    pub const fn losing_archive(mut self) -> Self {
        self.lose_archive = true;
        self
    }

    /// Returns the downloads requested so far.
    #[must_use]
    pub fn downloads(&self) -> Vec<DownloadRequest> {
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BundleTransport for FakeTransport {
    async fn download(
        &self,
        url: &str,
        dest: &Utf8Path,
        auth: Option<&SecretString>,
        headers: &HeaderMap,
    ) -> FetchResult<Utf8PathBuf> {
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DownloadRequest {
                url: url.to_owned(),
                dest: dest.to_owned(),
                authenticated: auth.is_some(),
                accept: headers
                    .get(ACCEPT)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned),
            });
        if self.fail_download {
            return Err(FetchError::download(eyre!(
                "simulated download failure for {url}"
            )));
        }
        std::fs::copy(&self.archive, dest)
            .wrap_err_with(|| format!("failed to copy {} to {dest}", self.archive))
            .map_err(FetchError::download)?;
        Ok(dest.to_owned())
    }

    async fn extract(&self, archive: &Utf8Path, dest: &Utf8Path) -> FetchResult<Utf8PathBuf> {
        unpack_tar_gz(archive, dest).map_err(FetchError::extraction)?;
        if self.lose_archive {
            std::fs::remove_file(archive)
                .wrap_err_with(|| format!("failed to remove {archive}"))
                .map_err(FetchError::extraction)?;
        }
        Ok(dest.to_owned())
    }
}

/// Filesystem tool cache that records every lookup key.
#[derive(Debug)]
pub struct RecordingToolCache {
    inner: LocalToolCache,
    fail_store: bool,
    lookups: Mutex<Vec<String>>,
}

impl RecordingToolCache {
    /// Creates a recording cache rooted at `root`.
    #[must_use]
    pub const fn new(root: Utf8PathBuf) -> Self {
        Self {
            inner: LocalToolCache::new(ToolCacheConfig::with_dir(root)),
            fail_store: false,
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Makes every store attempt fail.
    #[must_use]
    pub const fn failing_store(mut self) -> Self {
        self.fail_store = true;
        self
    }

    /// Returns the keys passed to [`ToolCache::find`] so far, in order.
    #[must_use]
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores `source` directly, bypassing the failure switch.
    ///
    /// # Errors
    /// Returns an error when the copy cannot be written.
    pub fn seed(&self, source: &Utf8Path, tool: &str, version: &str) -> FetchResult<Utf8PathBuf> {
        self.inner.cache_dir(source, tool, version)
    }
}

impl ToolCache for RecordingToolCache {
    fn find(&self, tool: &str, version: &str) -> Option<Utf8PathBuf> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(version.to_owned());
        self.inner.find(tool, version)
    }

    fn find_all_versions(&self, tool: &str) -> Vec<String> {
        self.inner.find_all_versions(tool)
    }

    fn cache_dir(&self, source: &Utf8Path, tool: &str, version: &str) -> FetchResult<Utf8PathBuf> {
        if self.fail_store {
            return Err(FetchError::from(eyre!(
                "simulated cache store failure for {tool} {version}"
            )));
        }
        self.inner.cache_dir(source, tool, version)
    }
}
