//! Decides where the CodeQL bundle for this run comes from.
//!
//! Given the user's tools specifier, the resolver produces exactly one
//! [`ToolsSource`]: a local archive, an existing tool cache entry, or a
//! download descriptor. Local paths never touch the network. Everything else
//! derives a release identity (tag, bundle version, CLI version) and probes
//! the tool cache before settling on a download.

mod probe;

use std::fmt;

use camino::Utf8PathBuf;
use color_eyre::eyre::eyre;
use tracing::info;

use crate::cache::ToolCache;
use crate::error::{ResolveError, ResolveErrorKind, ResolveResult};
use crate::release::{Platform, ReleaseRegistry, Repository, find_asset_url, latest_tag};
use crate::version::{bundle_version_from_tag, cli_version_from_bundle, tag_from_url, version_label};

use self::probe::probe_toolcache;

/// Observability target for source resolution.
const LOG_TARGET: &str = "codeql_setup::resolve";

/// Sentinel asking for the most recent release.
pub const LATEST: &str = "latest";

/// The raw tools input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSpecifier {
    /// No input, an empty input, or `latest`.
    Latest,
    /// An explicit HTTP(S) download URL.
    Url(String),
    /// A bundle archive on the local filesystem.
    Local(Utf8PathBuf),
}

impl ToolSpecifier {
    /// Classifies the raw tools input.
    ///
    /// # Examples
    ///
    /// ```
    /// use codeql_bundle_setup::resolver::ToolSpecifier;
    ///
    /// assert_eq!(ToolSpecifier::parse(None), ToolSpecifier::Latest);
    /// assert!(matches!(
    ///     ToolSpecifier::parse(Some("https://example.com/bundle-2.14.6/codeql-bundle.tar.gz")),
    ///     ToolSpecifier::Url(_)
    /// ));
    /// assert!(matches!(
    ///     ToolSpecifier::parse(Some("./codeql-bundle.tar.gz")),
    ///     ToolSpecifier::Local(_)
    /// ));
    /// ```
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("" | LATEST) => Self::Latest,
            Some(value) if has_http_scheme(value) => Self::Url(value.to_owned()),
            Some(value) => Self::Local(Utf8PathBuf::from(value)),
        }
    }
}

fn has_http_scheme(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Discriminates [`ToolsSource`] variants for logging and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A local archive.
    Local,
    /// An existing tool cache entry.
    Toolcache,
    /// A bundle that must be downloaded.
    Download,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Toolcache => "toolcache",
            Self::Download => "download",
        })
    }
}

/// The resolved origin of the bundle for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolsSource {
    /// An archive on disk; extracted but never cached.
    Local {
        /// Path to the archive.
        archive: Utf8PathBuf,
    },
    /// A bundle already present in the tool cache.
    Toolcache {
        /// Cached bundle directory.
        tools_dir: Utf8PathBuf,
        /// Key the entry was found under.
        cache_key: String,
        /// Human-readable version for logs and outputs.
        version_label: String,
    },
    /// A bundle that still has to be fetched.
    Download {
        /// Asset URL.
        url: String,
        /// Bundle version derived from the release tag, when known.
        bundle_version: Option<String>,
        /// Stable CLI version derived from the bundle version, when known.
        cli_version: Option<String>,
        /// Human-readable version for logs and outputs.
        version_label: String,
    },
}

impl ToolsSource {
    /// Returns which variant this is.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::Local { .. } => SourceKind::Local,
            Self::Toolcache { .. } => SourceKind::Toolcache,
            Self::Download { .. } => SourceKind::Download,
        }
    }
}

/// Release identity derived from the specifier; held for one resolution.
#[derive(Debug)]
struct ReleaseIdentity {
    tag: Option<String>,
    url: Option<String>,
    bundle_version: Option<String>,
    cli_version: Option<String>,
}

impl ReleaseIdentity {
    fn new(tag: Option<String>, url: Option<String>) -> Self {
        let bundle_version = tag
            .as_deref()
            .and_then(bundle_version_from_tag)
            .map(str::to_owned);
        let cli_version = bundle_version.as_deref().and_then(cli_version_from_bundle);
        Self {
            tag,
            url,
            bundle_version,
            cli_version,
        }
    }

    fn label(&self) -> String {
        version_label(
            self.cli_version.as_deref(),
            self.bundle_version.as_deref(),
            self.tag.as_deref(),
            self.url.as_deref(),
        )
    }
}

/// Resolves tools specifiers against one registry and one tool cache.
#[derive(Debug)]
pub struct SourceResolver<'a, R, C> {
    registry: &'a R,
    cache: &'a C,
    repository: &'a Repository,
    platform: Platform,
}

impl<'a, R: ReleaseRegistry, C: ToolCache> SourceResolver<'a, R, C> {
    /// Creates a resolver for bundles published in `repository`.
    #[must_use]
    pub const fn new(
        registry: &'a R,
        cache: &'a C,
        repository: &'a Repository,
        platform: Platform,
    ) -> Self {
        Self {
            registry,
            cache,
            repository,
            platform,
        }
    }

    /// Produces the single source the bundle will be taken from.
    ///
    /// # Errors
    ///
    /// Fails when the registry cannot name a release or asset, or with
    /// [`ResolveErrorKind::Unresolvable`] when neither a tag nor a URL can be
    /// established.
    pub async fn resolve(&self, specifier: &ToolSpecifier) -> ResolveResult<ToolsSource> {
        let identity = match specifier {
            ToolSpecifier::Local(archive) => {
                info!(
                    target: LOG_TARGET,
                    archive = %archive,
                    "using local bundle archive"
                );
                return Ok(ToolsSource::Local {
                    archive: archive.clone(),
                });
            }
            ToolSpecifier::Latest => {
                let tag = latest_tag(self.registry, self.repository).await?;
                ReleaseIdentity::new(Some(tag), None)
            }
            ToolSpecifier::Url(url) => ReleaseIdentity::new(tag_from_url(url), Some(url.clone())),
        };

        if let Some(hit) = probe_toolcache(
            self.cache,
            identity.cli_version.as_deref(),
            identity.bundle_version.as_deref(),
        ) {
            let version_label = identity.label();
            info!(
                target: LOG_TARGET,
                tools_dir = %hit.tools_dir,
                cache_key = %hit.cache_key,
                version = %version_label,
                "using cached bundle"
            );
            return Ok(ToolsSource::Toolcache {
                tools_dir: hit.tools_dir,
                cache_key: hit.cache_key,
                version_label,
            });
        }

        let url = self.download_url(&identity).await?;
        let version_label = identity.label();
        info!(
            target: LOG_TARGET,
            url = %url,
            version = %version_label,
            "bundle not cached, downloading"
        );
        Ok(ToolsSource::Download {
            url,
            bundle_version: identity.bundle_version,
            cli_version: identity.cli_version,
            version_label,
        })
    }

    async fn download_url(&self, identity: &ReleaseIdentity) -> ResolveResult<String> {
        if let Some(url) = &identity.url {
            return Ok(url.clone());
        }
        let Some(tag) = &identity.tag else {
            return Err(ResolveError::new(
                ResolveErrorKind::Unresolvable,
                eyre!("unable to determine a bundle source: no local path, release tag, or URL"),
            ));
        };
        find_asset_url(self.registry, self.repository, tag, self.platform).await
    }
}

#[cfg(test)]
mod tests;
