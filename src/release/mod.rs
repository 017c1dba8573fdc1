//! Locates bundle releases and their platform assets in the release registry.
//!
//! The registry itself is a collaborator behind [`ReleaseRegistry`]; this
//! module decides which release to ask for, which asset name to look for, and
//! how registry failures surface. It never retries and never falls back to a
//! different repository or host.

mod github;
mod platform;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use color_eyre::eyre::eyre;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult, ResolveError, ResolveErrorKind, ResolveResult};

pub(crate) use github::CLIENT_USER_AGENT;
pub use github::GitHubReleaseClient;
pub use platform::{BUNDLE_ASSET_STEM, Platform};

/// Observability target for release lookups.
const LOG_TARGET: &str = "codeql_setup::registry";

/// Repository published releases are read from, as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    owner: String,
    name: String,
}

impl Repository {
    /// Repository queried when no override is supplied.
    pub const DEFAULT: &'static str = "github/codeql-action";

    /// Returns the owning account.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for Repository {
    type Err = color_eyre::Report;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let Some((owner, name)) = trimmed.split_once('/') else {
            return Err(eyre!("repository must be written as owner/name (received {raw:?})"));
        };
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(eyre!("repository must be written as owner/name (received {raw:?})"));
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A published release as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Tag identifying the release, e.g. `bundle-2.14.6`.
    pub tag_name: String,
    /// Downloadable files attached to the release.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// File name of the asset.
    pub name: String,
    /// API URL serving the asset body when requested as
    /// `application/octet-stream`.
    pub url: String,
}

/// Release registry collaborator.
///
/// Implementations must surface a missing release as
/// [`RegistryError::NotFound`] so callers can tell it apart from transport
/// failures.
pub trait ReleaseRegistry {
    /// Host name of the registry, used in diagnostics.
    fn host(&self) -> &str;

    /// Fetches the release published under `tag`.
    fn release_by_tag(
        &self,
        repository: &Repository,
        tag: &str,
    ) -> impl Future<Output = RegistryResult<Release>> + Send;

    /// Fetches the most recent release.
    fn latest_release(
        &self,
        repository: &Repository,
    ) -> impl Future<Output = RegistryResult<Release>> + Send;
}

/// Returns the tag of the most recent release in `repository`.
///
/// # Errors
///
/// Fails with [`ResolveErrorKind::NoReleases`] when the repository has no
/// releases, or [`ResolveErrorKind::Other`] when the registry cannot be
/// reached.
pub async fn latest_tag<R: ReleaseRegistry>(
    registry: &R,
    repository: &Repository,
) -> ResolveResult<String> {
    let release = registry
        .latest_release(repository)
        .await
        .map_err(|err| registry_failure(err, ResolveErrorKind::NoReleases, repository, registry))?;
    debug!(
        target: LOG_TARGET,
        repository = %repository,
        tag = %release.tag_name,
        "resolved latest release"
    );
    Ok(release.tag_name)
}

/// Finds the download URL of the bundle asset for `platform` in the release
/// tagged `tag`.
///
/// # Errors
///
/// Fails with [`ResolveErrorKind::ReleaseNotFound`] when the tag does not
/// exist and [`ResolveErrorKind::AssetNotFound`] when the release has no asset
/// named for the platform.
pub async fn find_asset_url<R: ReleaseRegistry>(
    registry: &R,
    repository: &Repository,
    tag: &str,
    platform: Platform,
) -> ResolveResult<String> {
    let release = registry
        .release_by_tag(repository, tag)
        .await
        .map_err(|err| {
            registry_failure(err, ResolveErrorKind::ReleaseNotFound, repository, registry)
        })?;

    let asset_name = platform.asset_name();
    let Some(asset) = release.assets.iter().find(|asset| asset.name == asset_name) else {
        return Err(ResolveError::new(
            ResolveErrorKind::AssetNotFound,
            eyre!(
                "release {tag} in {repository} on {} has no asset named {asset_name} for {platform}",
                registry.host()
            ),
        ));
    };

    debug!(
        target: LOG_TARGET,
        repository = %repository,
        tag = %tag,
        asset = %asset_name,
        url = %asset.url,
        "found bundle asset"
    );
    Ok(asset.url.clone())
}

fn registry_failure<R: ReleaseRegistry>(
    err: RegistryError,
    not_found_kind: ResolveErrorKind,
    repository: &Repository,
    registry: &R,
) -> ResolveError {
    let kind = if err.is_not_found() {
        not_found_kind
    } else {
        ResolveErrorKind::Other
    };
    let host = registry.host();
    ResolveError::new(
        kind,
        color_eyre::Report::new(err)
            .wrap_err(format!("release lookup failed for {repository} on {host}")),
    )
}
