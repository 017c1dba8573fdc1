//! Domain error types for the CodeQL bundle resolver.

use color_eyre::Report;
use thiserror::Error;

/// Result alias for operations that may return a [`SetupError`].
pub type Result<T> = std::result::Result<T, SetupError>;

/// Result alias for source-resolution fallible operations.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Result alias for download, extraction, and caching operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result alias for configuration fallible operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result alias for release registry requests.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result alias for version normalisation.
pub type VersionResult<T> = std::result::Result<T, VersionError>;

/// Top-level error exposed by the crate.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Indicates configuration capture failed.
    #[error("configuration parsing failed")]
    Config(#[from] ConfigError),
    /// Indicates the tools source could not be resolved.
    #[error("tool resolution failed")]
    Resolve(#[from] ResolveError),
    /// Indicates the bundle could not be downloaded, extracted, or cached.
    #[error("bundle fetch failed")]
    Fetch(#[from] FetchError),
    /// Indicates the async runtime could not be started.
    #[error("runtime initialisation failed")]
    Runtime(#[source] Report),
    /// Indicates the action outputs could not be written.
    #[error("failed to publish action outputs")]
    Output(#[source] Report),
}

/// Categorises resolution failures so callers can branch on structured errors.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ResolveErrorKind {
    /// Represents errors without a more specific semantic meaning.
    #[default]
    Other,
    /// The repository has no published releases.
    NoReleases,
    /// The requested release tag does not exist.
    ReleaseNotFound,
    /// The release exists but carries no asset for the current platform.
    AssetNotFound,
    /// No local path, tag, or URL could be established.
    Unresolvable,
}

/// Captures resolution failures.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct ResolveError {
    kind: ResolveErrorKind,
    #[source]
    report: Report,
}

impl ResolveError {
    /// Constructs a new resolution error with the provided kind and diagnostic
    /// report.
    #[must_use]
    pub const fn new(kind: ResolveErrorKind, report: Report) -> Self {
        Self { kind, report }
    }

    /// Returns the semantic category for this resolution failure.
    #[must_use]
    pub const fn kind(&self) -> ResolveErrorKind {
        self.kind
    }

    /// Extracts the underlying diagnostic report.
    pub fn into_report(self) -> Report {
        self.report
    }
}

impl From<Report> for ResolveError {
    fn from(report: Report) -> Self {
        Self::new(ResolveErrorKind::Other, report)
    }
}

/// Categorises fetch failures.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum FetchErrorKind {
    /// Represents errors without a more specific semantic meaning.
    #[default]
    Other,
    /// The archive could not be downloaded.
    Download,
    /// The archive could not be unpacked.
    Extraction,
}

/// Captures download, extraction, and cache-store failures.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct FetchError {
    kind: FetchErrorKind,
    #[source]
    report: Report,
}

impl FetchError {
    /// Constructs a new fetch error with the provided kind and diagnostic
    /// report.
    #[must_use]
    pub const fn new(kind: FetchErrorKind, report: Report) -> Self {
        Self { kind, report }
    }

    /// Wraps a report as a download failure.
    #[must_use]
    pub const fn download(report: Report) -> Self {
        Self::new(FetchErrorKind::Download, report)
    }

    /// Wraps a report as an extraction failure.
    #[must_use]
    pub const fn extraction(report: Report) -> Self {
        Self::new(FetchErrorKind::Extraction, report)
    }

    /// Returns the semantic category for this fetch failure.
    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    /// Extracts the underlying diagnostic report.
    pub fn into_report(self) -> Report {
        self.report
    }
}

impl From<Report> for FetchError {
    fn from(report: Report) -> Self {
        Self::new(FetchErrorKind::Other, report)
    }
}

/// Captures configuration failures.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] Report);

/// Failures surfaced by the release registry collaborator.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The release (or the latest release) does not exist.
    #[error("release {release} not found in {repository} on {host}")]
    NotFound {
        /// Repository that was queried, as `owner/name`.
        repository: String,
        /// Release that was requested: a tag or `latest`.
        release: String,
        /// Registry host that answered.
        host: String,
    },
    /// The registry answered with an unexpected status.
    #[error("registry request {url} returned HTTP {status}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The request could not be sent or its body could not be decoded.
    #[error("registry request {url} failed")]
    Transport {
        /// Request URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

impl RegistryError {
    /// Returns `true` when the registry reported the release as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures raised while normalising version strings.
#[derive(Debug, Error)]
pub enum VersionError {
    /// Neither the raw string nor its `0.0.0-` rewrite parses as a semantic
    /// version.
    #[error("invalid version format: {raw:?}")]
    InvalidVersionFormat {
        /// The rejected input.
        raw: String,
        /// Parser diagnostic for the rewritten form.
        #[source]
        source: semver::Error,
    },
}
