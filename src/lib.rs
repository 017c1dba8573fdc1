//! Resolves, downloads, and caches CodeQL bundles for CI jobs.
//!
//! Given a tools specifier (a local archive, a download URL, or `latest`) the
//! library decides once where the bundle for this run lives: on disk, in the
//! runner's tool cache under a version key, or in a release of the configured
//! repository. Downloads are unpacked and stored in the tool cache so later
//! runs on the same machine skip the network. Works against github.com and
//! GitHub Enterprise Server instances alike.

mod bootstrap;
pub mod cache;
mod cleanup_helpers;
mod config;
mod error;
pub mod fetch;
mod fs;
mod observability;
pub mod release;
pub mod resolver;
#[doc(hidden)]
pub mod test_support;
pub mod version;

pub use bootstrap::{
    API_URL_ENV, GITHUB_OUTPUT_ENV, RUNNER_TEMP_ENV, RunnerEnvironment, SERVER_URL_ENV,
    SetupOutcome, run, setup_codeql_tools,
};
pub use config::ActionConfig;
pub use error::{
    ConfigError, ConfigResult, FetchError, FetchErrorKind, FetchResult, RegistryError,
    RegistryResult, ResolveError, ResolveErrorKind, ResolveResult, Result, SetupError,
    VersionError, VersionResult,
};

use camino::Utf8PathBuf;
use color_eyre::eyre::eyre;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;

/// Captures the action inputs supplied via `INPUT_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, OrthoConfig, Default)]
#[ortho_config(prefix = "INPUT")]
///
/// # Examples
/// ```
/// use codeql_bundle_setup::SetupCfg;
///
/// let cfg = SetupCfg::default();
/// assert!(cfg.tools.is_none());
/// ```
pub struct SetupCfg {
    /// Repository bundles are released from, as `owner/name`.
    pub repository: Option<String>,
    /// Tools specifier: a local archive path, a download URL, or `latest`.
    pub tools: Option<String>,
    /// Credential used for the registry and same-instance downloads.
    pub token: Option<String>,
    /// Overrides the tool cache root.
    pub tool_cache_dir: Option<Utf8PathBuf>,
}

impl SetupCfg {
    /// Loads the inputs from environment variables without parsing CLI
    /// arguments.
    ///
    /// # Errors
    /// Returns an error when a value cannot be deserialised.
    pub fn load() -> ConfigResult<Self> {
        let args = [OsString::from("codeql-bundle-setup")];
        Self::load_from_iter(args).map_err(|err| ConfigError::from(eyre!(err)))
    }
}
