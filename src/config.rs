//! Immutable run configuration shared by every component.
//!
//! [`ActionConfig`] is assembled once at startup from the action inputs
//! ([`SetupCfg`](crate::SetupCfg)) and the runner environment, then passed by
//! reference. Nothing below the orchestrator reads ambient process state.

use camino::Utf8PathBuf;
use color_eyre::eyre::Context;
use secrecy::SecretString;
use url::Url;

use crate::bootstrap::RunnerEnvironment;
use crate::cache::ToolCacheConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::release::{Platform, Repository};
use crate::resolver::ToolSpecifier;
use crate::SetupCfg;

/// Everything a single resolution needs to know about its surroundings.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    /// Repository bundles are released from.
    pub repository: Repository,
    /// Classified tools input.
    pub tools: ToolSpecifier,
    /// Credential for the hosting instance; never logged.
    pub token: Option<SecretString>,
    /// Private scratch directory for downloads and extraction.
    pub temp_dir: Utf8PathBuf,
    /// Web URL of the hosting instance, e.g. `https://github.com`.
    pub server_url: Url,
    /// REST API URL of the hosting instance.
    pub api_url: Url,
    /// Tool cache location.
    pub tool_cache: ToolCacheConfig,
    /// Platform used to pick bundle assets and the CLI executable.
    pub platform: Platform,
}

impl ActionConfig {
    /// Folds the action inputs and runner environment into one value.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository input is not `owner/name`.
    pub fn from_parts(cfg: &SetupCfg, runner: RunnerEnvironment) -> ConfigResult<Self> {
        let repository = cfg
            .repository
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .unwrap_or(Repository::DEFAULT)
            .parse::<Repository>()
            .context("INPUT_REPOSITORY is invalid")
            .map_err(ConfigError::from)?;

        let token = cfg
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::from(token.to_owned()));

        let tool_cache_dir = cfg
            .tool_cache_dir
            .clone()
            .or(runner.tool_cache_dir);
        let tool_cache = tool_cache_dir.map_or_else(ToolCacheConfig::new, ToolCacheConfig::with_dir);

        Ok(Self {
            repository,
            tools: ToolSpecifier::parse(cfg.tools.as_deref()),
            token,
            temp_dir: runner.temp_dir,
            server_url: runner.server_url,
            api_url: runner.api_url,
            tool_cache,
            platform: Platform::current(),
        })
    }

    /// Origins considered part of the caller's own hosting instance.
    #[must_use]
    pub fn instance_urls(&self) -> [&Url; 2] {
        [&self.server_url, &self.api_url]
    }
}
