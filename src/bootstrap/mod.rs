//! Orchestrates one CodeQL setup run.
//!
//! [`run`] captures configuration once, builds the real collaborators, and
//! publishes the outcome as step outputs. [`setup_codeql_tools`] holds the
//! sequencing itself (resolve, then fetch only when needed) and accepts any
//! registry, cache, and transport so tests can drive it with fakes.
mod env;
mod output;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::Context;
use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::SetupCfg;
use crate::cache::{LocalToolCache, ToolCache};
use crate::config::ActionConfig;
use crate::error::{Result as CrateResult, SetupError};
use crate::fetch::{BundleFetcher, BundleTransport, FetchOutcome, HttpTransport};
use crate::observability::init_tracing;
use crate::release::{GitHubReleaseClient, Platform, ReleaseRegistry};
use crate::resolver::{SourceKind, SourceResolver, ToolsSource};

pub use env::{API_URL_ENV, RUNNER_TEMP_ENV, RunnerEnvironment, SERVER_URL_ENV};
pub use output::GITHUB_OUTPUT_ENV;

use self::env::output_file_from_env;
use self::output::write_outputs;

/// Observability target for orchestration.
const LOG_TARGET: &str = "codeql_setup::resolve";

/// Directory inside a bundle that holds the CLI.
const CLI_DIR: &str = "codeql";

/// The result of a completed setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    /// Root of the unpacked bundle.
    pub tools_dir: Utf8PathBuf,
    /// Path to the CLI executable inside the bundle.
    pub codeql_path: Utf8PathBuf,
    /// Human-readable version of the bundle.
    pub tools_version: String,
    /// Where the bundle came from.
    pub source: SourceKind,
    /// Tool cache key holding the bundle, if it is cached.
    pub cache_key: Option<String>,
    /// Time spent downloading, when a download happened.
    pub download_duration: Option<Duration>,
    /// Time spent unpacking, when an archive was unpacked.
    pub extraction_duration: Option<Duration>,
}

impl SetupOutcome {
    fn from_fetch(fetched: FetchOutcome, source: SourceKind, platform: Platform) -> Self {
        let download_duration = (source == SourceKind::Download).then_some(fetched.download_duration);
        Self {
            codeql_path: cli_path(&fetched.tools_dir, platform),
            tools_dir: fetched.tools_dir,
            tools_version: fetched.tools_version,
            source,
            cache_key: fetched.cache_key,
            download_duration,
            extraction_duration: Some(fetched.extraction_duration),
        }
    }
}

fn cli_path(tools_dir: &Utf8Path, platform: Platform) -> Utf8PathBuf {
    tools_dir.join(CLI_DIR).join(platform.cli_executable())
}

/// Resolves, fetches, and caches the CodeQL bundle described by the
/// environment, then publishes the step outputs.
///
/// Configuration is read once:
/// - `INPUT_REPOSITORY`, `INPUT_TOOLS`, `INPUT_TOKEN`, and
///   `INPUT_TOOL_CACHE_DIR` via [`SetupCfg`];
/// - `RUNNER_TEMP`, `GITHUB_SERVER_URL`, `GITHUB_API_URL`, and
///   `RUNNER_TOOL_CACHE` via [`RunnerEnvironment`];
/// - `GITHUB_OUTPUT` names the step output file.
///
/// # Examples
/// ```no_run
/// use codeql_bundle_setup::run;
///
/// fn main() -> Result<(), codeql_bundle_setup::SetupError> {
///     run()?;
///     Ok(())
/// }
/// ```
///
/// # Errors
/// Returns an error when configuration is invalid, when the bundle cannot be
/// resolved or fetched, or when the outputs cannot be written.
pub fn run() -> CrateResult<()> {
    if let Err(err) = color_eyre::install() {
        tracing::debug!("color_eyre already installed: {err}");
    }
    init_tracing();

    let cfg = SetupCfg::load()?;
    let config = ActionConfig::from_parts(&cfg, RunnerEnvironment::from_env()?)?;
    let output_file = output_file_from_env()?;

    let registry = GitHubReleaseClient::new(&config.api_url, config.token.clone())?;
    let cache = LocalToolCache::new(config.tool_cache.clone());
    let transport = HttpTransport::new()?;
    let runtime = build_runtime()?;

    let outcome = runtime.block_on(setup_codeql_tools(&config, &registry, &cache, &transport))?;
    write_outputs(&outcome, output_file.as_deref()).map_err(SetupError::Output)?;
    Ok(())
}

/// Resolves the bundle source for `config.tools` and fetches it if needed.
///
/// # Errors
/// Returns [`SetupError::Resolve`] when no source can be determined and
/// [`SetupError::Fetch`] when a download or extraction fails. Cleanup and
/// cache-store problems are logged and do not fail the run.
pub async fn setup_codeql_tools<R, C, T>(
    config: &ActionConfig,
    registry: &R,
    cache: &C,
    transport: &T,
) -> CrateResult<SetupOutcome>
where
    R: ReleaseRegistry,
    C: ToolCache,
    T: BundleTransport,
{
    let resolver = SourceResolver::new(registry, cache, &config.repository, config.platform);
    let source = resolver.resolve(&config.tools).await?;
    let kind = source.kind();
    let fetcher = BundleFetcher::new(transport, cache, config);

    let outcome = match source {
        ToolsSource::Local { archive } => {
            let fetched = fetcher.extract_local(&archive).await?;
            SetupOutcome::from_fetch(fetched, kind, config.platform)
        }
        ToolsSource::Toolcache {
            tools_dir,
            cache_key,
            version_label,
        } => SetupOutcome {
            codeql_path: cli_path(&tools_dir, config.platform),
            tools_dir,
            tools_version: version_label,
            source: kind,
            cache_key: Some(cache_key),
            download_duration: None,
            extraction_duration: None,
        },
        ToolsSource::Download {
            url,
            bundle_version,
            cli_version,
            ..
        } => {
            let fetched = fetcher
                .download_and_cache(&url, bundle_version.as_deref(), cli_version.as_deref())
                .await?;
            SetupOutcome::from_fetch(fetched, kind, config.platform)
        }
    };

    info!(
        target: LOG_TARGET,
        source = %outcome.source,
        tools_dir = %outcome.tools_dir,
        version = %outcome.tools_version,
        "CodeQL bundle ready"
    );
    Ok(outcome)
}

fn build_runtime() -> CrateResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create Tokio runtime for bundle setup")
        .map_err(SetupError::Runtime)
}
