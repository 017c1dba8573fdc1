//! Parses the runner environment variables the setup depends on.

use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use color_eyre::eyre::eyre;
use url::Url;

use super::output::GITHUB_OUTPUT_ENV;
use crate::cache::RUNNER_TOOL_CACHE_ENV;
use crate::error::{ConfigError, ConfigResult};

/// Runner scratch directory; required.
pub const RUNNER_TEMP_ENV: &str = "RUNNER_TEMP";
/// Web URL of the hosting instance.
pub const SERVER_URL_ENV: &str = "GITHUB_SERVER_URL";
/// REST API URL of the hosting instance.
pub const API_URL_ENV: &str = "GITHUB_API_URL";

const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_API_URL: &str = "https://api.github.com";

/// Values read from the runner environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerEnvironment {
    /// Scratch directory for downloads and extraction.
    pub temp_dir: Utf8PathBuf,
    /// Web URL of the hosting instance.
    pub server_url: Url,
    /// REST API URL of the hosting instance.
    pub api_url: Url,
    /// Tool cache root advertised by the runner, if any.
    pub tool_cache_dir: Option<Utf8PathBuf>,
}

impl RunnerEnvironment {
    /// Reads and validates the runner environment.
    ///
    /// # Errors
    ///
    /// Returns an error when `RUNNER_TEMP` is missing, or when any variable is
    /// present but empty, not UTF-8, or not a valid URL where one is expected.
    pub fn from_env() -> ConfigResult<Self> {
        let temp_dir = match env::var_os(RUNNER_TEMP_ENV) {
            Some(raw) => parse_path(RUNNER_TEMP_ENV, &raw)?,
            None => {
                return Err(ConfigError::from(eyre!(
                    "{RUNNER_TEMP_ENV} must be set to the runner's temporary directory"
                )));
            }
        };
        let server_url = env::var_os(SERVER_URL_ENV)
            .map_or_else(|| default_url(DEFAULT_SERVER_URL), |raw| parse_url(SERVER_URL_ENV, &raw))?;
        let api_url = env::var_os(API_URL_ENV)
            .map_or_else(|| default_url(DEFAULT_API_URL), |raw| parse_url(API_URL_ENV, &raw))?;
        let tool_cache_dir = env::var_os(RUNNER_TOOL_CACHE_ENV)
            .map(|raw| parse_path(RUNNER_TOOL_CACHE_ENV, &raw))
            .transpose()?;

        Ok(Self {
            temp_dir,
            server_url,
            api_url,
            tool_cache_dir,
        })
    }
}

/// Reads the step output file path, if the runner provides one.
pub(super) fn output_file_from_env() -> ConfigResult<Option<Utf8PathBuf>> {
    env::var_os(GITHUB_OUTPUT_ENV)
        .map(|raw| parse_path(GITHUB_OUTPUT_ENV, &raw))
        .transpose()
}

fn parse_text<'a>(name: &str, raw: &'a OsStr) -> ConfigResult<&'a str> {
    let text = raw.to_str().ok_or_else(|| {
        ConfigError::from(eyre!(
            "{name} must contain a valid UTF-8 value (received {:?})",
            raw.to_string_lossy()
        ))
    })?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::from(eyre!("{name} is present but empty")));
    }
    Ok(trimmed)
}

fn parse_path(name: &str, raw: &OsStr) -> ConfigResult<Utf8PathBuf> {
    let text = parse_text(name, raw)?;
    Utf8PathBuf::from_path_buf(PathBuf::from(text))
        .map_err(|_| ConfigError::from(eyre!("{name} must be a UTF-8 path")))
}

fn parse_url(name: &str, raw: &OsStr) -> ConfigResult<Url> {
    let text = parse_text(name, raw)?;
    let url = Url::parse(text)
        .map_err(|err| ConfigError::from(eyre!("failed to parse {name} from '{text}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::from(eyre!(
            "{name} must be an http or https URL (received {text})"
        )));
    }
    Ok(url)
}

fn default_url(raw: &str) -> ConfigResult<Url> {
    Url::parse(raw).map_err(|err| ConfigError::from(eyre!("invalid default URL {raw}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use temp_env::with_vars;

    #[cfg(unix)]
    use std::os::unix::ffi::OsStrExt;

    #[rstest]
    #[case("", "present but empty")]
    #[case("   ", "present but empty")]
    #[case("github.com", "failed to parse")]
    #[case("ftp://github.com", "http or https")]
    fn parse_url_rejects_invalid_values(#[case] raw: &str, #[case] expected: &str) {
        let err = parse_url(SERVER_URL_ENV, OsStr::new(raw)).expect_err("invalid url");
        let message = err.to_string();
        assert!(message.contains(expected), "{message}");
        assert!(message.contains(SERVER_URL_ENV), "{message}");
    }

    #[test]
    fn parse_url_accepts_enterprise_instance() {
        let url = parse_url(API_URL_ENV, OsStr::new(" https://ghe.example/api/v3 ")).expect("url");
        assert_eq!(url.host_str(), Some("ghe.example"));
    }

    #[cfg(unix)]
    #[test]
    fn parse_path_rejects_non_utf8() {
        let raw = OsStr::from_bytes(b"/runner/\xff/temp");
        let err = parse_path(RUNNER_TEMP_ENV, raw).expect_err("non-utf8");
        assert!(err.to_string().contains("valid UTF-8"));
    }

    #[test]
    fn from_env_requires_runner_temp() {
        with_vars([(RUNNER_TEMP_ENV, None::<&str>)], || {
            let err = RunnerEnvironment::from_env().expect_err("missing RUNNER_TEMP");
            assert!(err.to_string().contains(RUNNER_TEMP_ENV));
        });
    }

    #[test]
    fn from_env_applies_public_instance_defaults() {
        with_vars(
            [
                (RUNNER_TEMP_ENV, Some("/runner/_temp")),
                (SERVER_URL_ENV, None),
                (API_URL_ENV, None),
                (RUNNER_TOOL_CACHE_ENV, None),
            ],
            || {
                let runner = RunnerEnvironment::from_env().expect("runner env");
                assert_eq!(runner.temp_dir, "/runner/_temp");
                assert_eq!(runner.server_url.as_str(), "https://github.com/");
                assert_eq!(runner.api_url.as_str(), "https://api.github.com/");
                assert!(runner.tool_cache_dir.is_none());
            },
        );
    }

    #[test]
    fn output_file_is_optional() {
        with_vars([(GITHUB_OUTPUT_ENV, None::<&str>)], || {
            assert_eq!(output_file_from_env().expect("output file"), None);
        });
        with_vars([(GITHUB_OUTPUT_ENV, Some("/runner/_temp/output"))], || {
            assert_eq!(
                output_file_from_env().expect("output file"),
                Some(Utf8PathBuf::from("/runner/_temp/output"))
            );
        });
    }

    #[test]
    fn from_env_reads_enterprise_values() {
        with_vars(
            [
                (RUNNER_TEMP_ENV, Some("/runner/_temp")),
                (SERVER_URL_ENV, Some("https://ghe.example")),
                (API_URL_ENV, Some("https://ghe.example/api/v3")),
                (RUNNER_TOOL_CACHE_ENV, Some("/opt/hostedtoolcache")),
            ],
            || {
                let runner = RunnerEnvironment::from_env().expect("runner env");
                assert_eq!(runner.server_url.host_str(), Some("ghe.example"));
                assert_eq!(runner.api_url.path(), "/api/v3");
                assert_eq!(
                    runner.tool_cache_dir,
                    Some(Utf8PathBuf::from("/opt/hostedtoolcache"))
                );
            },
        );
    }
}
