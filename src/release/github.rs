//! GitHub REST client for the release registry.
//!
//! Works against github.com and GitHub Enterprise Server alike; the API base
//! URL comes from the runner environment.

use color_eyre::eyre::Context;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use super::{Release, ReleaseRegistry, Repository};
use crate::error::{ConfigError, ConfigResult, RegistryError, RegistryResult};

/// Observability target for registry requests.
const LOG_TARGET: &str = "codeql_setup::registry";

/// User agent sent with registry and download requests.
pub(crate) const CLIENT_USER_AGENT: &str = concat!("codeql-bundle-setup/", env!("CARGO_PKG_VERSION"));

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// Release registry backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    client: Client,
    api_base: String,
    host: String,
    token: Option<SecretString>,
}

impl GitHubReleaseClient {
    /// Creates a client for the API rooted at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialised, for example
    /// because the TLS backend is unavailable.
    pub fn new(api_url: &Url, token: Option<SecretString>) -> ConfigResult<Self> {
        let client = Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .context("failed to initialise HTTP client for the release registry")
            .map_err(ConfigError::from)?;
        Ok(Self {
            client,
            api_base: api_url.as_str().trim_end_matches('/').to_owned(),
            host: api_url.host_str().unwrap_or("unknown-host").to_owned(),
            token,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        if let Some(token) = &self.token {
            if let Ok(mut value) =
                HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn get_release(
        &self,
        url: String,
        repository: &Repository,
        release: &str,
    ) -> RegistryResult<Release> {
        debug!(target: LOG_TARGET, %url, "querying release registry");
        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|source| RegistryError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound {
                repository: repository.to_string(),
                release: release.to_owned(),
                host: self.host.clone(),
            });
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<Release>()
            .await
            .map_err(|source| RegistryError::Transport { url, source })
    }
}

impl ReleaseRegistry for GitHubReleaseClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn release_by_tag(&self, repository: &Repository, tag: &str) -> RegistryResult<Release> {
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{tag}",
            self.api_base,
            repository.owner(),
            repository.name()
        );
        self.get_release(url, repository, tag).await
    }

    async fn latest_release(&self, repository: &Repository) -> RegistryResult<Release> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base,
            repository.owner(),
            repository.name()
        );
        self.get_release(url, repository, "latest").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash_from_api_base() {
        let api = Url::parse("https://ghes.example.com/api/v3/").expect("url");
        let client = GitHubReleaseClient::new(&api, None).expect("client");
        assert_eq!(client.api_base, "https://ghes.example.com/api/v3");
        assert_eq!(client.host(), "ghes.example.com");
    }

    #[test]
    fn headers_mark_credentials_sensitive() {
        let api = Url::parse("https://api.github.com").expect("url");
        let token = SecretString::from("ghs_example".to_owned());
        let client = GitHubReleaseClient::new(&api, Some(token)).expect("client");

        let headers = client.headers();
        let auth = headers.get(AUTHORIZATION).expect("authorization header");
        assert!(auth.is_sensitive());
        assert_eq!(headers.get(ACCEPT).expect("accept"), GITHUB_JSON);
    }

    #[test]
    fn headers_omit_authorization_without_token() {
        let api = Url::parse("https://api.github.com").expect("url");
        let client = GitHubReleaseClient::new(&api, None).expect("client");
        assert!(client.headers().get(AUTHORIZATION).is_none());
    }
}
