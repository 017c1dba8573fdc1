//! Request shaping for bundle downloads.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::release::CLIENT_USER_AGENT;

/// Query parameter that marks a URL as already carrying its own credential.
const TOKEN_QUERY_PARAM: &str = "token";

/// Headers sent with every bundle download.
pub(crate) fn download_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    headers
}

/// Decides whether the configured credential may be sent to `url`.
///
/// The credential goes only to the caller's own hosting instance and never to
/// URLs that already embed a `token` query parameter. Unparseable URLs never
/// receive it.
pub(crate) fn should_attach_credential(url: &str, instance_urls: &[&Url]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed
        .query_pairs()
        .any(|(name, _)| name == TOKEN_QUERY_PARAM)
    {
        return false;
    }
    let origin = parsed.origin();
    instance_urls
        .iter()
        .any(|instance| instance.origin() == origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn instance() -> (Url, Url) {
        (
            Url::parse("https://github.com").expect("server url"),
            Url::parse("https://api.github.com").expect("api url"),
        )
    }

    #[rstest]
    #[case(
        "https://github.com/github/codeql-action/releases/download/codeql-bundle-v2.14.6/codeql-bundle-linux64.tar.gz",
        true
    )]
    #[case("https://api.github.com/repos/github/codeql-action/releases/assets/1", true)]
    #[case("https://github.com/bundle.tar.gz?token=abc", false)]
    #[case("https://mirror.example.com/codeql-bundle-v2.14.6/codeql-bundle.tar.gz", false)]
    #[case("http://github.com/bundle.tar.gz", false)]
    #[case("not a url", false)]
    fn credential_goes_only_to_the_own_instance(#[case] url: &str, #[case] expected: bool) {
        let (server, api) = instance();
        assert_eq!(should_attach_credential(url, &[&server, &api]), expected);
    }

    #[test]
    fn download_headers_request_raw_bytes() {
        let headers = download_headers();
        assert_eq!(
            headers.get(ACCEPT).and_then(|value| value.to_str().ok()),
            Some("application/octet-stream")
        );
        assert!(headers.contains_key(USER_AGENT));
    }
}
