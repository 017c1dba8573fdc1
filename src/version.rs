//! Reconciles the version-naming schemes used by CodeQL bundles.
//!
//! Release tags take the form `bundle-<suffix>`. The suffix (the bundle
//! version) may be a semantic version such as `2.14.6` or an opaque label such
//! as `nightly-20240102`. Opaque labels are folded into the semantic-version
//! space as pre-releases of a synthetic `0.0.0` base so every bundle shares a
//! single ordering and a single cache-key namespace.

use semver::Version;
use tracing::debug;
use url::Url;

use crate::error::{VersionError, VersionResult};

/// Prefix shared by every bundle release tag.
pub const TAG_PREFIX: &str = "bundle-";

/// Base version used when a bundle version is not itself a semantic version.
pub const SYNTHETIC_BASE: &str = "0.0.0";

/// Observability target for version handling.
const LOG_TARGET: &str = "codeql_setup::version";

/// Converts a raw release string into a semantic version.
///
/// Valid semantic versions are returned in cleaned form (surrounding
/// whitespace and a leading `v` or `=` removed). Anything else is rewritten as
/// `0.0.0-<raw>` and parsed again.
///
/// # Errors
///
/// Returns [`VersionError::InvalidVersionFormat`] when the rewritten form is
/// still not a valid semantic version.
///
/// # Examples
///
/// ```
/// use codeql_bundle_setup::version::normalize_version;
///
/// assert_eq!(normalize_version("v2.14.6")?.to_string(), "2.14.6");
/// assert_eq!(
///     normalize_version("nightly-20240102")?.to_string(),
///     "0.0.0-nightly-20240102"
/// );
/// # Ok::<(), codeql_bundle_setup::VersionError>(())
/// ```
pub fn normalize_version(raw: &str) -> VersionResult<Version> {
    if let Some(version) = clean_version(raw) {
        return Ok(version);
    }

    let synthetic = format!("{SYNTHETIC_BASE}-{raw}");
    debug!(
        target: LOG_TARGET,
        raw = %raw,
        synthetic = %synthetic,
        "version is not semantic, treating it as a pre-release of the synthetic base"
    );
    Version::parse(&synthetic).map_err(|source| VersionError::InvalidVersionFormat {
        raw: raw.to_owned(),
        source,
    })
}

/// Parses `raw` as a semantic version after stripping decoration, without
/// falling back to the synthetic base.
fn clean_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['=', 'v', 'V']);
    Version::parse(trimmed).ok()
}

/// Returns `true` when `version` has the strict `x.y.z` shape with no
/// pre-release or build metadata.
#[must_use]
pub fn is_strict_release(version: &str) -> bool {
    let mut parts = 0_usize;
    for part in version.split('.') {
        if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts == 3
}

/// Extracts the bundle version from a release tag.
///
/// Returns `None` when the tag does not carry the [`TAG_PREFIX`] or the suffix
/// is empty.
#[must_use]
pub fn bundle_version_from_tag(tag: &str) -> Option<&str> {
    tag.strip_prefix(TAG_PREFIX)
        .filter(|suffix| !suffix.is_empty())
}

/// Derives the stable CLI version from a bundle version.
///
/// Only bundle versions that parse as semantic versions and normalise to a
/// strict `x.y.z` release yield a CLI version; pre-release and build-suffixed
/// bundles yield `None`.
#[must_use]
pub fn cli_version_from_bundle(bundle_version: &str) -> Option<String> {
    let version = clean_version(bundle_version)?;
    let canonical = version.to_string();
    is_strict_release(&canonical).then_some(canonical)
}

/// Recovers a release tag from a bundle download URL.
///
/// The tag is a directory segment of the URL path that starts with
/// [`TAG_PREFIX`]; the final segment names the asset file and is never
/// considered.
#[must_use]
pub fn tag_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let (_, directories) = segments.split_last()?;
    directories
        .iter()
        .find(|segment| segment.starts_with(TAG_PREFIX) && segment.len() > TAG_PREFIX.len())
        .map(|segment| (*segment).to_owned())
}

/// Cache key probed when no stable CLI version match exists.
#[must_use]
pub fn fallback_cache_key(bundle_version: &str) -> String {
    format!("{SYNTHETIC_BASE}-{bundle_version}")
}

/// Computes the key under which a freshly downloaded bundle is cached.
///
/// Strict `x.y.z` CLI versions earn the compound `<cli>-<bundle>` key, taken
/// verbatim. Otherwise the key is the normalised bundle version.
///
/// # Errors
///
/// Propagates [`VersionError::InvalidVersionFormat`] from
/// [`normalize_version`] when the bundle version cannot be normalised.
///
/// # Examples
///
/// ```
/// use codeql_bundle_setup::version::canonical_cache_key;
///
/// assert_eq!(canonical_cache_key(Some("2.14.6"), "2.14.6")?, "2.14.6-2.14.6");
/// assert_eq!(
///     canonical_cache_key(None, "nightly-20240102")?,
///     "0.0.0-nightly-20240102"
/// );
/// # Ok::<(), codeql_bundle_setup::VersionError>(())
/// ```
pub fn canonical_cache_key(cli_version: Option<&str>, bundle_version: &str) -> VersionResult<String> {
    match cli_version {
        Some(cli) if is_strict_release(cli) => Ok(format!("{cli}-{bundle_version}")),
        _ => Ok(normalize_version(bundle_version)?.to_string()),
    }
}

/// Picks the human-readable version label used in logs and outputs.
///
/// Preference order: CLI version, semantic form of the bundle version, raw
/// tag, raw URL, then `unknown`. The label never influences cache keys.
#[must_use]
pub fn version_label(
    cli_version: Option<&str>,
    bundle_version: Option<&str>,
    tag: Option<&str>,
    url: Option<&str>,
) -> String {
    if let Some(cli) = cli_version {
        return cli.to_owned();
    }
    if let Some(version) = bundle_version.and_then(|bundle| normalize_version(bundle).ok()) {
        return version.to_string();
    }
    tag.or(url).unwrap_or("unknown").to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2.14.6", "2.14.6")]
    #[case("v2.14.6", "2.14.6")]
    #[case(" =1.0.0 ", "1.0.0")]
    #[case("2.15.0-beta.1", "2.15.0-beta.1")]
    #[case("nightly-20240102", "0.0.0-nightly-20240102")]
    #[case("20240102", "0.0.0-20240102")]
    fn normalize_version_produces_canonical_form(#[case] raw: &str, #[case] expected: &str) {
        let version = normalize_version(raw).expect("normalise");
        assert_eq!(version.to_string(), expected);
    }

    #[rstest]
    #[case("2.14.6")]
    #[case("v3.0.1")]
    #[case("nightly-20240102")]
    #[case("1.2.3+build.7")]
    fn normalize_version_is_idempotent(#[case] raw: &str) {
        let once = normalize_version(raw).expect("first pass");
        let twice = normalize_version(&once.to_string()).expect("second pass");
        assert_eq!(once, twice);
    }

    #[rstest]
    #[case("nightly-20240102")]
    #[case("codeql-preview")]
    fn non_semantic_labels_become_synthetic_pre_releases(#[case] label: &str) {
        let direct = normalize_version(label).expect("direct");
        let rewritten = normalize_version(&format!("0.0.0-{label}")).expect("rewritten");
        assert_eq!(direct, rewritten);
        assert_eq!(direct.pre.as_str(), label);
    }

    #[test]
    fn normalize_version_rejects_unrepresentable_labels() {
        let err = normalize_version("has spaces inside").expect_err("should fail");
        assert!(err.to_string().contains("has spaces inside"));
    }

    #[rstest]
    #[case("2.14.6", true)]
    #[case("10.0.0", true)]
    #[case("2.14", false)]
    #[case("2.14.6-beta", false)]
    #[case("2.14.6+20240102", false)]
    #[case("v2.14.6", false)]
    #[case("", false)]
    fn is_strict_release_accepts_only_plain_triples(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(is_strict_release(raw), expected);
    }

    #[rstest]
    #[case("bundle-2.14.6", Some("2.14.6"))]
    #[case("bundle-nightly-20240102", Some("nightly-20240102"))]
    #[case("bundle-", None)]
    #[case("v2.14.6", None)]
    fn bundle_version_from_tag_strips_prefix(#[case] tag: &str, #[case] expected: Option<&str>) {
        assert_eq!(bundle_version_from_tag(tag), expected);
    }

    #[rstest]
    #[case("2.14.6", Some("2.14.6"))]
    #[case("v2.14.6", Some("2.14.6"))]
    #[case("2.15.0-beta.1", None)]
    #[case("nightly-20240102", None)]
    fn cli_version_requires_strict_release(#[case] bundle: &str, #[case] expected: Option<&str>) {
        assert_eq!(cli_version_from_bundle(bundle).as_deref(), expected);
    }

    #[rstest]
    #[case(
        "https://github.com/github/codeql-action/releases/download/bundle-2.14.6/codeql-bundle-linux64.tar.gz",
        Some("bundle-2.14.6")
    )]
    #[case(
        "https://ghes.example.com/mirror/bundle-nightly-20240102/codeql-bundle.tar.gz?token=abc",
        Some("bundle-nightly-20240102")
    )]
    #[case("https://example.com/downloads/bundle-2.14.6.tar.gz", None)]
    #[case("https://api.github.com/repos/github/codeql-action/releases/assets/42", None)]
    #[case("not a url", None)]
    fn tag_from_url_reads_directory_segments(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(tag_from_url(url).as_deref(), expected);
    }

    #[rstest]
    #[case(Some("2.14.6"), "2.14.6", "2.14.6-2.14.6")]
    #[case(Some("2.14.6"), "20240102", "2.14.6-20240102")]
    #[case(Some("2.14.6-beta"), "2.14.6-beta", "2.14.6-beta")]
    #[case(Some("2.14.6+nightly"), "nightly-20240102", "0.0.0-nightly-20240102")]
    #[case(None, "nightly-20240102", "0.0.0-nightly-20240102")]
    #[case(None, "2.14.6", "2.14.6")]
    fn canonical_cache_key_reconciles_cli_and_bundle(
        #[case] cli: Option<&str>,
        #[case] bundle: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(canonical_cache_key(cli, bundle).expect("key"), expected);
    }

    #[test]
    fn fallback_cache_key_uses_synthetic_base() {
        assert_eq!(fallback_cache_key("2.14.6"), "0.0.0-2.14.6");
    }

    #[rstest]
    #[case(Some("2.14.6"), Some("nightly"), Some("bundle-nightly"), Some("https://x"), "2.14.6")]
    #[case(None, Some("nightly-1"), Some("bundle-nightly-1"), None, "0.0.0-nightly-1")]
    #[case(None, None, Some("bundle-?"), Some("https://x"), "bundle-?")]
    #[case(None, None, None, Some("https://x"), "https://x")]
    #[case(None, None, None, None, "unknown")]
    fn version_label_follows_preference_order(
        #[case] cli: Option<&str>,
        #[case] bundle: Option<&str>,
        #[case] tag: Option<&str>,
        #[case] url: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(version_label(cli, bundle, tag, url), expected);
    }
}
