//! Tests for source resolution and the tool cache probe.

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::cache::TOOL_NAME;
use crate::test_support::{FakeRegistry, RecordingToolCache, capture_warn_logs, test_runtime};

const LINUX_ASSET: &str = "codeql-bundle-linux64.tar.gz";

struct Harness {
    _temp: TempDir,
    root: Utf8PathBuf,
    cache: RecordingToolCache,
    repository: Repository,
}

impl Harness {
    /// Places a complete entry in the cache under `key`.
    fn seed(&self, key: &str) -> Utf8PathBuf {
        let source = self.root.join(format!("seed-{key}"));
        std::fs::create_dir_all(source.join("codeql")).expect("seed dir");
        std::fs::write(source.join("codeql").join("codeql"), "cli").expect("seed cli");
        self.cache.seed(&source, TOOL_NAME, key).expect("seed cache")
    }

    fn resolver<'a>(&'a self, registry: &'a FakeRegistry) -> SourceResolver<'a, FakeRegistry, RecordingToolCache> {
        SourceResolver::new(registry, &self.cache, &self.repository, Platform::Linux)
    }
}

#[fixture]
fn harness() -> Harness {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 root");
    let cache = RecordingToolCache::new(root.join("toolcache"));
    Harness {
        _temp: temp,
        root,
        cache,
        repository: Repository::DEFAULT.parse().expect("repository"),
    }
}

fn registry_with(tag: &str) -> FakeRegistry {
    FakeRegistry::default().with_release(tag, &[LINUX_ASSET, "codeql-bundle-win64.tar.gz"])
}

#[rstest]
#[case(None, ToolSpecifier::Latest)]
#[case(Some(""), ToolSpecifier::Latest)]
#[case(Some("latest"), ToolSpecifier::Latest)]
#[case(
    Some("https://example.com/bundle-2.14.6/codeql-bundle.tar.gz"),
    ToolSpecifier::Url("https://example.com/bundle-2.14.6/codeql-bundle.tar.gz".into())
)]
#[case(
    Some("HTTP://example.com/codeql-bundle.tar.gz"),
    ToolSpecifier::Url("HTTP://example.com/codeql-bundle.tar.gz".into())
)]
#[case(
    Some("/opt/codeql-bundle.tar.gz"),
    ToolSpecifier::Local(Utf8PathBuf::from("/opt/codeql-bundle.tar.gz"))
)]
#[case(
    Some("Latest"),
    ToolSpecifier::Local(Utf8PathBuf::from("Latest"))
)]
fn specifier_classification(#[case] raw: Option<&str>, #[case] expected: ToolSpecifier) {
    assert_eq!(ToolSpecifier::parse(raw), expected);
}

#[rstest]
#[tokio::test]
async fn local_path_never_touches_the_network(harness: Harness) {
    let registry = registry_with("bundle-2.14.6");
    let specifier = ToolSpecifier::parse(Some("./codeql-bundle-linux64.tar.gz"));

    let source = harness.resolver(&registry).resolve(&specifier).await.expect("resolve");

    assert_eq!(
        source,
        ToolsSource::Local {
            archive: Utf8PathBuf::from("./codeql-bundle-linux64.tar.gz")
        }
    );
    assert_eq!(registry.request_count(), 0);
    assert!(harness.cache.lookups().is_empty());
}

#[rstest]
#[tokio::test]
async fn latest_without_releases_fails(harness: Harness) {
    let registry = FakeRegistry::default();

    let err = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect_err("no releases");

    assert_eq!(err.kind(), ResolveErrorKind::NoReleases);
}

#[rstest]
#[tokio::test]
async fn stable_tag_probes_every_tier_before_downloading(harness: Harness) {
    let registry = registry_with("bundle-2.14.6");

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("resolve");

    assert_eq!(harness.cache.lookups(), ["2.14.6", "0.0.0-2.14.6"]);
    assert_eq!(
        source,
        ToolsSource::Download {
            url: FakeRegistry::asset_url("bundle-2.14.6", LINUX_ASSET),
            bundle_version: Some("2.14.6".into()),
            cli_version: Some("2.14.6".into()),
            version_label: "2.14.6".into(),
        }
    );
}

#[rstest]
#[tokio::test]
async fn nightly_tag_skips_cli_tier(harness: Harness) {
    let registry = registry_with("bundle-nightly-20240102");

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("resolve");

    assert_eq!(harness.cache.lookups(), ["0.0.0-nightly-20240102"]);
    match source {
        ToolsSource::Download {
            cli_version,
            bundle_version,
            version_label,
            ..
        } => {
            assert!(cli_version.is_none());
            assert_eq!(bundle_version.as_deref(), Some("nightly-20240102"));
            assert_eq!(version_label, "0.0.0-nightly-20240102");
        }
        other => panic!("expected a download, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn prerelease_tag_probes_fallback_then_semantic_key(harness: Harness) {
    let registry = registry_with("bundle-2.15.0-beta.1");

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("resolve");

    assert_eq!(harness.cache.lookups(), ["0.0.0-2.15.0-beta.1", "2.15.0-beta.1"]);
    assert_eq!(source.kind(), SourceKind::Download);
}

#[rstest]
#[tokio::test]
async fn prerelease_bundle_is_found_under_its_semantic_key(harness: Harness) {
    let registry = registry_with("bundle-2.15.0-beta.1");
    let cached = harness.seed("2.15.0-beta.1");

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("resolve");

    assert_eq!(
        source,
        ToolsSource::Toolcache {
            tools_dir: cached,
            cache_key: "2.15.0-beta.1".into(),
            version_label: "2.15.0-beta.1".into(),
        }
    );
}

#[rstest]
#[tokio::test]
async fn exact_cli_version_hit_wins(harness: Harness) {
    let registry = registry_with("bundle-2.14.6");
    let cached = harness.seed("2.14.6");
    harness.seed("0.0.0-2.14.6");

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("resolve");

    assert_eq!(
        source,
        ToolsSource::Toolcache {
            tools_dir: cached,
            cache_key: "2.14.6".into(),
            version_label: "2.14.6".into(),
        }
    );
    assert_eq!(harness.cache.lookups(), ["2.14.6"]);
}

#[rstest]
#[tokio::test]
async fn single_compound_candidate_is_selected(harness: Harness) {
    let registry = registry_with("bundle-2.14.6");
    let cached = harness.seed("2.14.6-2.14.6");

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("resolve");

    assert_eq!(
        source,
        ToolsSource::Toolcache {
            tools_dir: cached,
            cache_key: "2.14.6-2.14.6".into(),
            version_label: "2.14.6".into(),
        }
    );
}

#[rstest]
fn ambiguous_candidates_fall_through_with_warning(harness: Harness) {
    let registry = registry_with("bundle-2.14.6");
    harness.seed("2.14.6-20240101");
    harness.seed("2.14.6-20240102");
    let fallback = harness.seed("0.0.0-2.14.6");
    let runtime = test_runtime().expect("runtime");

    let (logs, result) = capture_warn_logs(|| {
        runtime.block_on(harness.resolver(&registry).resolve(&ToolSpecifier::Latest))
    });
    let source = result.expect("resolve");

    assert!(
        logs.iter()
            .any(|line| line.contains("multiple cached bundles match the CLI version")),
        "{logs:?}"
    );
    assert_eq!(
        source,
        ToolsSource::Toolcache {
            tools_dir: fallback,
            cache_key: "0.0.0-2.14.6".into(),
            version_label: "2.14.6".into(),
        }
    );
}

#[rstest]
#[tokio::test]
async fn ambiguous_candidates_without_fallback_download(harness: Harness) {
    let registry = registry_with("bundle-2.14.6");
    harness.seed("2.14.6-20240101");
    harness.seed("2.14.6-20240102");

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("resolve");

    assert_eq!(source.kind(), SourceKind::Download);
}

#[rstest]
#[tokio::test]
async fn url_with_tag_uses_cache_without_registry(harness: Harness) {
    let registry = FakeRegistry::default();
    let cached = harness.seed("0.0.0-nightly-20240102");
    let url = FakeRegistry::asset_url("bundle-nightly-20240102", LINUX_ASSET);

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Url(url))
        .await
        .expect("resolve");

    assert_eq!(
        source,
        ToolsSource::Toolcache {
            tools_dir: cached,
            cache_key: "0.0.0-nightly-20240102".into(),
            version_label: "0.0.0-nightly-20240102".into(),
        }
    );
    assert_eq!(registry.request_count(), 0);
}

#[rstest]
#[tokio::test]
async fn url_without_tag_downloads_as_given(harness: Harness) {
    let registry = FakeRegistry::default();
    let url = "https://mirror.example/codeql-bundle.tar.gz";

    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Url(url.into()))
        .await
        .expect("resolve");

    assert_eq!(
        source,
        ToolsSource::Download {
            url: url.into(),
            bundle_version: None,
            cli_version: None,
            version_label: url.into(),
        }
    );
    assert!(harness.cache.lookups().is_empty());
    assert_eq!(registry.request_count(), 0);
}

#[rstest]
#[tokio::test]
async fn missing_platform_asset_fails_only_on_download(harness: Harness) {
    let registry = FakeRegistry::default().with_release("bundle-2.14.6", &["codeql-bundle-win64.tar.gz"]);

    let err = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect_err("no linux asset");
    assert_eq!(err.kind(), ResolveErrorKind::AssetNotFound);

    harness.seed("2.14.6");
    let source = harness
        .resolver(&registry)
        .resolve(&ToolSpecifier::Latest)
        .await
        .expect("cached bundle needs no asset");
    assert_eq!(source.kind(), SourceKind::Toolcache);
}

#[rstest]
#[tokio::test]
async fn repeated_resolution_is_idempotent(harness: Harness) {
    let registry = registry_with("bundle-2.14.6");
    harness.seed("2.14.6-2.14.6");
    let resolver = harness.resolver(&registry);

    let first = resolver.resolve(&ToolSpecifier::Latest).await.expect("first");
    let second = resolver.resolve(&ToolSpecifier::Latest).await.expect("second");

    assert_eq!(first, second);
}
