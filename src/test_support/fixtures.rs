//! Shared fixtures for tests that need a runner layout or bundle archives.

use std::fs::File;
use std::io::{Result as IoResult, Write};

use camino::Utf8Path;
use color_eyre::eyre::{Result, eyre};
use flate2::Compression;
use flate2::write::GzEncoder;
use secrecy::SecretString;
use tokio::runtime::{Builder, Runtime};
use url::Url;

use crate::cache::ToolCacheConfig;
use crate::config::ActionConfig;
use crate::release::{Platform, Repository};
use crate::resolver::ToolSpecifier;

use super::fakes::FakeRegistry;

/// Credential handed to fixtures that need one.
pub const TEST_TOKEN: &str = "ghs_test_token";

/// Builds a single-threaded Tokio runtime for synchronous tests.
///
/// # Examples
/// ```rust
/// use codeql_bundle_setup::test_support::test_runtime;
///
/// # fn demo() -> color_eyre::eyre::Result<()> {
/// let runtime = test_runtime()?;
/// assert_eq!(runtime.block_on(async { 40 + 2 }), 42);
/// # Ok(())
/// # }
/// # demo().unwrap();
/// ```
pub fn test_runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| eyre!(err))
}

/// Writes a minimal gzip-compressed bundle with a `codeql/` directory holding
/// the CLI for every platform.
///
/// # Errors
/// Returns an error when the archive cannot be written.
pub fn write_bundle_archive(path: &Utf8Path) -> IoResult<()> {
    let encoder = GzEncoder::new(File::create(path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    append_file(&mut builder, "codeql/codeql", b"#!/bin/sh\necho codeql\n", 0o755)?;
    append_file(&mut builder, "codeql/codeql.exe", b"MZ", 0o755)?;
    append_file(&mut builder, "codeql/VERSION", b"2.14.6\n", 0o644)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

fn append_file<W: Write>(
    builder: &mut tar::Builder<W>,
    path: &str,
    contents: &[u8],
    mode: u32,
) -> IoResult<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder.append_data(&mut header, path, contents)
}

/// Builds a configuration rooted under `root` that treats
/// [`FakeRegistry::HOST`] as the caller's own instance.
///
/// Scratch space lives in `<root>/runner-temp` and the tool cache in
/// `<root>/toolcache`.
///
/// # Errors
/// Returns an error when the fixture URLs cannot be parsed.
pub fn action_config(root: &Utf8Path, tools: ToolSpecifier) -> Result<ActionConfig> {
    Ok(ActionConfig {
        repository: Repository::DEFAULT.parse()?,
        tools,
        token: Some(SecretString::from(TEST_TOKEN.to_owned())),
        temp_dir: root.join("runner-temp"),
        server_url: Url::parse(&format!("https://{}", FakeRegistry::HOST))?,
        api_url: Url::parse(&format!("https://api.{}", FakeRegistry::HOST))?,
        tool_cache: ToolCacheConfig::with_dir(root.join("toolcache")),
        platform: Platform::Linux,
    })
}
