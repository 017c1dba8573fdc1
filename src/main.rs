//! Resolves the CodeQL bundle requested by the action inputs, fetching and
//! caching it when needed, and publishes `tools-dir`, `codeql-path`, and
//! `tools-version` as step outputs.
//!
//! Inputs arrive as `INPUT_*` environment variables parsed by
//! [`OrthoConfig`](https://github.com/leynos/ortho-config); runner values such
//! as `RUNNER_TEMP` are read from the environment. The binary exits with
//! status code `0` on success and `1` on error.

fn main() -> color_eyre::eyre::Result<()> {
    codeql_bundle_setup::run().map_err(color_eyre::Report::new)?;
    Ok(())
}
