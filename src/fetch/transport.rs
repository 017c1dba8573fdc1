//! Archive download and extraction collaborators.

use std::fs::File;
use std::future::Future;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Context, eyre};
use flate2::read::GzDecoder;
use reqwest::Client;
use reqwest::header::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::LOG_TARGET;
use crate::error::{ConfigError, ConfigResult, FetchError, FetchResult};
use crate::release::CLIENT_USER_AGENT;

/// Suffix used while a download is still in flight.
const PARTIAL_SUFFIX: &str = "partial";

/// Moves bundle archives from a URL onto disk and unpacks them.
pub trait BundleTransport {
    /// Downloads `url` to exactly `dest` and returns `dest`.
    ///
    /// `auth` is only supplied when the caller has decided the credential may
    /// be sent to this URL.
    fn download(
        &self,
        url: &str,
        dest: &Utf8Path,
        auth: Option<&SecretString>,
        headers: &HeaderMap,
    ) -> impl Future<Output = FetchResult<Utf8PathBuf>> + Send;

    /// Unpacks `archive` into `dest` and returns `dest`.
    fn extract(
        &self,
        archive: &Utf8Path,
        dest: &Utf8Path,
    ) -> impl Future<Output = FetchResult<Utf8PathBuf>> + Send;
}

/// [`BundleTransport`] backed by `reqwest` and gzip-compressed tarballs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialised.
    pub fn new() -> ConfigResult<Self> {
        let client = Client::builder()
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .context("failed to initialise HTTP client for bundle downloads")
            .map_err(ConfigError::from)?;
        Ok(Self { client })
    }

    async fn stream_to(
        &self,
        url: &str,
        partial: &Utf8Path,
        auth: Option<&SecretString>,
        headers: &HeaderMap,
    ) -> color_eyre::Result<()> {
        let mut request = self.client.get(url).headers(headers.clone());
        if let Some(token) = auth {
            request = request.bearer_auth(token.expose_secret());
        }
        let mut response = request
            .send()
            .await
            .wrap_err_with(|| format!("failed to request {url}"))?
            .error_for_status()
            .wrap_err_with(|| format!("download of {url} was rejected"))?;

        let mut file = tokio::fs::File::create(partial)
            .await
            .wrap_err_with(|| format!("failed to create {partial}"))?;
        let mut hasher = Sha256::new();
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .wrap_err_with(|| format!("failed to read body of {url}"))?
        {
            hasher.update(&chunk);
            written += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .wrap_err_with(|| format!("failed to write {partial}"))?;
        }
        file.flush()
            .await
            .wrap_err_with(|| format!("failed to flush {partial}"))?;

        debug!(
            target: LOG_TARGET,
            url = %url,
            bytes = written,
            sha256 = %format!("{:x}", hasher.finalize()),
            "bundle archive downloaded"
        );
        Ok(())
    }
}

impl BundleTransport for HttpTransport {
    async fn download(
        &self,
        url: &str,
        dest: &Utf8Path,
        auth: Option<&SecretString>,
        headers: &HeaderMap,
    ) -> FetchResult<Utf8PathBuf> {
        let partial = dest.with_extension(PARTIAL_SUFFIX);
        if let Err(err) = self.stream_to(url, &partial, auth, headers).await {
            discard_partial(&partial).await;
            return Err(FetchError::download(err));
        }
        tokio::fs::rename(&partial, dest)
            .await
            .wrap_err_with(|| format!("failed to move {partial} to {dest}"))
            .map_err(FetchError::download)?;
        Ok(dest.to_owned())
    }

    async fn extract(&self, archive: &Utf8Path, dest: &Utf8Path) -> FetchResult<Utf8PathBuf> {
        let archive_path = archive.to_owned();
        let dest_path = dest.to_owned();
        tokio::task::spawn_blocking(move || unpack_tar_gz(&archive_path, &dest_path))
            .await
            .map_err(|err| FetchError::extraction(eyre!("extraction task failed: {err}")))?
            .map_err(FetchError::extraction)?;
        Ok(dest.to_owned())
    }
}

async fn discard_partial(partial: &Utf8Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            target: LOG_TARGET,
            path = %partial,
            error = %err,
            "failed to remove partial download"
        ),
    }
}

/// Unpacks a gzip-compressed tarball into `dest`, creating it when missing.
pub(crate) fn unpack_tar_gz(archive: &Utf8Path, dest: &Utf8Path) -> color_eyre::Result<()> {
    let file = File::open(archive).wrap_err_with(|| format!("failed to open archive {archive}"))?;
    std::fs::create_dir_all(dest).wrap_err_with(|| format!("failed to create {dest}"))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.set_preserve_permissions(true);
    tarball
        .unpack(dest)
        .wrap_err_with(|| format!("failed to unpack {archive} into {dest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_bundle_archive;
    use tempfile::tempdir;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf8 path")
    }

    #[test]
    fn unpack_tar_gz_restores_bundle_layout() {
        let temp = tempdir().expect("tempdir");
        let root = utf8(temp.path());
        let archive = root.join("bundle.tar.gz");
        write_bundle_archive(&archive).expect("archive");

        let dest = root.join("out");
        unpack_tar_gz(&archive, &dest).expect("unpack");

        assert!(dest.join("codeql").join("codeql").is_file());
    }

    #[test]
    fn unpack_tar_gz_rejects_garbage() {
        let temp = tempdir().expect("tempdir");
        let root = utf8(temp.path());
        let archive = root.join("bundle.tar.gz");
        std::fs::write(&archive, b"not a tarball").expect("write");

        let err = unpack_tar_gz(&archive, &root.join("out")).expect_err("garbage archive");
        assert!(err.to_string().contains("failed to unpack"));
    }

    #[tokio::test]
    async fn extract_maps_failures_to_extraction_errors() {
        let temp = tempdir().expect("tempdir");
        let root = utf8(temp.path());
        let transport = HttpTransport::new().expect("transport");

        let err = transport
            .extract(&root.join("missing.tar.gz"), &root.join("out"))
            .await
            .expect_err("missing archive");
        assert_eq!(err.kind(), crate::error::FetchErrorKind::Extraction);
    }
}
