//! Directory creation for runner scratch space and the tool cache, performed
//! through cap-std handles.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs::Dir};
use color_eyre::eyre::{Context, Result};
use std::io::ErrorKind;

/// Splits `path` into the ambient directory it hangs off (`/` or `.`) and the
/// remainder below it.
fn anchor(path: &Utf8Path) -> (&'static str, &Utf8Path) {
    match path.strip_prefix("/") {
        Ok(below_root) => ("/", below_root),
        Err(_) => (".", path),
    }
}

/// Creates `path` and any missing parents; an existing directory is fine.
pub(crate) fn ensure_dir_exists(path: &Utf8Path) -> Result<()> {
    let (base, relative) = anchor(path);
    if relative.as_str().is_empty() {
        return Ok(());
    }

    let dir = Dir::open_ambient_dir(base, ambient_authority())
        .with_context(|| format!("open ambient directory {base}"))?;
    match dir.create_dir_all(relative) {
        Err(err) if err.kind() != ErrorKind::AlreadyExists => {
            Err(err).with_context(|| format!("create {path}"))
        }
        _ => Ok(()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("/opt/hostedtoolcache", "/", "opt/hostedtoolcache")]
    #[case("runner/_temp", ".", "runner/_temp")]
    #[case("/", "/", "")]
    fn anchor_separates_base_from_remainder(
        #[case] raw: &str,
        #[case] base: &str,
        #[case] relative: &str,
    ) {
        assert_eq!(anchor(Utf8Path::new(raw)), (base, Utf8Path::new(relative)));
    }

    #[test]
    fn creates_nested_scratch_directories_idempotently() {
        let temp = tempdir().expect("tempdir");
        let root = Utf8Path::from_path(temp.path()).expect("utf8 path");
        let scratch = root.join("runner/_temp/4f0c-extracted");

        ensure_dir_exists(&scratch).expect("create nested");
        ensure_dir_exists(&scratch).expect("second call is a no-op");

        assert!(scratch.is_dir());
    }
}
