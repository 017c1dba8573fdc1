//! Copies an unpacked bundle tree into a cache entry.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use tracing::debug;

use super::{COMPLETION_MARKER, LOG_TARGET};

/// Copies the bundle tree at `source` into `dest` and returns how many files
/// were written.
///
/// The walk is iterative so deep bundle trees cannot exhaust the stack.
/// Symbolic links are recreated rather than followed, and any stray
/// completion marker in the source is skipped so only the caller decides when
/// the entry is complete.
pub(crate) fn copy_bundle_tree(source: &Utf8Path, dest: &Utf8Path) -> io::Result<u64> {
    let mut pending: Vec<(Utf8PathBuf, Utf8PathBuf)> = vec![(source.to_owned(), dest.to_owned())];
    let mut files = 0_u64;

    while let Some((from_dir, to_dir)) = pending.pop() {
        fs::create_dir_all(&to_dir)?;
        for dir_entry in from_dir.read_dir_utf8()? {
            let entry = dir_entry?;
            let name = entry.file_name();
            if from_dir.as_path() == source && name == COMPLETION_MARKER {
                continue;
            }
            let from = entry.path().to_owned();
            let to = to_dir.join(name);
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push((from, to));
            } else if file_type.is_symlink() {
                relink(&from, &to)?;
            } else {
                fs::copy(&from, &to)?;
                files += 1;
            }
        }
        mirror_mode(&from_dir, &to_dir);
    }

    Ok(files)
}

fn mirror_mode(from: &Utf8Path, to: &Utf8Path) {
    let outcome = fs::metadata(from).and_then(|meta| fs::set_permissions(to, meta.permissions()));
    if let Err(err) = outcome {
        debug!(target: LOG_TARGET, dir = %to, error = %err, "kept default directory mode");
    }
}

#[cfg(unix)]
fn relink(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn relink(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    if from.is_file() {
        fs::copy(from, to)?;
    }
    Ok(())
}
