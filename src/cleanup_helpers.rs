//! Shared file and directory removal helpers with safety guards.

use std::io::ErrorKind;
use std::path::{Component, Path};

/// Records the outcome of a guarded directory removal attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RemovalOutcome {
    Removed,
    Missing,
}

/// Checks whether a path contains any parent-directory (`..`) components.
fn has_parent_dir(path: &Path) -> bool {
    path.components()
        .any(|component| matches!(component, Component::ParentDir))
}

/// Attempts to remove a directory tree, rejecting unsafe paths before deletion.
pub(crate) fn try_remove_dir_all(path: &Path) -> Result<RemovalOutcome, std::io::Error> {
    guard_removal_path(path)?;
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(RemovalOutcome::Removed),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RemovalOutcome::Missing),
        Err(err) => Err(err),
    }
}

/// Removes every file or directory matching a glob `pattern` and returns how
/// many were removed.
///
/// Zero matches is not an error. Literal paths must be escaped with
/// [`glob::Pattern::escape`] before being passed in.
pub(crate) fn remove_matching(pattern: &str) -> Result<usize, std::io::Error> {
    let paths = glob::glob(pattern)
        .map_err(|err| std::io::Error::new(ErrorKind::InvalidInput, err.to_string()))?;

    let mut removed = 0;
    for entry in paths {
        let path = entry.map_err(std::io::Error::from)?;
        let outcome = if path.is_dir() {
            try_remove_dir_all(&path)?
        } else {
            try_remove_file(&path)?
        };
        if outcome == RemovalOutcome::Removed {
            removed += 1;
        }
    }
    Ok(removed)
}

fn try_remove_file(path: &Path) -> Result<RemovalOutcome, std::io::Error> {
    guard_removal_path(path)?;
    match std::fs::remove_file(path) {
        Ok(()) => Ok(RemovalOutcome::Removed),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RemovalOutcome::Missing),
        Err(err) => Err(err),
    }
}

fn guard_removal_path(path: &Path) -> Result<(), std::io::Error> {
    if is_empty_or_root(path) || has_parent_dir(path) {
        return Err(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("refuse to remove unsafe path {}", path.display()),
        ));
    }
    Ok(())
}

fn is_empty_or_root(path: &Path) -> bool {
    let mut components = path.components();
    match components.next() {
        None => true,
        Some(Component::CurDir | Component::RootDir) => components.next().is_none(),
        Some(Component::Prefix(_)) => match components.next() {
            None => true,
            Some(Component::RootDir) => components.next().is_none(),
            _ => false,
        },
        _ => false,
    }
}
