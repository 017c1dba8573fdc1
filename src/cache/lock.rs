//! Cross-process file locking for cache stores.
//!
//! Serialises concurrent writers of the same cache key across parallel CI
//! jobs sharing one tool cache. On Unix systems, uses `flock(2)` for advisory
//! locking. On non-Unix platforms, locking is a no-op.

use camino::Utf8Path;
use std::fs::{File, OpenOptions};
use std::io;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Subdirectory within the cache for lock files.
const LOCKS_SUBDIR: &str = ".locks";

/// Guard that holds a file lock until dropped.
///
/// The lock is automatically released when the guard goes out of scope.
#[derive(Debug)]
pub struct CacheLock {
    _file: File,
}

impl CacheLock {
    /// Acquires an exclusive lock for one tool version.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or the lock cannot
    /// be acquired.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use camino::Utf8Path;
    /// use codeql_bundle_setup::cache::CacheLock;
    ///
    /// let cache_dir = Utf8Path::new("/opt/hostedtoolcache");
    /// let _lock = CacheLock::acquire_exclusive(cache_dir, "CodeQL", "2.14.6-2.14.6")?;
    /// # Ok::<(), std::io::Error>(())
    /// ```
    #[cfg(unix)]
    pub fn acquire_exclusive(cache_dir: &Utf8Path, tool: &str, version: &str) -> io::Result<Self> {
        let file = open_lock_file(cache_dir, tool, version)?;

        // SAFETY: The file descriptor obtained from `file.as_raw_fd()` is valid
        // because `file` was opened via `OpenOptions::open` and remains owned by
        // this scope until after the `flock` call completes.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { _file: file })
    }

    /// Opens the lock file without locking on non-Unix platforms.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created.
    #[cfg(not(unix))]
    pub fn acquire_exclusive(cache_dir: &Utf8Path, tool: &str, version: &str) -> io::Result<Self> {
        let file = open_lock_file(cache_dir, tool, version)?;
        Ok(Self { _file: file })
    }
}

fn open_lock_file(cache_dir: &Utf8Path, tool: &str, version: &str) -> io::Result<File> {
    let locks_dir = cache_dir.join(LOCKS_SUBDIR);
    std::fs::create_dir_all(&locks_dir)?;

    let lock_path = locks_dir.join(format!("{tool}-{version}.lock"));
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
}
