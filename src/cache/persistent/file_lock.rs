//! Single-writer guard for the cache directory.
//!
//! The record log has exactly one writer per run. Rather than coordinate
//! concurrent processes, a second open of the same cache directory is
//! refused up front with `ErrorKind::WouldBlock`, which the cache layer
//! surfaces as `CacheError::Locked`.
//!
//! The guard is advisory, taken on a `.lock` file inside the directory, and
//! the operating system releases it when the file handle closes. Dropping
//! the `FileLock` on any exit path, panic included, frees the cache for the
//! next run.

use std::fs::{File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::path::{Path, PathBuf};

/// Name of the guard file inside the cache directory.
const LOCK_FILE: &str = ".lock";

/// Held exclusive lock on a cache directory.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    // Keeps the OS lock alive; releasing happens when this handle closes.
    _guard: File,
}

impl FileLock {
    /// Take the directory's exclusive lock, creating the guard file if
    /// needed.
    ///
    /// # Errors
    /// `ErrorKind::WouldBlock` when another process already holds the lock;
    /// otherwise whatever opening the guard file reported.
    pub fn acquire(dir: &Path) -> IoResult<Self> {
        let path = dir.join(LOCK_FILE);
        let guard = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        lock_exclusive(&guard)?;

        Ok(Self {
            path,
            _guard: guard,
        })
    }

    /// Path of the guard file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn held_elsewhere() -> IoError {
    IoError::new(
        ErrorKind::WouldBlock,
        "cache directory is in use by another process",
    )
}

#[cfg(unix)]
fn lock_exclusive(guard: &File) -> IoResult<()> {
    use std::os::unix::io::AsRawFd;

    let rc = unsafe { libc::flock(guard.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(());
    }

    let os_err = IoError::last_os_error();
    match os_err.raw_os_error() {
        Some(libc::EWOULDBLOCK) => Err(held_elsewhere()),
        _ => Err(os_err),
    }
}

#[cfg(windows)]
fn lock_exclusive(guard: &File) -> IoResult<()> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Foundation::HANDLE;
    use windows_sys::Win32::Storage::FileSystem::{
        LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
    };
    use windows_sys::Win32::System::IO::OVERLAPPED;

    let mut overlapped = unsafe { std::mem::zeroed::<OVERLAPPED>() };
    let rc = unsafe {
        LockFileEx(
            guard.as_raw_handle() as HANDLE,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            1,
            0,
            &mut overlapped,
        )
    };

    if rc == 0 {
        Err(held_elsewhere())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_creates_guard_file_and_releases_on_drop() {
        let dir = tempdir().unwrap();

        let guard_path = {
            let lock = FileLock::acquire(dir.path()).unwrap();
            assert!(lock.path().ends_with(LOCK_FILE));
            assert!(lock.path().exists());
            lock.path().to_path_buf()
        };

        // Dropped above, so the directory can be locked again.
        let relock = FileLock::acquire(dir.path()).unwrap();
        assert_eq!(relock.path(), guard_path);
    }

    #[test]
    fn test_concurrent_acquire_is_refused() {
        let dir = tempdir().unwrap();
        let _held = FileLock::acquire(dir.path()).unwrap();

        let refused = FileLock::acquire(dir.path()).unwrap_err();
        assert_eq!(refused.kind(), ErrorKind::WouldBlock);
    }
}
