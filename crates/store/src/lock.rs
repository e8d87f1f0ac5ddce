//! Cross-process named lock guarding a shared backing file.
//!
//! The lock is an advisory `flock` on a dedicated lock file in the system
//! temp directory. The lock file's name is derived from a SHA-256 hash of
//! the backing file's path (not the path text itself, which may be too
//! long or carry separators), so independent processes that refer to the
//! same path contend on the same lock.
//!
//! Acquisition is cancellable: it polls with a non-blocking `flock`
//! attempt and re-checks the [`CancellationToken`] between attempts
//! instead of blocking in the kernel indefinitely.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Delay between lock acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// NamedFileLock
// ---------------------------------------------------------------------------

/// A named exclusive lock scoped to one backing file path.
///
/// Cheap to construct; the lock file is only opened during
/// [`acquire`](NamedFileLock::acquire). Two handles for the same backing
/// path — in the same process or different processes — always serialize.
#[derive(Debug, Clone)]
pub struct NamedFileLock {
    lock_path: PathBuf,
}

impl NamedFileLock {
    /// Build the lock for `target`, scoped by `prefix`.
    ///
    /// `prefix` distinguishes lock namespaces (jobs, events, queue) so a
    /// hash collision across concerns would still not share a lock file.
    pub fn for_path(prefix: &str, target: &Path) -> Self {
        let hash = Sha256::digest(target.to_string_lossy().as_bytes());
        let lock_path = std::env::temp_dir().join(format!("satpipe-{prefix}-{hash:x}.lock"));
        Self { lock_path }
    }

    /// Acquire the lock, waiting until it is free or `cancel` fires.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<LockGuard, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;

        loop {
            if cancel.is_cancelled() {
                return Err(StoreError::Canceled);
            }

            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc == 0 {
                return Ok(LockGuard { file });
            }

            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EWOULDBLOCK) {
                return Err(StoreError::Io(err));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(StoreError::Canceled),
                _ = tokio::time::sleep(RETRY_INTERVAL) => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LockGuard
// ---------------------------------------------------------------------------

/// Holds the exclusive lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Closing the descriptor would also release the flock; the
        // explicit unlock keeps the release point visible.
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn same_path_yields_same_lock_file() {
        let a = NamedFileLock::for_path("jobs", Path::new("/srv/data/jobs.json"));
        let b = NamedFileLock::for_path("jobs", Path::new("/srv/data/jobs.json"));
        assert_eq!(a.lock_path, b.lock_path);
    }

    #[test]
    fn different_prefixes_do_not_share_lock_files() {
        let a = NamedFileLock::for_path("jobs", Path::new("/srv/data/shared.json"));
        let b = NamedFileLock::for_path("events", Path::new("/srv/data/shared.json"));
        assert_ne!(a.lock_path, b.lock_path);
    }

    #[tokio::test]
    async fn acquire_blocks_until_holder_releases() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.json");
        let lock = NamedFileLock::for_path("test", &target);
        let cancel = CancellationToken::new();

        let guard = lock.acquire(&cancel).await.unwrap();

        // A second handle cannot get the lock while the guard is alive.
        let second = NamedFileLock::for_path("test", &target);
        let contender = tokio::spawn({
            let cancel = cancel.clone();
            async move { second.acquire(&cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        let result = contender.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn acquire_observes_cancellation_while_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.json");
        let lock = NamedFileLock::for_path("test", &target);
        let cancel = CancellationToken::new();

        let _guard = lock.acquire(&cancel).await.unwrap();

        let waiter_cancel = CancellationToken::new();
        let second = NamedFileLock::for_path("test", &target);
        let contender = tokio::spawn({
            let waiter_cancel = waiter_cancel.clone();
            async move { second.acquire(&waiter_cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        waiter_cancel.cancel();

        let result = contender.await.unwrap();
        assert_matches!(result, Err(StoreError::Canceled));
    }
}
