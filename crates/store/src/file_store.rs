//! Shared-file JSON persistence with a cross-process transaction boundary.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::lock::NamedFileLock;

/// JSON document store shared between processes.
///
/// Every operation takes the named lock for the backing file, so reads
/// never race an in-flight [`transact`](JsonFileStore::transact) and a
/// read-modify-write is atomic with respect to every other process on
/// the host. All durable mutations in this crate route through
/// `transact`; ad-hoc load/save pairs would lose updates.
///
/// A missing file, an empty file, and a file that fails to parse all
/// load as `T::default()`. For parse failures this deliberately trades
/// durability for availability — the corrupt document is overwritten by
/// the next save — and is logged at WARN.
pub struct JsonFileStore<T> {
    path: PathBuf,
    lock: NamedFileLock,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    /// Create a store for `path`, locking under the given prefix.
    pub fn new(prefix: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = NamedFileLock::for_path(prefix, &path);
        Self {
            path,
            lock,
            _marker: PhantomData,
        }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current document under the lock.
    pub async fn load(&self, cancel: &CancellationToken) -> Result<T, StoreError> {
        let _guard = self.lock.acquire(cancel).await?;
        self.read_unlocked().await
    }

    /// Persist `document` under the lock, replacing the file contents.
    pub async fn save(&self, document: &T, cancel: &CancellationToken) -> Result<(), StoreError> {
        let _guard = self.lock.acquire(cancel).await?;
        self.write_unlocked(document).await
    }

    /// Run a read-modify-write transaction under a single lock hold.
    ///
    /// Loads the current document, applies `mutator`, and persists the
    /// result, returning the mutator's value. If the mutator errors the
    /// document is not written.
    pub async fn transact<R>(
        &self,
        cancel: &CancellationToken,
        mutator: impl FnOnce(&mut T) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let _guard = self.lock.acquire(cancel).await?;
        let mut document = self.read_unlocked().await?;
        let result = mutator(&mut document)?;
        self.write_unlocked(&document).await?;
        Ok(result)
    }

    async fn read_unlocked(&self) -> Result<T, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(T::default());
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        if raw.trim().is_empty() {
            return Ok(T::default());
        }

        match serde_json::from_str(&raw) {
            Ok(document) => Ok(document),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Backing document failed to parse, starting from an empty document"
                );
                Ok(T::default())
            }
        }
    }

    async fn write_unlocked(&self, document: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
