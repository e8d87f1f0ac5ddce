//! Storage and queue configuration, plus startup variant selection.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::job_store::{InMemoryJobStore, JobStore, JsonJobStore};
use crate::outbox::{EventOutbox, InMemoryEventOutbox, JsonEventOutbox};
use crate::queue::{FileJobQueue, InMemoryJobQueue, JobQueue};

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Which job store / outbox implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Process-local maps; state is lost on exit.
    InMemory,
    /// Shared JSON documents under the data directory.
    JsonFile,
}

/// Configuration for job and event storage.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Selected storage variant (default: `JsonFile`).
    pub mode: StorageMode,
    /// Base directory for storage files (default: `data`).
    pub data_dir: PathBuf,
    /// Maximum number of retained events; 0 disables trimming
    /// (default: `5000`).
    pub max_event_count: usize,
}

impl StorageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default    |
    /// |-------------------|------------|
    /// | `STORAGE_MODE`    | `JsonFile` |
    /// | `DATA_DIR`        | `data`     |
    /// | `MAX_EVENT_COUNT` | `5000`     |
    pub fn from_env() -> Self {
        let mode = match std::env::var("STORAGE_MODE").as_deref() {
            Ok(value) if value.eq_ignore_ascii_case("inmemory") => StorageMode::InMemory,
            _ => StorageMode::JsonFile,
        };

        let data_dir = std::env::var("DATA_DIR")
            .unwrap_or_else(|_| "data".into())
            .into();

        let max_event_count: usize = std::env::var("MAX_EVENT_COUNT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("MAX_EVENT_COUNT must be a valid usize");

        Self {
            mode,
            data_dir,
            max_event_count,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::JsonFile,
            data_dir: "data".into(),
            max_event_count: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Which queue implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Process-local channel; items are lost on exit.
    InMemory,
    /// Shared JSON document under the data directory.
    File,
}

/// Configuration for the job distribution queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Selected queue variant (default: `File`).
    pub mode: QueueMode,
    /// Base directory for the queue file (default: `data`).
    pub data_dir: PathBuf,
    /// Delay between dequeue polling attempts (default: 500 ms,
    /// floored at 50 ms by the queue itself).
    pub poll_interval: Duration,
}

impl QueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default |
    /// |--------------------------|---------|
    /// | `QUEUE_MODE`             | `File`  |
    /// | `DATA_DIR`               | `data`  |
    /// | `QUEUE_POLL_INTERVAL_MS` | `500`   |
    pub fn from_env() -> Self {
        let mode = match std::env::var("QUEUE_MODE").as_deref() {
            Ok(value) if value.eq_ignore_ascii_case("inmemory") => QueueMode::InMemory,
            _ => QueueMode::File,
        };

        let data_dir = std::env::var("DATA_DIR")
            .unwrap_or_else(|_| "data".into())
            .into();

        let poll_interval_ms: u64 = std::env::var("QUEUE_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("QUEUE_POLL_INTERVAL_MS must be a valid u64");

        Self {
            mode,
            data_dir,
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::File,
            data_dir: "data".into(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// Variant selection
// ---------------------------------------------------------------------------

/// Build the configured job store.
pub fn create_job_store(config: &StorageConfig) -> Arc<dyn JobStore> {
    match config.mode {
        StorageMode::InMemory => Arc::new(InMemoryJobStore::new()),
        StorageMode::JsonFile => Arc::new(JsonJobStore::new(&config.data_dir)),
    }
}

/// Build the configured event outbox.
pub fn create_event_outbox(config: &StorageConfig) -> Arc<dyn EventOutbox> {
    match config.mode {
        StorageMode::InMemory => Arc::new(InMemoryEventOutbox::new()),
        StorageMode::JsonFile => {
            Arc::new(JsonEventOutbox::new(&config.data_dir, config.max_event_count))
        }
    }
}

/// Build the configured job queue.
pub fn create_job_queue(config: &QueueConfig) -> Arc<dyn JobQueue> {
    match config.mode {
        QueueMode::InMemory => Arc::new(InMemoryJobQueue::new()),
        QueueMode::File => Arc::new(FileJobQueue::new(&config.data_dir, config.poll_interval)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
