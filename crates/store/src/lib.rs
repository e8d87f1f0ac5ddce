//! Storage layer: durable, crash-safe persistence for jobs, events, and
//! the work queue.
//!
//! Everything durable is a JSON document in a shared file, mutated only
//! through [`file_store::JsonFileStore::transact`] — a read-modify-write
//! guarded by a cross-process named lock ([`lock::NamedFileLock`]). Each
//! concern also has a process-local in-memory variant for single-process
//! deployments and tests; the variant is selected at startup from
//! [`config`].

pub mod config;
pub mod error;
pub mod file_store;
pub mod job_store;
pub mod lock;
pub mod outbox;
pub mod queue;

pub use config::{
    create_event_outbox, create_job_queue, create_job_store, QueueConfig, QueueMode,
    StorageConfig, StorageMode,
};
pub use error::StoreError;
pub use file_store::JsonFileStore;
pub use job_store::{InMemoryJobStore, JobStore, JsonJobStore};
pub use outbox::{EventOutbox, InMemoryEventOutbox, JsonEventOutbox};
pub use queue::{FileJobQueue, InMemoryJobQueue, JobQueue};
