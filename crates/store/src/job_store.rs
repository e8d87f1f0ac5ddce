//! Durable keyed storage for job aggregates.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use satpipe_core::Job;

use crate::error::StoreError;
use crate::file_store::JsonFileStore;

/// File name of the durable job document inside the data directory.
const JOBS_FILE: &str = "jobs.json";

// ---------------------------------------------------------------------------
// JobStore trait
// ---------------------------------------------------------------------------

/// Keyed storage for job aggregates.
///
/// Both variants are safe for concurrent callers; the file-backed variant
/// is additionally safe across processes.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. Fails with [`StoreError::AlreadyExists`] if the
    /// id is already present.
    async fn add(&self, job: &Job, cancel: &CancellationToken) -> Result<(), StoreError>;

    /// Replace the stored job, inserting if absent (upsert — tolerates
    /// concurrent-create races).
    async fn update(&self, job: &Job, cancel: &CancellationToken) -> Result<(), StoreError>;

    /// Fetch a job by id, or `None` if it does not exist.
    async fn get(&self, job_id: Uuid, cancel: &CancellationToken)
        -> Result<Option<Job>, StoreError>;

    /// All stored jobs, newest first by creation time.
    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Job>, StoreError>;
}

// ---------------------------------------------------------------------------
// InMemoryJobStore
// ---------------------------------------------------------------------------

/// Process-local job store for single-process deployments and tests.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn add(&self, job: &Job, _cancel: &CancellationToken) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update(&self, job: &Job, _cancel: &CancellationToken) -> Result<(), StoreError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(
        &self,
        job_id: Uuid,
        _cancel: &CancellationToken,
    ) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn list(&self, _cancel: &CancellationToken) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

// ---------------------------------------------------------------------------
// JsonJobStore
// ---------------------------------------------------------------------------

/// Persisted payload of the job document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct JobDocument {
    jobs: Vec<Job>,
}

/// File-backed job store shared by all processes on the host.
pub struct JsonJobStore {
    store: JsonFileStore<JobDocument>,
}

impl JsonJobStore {
    /// Create a store backed by `{data_dir}/jobs.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            store: JsonFileStore::new("jobs", data_dir.join(JOBS_FILE)),
        }
    }
}

#[async_trait]
impl JobStore for JsonJobStore {
    async fn add(&self, job: &Job, cancel: &CancellationToken) -> Result<(), StoreError> {
        let job = job.clone();
        self.store
            .transact(cancel, move |doc| {
                if doc.jobs.iter().any(|existing| existing.id == job.id) {
                    return Err(StoreError::AlreadyExists(job.id));
                }
                doc.jobs.push(job);
                Ok(())
            })
            .await
    }

    async fn update(&self, job: &Job, cancel: &CancellationToken) -> Result<(), StoreError> {
        let job = job.clone();
        self.store
            .transact(cancel, move |doc| {
                match doc.jobs.iter_mut().find(|existing| existing.id == job.id) {
                    Some(existing) => *existing = job,
                    None => doc.jobs.push(job),
                }
                Ok(())
            })
            .await
    }

    async fn get(
        &self,
        job_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<Job>, StoreError> {
        let doc = self.store.load(cancel).await?;
        Ok(doc.jobs.into_iter().find(|job| job.id == job_id))
    }

    async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.store.load(cancel).await?.jobs;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
