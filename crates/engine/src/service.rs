//! Producer-side job operations: create, query, and cancel jobs.
//!
//! The service owns the create flow's ordering guarantee: the job is
//! durable in the store before its JobCreated event is visible, and the
//! event is appended before the id is handed to the worker queue.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use satpipe_core::{CoreError, EventDraft, Job, JobEventKind, StageStatus};
use satpipe_store::{EventOutbox, JobQueue, JobStore};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// NewJob
// ---------------------------------------------------------------------------

/// Input for creating a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Satellite source name.
    pub satellite_name: String,
    /// Raw data display name.
    pub raw_data_name: String,
    /// Raw data size in bytes.
    pub raw_data_size_bytes: i64,
}

impl NewJob {
    fn validate(&self) -> Result<(), CoreError> {
        if self.satellite_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "satellite_name must not be empty".into(),
            ));
        }
        if self.raw_data_name.trim().is_empty() {
            return Err(CoreError::Validation(
                "raw_data_name must not be empty".into(),
            ));
        }
        if self.raw_data_size_bytes < 0 {
            return Err(CoreError::Validation(
                "raw_data_size_bytes must not be negative".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JobService
// ---------------------------------------------------------------------------

/// Job operations exposed to producers (the HTTP API).
pub struct JobService {
    jobs: Arc<dyn JobStore>,
    outbox: Arc<dyn EventOutbox>,
    queue: Arc<dyn JobQueue>,
}

impl JobService {
    /// Create a service over the given store, outbox, and queue.
    pub fn new(
        jobs: Arc<dyn JobStore>,
        outbox: Arc<dyn EventOutbox>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            jobs,
            outbox,
            queue,
        }
    }

    /// Create a job, record its JobCreated event, and enqueue it.
    ///
    /// Store, outbox, and queue are touched strictly in that order, so a
    /// crash mid-way leaves at worst a stored job that is never picked
    /// up, never a queued id without a stored job.
    pub async fn create_job(
        &self,
        input: NewJob,
        cancel: &CancellationToken,
    ) -> Result<Job, EngineError> {
        input.validate()?;

        let job = Job::new(
            Uuid::new_v4(),
            input.satellite_name,
            input.raw_data_name,
            input.raw_data_size_bytes,
            Utc::now(),
        );
        self.jobs.add(&job, cancel).await?;
        self.outbox
            .append(
                EventDraft::new(JobEventKind::JobCreated, job.id, job.created_at)
                    .with_message("Job created and queued."),
                cancel,
            )
            .await?;
        self.queue.enqueue(job.id, cancel).await?;

        tracing::info!(
            job_id = %job.id,
            satellite = %job.satellite_name,
            raw_data = %job.raw_data_name,
            "Job created"
        );
        Ok(job)
    }

    /// Fetch one job by id.
    pub async fn get_job(
        &self,
        job_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Job, EngineError> {
        self.jobs
            .get(job_id, cancel)
            .await?
            .ok_or(EngineError::Core(CoreError::NotFound {
                entity: "job",
                id: job_id.to_string(),
            }))
    }

    /// All jobs, newest first.
    pub async fn list_jobs(&self, cancel: &CancellationToken) -> Result<Vec<Job>, EngineError> {
        Ok(self.jobs.list(cancel).await?)
    }

    /// Cancel a job on behalf of an operator.
    ///
    /// The cancellation is recorded against the job's current stage. A
    /// job that already finished is rejected with a conflict.
    pub async fn cancel_job(
        &self,
        job_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Job, EngineError> {
        let mut job = self.get_job(job_id, cancel).await?;

        let canceled_at = Utc::now();
        job.cancel(canceled_at)?;
        self.jobs.update(&job, cancel).await?;
        self.outbox
            .append(
                EventDraft::new(JobEventKind::JobCanceled, job.id, canceled_at)
                    .with_stage(job.current_stage)
                    .with_status(StageStatus::Canceled)
                    .with_message("Job canceled by operator."),
                cancel,
            )
            .await?;

        tracing::info!(job_id = %job.id, stage = %job.current_stage, "Job canceled");
        Ok(job)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use satpipe_core::{JobFinalStatus, PipelineStage, StageState};
    use satpipe_store::{InMemoryEventOutbox, InMemoryJobQueue, InMemoryJobStore};

    use super::*;

    struct Harness {
        outbox: Arc<InMemoryEventOutbox>,
        queue: Arc<InMemoryJobQueue>,
        service: JobService,
    }

    fn harness() -> Harness {
        let jobs = Arc::new(InMemoryJobStore::new());
        let outbox = Arc::new(InMemoryEventOutbox::new());
        let queue = Arc::new(InMemoryJobQueue::new());
        let service = JobService::new(
            jobs as Arc<dyn JobStore>,
            Arc::clone(&outbox) as Arc<dyn EventOutbox>,
            Arc::clone(&queue) as Arc<dyn JobQueue>,
        );
        Harness {
            outbox,
            queue,
            service,
        }
    }

    fn new_job() -> NewJob {
        NewJob {
            satellite_name: "KOMPSAT-5".into(),
            raw_data_name: "scene.raw".into(),
            raw_data_size_bytes: 4096,
        }
    }

    #[tokio::test]
    async fn create_job_stores_emits_and_enqueues() {
        let h = harness();
        let cancel = CancellationToken::new();

        let job = h.service.create_job(new_job(), &cancel).await.unwrap();
        assert!(job.final_status.is_none());
        assert_eq!(job.current_stage, PipelineStage::DataIngestion);

        let fetched = h.service.get_job(job.id, &cancel).await.unwrap();
        assert_eq!(fetched, job);

        let events = h.outbox.list_after(0, 10, &cancel).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, JobEventKind::JobCreated);
        assert_eq!(events[0].job_id, job.id);
        assert_eq!(events[0].occurred_at, job.created_at);

        assert_eq!(h.queue.dequeue(&cancel).await.unwrap(), job.id);
    }

    #[tokio::test]
    async fn create_job_rejects_blank_names() {
        let h = harness();
        let cancel = CancellationToken::new();

        let err = h
            .service
            .create_job(
                NewJob {
                    satellite_name: "  ".into(),
                    ..new_job()
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert_matches!(err, EngineError::Core(CoreError::Validation(_)));

        // Nothing was emitted for the rejected request.
        assert!(h.outbox.list_after(0, 10, &cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_job_rejects_negative_size() {
        let h = harness();
        let cancel = CancellationToken::new();

        let err = h
            .service
            .create_job(
                NewJob {
                    raw_data_size_bytes: -1,
                    ..new_job()
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert_matches!(err, EngineError::Core(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn get_job_maps_missing_to_not_found() {
        let h = harness();
        let cancel = CancellationToken::new();

        let err = h.service.get_job(Uuid::new_v4(), &cancel).await.unwrap_err();
        assert_matches!(
            err,
            EngineError::Core(CoreError::NotFound { entity: "job", .. })
        );
    }

    #[tokio::test]
    async fn list_jobs_returns_newest_first() {
        let h = harness();
        let cancel = CancellationToken::new();

        let first = h.service.create_job(new_job(), &cancel).await.unwrap();
        let second = h.service.create_job(new_job(), &cancel).await.unwrap();

        let jobs = h.service.list_jobs(&cancel).await.unwrap();
        assert_eq!(jobs.len(), 2);
        // Creation times can collide at clock resolution; both orders of
        // the pair are acceptable then, but both jobs must be present.
        let ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
    }

    #[tokio::test]
    async fn cancel_job_records_state_and_event() {
        let h = harness();
        let cancel = CancellationToken::new();
        let job = h.service.create_job(new_job(), &cancel).await.unwrap();

        let canceled = h.service.cancel_job(job.id, &cancel).await.unwrap();
        assert_eq!(canceled.final_status, Some(JobFinalStatus::Canceled));
        assert_matches!(
            canceled.stage(PipelineStage::DataIngestion).unwrap().state,
            StageState::Canceled { .. }
        );

        let events = h.outbox.list_after(0, 10, &cancel).await.unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.kind, JobEventKind::JobCanceled);
        assert_eq!(last.stage, Some(PipelineStage::DataIngestion));
        assert_eq!(last.status, Some(StageStatus::Canceled));
    }

    #[tokio::test]
    async fn cancel_job_twice_is_a_conflict() {
        let h = harness();
        let cancel = CancellationToken::new();
        let job = h.service.create_job(new_job(), &cancel).await.unwrap();

        h.service.cancel_job(job.id, &cancel).await.unwrap();
        let err = h.service.cancel_job(job.id, &cancel).await.unwrap_err();
        assert_matches!(err, EngineError::Core(CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancel_missing_job_is_not_found() {
        let h = harness();
        let cancel = CancellationToken::new();

        let err = h
            .service
            .cancel_job(Uuid::new_v4(), &cancel)
            .await
            .unwrap_err();
        assert_matches!(err, EngineError::Core(CoreError::NotFound { .. }));
    }
}
