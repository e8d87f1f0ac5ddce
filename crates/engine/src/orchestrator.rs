//! The pipeline orchestrator: walks one job through the fixed stage
//! order, driving the stage executor and recording every transition.
//!
//! Persistence happens before the matching event is appended, so a crash
//! between the two leaves the job state authoritative and the outbox
//! merely behind — pollers miss an event, they never see one for state
//! that was not persisted.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use satpipe_core::{EventDraft, JobEventKind, PipelineStage, StageStatus};
use satpipe_store::{EventOutbox, JobStore};

use crate::error::EngineError;
use crate::executor::{StageContext, StageExecutor, StageResult};

/// Drives jobs through the pipeline, one at a time per call.
///
/// The stage loop is strictly sequential; concurrency comes from running
/// multiple orchestrator calls for *different* jobs on distinct workers.
pub struct PipelineOrchestrator {
    jobs: Arc<dyn JobStore>,
    outbox: Arc<dyn EventOutbox>,
    executor: Arc<dyn StageExecutor>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator over the given store, outbox, and executor.
    pub fn new(
        jobs: Arc<dyn JobStore>,
        outbox: Arc<dyn EventOutbox>,
        executor: Arc<dyn StageExecutor>,
    ) -> Self {
        Self {
            jobs,
            outbox,
            executor,
        }
    }

    /// Process the job with the given id until it finishes or fails.
    ///
    /// A missing job is a no-op. Stages already marked Success are
    /// skipped, so re-invoking after a crash resumes at the first
    /// incomplete stage without re-executing finished work. The only
    /// error that propagates out of a turn is a cancellation; executor
    /// defects become stage failures.
    pub async fn process(
        &self,
        job_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let Some(mut job) = self.jobs.get(job_id, cancel).await? else {
            tracing::debug!(job_id = %job_id, "Job not found, nothing to process");
            return Ok(());
        };

        for stage in PipelineStage::ORDER {
            if job.final_status.is_some() {
                break;
            }

            let record = job.stage(stage)?;
            if record.state.status() == StageStatus::Success {
                continue;
            }

            // Reuse a start time persisted by an interrupted earlier run
            // rather than overwriting it.
            let started_at = record.state.started_at().unwrap_or_else(Utc::now);
            job.start_stage(stage, started_at)?;
            self.jobs.update(&job, cancel).await?;
            self.outbox
                .append(
                    EventDraft::new(JobEventKind::StageStarted, job.id, started_at)
                        .with_stage(stage)
                        .with_status(StageStatus::Processing)
                        .with_message(format!("Stage {stage} started.")),
                    cancel,
                )
                .await?;
            tracing::info!(job_id = %job.id, stage = %stage, "Stage started");

            let context = StageContext {
                job_id: job.id,
                stage,
                satellite_name: job.satellite_name.clone(),
                raw_data_name: job.raw_data_name.clone(),
                raw_data_size_bytes: job.raw_data_size_bytes,
            };

            let result = match self.executor.execute(&context, cancel).await {
                Ok(result) => result,
                Err(err) if err.is_canceled() => return Err(EngineError::Canceled),
                // Executor defects never crash the worker; they fail the
                // stage with the error's message.
                Err(err) => StageResult::failure(err.to_string()),
            };

            match result {
                StageResult::Success { message } => {
                    let completed_at = Utc::now();
                    job.complete_stage(stage, completed_at)?;
                    self.jobs.update(&job, cancel).await?;

                    let mut draft =
                        EventDraft::new(JobEventKind::StageCompleted, job.id, completed_at)
                            .with_stage(stage)
                            .with_status(StageStatus::Success);
                    if let Some(message) = message {
                        draft = draft.with_message(message);
                    }
                    self.outbox.append(draft, cancel).await?;
                    tracing::info!(job_id = %job.id, stage = %stage, "Stage completed");

                    if job.final_status.is_some() {
                        self.outbox
                            .append(
                                EventDraft::new(JobEventKind::JobCompleted, job.id, completed_at)
                                    .with_message("Job completed successfully."),
                                cancel,
                            )
                            .await?;
                        tracing::info!(job_id = %job.id, "Job completed");
                    }
                }
                StageResult::Failure { message } => {
                    let completed_at = Utc::now();
                    job.fail_stage(stage, completed_at, message.clone())?;
                    self.jobs.update(&job, cancel).await?;

                    self.outbox
                        .append(
                            EventDraft::new(JobEventKind::StageFailed, job.id, completed_at)
                                .with_stage(stage)
                                .with_status(StageStatus::Failed)
                                .with_message(message.clone()),
                            cancel,
                        )
                        .await?;
                    self.outbox
                        .append(
                            EventDraft::new(JobEventKind::JobFailed, job.id, completed_at)
                                .with_message("Job failed."),
                            cancel,
                        )
                        .await?;
                    tracing::warn!(
                        job_id = %job.id,
                        stage = %stage,
                        error = %message,
                        "Stage failed, job terminated"
                    );
                    break;
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
