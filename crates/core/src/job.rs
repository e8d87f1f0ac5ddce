//! The job aggregate and its stage state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::stage::{PipelineStage, StageRecord, StageState, StageStatus};

// ---------------------------------------------------------------------------
// JobFinalStatus
// ---------------------------------------------------------------------------

/// Overall final result of a job. Write-once: transitions are rejected
/// after any of these is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobFinalStatus {
    /// All stages completed successfully.
    Success,
    /// A stage failed; the pipeline halted there.
    Failed,
    /// An operator canceled the job.
    Canceled,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One satellite processing job and its pipeline state.
///
/// Owns exactly one [`StageRecord`] per stage of
/// [`PipelineStage::ORDER`], in that order. All transitions are pure:
/// persistence and event emission are the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Satellite source name or identifier.
    pub satellite_name: String,
    /// Raw data display name.
    pub raw_data_name: String,
    /// Approximate raw data size in bytes.
    pub raw_data_size_bytes: i64,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// The stage currently pointed at by the pipeline.
    pub current_stage: PipelineStage,
    /// Final status once the pipeline completed or terminated.
    pub final_status: Option<JobFinalStatus>,
    /// Completion time of the overall job.
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-stage execution records in canonical pipeline order.
    pub stages: Vec<StageRecord>,
}

impl Job {
    /// Create a new job with every stage Pending.
    pub fn new(
        id: Uuid,
        satellite_name: impl Into<String>,
        raw_data_name: impl Into<String>,
        raw_data_size_bytes: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            satellite_name: satellite_name.into(),
            raw_data_name: raw_data_name.into(),
            raw_data_size_bytes,
            created_at,
            current_stage: PipelineStage::ORDER[0],
            final_status: None,
            completed_at: None,
            stages: PipelineStage::ORDER
                .into_iter()
                .map(StageRecord::pending)
                .collect(),
        }
    }

    /// Look up the record for `stage`.
    ///
    /// With the closed stage enum and fixed stage list this can only miss
    /// if the aggregate was constructed incorrectly, which is a defect —
    /// surfaced as NotFound rather than a panic.
    pub fn stage(&self, stage: PipelineStage) -> Result<&StageRecord, CoreError> {
        self.stages
            .iter()
            .find(|record| record.stage == stage)
            .ok_or(CoreError::NotFound {
                entity: "stage",
                id: stage.to_string(),
            })
    }

    fn stage_mut(&mut self, stage: PipelineStage) -> Result<&mut StageRecord, CoreError> {
        self.stages
            .iter_mut()
            .find(|record| record.stage == stage)
            .ok_or(CoreError::NotFound {
                entity: "stage",
                id: stage.to_string(),
            })
    }

    fn ensure_not_finished(&self) -> Result<(), CoreError> {
        if let Some(status) = self.final_status {
            return Err(CoreError::Conflict(format!(
                "Job {} already finished with status {status:?}",
                self.id
            )));
        }
        Ok(())
    }

    /// Mark `stage` as Processing and advance the current-stage pointer.
    ///
    /// Clears any previously recorded completion time or error for the
    /// stage. The caller picks `started_at`; when resuming a stage that
    /// was already Processing it should pass the recorded start time back
    /// in rather than the current clock.
    pub fn start_stage(
        &mut self,
        stage: PipelineStage,
        started_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.ensure_not_finished()?;
        self.stage_mut(stage)?.state = StageState::Processing { started_at };
        self.current_stage = stage;
        Ok(())
    }

    /// Mark a Processing stage as Success.
    ///
    /// If `stage` is the last stage in pipeline order, the job's final
    /// status and completion time are set atomically with the stage
    /// transition.
    pub fn complete_stage(
        &mut self,
        stage: PipelineStage,
        completed_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.ensure_not_finished()?;
        let record = self.stage_mut(stage)?;
        let started_at = match record.state {
            StageState::Processing { started_at } => started_at,
            ref other => {
                return Err(CoreError::Validation(format!(
                    "Stage {stage} cannot complete from status {:?}",
                    other.status()
                )))
            }
        };
        record.state = StageState::Success {
            started_at,
            completed_at,
        };

        if stage.is_last() {
            self.final_status = Some(JobFinalStatus::Success);
            self.completed_at = Some(completed_at);
        }
        Ok(())
    }

    /// Mark a Processing stage as Failed and terminate the job.
    ///
    /// The job's final status becomes Failed regardless of which stage
    /// failed; no later stage will ever be touched.
    pub fn fail_stage(
        &mut self,
        stage: PipelineStage,
        completed_at: DateTime<Utc>,
        error_message: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.ensure_not_finished()?;
        let record = self.stage_mut(stage)?;
        let started_at = match record.state {
            StageState::Processing { started_at } => started_at,
            ref other => {
                return Err(CoreError::Validation(format!(
                    "Stage {stage} cannot fail from status {:?}",
                    other.status()
                )))
            }
        };
        record.state = StageState::Failed {
            started_at,
            completed_at,
            error_message: error_message.into(),
        };
        self.final_status = Some(JobFinalStatus::Failed);
        self.completed_at = Some(completed_at);
        Ok(())
    }

    /// Cancel the job, marking the current stage as Canceled.
    ///
    /// A current stage that never started records the cancel time as its
    /// start time so that every non-Pending state carries one.
    pub fn cancel(&mut self, completed_at: DateTime<Utc>) -> Result<(), CoreError> {
        self.ensure_not_finished()?;
        let stage = self.current_stage;
        let record = self.stage_mut(stage)?;
        let started_at = record.state.started_at().unwrap_or(completed_at);
        record.state = StageState::Canceled {
            started_at,
            completed_at,
        };
        self.final_status = Some(JobFinalStatus::Canceled);
        self.completed_at = Some(completed_at);
        Ok(())
    }

    /// Flat status of `stage`, for callers that do not need the payload.
    pub fn stage_status(&self, stage: PipelineStage) -> Result<StageStatus, CoreError> {
        Ok(self.stage(stage)?.state.status())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
