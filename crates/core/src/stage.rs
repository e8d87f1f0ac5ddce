//! Pipeline stages and the per-stage state machine.
//!
//! [`StageState`] is a tagged union: each status variant carries exactly
//! the fields that are valid for it, so the presence rules (a start time
//! exists once a stage leaves Pending, a completion time exists once it
//! reaches a terminal state, an error message exists only on Failed) hold
//! by construction rather than by convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PipelineStage
// ---------------------------------------------------------------------------

/// One named step of the fixed processing pipeline.
///
/// The pipeline order is total and public: [`PipelineStage::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Raw data ingestion.
    DataIngestion,
    /// Input data validation.
    InputValidation,
    /// Blur processing.
    Blur,
    /// Mosaic processing.
    Mosaic,
    /// Output merging.
    OutputMerge,
    /// Output validation.
    OutputValidation,
    /// Distribution of the finished product.
    Distribution,
}

impl PipelineStage {
    /// The canonical pipeline order for all jobs. Never changes.
    pub const ORDER: [PipelineStage; 7] = [
        PipelineStage::DataIngestion,
        PipelineStage::InputValidation,
        PipelineStage::Blur,
        PipelineStage::Mosaic,
        PipelineStage::OutputMerge,
        PipelineStage::OutputValidation,
        PipelineStage::Distribution,
    ];

    /// Whether this stage is the last one in pipeline order.
    pub fn is_last(self) -> bool {
        self == *PipelineStage::ORDER.last().expect("pipeline order is non-empty")
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::DataIngestion => "DataIngestion",
            PipelineStage::InputValidation => "InputValidation",
            PipelineStage::Blur => "Blur",
            PipelineStage::Mosaic => "Mosaic",
            PipelineStage::OutputMerge => "OutputMerge",
            PipelineStage::OutputValidation => "OutputValidation",
            PipelineStage::Distribution => "Distribution",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

/// Flat execution status of a stage, used in events and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    /// Waiting to be processed.
    Pending,
    /// Currently in progress.
    Processing,
    /// Completed successfully.
    Success,
    /// Failed during processing.
    Failed,
    /// Canceled before completion.
    Canceled,
}

// ---------------------------------------------------------------------------
// StageState
// ---------------------------------------------------------------------------

/// Execution state of a stage, with status-specific payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum StageState {
    /// Waiting to be processed.
    Pending,
    /// In progress since `started_at`.
    Processing {
        /// When processing began.
        started_at: DateTime<Utc>,
    },
    /// Completed successfully.
    Success {
        /// When processing began.
        started_at: DateTime<Utc>,
        /// When processing finished.
        completed_at: DateTime<Utc>,
    },
    /// Failed during processing.
    Failed {
        /// When processing began.
        started_at: DateTime<Utc>,
        /// When the failure was recorded.
        completed_at: DateTime<Utc>,
        /// Diagnostics from the failing executor.
        error_message: String,
    },
    /// Canceled before completion.
    Canceled {
        /// When processing began (the cancel time if it never started).
        started_at: DateTime<Utc>,
        /// When the cancellation was recorded.
        completed_at: DateTime<Utc>,
    },
}

impl StageState {
    /// The flat status for this state.
    pub fn status(&self) -> StageStatus {
        match self {
            StageState::Pending => StageStatus::Pending,
            StageState::Processing { .. } => StageStatus::Processing,
            StageState::Success { .. } => StageStatus::Success,
            StageState::Failed { .. } => StageStatus::Failed,
            StageState::Canceled { .. } => StageStatus::Canceled,
        }
    }

    /// Start time, present for every non-Pending state.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            StageState::Pending => None,
            StageState::Processing { started_at }
            | StageState::Success { started_at, .. }
            | StageState::Failed { started_at, .. }
            | StageState::Canceled { started_at, .. } => Some(*started_at),
        }
    }

    /// Completion time, present for every terminal state.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            StageState::Pending | StageState::Processing { .. } => None,
            StageState::Success { completed_at, .. }
            | StageState::Failed { completed_at, .. }
            | StageState::Canceled { completed_at, .. } => Some(*completed_at),
        }
    }

    /// Error message, present only on Failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            StageState::Failed { error_message, .. } => Some(error_message),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StageRecord
// ---------------------------------------------------------------------------

/// Execution record of a single pipeline stage within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// The pipeline stage this record describes.
    pub stage: PipelineStage,
    /// Current execution state.
    pub state: StageState,
}

impl StageRecord {
    /// Create a fresh Pending record for `stage`.
    pub fn pending(stage: PipelineStage) -> Self {
        Self {
            stage,
            state: StageState::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
