//! Monitoring events emitted while jobs move through the pipeline.
//!
//! Events are appended to an outbox with a strictly increasing sequence
//! number and polled by external monitors ("give me everything after
//! sequence N"). An event is immutable once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stage::{PipelineStage, StageStatus};

// ---------------------------------------------------------------------------
// JobEventKind
// ---------------------------------------------------------------------------

/// Classification of a job event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEventKind {
    /// Job was created and queued.
    JobCreated,
    /// A pipeline stage started.
    StageStarted,
    /// A pipeline stage completed successfully.
    StageCompleted,
    /// A pipeline stage failed.
    StageFailed,
    /// Job completed successfully.
    JobCompleted,
    /// Job failed and will not continue.
    JobFailed,
    /// Job was canceled.
    JobCanceled,
}

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// One event in the outbox, as observed by pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Monotonic 1-based sequence number, unique across all jobs.
    pub sequence: u64,
    /// Unique event identifier.
    pub event_id: Uuid,
    /// The job this event belongs to.
    pub job_id: Uuid,
    /// The stage this event relates to, if any.
    pub stage: Option<PipelineStage>,
    /// The stage status this event relates to, if any.
    pub status: Option<StageStatus>,
    /// Event classification.
    pub kind: JobEventKind,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Optional detail message.
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// EventDraft
// ---------------------------------------------------------------------------

/// Everything of an event except what only the outbox can assign.
///
/// The outbox stamps the sequence number and a fresh event id at append
/// time; producers build the rest with this draft.
///
/// ```rust
/// use chrono::Utc;
/// use satpipe_core::{EventDraft, JobEventKind, PipelineStage, StageStatus};
///
/// let draft = EventDraft::new(JobEventKind::StageStarted, uuid::Uuid::new_v4(), Utc::now())
///     .with_stage(PipelineStage::Blur)
///     .with_status(StageStatus::Processing)
///     .with_message("Stage Blur started.");
/// ```
#[derive(Debug, Clone)]
pub struct EventDraft {
    /// Event classification.
    pub kind: JobEventKind,
    /// The job this event belongs to.
    pub job_id: Uuid,
    /// The stage this event relates to, if any.
    pub stage: Option<PipelineStage>,
    /// The stage status this event relates to, if any.
    pub status: Option<StageStatus>,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Optional detail message.
    pub message: Option<String>,
}

impl EventDraft {
    /// Create a draft with only the required fields.
    pub fn new(kind: JobEventKind, job_id: Uuid, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            job_id,
            stage: None,
            status: None,
            occurred_at,
            message: None,
        }
    }

    /// Attach the related pipeline stage.
    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attach the related stage status.
    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a detail message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Seal the draft into a [`JobEvent`] with an outbox-assigned sequence.
    pub fn into_event(self, sequence: u64) -> JobEvent {
        JobEvent {
            sequence,
            event_id: Uuid::new_v4(),
            job_id: self.job_id,
            stage: self.stage,
            status: self.status,
            kind: self.kind,
            occurred_at: self.occurred_at,
            message: self.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_draft_has_empty_optional_fields() {
        let job_id = Uuid::new_v4();
        let draft = EventDraft::new(JobEventKind::JobCreated, job_id, Utc::now());
        assert!(draft.stage.is_none());
        assert!(draft.status.is_none());
        assert!(draft.message.is_none());
        assert_eq!(draft.job_id, job_id);
    }

    #[test]
    fn into_event_stamps_sequence_and_fresh_id() {
        let draft = EventDraft::new(JobEventKind::StageStarted, Uuid::new_v4(), Utc::now())
            .with_stage(PipelineStage::Blur)
            .with_status(StageStatus::Processing)
            .with_message("Stage Blur started.");

        let a = draft.clone().into_event(7);
        let b = draft.into_event(8);

        assert_eq!(a.sequence, 7);
        assert_eq!(b.sequence, 8);
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.stage, Some(PipelineStage::Blur));
        assert_eq!(a.status, Some(StageStatus::Processing));
        assert_eq!(a.message.as_deref(), Some("Stage Blur started."));
    }

    #[test]
    fn event_serde_round_trips() {
        let event = EventDraft::new(JobEventKind::StageFailed, Uuid::new_v4(), Utc::now())
            .with_stage(PipelineStage::Mosaic)
            .with_status(StageStatus::Failed)
            .with_message("tile overlap mismatch")
            .into_event(42);

        let json = serde_json::to_string(&event).expect("serialize");
        let back: JobEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }
}
