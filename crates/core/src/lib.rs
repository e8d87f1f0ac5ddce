//! Domain model for the satellite processing pipeline.
//!
//! Pure types and state transitions only — persistence and event emission
//! are the responsibility of the store and engine crates. The aggregate
//! root is [`job::Job`], which owns one [`stage::StageRecord`] per
//! pipeline stage and enforces the legal transition rules.

pub mod error;
pub mod event;
pub mod job;
pub mod stage;

pub use error::CoreError;
pub use event::{EventDraft, JobEvent, JobEventKind};
pub use job::{Job, JobFinalStatus};
pub use stage::{PipelineStage, StageRecord, StageState, StageStatus};
