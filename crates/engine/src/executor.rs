//! The stage executor contract.
//!
//! The executor is the external collaborator that performs the actual
//! work of one stage. The engine only sees this contract: an executor
//! must be safely re-invocable per stage and must never mutate job or
//! stage records — all mutation is the orchestrator's responsibility.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use satpipe_core::PipelineStage;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// StageContext
// ---------------------------------------------------------------------------

/// Metadata handed to an executor for one stage invocation.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// The job being processed.
    pub job_id: Uuid,
    /// The stage to execute.
    pub stage: PipelineStage,
    /// Satellite source name.
    pub satellite_name: String,
    /// Raw data display name.
    pub raw_data_name: String,
    /// Raw data size in bytes.
    pub raw_data_size_bytes: i64,
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Outcome of one executor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// The stage completed, with an optional detail message.
    Success {
        /// Optional detail message, carried into the StageCompleted event.
        message: Option<String>,
    },
    /// The stage failed, with a required message.
    Failure {
        /// Diagnostics, carried into the StageFailed event and the
        /// stage record.
        message: String,
    },
}

impl StageResult {
    /// A success with a message.
    pub fn success(message: impl Into<String>) -> Self {
        StageResult::Success {
            message: Some(message.into()),
        }
    }

    /// A failure with the required message.
    pub fn failure(message: impl Into<String>) -> Self {
        StageResult::Failure {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StageExecutor trait
// ---------------------------------------------------------------------------

/// Executes the domain work of a single pipeline stage.
///
/// Returning [`EngineError::Canceled`] propagates out of the whole job
/// turn; any other error is captured by the orchestrator and recorded as
/// a stage failure with the error's message.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Perform the work for `context`.
    async fn execute(
        &self,
        context: &StageContext,
        cancel: &CancellationToken,
    ) -> Result<StageResult, EngineError>;
}
