//! Engine-layer error type.

use satpipe_core::CoreError;
use satpipe_store::StoreError;

/// Errors produced while driving the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error from the job aggregate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage-layer error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation was canceled cooperatively.
    #[error("Operation canceled")]
    Canceled,

    /// A stage executor defect that is not a stage-level failure
    /// (executors report failures via
    /// [`StageResult::Failure`](crate::executor::StageResult)).
    #[error("Executor error: {0}")]
    Executor(String),
}

impl EngineError {
    /// Whether this error is a cancellation, regardless of which layer
    /// observed it. Cancellations propagate; everything else the
    /// orchestrator captures as a stage failure.
    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            EngineError::Canceled | EngineError::Store(StoreError::Canceled)
        )
    }
}
