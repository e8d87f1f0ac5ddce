//! The worker loop: dequeue a job id, process it, repeat.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use satpipe_store::JobQueue;

use crate::orchestrator::PipelineOrchestrator;

/// Delay before retrying after a failed dequeue, so a persistently
/// broken queue backend does not spin the loop hot.
const DEQUEUE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// One consumer of the job queue.
///
/// A deployment runs several of these loops (in one or many processes);
/// each job id is delivered to exactly one of them.
pub struct JobWorker {
    id: usize,
    queue: Arc<dyn JobQueue>,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl JobWorker {
    /// Create a worker with a numeric id used only for log correlation.
    pub fn new(id: usize, queue: Arc<dyn JobQueue>, orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self {
            id,
            queue,
            orchestrator,
        }
    }

    /// Run until `cancel` fires.
    ///
    /// A failed job turn does not stop the loop; the error is logged and
    /// the worker moves on to the next queued id. Job state stays
    /// consistent because the orchestrator persists before every event,
    /// so an aborted turn is resumed by whoever dequeues the id next.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(worker = self.id, "Worker started");

        loop {
            let job_id = match self.queue.dequeue(&cancel).await {
                Ok(job_id) => job_id,
                Err(err) if cancel.is_cancelled() => {
                    tracing::debug!(worker = self.id, error = %err, "Worker dequeue canceled");
                    break;
                }
                Err(err) => {
                    tracing::error!(worker = self.id, error = %err, "Dequeue failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(DEQUEUE_RETRY_DELAY) => {}
                    }
                    continue;
                }
            };

            tracing::info!(worker = self.id, job_id = %job_id, "Picked up job");
            match self.orchestrator.process(job_id, &cancel).await {
                Ok(()) => {}
                Err(err) if err.is_canceled() => {
                    tracing::info!(worker = self.id, job_id = %job_id, "Job turn canceled");
                    break;
                }
                Err(err) => {
                    tracing::error!(
                        worker = self.id,
                        job_id = %job_id,
                        error = %err,
                        "Job processing failed"
                    );
                }
            }
        }

        tracing::info!(worker = self.id, "Worker stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
