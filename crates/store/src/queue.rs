//! Job queue: hands job ids from producers to the worker pool.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StoreError;
use crate::file_store::JsonFileStore;

/// File name of the durable queue document inside the data directory.
const QUEUE_FILE: &str = "queue.json";

/// Smallest allowed dequeue polling interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// JobQueue trait
// ---------------------------------------------------------------------------

/// FIFO hand-off of job ids from producers to workers.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job id for processing.
    async fn enqueue(&self, job_id: Uuid, cancel: &CancellationToken) -> Result<(), StoreError>;

    /// Take the next job id, suspending until one is available or
    /// `cancel` fires ([`StoreError::Canceled`]).
    async fn dequeue(&self, cancel: &CancellationToken) -> Result<Uuid, StoreError>;
}

// ---------------------------------------------------------------------------
// InMemoryJobQueue
// ---------------------------------------------------------------------------

/// Process-local queue backed by an unbounded channel.
pub struct InMemoryJobQueue {
    sender: mpsc::UnboundedSender<Uuid>,
    receiver: Mutex<mpsc::UnboundedReceiver<Uuid>>,
}

impl InMemoryJobQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job_id: Uuid, _cancel: &CancellationToken) -> Result<(), StoreError> {
        // The receiver half lives as long as self, so send cannot fail.
        self.sender
            .send(job_id)
            .map_err(|_| StoreError::Canceled)?;
        Ok(())
    }

    async fn dequeue(&self, cancel: &CancellationToken) -> Result<Uuid, StoreError> {
        // The select covers the receiver-mutex wait as well, so a worker
        // parked behind another consumer still observes cancellation.
        tokio::select! {
            _ = cancel.cancelled() => Err(StoreError::Canceled),
            item = async { self.receiver.lock().await.recv().await } => {
                item.ok_or(StoreError::Canceled)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FileJobQueue
// ---------------------------------------------------------------------------

/// Persisted payload of the queue document: job ids in FIFO order.
#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueDocument {
    items: Vec<Uuid>,
}

/// File-backed queue shared by all processes on the host.
///
/// The backing medium has no cross-process wake-up, so `dequeue` polls
/// the shared document at a configurable interval instead of blocking
/// natively — an accepted latency trade-off, not a correctness defect.
pub struct FileJobQueue {
    store: JsonFileStore<QueueDocument>,
    poll_interval: Duration,
}

impl FileJobQueue {
    /// Create a queue backed by `{data_dir}/queue.json`.
    ///
    /// `poll_interval` is floored at 50 ms.
    pub fn new(data_dir: &Path, poll_interval: Duration) -> Self {
        Self {
            store: JsonFileStore::new("queue", data_dir.join(QUEUE_FILE)),
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }
}

#[async_trait]
impl JobQueue for FileJobQueue {
    async fn enqueue(&self, job_id: Uuid, cancel: &CancellationToken) -> Result<(), StoreError> {
        self.store
            .transact(cancel, move |doc| {
                doc.items.push(job_id);
                Ok(())
            })
            .await
    }

    async fn dequeue(&self, cancel: &CancellationToken) -> Result<Uuid, StoreError> {
        loop {
            let taken = self
                .store
                .transact(cancel, |doc| {
                    if doc.items.is_empty() {
                        Ok(None)
                    } else {
                        Ok(Some(doc.items.remove(0)))
                    }
                })
                .await?;

            if let Some(job_id) = taken {
                return Ok(job_id);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(StoreError::Canceled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn in_memory_queue_is_fifo() {
        let queue = InMemoryJobQueue::new();
        let cancel = CancellationToken::new();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        queue.enqueue(first, &cancel).await.unwrap();
        queue.enqueue(second, &cancel).await.unwrap();

        assert_eq!(queue.dequeue(&cancel).await.unwrap(), first);
        assert_eq!(queue.dequeue(&cancel).await.unwrap(), second);
    }

    #[tokio::test]
    async fn in_memory_dequeue_observes_cancellation() {
        let queue = InMemoryJobQueue::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = queue.dequeue(&cancel).await.unwrap_err();
        assert_matches!(err, StoreError::Canceled);
    }

    #[tokio::test]
    async fn file_queue_is_fifo_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let producer = FileJobQueue::new(dir.path(), Duration::from_millis(50));
        producer.enqueue(first, &cancel).await.unwrap();
        producer.enqueue(second, &cancel).await.unwrap();

        // A separate handle (as another process would hold) drains in order.
        let consumer = FileJobQueue::new(dir.path(), Duration::from_millis(50));
        assert_eq!(consumer.dequeue(&cancel).await.unwrap(), first);
        assert_eq!(consumer.dequeue(&cancel).await.unwrap(), second);
    }

    #[tokio::test]
    async fn file_dequeue_waits_for_a_producer() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let job_id = Uuid::new_v4();

        let consumer = FileJobQueue::new(dir.path(), Duration::from_millis(50));
        let waiter = tokio::spawn({
            let cancel = cancel.clone();
            async move { consumer.dequeue(&cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!waiter.is_finished());

        let producer = FileJobQueue::new(dir.path(), Duration::from_millis(50));
        producer.enqueue(job_id, &cancel).await.unwrap();

        let taken = waiter.await.unwrap().unwrap();
        assert_eq!(taken, job_id);
    }

    #[tokio::test]
    async fn file_dequeue_observes_cancellation_while_polling() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();

        let queue = FileJobQueue::new(dir.path(), Duration::from_millis(50));
        let waiter = tokio::spawn({
            let cancel = cancel.clone();
            async move { queue.dequeue(&cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        cancel.cancel();

        let result = waiter.await.unwrap();
        assert_matches!(result, Err(StoreError::Canceled));
    }
}
