//! Append-only event outbox with monotonic sequencing.
//!
//! `append` assigns the next sequence number atomically with respect to
//! every other append — for the file-backed variant the counter lives in
//! the persisted document and is incremented inside the same transaction
//! as the append, so sequences are gap-free and never reused even across
//! process restarts. Events are immutable; the only removal is a FIFO
//! trim from the oldest end when a retention cap is exceeded, and
//! trimmed sequence numbers are never reassigned.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use satpipe_core::{EventDraft, JobEvent};

use crate::error::StoreError;
use crate::file_store::JsonFileStore;

/// File name of the durable event document inside the data directory.
const EVENTS_FILE: &str = "events.json";

// ---------------------------------------------------------------------------
// EventOutbox trait
// ---------------------------------------------------------------------------

/// Append-only, sequence-numbered event log polled by external monitors.
#[async_trait]
pub trait EventOutbox: Send + Sync {
    /// Append a new event, assigning it the next sequence number.
    async fn append(
        &self,
        draft: EventDraft,
        cancel: &CancellationToken,
    ) -> Result<JobEvent, StoreError>;

    /// Events with sequence strictly greater than `after_sequence`,
    /// ascending, at most `max_count`. Read-only: never advances the
    /// counter. Pollers must tolerate sequence gaps caused by retention
    /// trimming.
    async fn list_after(
        &self,
        after_sequence: u64,
        max_count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobEvent>, StoreError>;
}

// ---------------------------------------------------------------------------
// InMemoryEventOutbox
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct OutboxState {
    next_sequence: u64,
    events: Vec<JobEvent>,
}

/// Process-local outbox for single-process deployments and tests.
pub struct InMemoryEventOutbox {
    state: Mutex<OutboxState>,
}

impl InMemoryEventOutbox {
    /// Create an empty outbox with the sequence counter at 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OutboxState {
                next_sequence: 1,
                events: Vec::new(),
            }),
        }
    }
}

impl Default for InMemoryEventOutbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventOutbox for InMemoryEventOutbox {
    async fn append(
        &self,
        draft: EventDraft,
        _cancel: &CancellationToken,
    ) -> Result<JobEvent, StoreError> {
        let mut state = self.state.lock().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let event = draft.into_event(sequence);
        state.events.push(event.clone());
        Ok(event)
    }

    async fn list_after(
        &self,
        after_sequence: u64,
        max_count: usize,
        _cancel: &CancellationToken,
    ) -> Result<Vec<JobEvent>, StoreError> {
        let state = self.state.lock().await;
        Ok(collect_after(&state.events, after_sequence, max_count))
    }
}

// ---------------------------------------------------------------------------
// JsonEventOutbox
// ---------------------------------------------------------------------------

/// Persisted payload of the event document.
#[derive(Debug, Serialize, Deserialize)]
struct EventDocument {
    next_sequence: u64,
    events: Vec<JobEvent>,
}

impl Default for EventDocument {
    fn default() -> Self {
        Self {
            next_sequence: 1,
            events: Vec::new(),
        }
    }
}

/// File-backed outbox shared by all processes on the host.
pub struct JsonEventOutbox {
    store: JsonFileStore<EventDocument>,
    max_event_count: usize,
}

impl JsonEventOutbox {
    /// Create an outbox backed by `{data_dir}/events.json`.
    ///
    /// A `max_event_count` of zero disables retention trimming.
    pub fn new(data_dir: &Path, max_event_count: usize) -> Self {
        Self {
            store: JsonFileStore::new("events", data_dir.join(EVENTS_FILE)),
            max_event_count,
        }
    }
}

#[async_trait]
impl EventOutbox for JsonEventOutbox {
    async fn append(
        &self,
        draft: EventDraft,
        cancel: &CancellationToken,
    ) -> Result<JobEvent, StoreError> {
        let max_event_count = self.max_event_count;
        self.store
            .transact(cancel, move |doc| {
                let sequence = doc.next_sequence;
                doc.next_sequence += 1;

                let event = draft.into_event(sequence);
                doc.events.push(event.clone());

                // Evict oldest-first once the cap is exceeded. The new
                // event keeps its already-assigned sequence number.
                if max_event_count > 0 && doc.events.len() > max_event_count {
                    let overflow = doc.events.len() - max_event_count;
                    doc.events.drain(..overflow);
                }

                Ok(event)
            })
            .await
    }

    async fn list_after(
        &self,
        after_sequence: u64,
        max_count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobEvent>, StoreError> {
        let doc = self.store.load(cancel).await?;
        Ok(collect_after(&doc.events, after_sequence, max_count))
    }
}

/// Shared `list_after` semantics over an already-ordered event slice.
fn collect_after(events: &[JobEvent], after_sequence: u64, max_count: usize) -> Vec<JobEvent> {
    events
        .iter()
        .filter(|event| event.sequence > after_sequence)
        .take(max_count)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use satpipe_core::JobEventKind;
    use uuid::Uuid;

    use super::*;

    fn draft() -> EventDraft {
        EventDraft::new(JobEventKind::JobCreated, Uuid::new_v4(), Utc::now())
    }

    async fn append_n(outbox: &dyn EventOutbox, n: usize) -> Vec<u64> {
        let cancel = CancellationToken::new();
        let mut sequences = Vec::new();
        for _ in 0..n {
            let event = outbox.append(draft(), &cancel).await.unwrap();
            sequences.push(event.sequence);
        }
        sequences
    }

    #[tokio::test]
    async fn in_memory_sequences_start_at_one_and_increase() {
        let outbox = InMemoryEventOutbox::new();
        let sequences = append_n(&outbox, 5).await;
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn list_after_returns_strictly_greater_ascending() {
        let outbox = InMemoryEventOutbox::new();
        append_n(&outbox, 6).await;
        let cancel = CancellationToken::new();

        let events = outbox.list_after(2, 3, &cancel).await.unwrap();
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);

        // N = 0 yields everything.
        let all = outbox.list_after(0, 100, &cancel).await.unwrap();
        assert_eq!(all.len(), 6);

        // N beyond the current maximum yields nothing.
        let none = outbox.list_after(99, 100, &cancel).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn json_sequences_survive_process_restart() {
        let dir = tempfile::tempdir().unwrap();

        let first = {
            let outbox = JsonEventOutbox::new(dir.path(), 0);
            append_n(&outbox, 3).await
        };
        assert_eq!(first, vec![1, 2, 3]);

        // A fresh handle (simulated restart) continues the counter with
        // no gaps or reuse.
        let outbox = JsonEventOutbox::new(dir.path(), 0);
        let second = append_n(&outbox, 2).await;
        assert_eq!(second, vec![4, 5]);
    }

    #[tokio::test]
    async fn json_retention_trims_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = JsonEventOutbox::new(dir.path(), 3);
        let cancel = CancellationToken::new();

        append_n(&outbox, 5).await;

        let events = outbox.list_after(0, 100, &cancel).await.unwrap();
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        // Oldest two evicted; their sequences are gone, not reassigned.
        assert_eq!(sequences, vec![3, 4, 5]);

        // Appends after trimming keep counting upward.
        let next = outbox.append(draft(), &cancel).await.unwrap();
        assert_eq!(next.sequence, 6);
    }

    #[tokio::test]
    async fn concurrent_appends_never_repeat_a_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let outbox = JsonEventOutbox::new(dir.path(), 0);
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                let mut sequences = Vec::new();
                for _ in 0..5 {
                    let event = outbox.append(draft(), &cancel).await.unwrap();
                    sequences.push(event.sequence);
                }
                sequences
            }));
        }

        let mut all: Vec<u64> = Vec::new();
        for task in tasks {
            all.extend(task.await.unwrap());
        }

        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 20);
        assert_eq!(*all.last().unwrap(), 20);
    }
}
