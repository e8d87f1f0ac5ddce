use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use satpipe_engine::JobService;
use satpipe_store::EventOutbox;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Producer-side job operations.
    pub service: Arc<JobService>,
    /// Event outbox, polled by the events endpoint.
    pub outbox: Arc<dyn EventOutbox>,
    /// Server-lifetime cancellation token, fired on shutdown so storage
    /// lock waits held by in-flight requests unwind promptly.
    pub cancel: CancellationToken,
}
