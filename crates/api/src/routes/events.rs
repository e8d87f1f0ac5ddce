//! Routes and handlers for the `/events` resource: the monitor poll.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Largest page a single poll may request.
const MAX_PAGE_SIZE: i64 = 500;

/// Page size used when the caller does not specify one.
const DEFAULT_PAGE_SIZE: i64 = 200;

/// Query parameters for event polling.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Return events with sequence strictly greater than this
    /// (default 0, i.e. everything retained).
    pub after_sequence: Option<i64>,
    /// Maximum number of events to return (default 200, max 500).
    pub max_count: Option<i64>,
}

/// GET /api/events?after_sequence=N&max_count=M
///
/// Incremental poll: everything after sequence N, oldest first. Out of
/// range parameters are floored and clamped rather than rejected.
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> AppResult<impl IntoResponse> {
    let after_sequence = query.after_sequence.unwrap_or(0).max(0) as u64;
    let max_count = query
        .max_count
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE) as usize;

    let events = state
        .outbox
        .list_after(after_sequence, max_count, &state.cancel)
        .await
        .map_err(satpipe_engine::EngineError::from)?;
    Ok(Json(events))
}

/// Routes mounted at `/events`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_events))
}
