//! Routes and handlers for the `/jobs` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use satpipe_engine::NewJob;

use crate::error::AppResult;
use crate::state::AppState;

/// Request body for creating a job.
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    /// Satellite source name.
    pub satellite_name: String,
    /// Raw data display name.
    pub raw_data_name: String,
    /// Raw data size in bytes.
    pub raw_data_size_bytes: i64,
}

/// POST /api/jobs
///
/// Creates a job, records its creation event, and queues it for a worker.
/// Returns 201 with the full job aggregate.
async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .service
        .create_job(
            NewJob {
                satellite_name: body.satellite_name,
                raw_data_name: body.raw_data_name,
                raw_data_size_bytes: body.raw_data_size_bytes,
            },
            &state.cancel,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs
///
/// All jobs, newest first.
async fn list_jobs(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let jobs = state.service.list_jobs(&state.cancel).await?;
    Ok(Json(jobs))
}

/// GET /api/jobs/{id}
///
/// One job by id; 404 when missing.
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = state.service.get_job(id, &state.cancel).await?;
    Ok(Json(job))
}

/// POST /api/jobs/{id}/cancel
///
/// Operator cancellation; 404 when missing, 409 when already finished.
async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = state.service.cancel_job(id, &state.cancel).await?;
    Ok(Json(job))
}

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /                -> list_jobs
/// POST   /                -> create_job
/// GET    /{id}            -> get_job
/// POST   /{id}/cancel     -> cancel_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/{id}", get(get_job))
        .route("/{id}/cancel", post(cancel_job))
}
