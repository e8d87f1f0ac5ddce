use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use satpipe_core::CoreError;
use satpipe_engine::EngineError;
use satpipe_store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`EngineError`] for domain and storage errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain or storage error from the engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Engine(engine) => classify_engine_error(engine),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an engine error into an HTTP status, error code, and message.
fn classify_engine_error(err: &EngineError) -> (StatusCode, &'static str, String) {
    match err {
        // --- CoreError variants ---
        EngineError::Core(core) => match core {
            CoreError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            ),
            CoreError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            CoreError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal core error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        },

        // --- Storage errors ---
        EngineError::Store(StoreError::AlreadyExists(id)) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            format!("Job {id} already exists"),
        ),
        EngineError::Store(StoreError::Canceled) | EngineError::Canceled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SHUTTING_DOWN",
            "The service is shutting down".to_string(),
        ),
        EngineError::Store(store) => {
            tracing::error!(error = %store, "Storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }

        EngineError::Executor(msg) => {
            tracing::error!(error = %msg, "Executor error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
