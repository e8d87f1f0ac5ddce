use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use satpipe_api::router::{build_cors_layer, build_router};
use satpipe_api::state::AppState;
use satpipe_engine::JobService;
use satpipe_store::{InMemoryEventOutbox, InMemoryJobQueue, InMemoryJobStore};

/// Build the full application router over in-memory storage.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (CORS, request ID, tracing,
/// panic recovery) that production uses.
pub fn build_test_app() -> Router {
    let jobs = Arc::new(InMemoryJobStore::new());
    let outbox = Arc::new(InMemoryEventOutbox::new());
    let queue = Arc::new(InMemoryJobQueue::new());

    let state = AppState {
        service: Arc::new(JobService::new(
            jobs,
            Arc::clone(&outbox) as Arc<dyn satpipe_store::EventOutbox>,
            queue,
        )),
        outbox,
        cancel: CancellationToken::new(),
    };

    let cors = build_cors_layer(&["http://localhost:5173".to_string()]);
    build_router(state, cors)
}

/// Issue a GET request against the app.
#[allow(dead_code)]
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a POST request with a JSON body against the app.
#[allow(dead_code)]
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body into parsed JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a job through the API and return its parsed JSON.
#[allow(dead_code)]
pub async fn create_sample_job(app: Router) -> serde_json::Value {
    let response = post_json(
        app,
        "/api/jobs",
        serde_json::json!({
            "satellite_name": "KOMPSAT-5",
            "raw_data_name": "scene-2031.raw",
            "raw_data_size_bytes": 4096,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}
