use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satpipe_api::config::ServerConfig;
use satpipe_api::router::{build_cors_layer, build_router};
use satpipe_api::state::AppState;
use satpipe_engine::JobService;
use satpipe_store::{
    create_event_outbox, create_job_queue, create_job_store, QueueConfig, StorageConfig,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satpipe_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let storage_config = StorageConfig::from_env();
    let queue_config = QueueConfig::from_env();
    tracing::info!(
        storage_mode = ?storage_config.mode,
        queue_mode = ?queue_config.mode,
        data_dir = %storage_config.data_dir.display(),
        "Loaded storage configuration"
    );

    // --- Storage ---
    let jobs = create_job_store(&storage_config);
    let outbox = create_event_outbox(&storage_config);
    let queue = create_job_queue(&queue_config);

    // --- App state ---
    let cancel = CancellationToken::new();
    let state = AppState {
        service: Arc::new(JobService::new(jobs, Arc::clone(&outbox), queue)),
        outbox,
        cancel: cancel.clone(),
    };

    // --- Router ---
    let cors = build_cors_layer(&config.cors_origins);
    let app = build_router(state, cors);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Unblock any storage lock waits still held by in-flight requests.
    cancel.cancel();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
