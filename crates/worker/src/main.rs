use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satpipe_engine::{JobWorker, PipelineOrchestrator, SimulatedStageExecutor, SimulationConfig};
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
                .unwrap_or_else(|_| "satpipe_worker=debug,satpipe_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let storage_config = StorageConfig::from_env();
    let queue_config = QueueConfig::from_env();
    let simulation_config = SimulationConfig::from_env();

    let worker_count: usize = std::env::var("WORKER_COUNT")
        .unwrap_or_else(|_| "2".into())
        .parse()
        .expect("WORKER_COUNT must be a valid usize");

    tracing::info!(
        storage_mode = ?storage_config.mode,
        queue_mode = ?queue_config.mode,
        data_dir = %storage_config.data_dir.display(),
        worker_count,
        "Loaded worker configuration"
    );

    // --- Storage ---
    let jobs = create_job_store(&storage_config);
    let outbox = create_event_outbox(&storage_config);
    let queue = create_job_queue(&queue_config);

    // --- Pipeline ---
    let executor = Arc::new(SimulatedStageExecutor::new(simulation_config));
    let orchestrator = Arc::new(PipelineOrchestrator::new(jobs, outbox, executor));

    // --- Worker pool ---
    let cancel = CancellationToken::new();
    let mut handles = Vec::with_capacity(worker_count);
    for id in 0..worker_count {
        let worker = JobWorker::new(id, Arc::clone(&queue), Arc::clone(&orchestrator));
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move { worker.run(cancel).await }));
    }
    tracing::info!(worker_count, "Worker pool started");

    // --- Shutdown ---
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl-C handler");
    tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");

    cancel.cancel();
    for handle in handles {
        let _ = handle.await;
    }
    tracing::info!("Graceful shutdown complete");
}
