//! # Assignment Worker
//!
//! Standalone process that watches the assignment-trigger list and invokes
//! auto-assignment for allow-listed jurisdictions.
//!
//! ## Usage
//!
//! ```bash
//! # Call the pipeline server over HTTP
//! PIPELINE__WORKER__INVOKER=http cargo run --bin assignment-worker
//!
//! # Run the assignment engine in this process
//! PIPELINE_ENV=production cargo run --bin assignment-worker
//! ```

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};

use complaint_pipeline::assignment::{AssignmentEngine, EngineConfig};
use complaint_pipeline::bootstrap::{
    build_invoker, build_worker, shutdown_signal, wait_for_queue_ready,
};
use complaint_pipeline::config::{ConfigManager, InvokerMode};
use complaint_pipeline::database::PgComplaintStore;
use complaint_pipeline::logging;
use complaint_pipeline::messaging::{ListQueue, RedisQueueClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("🚀 Starting assignment worker");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let manager = ConfigManager::load().context("Failed to load configuration")?;
    let config = manager.config();
    info!("   Environment: {}", manager.environment());
    info!(
        "   Allowed jurisdictions: {:?}",
        config.worker.allowed_jurisdictions
    );

    let queue = Arc::new(RedisQueueClient::new(config.queue.clone()));
    wait_for_queue_ready(
        queue.as_ref(),
        config.worker.ready_wait_attempts,
        config.worker.ready_wait_interval(),
    )
    .await
    .context("Queue client never became ready")?;
    let queue: Arc<dyn ListQueue> = queue;

    let mut store = None;
    let engine = match config.worker.invoker {
        InvokerMode::InProcess => {
            let pg = Arc::new(
                PgComplaintStore::connect(&config.database)
                    .await
                    .context("Failed to connect to complaint store")?,
            );
            store = Some(Arc::clone(&pg));
            Some(Arc::new(AssignmentEngine::new(
                Arc::clone(&queue),
                pg,
                EngineConfig::from_pipeline(config),
            )))
        }
        InvokerMode::Http => None,
    };

    let invoker = build_invoker(config, engine)?;
    let worker = build_worker(config, Arc::clone(&queue), invoker);
    let handle = worker.start();

    info!("🎉 Assignment worker running, press Ctrl+C to stop");
    shutdown_signal().await;

    info!("🛑 Shutdown signal received, finishing current iteration");
    worker.stop();
    if let Some(handle) = handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Assignment worker task ended abnormally");
        }
    }

    if let Some(store) = store {
        store.close().await;
    }
    info!("👋 Assignment worker shutdown complete");

    Ok(())
}
