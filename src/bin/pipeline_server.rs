//! # Pipeline Server
//!
//! Runs the ingestion and assignment pollers and the internal web API over a
//! shared Redis queue and PostgreSQL store. Either poller can be switched on
//! or off at runtime through the API.

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

use complaint_pipeline::bootstrap::{shutdown_signal, wait_for_queue_ready};
use complaint_pipeline::config::ConfigManager;
use complaint_pipeline::database::{ComplaintStore, PgComplaintStore};
use complaint_pipeline::logging;
use complaint_pipeline::messaging::{ListQueue, RedisQueueClient};
use complaint_pipeline::web::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("🚀 Starting complaint pipeline server");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let manager = ConfigManager::load().context("Failed to load configuration")?;
    let config = Arc::new(manager.config().clone());
    info!("   Environment: {}", manager.environment());

    let store = Arc::new(
        PgComplaintStore::connect(&config.database)
            .await
            .context("Failed to connect to complaint store")?,
    );
    if config.database.run_migrations {
        store.migrate().await.context("Failed to run migrations")?;
        info!("✅ Migrations applied");
    }

    let queue = Arc::new(RedisQueueClient::new(config.queue.clone()));
    wait_for_queue_ready(
        queue.as_ref(),
        config.worker.ready_wait_attempts,
        config.worker.ready_wait_interval(),
    )
    .await
    .context("Queue client never became ready")?;

    let queue_dyn: Arc<dyn ListQueue> = queue.clone();
    let store_dyn: Arc<dyn ComplaintStore> = store.clone();
    let state = AppState::new(Arc::clone(&config), queue_dyn, store_dyn);

    if config.ingestion.poll_on_start {
        state.ingestion_poller.start();
    }
    if config.assignment.poll_on_start {
        state.assignment_poller.start();
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_handle = if config.web.enabled {
        let bind_address = config.web.bind_address.clone();
        let web_state = state.clone();
        Some(tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = web::serve(web_state, &bind_address, shutdown).await {
                error!(error = %e, address = %bind_address, "Pipeline web server error");
            }
        }))
    } else {
        info!("Web API disabled");
        None
    };

    info!("🎉 Pipeline server running, press Ctrl+C to stop");
    shutdown_signal().await;

    info!("🛑 Shutdown signal received, initiating graceful shutdown");
    // Web first, so no request can restart a poller after it is stopped
    let _ = shutdown_tx.send(());
    if let Some(handle) = server_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Web server task ended abnormally");
        }
    }
    state.ingestion_poller.stop();
    state.assignment_poller.stop();
    state.ingestion_poller.stopped().await;
    state.assignment_poller.stopped().await;

    queue.disconnect().await;
    store.close().await;
    info!("👋 Pipeline server shutdown complete");

    Ok(())
}
