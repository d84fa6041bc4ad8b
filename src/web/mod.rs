//! # Internal Web API
//!
//! HTTP surface over the pipeline stages and the switches for their pollers.
//! The assignment worker's HTTP invoker calls `POST /assignment/auto-assign`
//! here.

use crate::error::{PipelineError, Result};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use tracing::info;

pub mod handlers;
pub mod response_types;
pub mod state;

pub use response_types::{ApiError, ApiResult};
pub use state::AppState;

/// Create the pipeline web application with all routes
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/processing", post(handlers::processing::process_next))
        .route("/processing/start", post(handlers::polling::start_ingestion))
        .route("/processing/stop", post(handlers::polling::stop_ingestion))
        .route("/processing/status", get(handlers::polling::ingestion_status))
        .route(
            "/assignment/auto-assign",
            post(handlers::assignment::auto_assign),
        )
        .route("/assignment/batch", post(handlers::assignment::process_batch))
        .route(
            "/assignment/queue-status",
            get(handlers::assignment::queue_status),
        )
        .route(
            "/assignment/polling/start",
            post(handlers::polling::start_assignment),
        )
        .route(
            "/assignment/polling/stop",
            post(handlers::polling::stop_assignment),
        )
        .route(
            "/assignment/polling/status",
            get(handlers::polling::assignment_status),
        )
        .with_state(state)
}

/// Bind `bind_address` and serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, bind_address: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| PipelineError::Web(format!("Failed to bind to {bind_address}: {e}")))?;
    if let Ok(address) = listener.local_addr() {
        info!(address = %address, "✅ Pipeline web server listening");
    }

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| PipelineError::Web(e.to_string()))
}
