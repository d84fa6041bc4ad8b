//! # Polling Control Handlers
//!
//! Runtime switches for the ingestion and assignment pollers:
//! `/processing/{start,stop,status}` and `/assignment/polling/{start,stop,status}`.
//! Start and stop are idempotent; both answer with the resulting status.

use crate::lifecycle::LoopState;
use crate::web::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingStatusResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub is_polling: bool,
    /// `running`, `stopping` or `stopped`
    pub state: String,
    pub interval_ms: u64,
}

impl PollingStatusResponse {
    fn new(message: Option<&str>, state: LoopState, interval: Duration) -> Self {
        Self {
            success: true,
            message: message.map(str::to_string),
            is_polling: state == LoopState::Running,
            state: state.to_string(),
            interval_ms: interval.as_millis() as u64,
        }
    }
}

/// POST /processing/start
pub async fn start_ingestion(State(state): State<AppState>) -> Json<PollingStatusResponse> {
    let poller = &state.ingestion_poller;
    // A stop still winding down must finish before the loop can run again
    if poller.state() == LoopState::Stopping {
        poller.stopped().await;
    }
    if poller.start().is_some() {
        info!("Ingestion polling started via API");
    }
    Json(PollingStatusResponse::new(
        Some("Complaint polling started"),
        poller.state(),
        poller.poll_interval(),
    ))
}

/// POST /processing/stop
pub async fn stop_ingestion(State(state): State<AppState>) -> Json<PollingStatusResponse> {
    let poller = &state.ingestion_poller;
    poller.stop();
    Json(PollingStatusResponse::new(
        Some("Complaint polling stopped"),
        poller.state(),
        poller.poll_interval(),
    ))
}

/// GET /processing/status
pub async fn ingestion_status(State(state): State<AppState>) -> Json<PollingStatusResponse> {
    let poller = &state.ingestion_poller;
    Json(PollingStatusResponse::new(None, poller.state(), poller.poll_interval()))
}

/// POST /assignment/polling/start
pub async fn start_assignment(State(state): State<AppState>) -> Json<PollingStatusResponse> {
    let poller = &state.assignment_poller;
    if poller.state() == LoopState::Stopping {
        poller.stopped().await;
    }
    if poller.start().is_some() {
        info!("Assignment polling started via API");
    }
    Json(PollingStatusResponse::new(
        Some("Auto-assign polling started"),
        poller.state(),
        poller.poll_interval(),
    ))
}

/// POST /assignment/polling/stop
pub async fn stop_assignment(State(state): State<AppState>) -> Json<PollingStatusResponse> {
    let poller = &state.assignment_poller;
    poller.stop();
    Json(PollingStatusResponse::new(
        Some("Auto-assign polling stopped"),
        poller.state(),
        poller.poll_interval(),
    ))
}

/// GET /assignment/polling/status
pub async fn assignment_status(State(state): State<AppState>) -> Json<PollingStatusResponse> {
    let poller = &state.assignment_poller;
    Json(PollingStatusResponse::new(None, poller.state(), poller.poll_interval()))
}
