//! # Health Check Handlers
//!
//! Reports the complaint store and the depth of each pipeline list.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error};

use crate::web::state::AppState;

/// Detailed health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub checks: HashMap<String, HealthCheck>,
    /// Length of each configured list, absent when the queue is unavailable
    pub queues: HashMap<String, u64>,
}

/// Individual health check result
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl HealthCheck {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>, started: Instant) -> Self {
        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => Self {
                status: "healthy".to_string(),
                message: None,
                duration_ms,
            },
            Err(e) => Self {
                status: "unhealthy".to_string(),
                message: Some(e.to_string()),
                duration_ms,
            },
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Health check endpoint: GET /health
///
/// 503 when the store is unreachable, `degraded` when only the queue is.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    debug!("Performing health check");
    let mut checks = HashMap::new();

    let started = Instant::now();
    let store_check = HealthCheck::from_result(state.store.health_check().await, started);
    if !store_check.is_healthy() {
        error!(message = ?store_check.message, "Complaint store health check failed");
    }
    let store_healthy = store_check.is_healthy();
    checks.insert("store".to_string(), store_check);

    let started = Instant::now();
    let queue_cfg = &state.config.queue;
    let lists = [
        &queue_cfg.registration_queue,
        &queue_cfg.processed_queue,
        &queue_cfg.assignment_queue,
        &queue_cfg.dead_letter_queue,
    ];
    let mut queues = HashMap::new();
    let mut queue_result = Ok(());
    for list in lists {
        match state.queue.len(list).await {
            Ok(len) => {
                queues.insert(list.clone(), len);
            }
            Err(e) => {
                queue_result = Err(e);
                queues.clear();
                break;
            }
        }
    }
    let queue_check = HealthCheck::from_result(queue_result, started);
    let queue_healthy = queue_check.is_healthy();
    checks.insert("queue".to_string(), queue_check);

    let (status_code, status) = match (store_healthy, queue_healthy) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
        (true, false) => (StatusCode::OK, "degraded"),
        (true, true) => (StatusCode::OK, "healthy"),
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
            queues,
        }),
    )
}
