//! # Assignment Handlers
//!
//! Internal endpoints used by the assignment worker's HTTP invoker and by
//! operators draining the Processed Queue by hand.

use crate::assignment::BatchSummary;
use crate::models::AssignmentResult;
use crate::web::response_types::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct AutoAssignRequest {
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatusResponse {
    pub queue_length: u64,
    /// Head entry, decoded when it is JSON
    pub next_complaint: Option<serde_json::Value>,
}

/// Assign one complaint: POST /assignment/auto-assign
///
/// 200 with the result on success, 404 with the result otherwise.
pub async fn auto_assign(
    State(state): State<AppState>,
    body: Option<Json<AutoAssignRequest>>,
) -> (StatusCode, Json<AssignmentResult>) {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    debug!(jurisdiction = ?request.jurisdiction, "Auto-assign requested");

    let result = state.components.engine.auto_assign_one().await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(result))
}

/// Drain up to `limit` references: POST /assignment/batch?limit=N
pub async fn process_batch(
    State(state): State<AppState>,
    Query(params): Query<BatchParams>,
) -> ApiResult<Json<BatchSummary>> {
    let limit = params
        .limit
        .unwrap_or(state.config.assignment.default_batch_limit);
    if limit == 0 {
        return Err(ApiError::bad_request("limit must be at least 1"));
    }

    Ok(Json(state.components.batch.process_batch(limit).await))
}

/// Processed Queue depth and head: GET /assignment/queue-status
pub async fn queue_status(State(state): State<AppState>) -> ApiResult<Json<QueueStatusResponse>> {
    let (queue_length, next) = state.components.engine.queue_status().await?;
    let next_complaint = next.map(|raw| {
        serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
    });

    Ok(Json(QueueStatusResponse {
        queue_length,
        next_complaint,
    }))
}
