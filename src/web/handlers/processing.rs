//! # Processing Handler
//!
//! Runs one validate-and-persist step on demand, the same step the ingestion
//! poller runs on its interval.

use crate::ingestion::Disposition;
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Process the head registration: POST /processing
///
/// 201 persisted, 204 queue empty, 503 left for retry, 400 otherwise.
pub async fn process_next(State(state): State<AppState>) -> Response {
    let outcome = state.components.processor.process_next().await;
    let status = match outcome.disposition {
        Disposition::Empty => return StatusCode::NO_CONTENT.into_response(),
        Disposition::Persisted | Disposition::Duplicate => StatusCode::CREATED,
        Disposition::RetryLater => StatusCode::SERVICE_UNAVAILABLE,
        Disposition::InvalidRemoved | Disposition::DeadLettered => StatusCode::BAD_REQUEST,
    };
    (status, Json(outcome)).into_response()
}
