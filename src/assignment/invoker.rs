//! # Assignment Invokers
//!
//! The worker triggers assignment through [`AssignmentInvoker`] without
//! knowing whether the engine runs in the same process or behind the internal
//! HTTP surface.

use super::engine::AssignmentEngine;
use crate::models::{AssignmentResult, FailureCategory};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum InvokeError {
    /// Remote engine answered with a non-2xx status
    #[error("Assignment endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Assignment transport error: {message}")]
    Transport { message: String },

    /// Engine ran but produced no assignee
    #[error("Assignment failed: {message}")]
    AssignmentFailed {
        category: Option<FailureCategory>,
        message: String,
    },
}

impl InvokeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for InvokeError {
    fn from(err: reqwest::Error) -> Self {
        InvokeError::transport(err.to_string())
    }
}

#[async_trait]
pub trait AssignmentInvoker: Send + Sync + 'static {
    /// Trigger one assignment for a complaint in `jurisdiction`
    async fn invoke(&self, jurisdiction: &str) -> Result<AssignmentResult, InvokeError>;
}

/// Calls the engine directly
#[derive(Debug, Clone)]
pub struct InProcessInvoker {
    engine: Arc<AssignmentEngine>,
}

impl InProcessInvoker {
    pub fn new(engine: Arc<AssignmentEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl AssignmentInvoker for InProcessInvoker {
    async fn invoke(&self, jurisdiction: &str) -> Result<AssignmentResult, InvokeError> {
        debug!(jurisdiction = %jurisdiction, "Invoking in-process assignment");
        let result = self.engine.auto_assign_one().await;
        if result.success {
            Ok(result)
        } else {
            Err(InvokeError::AssignmentFailed {
                category: result.failure,
                message: result.message,
            })
        }
    }
}

/// Calls `POST {base}/assignment/auto-assign` on the internal HTTP surface
#[derive(Debug, Clone)]
pub struct HttpAssignmentInvoker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAssignmentInvoker {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InvokeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/assignment/auto-assign", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AssignmentInvoker for HttpAssignmentInvoker {
    async fn invoke(&self, jurisdiction: &str) -> Result<AssignmentResult, InvokeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "jurisdiction": jurisdiction }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InvokeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<AssignmentResult>().await?)
    }
}
