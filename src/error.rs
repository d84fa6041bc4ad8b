use crate::assignment::invoker::InvokeError;
use crate::config::ConfigurationError;
use crate::database::StoreError;
use crate::messaging::QueueError;
use thiserror::Error;

/// Top-level error for pipeline bootstrap and binaries
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Assignment invocation error: {0}")]
    Invoke(#[from] InvokeError),

    #[error("Queue client not ready after {attempts} attempts")]
    QueueNotReady { attempts: u32 },

    #[error("Web server error: {0}")]
    Web(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
