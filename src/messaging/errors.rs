//! # Queue Error Types
//!
//! Structured errors for list-queue operations. Connectivity failures are
//! separated from command failures so callers can treat them as "nothing this
//! poll" while the client rebuilds its connection in the background.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue client not initialized. Call connect() first")]
    NotInitialized,

    #[error("Queue connectivity error: {message}")]
    Connectivity { message: String },

    #[error("Queue command failed: {list}: {operation}: {message}")]
    Command {
        list: String,
        operation: String,
        message: String,
    },

    #[error("Queue configuration error: {message}")]
    Configuration { message: String },
}

impl QueueError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    pub fn command(
        list: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Command {
            list: list.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Connectivity-class errors are recovered by reconnecting, not by the caller
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::NotInitialized)
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            QueueError::connectivity(err.to_string())
        } else {
            QueueError::command("unknown", "redis", err.to_string())
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(QueueError::connectivity("refused").is_connectivity());
        assert!(QueueError::NotInitialized.is_connectivity());
        assert!(!QueueError::command("q", "LPOP", "WRONGTYPE").is_connectivity());
    }

    #[test]
    fn test_error_display() {
        let err = QueueError::command("complaint:processed:queue", "RPUSH", "OOM");
        let display = format!("{err}");
        assert!(display.contains("complaint:processed:queue"));
        assert!(display.contains("RPUSH"));
        assert!(display.contains("OOM"));
    }
}
