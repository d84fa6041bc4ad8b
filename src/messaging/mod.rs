//! # Messaging Module
//!
//! Named FIFO lists backing the pipeline: the Ingestion Queue, the Processed
//! Queue, the assignment-trigger queue, and the dead-letter list. Producers
//! append at the tail, consumers take from the head.
//!
//! Two providers implement [`ListQueue`]:
//!
//! - [`RedisQueueClient`]: single node, cluster, or sentinel-supervised Redis
//! - [`InMemoryListQueue`]: process-local lists for tests and development

pub mod errors;
pub mod in_memory;
pub mod queue_client;

pub use errors::{QueueError, QueueResult};
pub use in_memory::InMemoryListQueue;
pub use queue_client::{ConnectionState, QueueConnection, RedisQueueClient};

use async_trait::async_trait;
use std::time::Duration;

/// Operations over named lists of serialized entries
#[async_trait]
pub trait ListQueue: Send + Sync + 'static {
    /// Establish the backend connection if it is not already usable
    async fn ensure_connected(&self) -> QueueResult<()> {
        Ok(())
    }

    /// Append `payload` at the tail of `list`, returning the new length
    async fn push(&self, list: &str, payload: &str) -> QueueResult<u64>;

    /// Read the head of `list` without removing it
    async fn peek(&self, list: &str) -> QueueResult<Option<String>>;

    /// Remove and return the head of `list`
    ///
    /// With `wait` set, blocks up to that long for an entry to arrive.
    /// Without it, returns `None` immediately on an empty list.
    async fn pop(&self, list: &str, wait: Option<Duration>) -> QueueResult<Option<String>>;

    /// Remove the first entry equal to `payload`, returning how many were removed
    async fn remove(&self, list: &str, payload: &str) -> QueueResult<u64>;

    /// Whether any entry of `list` equals `payload`
    async fn contains(&self, list: &str, payload: &str) -> QueueResult<bool>;

    async fn len(&self, list: &str) -> QueueResult<u64>;

    /// Whether the client currently holds a usable connection
    fn is_ready(&self) -> bool;
}
