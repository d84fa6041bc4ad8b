//! # Ingestion
//!
//! Validator/persister stage: turns raw Ingestion Queue entries into durable
//! complaints and routes new ones to the Processed Queue.

pub mod poller;
pub mod processor;

pub use poller::IngestionPoller;
pub use processor::{ComplaintProcessor, Disposition, ProcessOutcome, ProcessedSummary, ProcessorConfig};
