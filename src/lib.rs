#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Complaint Pipeline
//!
//! Queue-backed ingestion and operator assignment for citizen complaints.
//!
//! ## Overview
//!
//! Raw submissions arrive on a Redis list. The ingestion stage validates and
//! persists them, marks recent repeats as duplicates, and forwards a reference
//! for each new complaint to the Processed Queue. The assignment stage pops
//! those references and routes each complaint to an eligible operator in its
//! district. Each department maps to one operator pool through
//! [`models::Department::pool`]: field departments such as `INFRASTRUCTURE`
//! or `WATER_SUPPLY_SANITATION` go to agents, administrative ones such as
//! `HEALTH` or `REVENUE` to municipal admins. A separate worker watches an
//! assignment-trigger list and invokes the assignment stage for jurisdictions
//! on its allow-list.
//!
//! ## Module Organization
//!
//! - [`messaging`] - Redis list client with reconnect and an in-memory double
//! - [`database`] - Complaint store trait, PostgreSQL and in-memory backends
//! - [`models`] - Complaint, operator, submission and routing types
//! - [`ingestion`] - Validate-and-persist step and its polling loop
//! - [`assignment`] - Engine, batch driver, invokers and assignment worker
//! - [`web`] - Internal HTTP surface over the pipeline stages
//! - [`config`] - Layered YAML/env configuration
//! - [`logging`] - Structured console and file logging
//! - [`lifecycle`] - Start/stop control shared by the long-running loops
//! - [`bootstrap`] - Wiring helpers used by the binaries
//! - [`error`] - Top-level error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use complaint_pipeline::bootstrap::PipelineComponents;
//! use complaint_pipeline::config::PipelineConfig;
//! use complaint_pipeline::database::InMemoryComplaintStore;
//! use complaint_pipeline::messaging::InMemoryListQueue;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = PipelineConfig::default();
//! let components = PipelineComponents::new(
//!     &config,
//!     Arc::new(InMemoryListQueue::new()),
//!     Arc::new(InMemoryComplaintStore::new()),
//! );
//!
//! let outcome = components.processor.process_next().await;
//! println!("ingestion: {:?}", outcome.disposition);
//!
//! let summary = components.batch.process_batch(10).await;
//! println!("assigned {} of {}", summary.successful, summary.processed);
//! # }
//! ```

pub mod assignment;
pub mod bootstrap;
pub mod config;
pub mod database;
pub mod error;
pub mod ingestion;
pub mod lifecycle;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod web;

pub use assignment::{AssignmentEngine, AssignmentPoller, AssignmentWorker, BatchDriver, BatchSummary};
pub use config::{ConfigManager, PipelineConfig};
pub use error::{PipelineError, Result};
pub use ingestion::{ComplaintProcessor, IngestionPoller, ProcessOutcome};
pub use messaging::{ListQueue, RedisQueueClient};
pub use models::{AssignmentResult, ProcessedReference};
