//! # Assignment
//!
//! Routes persisted complaints to operators.
//!
//! - [`engine`]: single assignment from the Processed Queue
//! - [`batch`]: bounded drain of the Processed Queue
//! - [`selection`]: capacity filter and uniform tie-break
//! - [`trigger`]: normalization of assignment-trigger entries
//! - [`invoker`]: in-process and HTTP ways of reaching the engine
//! - [`poller`]: interval-driven assignment straight off the Processed Queue
//! - [`worker`]: the polling loop over the assignment-trigger queue

pub mod batch;
pub mod engine;
pub mod invoker;
pub mod poller;
pub mod selection;
pub mod trigger;
pub mod worker;

pub use batch::{BatchDriver, BatchSummary};
pub use engine::{AssignmentEngine, EngineConfig};
pub use invoker::{AssignmentInvoker, HttpAssignmentInvoker, InProcessInvoker, InvokeError};
pub use poller::AssignmentPoller;
pub use selection::{filter_eligible, CandidateSelector};
pub use trigger::{TriggerError, TriggerRecord};
pub use worker::{AssignmentWorker, IterationOutcome, WorkerSettings, WorkerStatsSnapshot};
