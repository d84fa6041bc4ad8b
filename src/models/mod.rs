//! # Pipeline Models
//!
//! Data types flowing through the ingestion and assignment stages.
//!
//! - [`submission`]: raw Ingestion Queue entries and their validation
//! - [`complaint`]: durable complaint records, departments, statuses
//! - [`operator`]: agent and municipal admin candidates
//! - [`routing`]: Processed Queue references and assignment results

pub mod complaint;
pub mod operator;
pub mod routing;
pub mod submission;

pub use complaint::{
    ComplaintLocation, ComplaintStatus, Department, NewComplaint, PersistedComplaint, Urgency,
};
pub use operator::{same_jurisdiction, OperatorCandidate, OperatorPool, OperatorStatus};
pub use routing::{Assignee, AssignmentResult, FailureCategory, ProcessedReference};
pub use submission::{
    description_fingerprint, DuplicateKey, RawLocation, RawSubmission, SubmissionError,
    ValidatedSubmission,
};
