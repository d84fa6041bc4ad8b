//! # Database Operations
//!
//! Persistence for complaints and operator workloads.
//!
//! ## Key Components
//!
//! - [`store`] - The [`ComplaintStore`] capability used by the pipeline stages
//! - [`postgres`] - SQLx/PostgreSQL implementation with transactional writes
//! - [`in_memory`] - Mutex-guarded implementation for tests and development
//! - [`errors`] - Transient vs permanent failure classification
//!
//! ## Transaction Boundaries
//!
//! - Complaint creation writes the complaint and its location together
//! - Assignment increments the operator workload (only while ACTIVE and below
//!   the limit) and writes the assignee in the same transaction

pub mod errors;
pub mod in_memory;
pub mod postgres;
pub mod store;

pub use errors::{StoreError, StoreResult};
pub use in_memory::InMemoryComplaintStore;
pub use postgres::PgComplaintStore;
pub use store::ComplaintStore;
