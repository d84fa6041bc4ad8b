//! # Complaint Store
//!
//! Persistence capability consumed by the validator/persister and the
//! assignment engine. Every mutating operation is a single transaction.

use super::errors::StoreResult;
use crate::models::{DuplicateKey, NewComplaint, OperatorCandidate, OperatorPool, PersistedComplaint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait ComplaintStore: Send + Sync + 'static {
    /// Earliest complaint matching `key` submitted at or after `since`
    async fn find_recent_duplicate(
        &self,
        key: &DuplicateKey,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>>;

    /// Insert the complaint and its location atomically, status REGISTERED
    async fn create_complaint(&self, complaint: NewComplaint) -> StoreResult<PersistedComplaint>;

    async fn find_complaint(&self, id: Uuid) -> StoreResult<Option<PersistedComplaint>>;

    /// ACTIVE operators of `pool` whose jurisdiction matches case-insensitively
    ///
    /// Implementations may already exclude operators at their workload limit;
    /// callers must still check capacity.
    async fn eligible_candidates(
        &self,
        pool: OperatorPool,
        jurisdiction: &str,
    ) -> StoreResult<Vec<OperatorCandidate>>;

    /// Increment the operator's workload and write it onto the complaint
    ///
    /// The increment only applies while the operator is ACTIVE and below its
    /// limit; otherwise nothing changes and `CapacityExhausted` is returned.
    /// The complaint moves to UNDER_PROCESSING in the same transaction. A
    /// complaint that already has an assignee yields `AlreadyAssigned` and no
    /// workload changes.
    async fn assign_complaint(
        &self,
        complaint_id: Uuid,
        pool: OperatorPool,
        operator_id: Uuid,
    ) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
}
