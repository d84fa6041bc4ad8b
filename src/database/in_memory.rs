//! # In-Memory Complaint Store
//!
//! Process-local [`ComplaintStore`] for tests and development. All state sits
//! behind one mutex so each operation is atomic, mirroring the transactional
//! behavior of the PostgreSQL store.
//!
//! Test hooks:
//! - injected failures are returned by the next operations, in order
//! - every candidate query records which operator pool it touched
//! - complaints can be backdated to exercise the duplicate window

use super::errors::{StoreError, StoreResult};
use super::store::ComplaintStore;
use crate::models::{
    ComplaintStatus, DuplicateKey, NewComplaint, OperatorCandidate, OperatorPool,
    PersistedComplaint,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

#[derive(Debug, Default)]
struct StoreState {
    complaints: HashMap<Uuid, PersistedComplaint>,
    agents: Vec<OperatorCandidate>,
    municipal_admins: Vec<OperatorCandidate>,
    next_seq: i64,
    queried_pools: Vec<OperatorPool>,
    injected_failures: VecDeque<StoreError>,
}

impl StoreState {
    fn pool(&self, pool: OperatorPool) -> &Vec<OperatorCandidate> {
        match pool {
            OperatorPool::Agent => &self.agents,
            OperatorPool::MunicipalAdmin => &self.municipal_admins,
        }
    }

    fn pool_mut(&mut self, pool: OperatorPool) -> &mut Vec<OperatorCandidate> {
        match pool {
            OperatorPool::Agent => &mut self.agents,
            OperatorPool::MunicipalAdmin => &mut self.municipal_admins,
        }
    }

    fn take_failure(&mut self) -> StoreResult<()> {
        match self.injected_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryComplaintStore {
    state: Mutex<StoreState>,
}

impl InMemoryComplaintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candidate(&self, pool: OperatorPool, candidate: OperatorCandidate) {
        self.state.lock().pool_mut(pool).push(candidate);
    }

    pub fn candidate(&self, pool: OperatorPool, id: Uuid) -> Option<OperatorCandidate> {
        self.state.lock().pool(pool).iter().find(|c| c.id == id).cloned()
    }

    /// Return `err` from the next store operation
    pub fn inject_failure(&self, err: StoreError) {
        self.state.lock().injected_failures.push_back(err);
    }

    /// Pools touched by candidate queries, in call order
    pub fn queried_pools(&self) -> Vec<OperatorPool> {
        self.state.lock().queried_pools.clone()
    }

    pub fn complaint(&self, id: Uuid) -> Option<PersistedComplaint> {
        self.state.lock().complaints.get(&id).cloned()
    }

    /// All complaints ordered by sequence number
    pub fn complaints(&self) -> Vec<PersistedComplaint> {
        let mut complaints: Vec<_> = self.state.lock().complaints.values().cloned().collect();
        complaints.sort_by_key(|c| c.seq);
        complaints
    }

    /// Insert an already-persisted complaint, e.g. one without a location
    pub fn insert_complaint(&self, complaint: PersistedComplaint) {
        let mut state = self.state.lock();
        state.next_seq = state.next_seq.max(complaint.seq);
        state.complaints.insert(complaint.id, complaint);
    }

    /// Move a complaint's submission date into the past
    pub fn backdate_complaint(&self, id: Uuid, submitted_at: DateTime<Utc>) {
        if let Some(complaint) = self.state.lock().complaints.get_mut(&id) {
            complaint.submission_date = submitted_at;
        }
    }
}

#[async_trait]
impl ComplaintStore for InMemoryComplaintStore {
    async fn find_recent_duplicate(
        &self,
        key: &DuplicateKey,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>> {
        let mut state = self.state.lock();
        state.take_failure()?;

        Ok(state
            .complaints
            .values()
            .filter(|c| {
                c.submitter_id == key.submitter_id
                    && c.category_id == key.category_id
                    && c.sub_category == key.sub_category
                    && c.description_fingerprint == key.description_fingerprint
                    && c.submission_date >= since
            })
            .min_by_key(|c| (c.submission_date, c.seq))
            .map(|c| c.id))
    }

    async fn create_complaint(&self, complaint: NewComplaint) -> StoreResult<PersistedComplaint> {
        let mut state = self.state.lock();
        state.take_failure()?;

        state.next_seq += 1;
        let now = Utc::now();
        let persisted = PersistedComplaint {
            id: Uuid::new_v4(),
            seq: state.next_seq,
            submitter_id: complaint.submitter_id,
            category_id: complaint.category_id,
            sub_category: complaint.sub_category,
            description: complaint.description,
            description_fingerprint: complaint.description_fingerprint,
            urgency: complaint.urgency,
            department: complaint.department,
            is_public: complaint.is_public,
            is_duplicate: complaint.is_duplicate,
            attachment_url: complaint.attachment_url,
            status: ComplaintStatus::Registered,
            assigned_agent_id: None,
            managed_by_admin_id: None,
            location: Some(complaint.location),
            submission_date: now,
            updated_at: now,
        };
        state.complaints.insert(persisted.id, persisted.clone());
        Ok(persisted)
    }

    async fn find_complaint(&self, id: Uuid) -> StoreResult<Option<PersistedComplaint>> {
        let mut state = self.state.lock();
        state.take_failure()?;
        Ok(state.complaints.get(&id).cloned())
    }

    async fn eligible_candidates(
        &self,
        pool: OperatorPool,
        jurisdiction: &str,
    ) -> StoreResult<Vec<OperatorCandidate>> {
        let mut state = self.state.lock();
        state.take_failure()?;
        state.queried_pools.push(pool);

        // Capacity filtering is left to the caller
        Ok(state
            .pool(pool)
            .iter()
            .filter(|c| c.status == crate::models::OperatorStatus::Active && c.serves(jurisdiction))
            .cloned()
            .collect())
    }

    async fn assign_complaint(
        &self,
        complaint_id: Uuid,
        pool: OperatorPool,
        operator_id: Uuid,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.take_failure()?;

        match state.complaints.get(&complaint_id) {
            None => return Err(StoreError::not_found("Complaint", complaint_id)),
            Some(complaint) if complaint.is_assigned() => {
                return Err(StoreError::already_assigned(complaint_id))
            }
            Some(_) => {}
        }

        let operator = state
            .pool_mut(pool)
            .iter_mut()
            .find(|c| c.id == operator_id)
            .filter(|c| c.is_eligible())
            .ok_or_else(|| StoreError::capacity_exhausted(operator_id))?;
        operator.current_workload += 1;

        if let Some(complaint) = state.complaints.get_mut(&complaint_id) {
            match pool {
                OperatorPool::Agent => complaint.assigned_agent_id = Some(operator_id),
                OperatorPool::MunicipalAdmin => complaint.managed_by_admin_id = Some(operator_id),
            }
            complaint.status = ComplaintStatus::UnderProcessing;
            complaint.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.state.lock().take_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplaintLocation, Department, OperatorStatus, Urgency};

    fn new_complaint() -> NewComplaint {
        NewComplaint {
            submitter_id: "u1".to_string(),
            category_id: "c1".to_string(),
            sub_category: "Water Leakage".to_string(),
            description: String::new(),
            description_fingerprint: crate::models::description_fingerprint(""),
            urgency: Urgency::Low,
            department: Department::WaterSupplySanitation,
            is_public: true,
            is_duplicate: false,
            attachment_url: None,
            location: ComplaintLocation {
                pin: "560001".to_string(),
                district: "Ranchi".to_string(),
                city: "Ranchi".to_string(),
                locality: "Lewis Road".to_string(),
                street: None,
                latitude: None,
                longitude: None,
            },
        }
    }

    fn agent(workload: i32, limit: i32) -> OperatorCandidate {
        OperatorCandidate {
            id: Uuid::new_v4(),
            name: "Ravi".to_string(),
            jurisdiction: "Ranchi".to_string(),
            current_workload: workload,
            workload_limit: limit,
            status: OperatorStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_sequence_numbers_increase() {
        let store = InMemoryComplaintStore::new();
        let first = store.create_complaint(new_complaint()).await.unwrap();
        let second = store.create_complaint(new_complaint()).await.unwrap();
        assert_eq!(first.seq + 1, second.seq);
        assert_eq!(first.status, ComplaintStatus::Registered);
    }

    #[tokio::test]
    async fn test_assign_respects_capacity() {
        let store = InMemoryComplaintStore::new();
        let complaint = store.create_complaint(new_complaint()).await.unwrap();
        let full = agent(3, 3);
        store.add_candidate(OperatorPool::Agent, full.clone());

        let err = store
            .assign_complaint(complaint.id, OperatorPool::Agent, full.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExhausted { .. }));
        assert_eq!(store.candidate(OperatorPool::Agent, full.id).unwrap().current_workload, 3);
        assert_eq!(store.complaint(complaint.id).unwrap().assigned_agent_id, None);
    }

    #[tokio::test]
    async fn test_assign_updates_both_records() {
        let store = InMemoryComplaintStore::new();
        let complaint = store.create_complaint(new_complaint()).await.unwrap();
        let open = agent(1, 3);
        store.add_candidate(OperatorPool::Agent, open.clone());

        store
            .assign_complaint(complaint.id, OperatorPool::Agent, open.id)
            .await
            .unwrap();

        let stored = store.complaint(complaint.id).unwrap();
        assert_eq!(stored.assigned_agent_id, Some(open.id));
        assert_eq!(stored.status, ComplaintStatus::UnderProcessing);
        assert_eq!(store.candidate(OperatorPool::Agent, open.id).unwrap().current_workload, 2);
    }

    #[tokio::test]
    async fn test_assigned_complaint_is_not_reassigned() {
        let store = InMemoryComplaintStore::new();
        let complaint = store.create_complaint(new_complaint()).await.unwrap();
        let first = agent(0, 3);
        let second = agent(0, 3);
        store.add_candidate(OperatorPool::Agent, first.clone());
        store.add_candidate(OperatorPool::Agent, second.clone());

        store
            .assign_complaint(complaint.id, OperatorPool::Agent, first.id)
            .await
            .unwrap();
        let err = store
            .assign_complaint(complaint.id, OperatorPool::Agent, second.id)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::AlreadyAssigned { .. }));
        assert_eq!(store.complaint(complaint.id).unwrap().assigned_agent_id, Some(first.id));
        assert_eq!(store.candidate(OperatorPool::Agent, second.id).unwrap().current_workload, 0);
    }

    #[tokio::test]
    async fn test_injected_failure_is_returned_once() {
        let store = InMemoryComplaintStore::new();
        store.inject_failure(StoreError::transient("connection reset"));

        assert!(store.health_check().await.unwrap_err().is_transient());
        assert!(store.health_check().await.is_ok());
    }
}
