//! # Assignment Engine
//!
//! Pops one Processed Queue reference and assigns the complaint to an
//! operator:
//!
//! 1. pop a reference (empty: `QueueEmpty`)
//! 2. load the complaint (missing: `ComplaintNotFound`)
//! 3. resolve the district, stored location first, then the reference
//! 4. map the department to the agent or municipal admin pool
//! 5. read ACTIVE operators of that pool serving the district
//! 6. keep those below their workload limit
//! 7. pick one uniformly at random
//! 8. increment its workload and write the assignee in one transaction
//!
//! Routing failures are terminal for the popped reference and returned as
//! values. Transient store failures put the reference back at the tail;
//! permanent ones move it to the dead-letter list.

use super::selection::{filter_eligible, CandidateSelector};
use crate::config::PipelineConfig;
use crate::database::{ComplaintStore, StoreError};
use crate::logging::{log_assignment_operation, log_error};
use crate::messaging::ListQueue;
use crate::models::{
    Assignee, AssignmentResult, Department, FailureCategory, OperatorPool, PersistedComplaint,
    ProcessedReference,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub const MSG_QUEUE_EMPTY: &str = "No complaints in processed queue";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub processed_queue: String,
    pub dead_letter_queue: String,
    pub selection_seed: Option<u64>,
}

impl EngineConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            processed_queue: config.queue.processed_queue.clone(),
            dead_letter_queue: config.queue.dead_letter_queue.clone(),
            selection_seed: config.assignment.selection_seed,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_pipeline(&PipelineConfig::default())
    }
}

pub struct AssignmentEngine {
    queue: Arc<dyn ListQueue>,
    store: Arc<dyn ComplaintStore>,
    selector: CandidateSelector,
    config: EngineConfig,
}

impl std::fmt::Debug for AssignmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentEngine")
            .field("config", &self.config)
            .finish()
    }
}

impl AssignmentEngine {
    pub fn new(
        queue: Arc<dyn ListQueue>,
        store: Arc<dyn ComplaintStore>,
        config: EngineConfig,
    ) -> Self {
        let selector = CandidateSelector::from_optional_seed(config.selection_seed);
        Self {
            queue,
            store,
            selector,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Length and head of the Processed Queue
    pub async fn queue_status(&self) -> crate::messaging::QueueResult<(u64, Option<String>)> {
        self.queue.ensure_connected().await?;
        let length = self.queue.len(&self.config.processed_queue).await?;
        let next = self.queue.peek(&self.config.processed_queue).await?;
        Ok((length, next))
    }

    /// Assign the complaint at the head of the Processed Queue
    #[instrument(skip(self))]
    pub async fn auto_assign_one(&self) -> AssignmentResult {
        let list = self.config.processed_queue.as_str();

        let popped = match self.queue.ensure_connected().await {
            Ok(()) => self.queue.pop(list, None).await,
            Err(e) => Err(e),
        };
        let raw = match popped {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return AssignmentResult::failed(FailureCategory::QueueEmpty, None, MSG_QUEUE_EMPTY)
            }
            Err(e) => {
                debug!(error = %e, "Processed queue unavailable");
                return AssignmentResult::failed(
                    FailureCategory::QueueEmpty,
                    None,
                    format!("Processed queue unavailable: {e}"),
                );
            }
        };

        let result = self.assign_reference(&raw).await;
        log_assignment_operation(
            "auto_assign",
            result.complaint_id.as_deref(),
            result.assignee.as_ref().map(|a| a.id.to_string()).as_deref(),
            if result.success { "assigned" } else { "failed" },
            Some(&result.message),
        );
        result
    }

    async fn assign_reference(&self, raw: &str) -> AssignmentResult {
        let reference = match ProcessedReference::parse(raw) {
            Ok(reference) => reference,
            Err(e) => {
                warn!(error = %e, "Malformed processed queue entry");
                self.dead_letter(raw).await;
                return AssignmentResult::failed(
                    FailureCategory::MalformedReference,
                    None,
                    format!("Malformed processed queue entry dead-lettered: {e}"),
                );
            }
        };
        let complaint_id = reference.id.trim().to_string();
        let not_found = || {
            AssignmentResult::failed(
                FailureCategory::ComplaintNotFound,
                Some(complaint_id.clone()),
                format!("Complaint {complaint_id} not found"),
            )
        };

        let already_assigned = || {
            AssignmentResult::failed(
                FailureCategory::AlreadyAssigned,
                Some(complaint_id.clone()),
                format!("Complaint {complaint_id} is already assigned"),
            )
        };

        let Ok(id) = Uuid::parse_str(&complaint_id) else {
            return not_found();
        };

        let complaint = match self.store.find_complaint(id).await {
            Ok(Some(complaint)) => complaint,
            Ok(None) => return not_found(),
            Err(e) => return self.store_failure(raw, &complaint_id, e).await,
        };
        if complaint.is_assigned() {
            debug!(complaint_id = %complaint_id, "Reference redelivered for an assigned complaint");
            return already_assigned();
        }

        let Some(district) = resolve_district(&complaint, &reference) else {
            return AssignmentResult::failed(
                FailureCategory::MissingDistrict,
                Some(complaint_id.clone()),
                format!("Complaint {complaint_id} has no district"),
            );
        };

        let department = match resolve_department(&complaint, &reference) {
            Ok(department) => department,
            Err(raw_department) => {
                return AssignmentResult::failed(
                    FailureCategory::UnknownDepartment,
                    Some(complaint_id),
                    format!("Unknown department: {raw_department}"),
                )
            }
        };
        let pool = department.pool();

        let candidates = match self.store.eligible_candidates(pool, &district).await {
            Ok(candidates) => candidates,
            Err(e) => return self.store_failure(raw, &complaint_id, e).await,
        };
        let mut eligible = filter_eligible(candidates, &district);

        debug!(
            complaint_id = %complaint_id,
            department = %department,
            pool = %pool,
            district = %district,
            eligible = eligible.len(),
            "Resolved assignment candidates"
        );

        while let Some(index) = self.selector.pick(&eligible) {
            let chosen = &eligible[index];
            match self.store.assign_complaint(id, pool, chosen.id).await {
                Ok(()) => {
                    info!(
                        complaint_id = %complaint_id,
                        assignee_id = %chosen.id,
                        pool = %pool,
                        "🎯 Complaint assigned"
                    );
                    return AssignmentResult::assigned(
                        complaint_id,
                        Assignee::from_candidate(pool, chosen),
                    );
                }
                Err(StoreError::CapacityExhausted { .. }) => {
                    // Lost a race for the last slot; redraw from the rest
                    debug!(operator_id = %chosen.id, "Candidate filled up concurrently");
                    eligible.swap_remove(index);
                }
                Err(StoreError::NotFound { .. }) => return not_found(),
                Err(StoreError::AlreadyAssigned { .. }) => return already_assigned(),
                Err(e) => return self.store_failure(raw, &complaint_id, e).await,
            }
        }

        AssignmentResult::failed(
            FailureCategory::NoEligibleCandidate,
            Some(complaint_id),
            no_available_message(pool, &district),
        )
    }

    async fn store_failure(&self, raw: &str, complaint_id: &str, err: StoreError) -> AssignmentResult {
        let category = if err.is_transient() {
            if let Err(e) = self.queue.push(&self.config.processed_queue, raw).await {
                log_error("assignment", "requeue", &e.to_string(), Some(raw));
            }
            FailureCategory::TransientStore
        } else {
            log_error("assignment", "store", &err.to_string(), Some(raw));
            self.dead_letter(raw).await;
            FailureCategory::StoreFailure
        };
        AssignmentResult::failed(
            category,
            Some(complaint_id.to_string()),
            format!("Store error while assigning complaint {complaint_id}: {err}"),
        )
    }

    async fn dead_letter(&self, raw: &str) {
        if let Err(e) = self.queue.push(&self.config.dead_letter_queue, raw).await {
            log_error("assignment", "dead_letter", &e.to_string(), Some(raw));
        }
    }
}

/// Stored location district wins over the reference's district
fn resolve_district(complaint: &PersistedComplaint, reference: &ProcessedReference) -> Option<String> {
    complaint
        .location_district()
        .map(str::to_string)
        .or_else(|| {
            reference
                .district
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
        })
}

/// Reference department first, stored department otherwise
fn resolve_department(
    complaint: &PersistedComplaint,
    reference: &ProcessedReference,
) -> Result<Department, String> {
    match reference
        .assigned_department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        Some(raw) => raw.parse::<Department>().map_err(|_| raw.to_string()),
        None => Ok(complaint.department),
    }
}

pub fn no_available_message(pool: OperatorPool, district: &str) -> String {
    format!("No available {} in {district}", pool.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplaintLocation, ComplaintStatus, Urgency};
    use chrono::Utc;

    fn complaint(location_district: Option<&str>) -> PersistedComplaint {
        PersistedComplaint {
            id: Uuid::new_v4(),
            seq: 1,
            submitter_id: "u1".to_string(),
            category_id: "c1".to_string(),
            sub_category: "Potholes".to_string(),
            description: String::new(),
            description_fingerprint: String::new(),
            urgency: Urgency::Low,
            department: Department::Infrastructure,
            is_public: true,
            is_duplicate: false,
            attachment_url: None,
            status: ComplaintStatus::Registered,
            assigned_agent_id: None,
            managed_by_admin_id: None,
            location: location_district.map(|d| ComplaintLocation {
                pin: "834001".to_string(),
                district: d.to_string(),
                city: d.to_string(),
                locality: "Kanke".to_string(),
                street: None,
                latitude: None,
                longitude: None,
            }),
            submission_date: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn reference(department: Option<&str>, district: Option<&str>) -> ProcessedReference {
        ProcessedReference {
            id: Uuid::new_v4().to_string(),
            assigned_department: department.map(str::to_string),
            district: district.map(str::to_string),
        }
    }

    #[test]
    fn test_location_district_preferred() {
        let resolved = resolve_district(&complaint(Some("Dhanbad")), &reference(None, Some("Ranchi")));
        assert_eq!(resolved.as_deref(), Some("Dhanbad"));
    }

    #[test]
    fn test_reference_district_fallback() {
        let resolved = resolve_district(&complaint(None), &reference(None, Some("Ranchi")));
        assert_eq!(resolved.as_deref(), Some("Ranchi"));
        assert_eq!(resolve_district(&complaint(None), &reference(None, Some("  "))), None);
    }

    #[test]
    fn test_department_resolution() {
        let c = complaint(None);
        assert_eq!(
            resolve_department(&c, &reference(Some("HEALTH"), None)).unwrap(),
            Department::Health
        );
        assert_eq!(
            resolve_department(&c, &reference(None, None)).unwrap(),
            Department::Infrastructure
        );
        assert_eq!(
            resolve_department(&c, &reference(Some("ASTRONOMY"), None)).unwrap_err(),
            "ASTRONOMY"
        );
    }

    #[test]
    fn test_no_available_message() {
        assert_eq!(
            no_available_message(OperatorPool::Agent, "Ranchi"),
            "No available agents in Ranchi"
        );
        assert_eq!(
            no_available_message(OperatorPool::MunicipalAdmin, "Bokaro"),
            "No available municipal admins in Bokaro"
        );
    }
}
