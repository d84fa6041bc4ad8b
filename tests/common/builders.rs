use chrono::Utc;
use complaint_pipeline::bootstrap::PipelineComponents;
use complaint_pipeline::config::PipelineConfig;
use complaint_pipeline::database::InMemoryComplaintStore;
use complaint_pipeline::messaging::InMemoryListQueue;
use complaint_pipeline::models::{
    ComplaintLocation, ComplaintStatus, Department, OperatorCandidate, OperatorPool,
    OperatorStatus, PersistedComplaint, ProcessedReference, Urgency,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Pipeline stages over in-memory backends
pub struct TestPipeline {
    pub config: PipelineConfig,
    pub queue: Arc<InMemoryListQueue>,
    pub store: Arc<InMemoryComplaintStore>,
    pub components: PipelineComponents,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let queue = Arc::new(InMemoryListQueue::new());
        let store = Arc::new(InMemoryComplaintStore::new());
        let components = PipelineComponents::new(&config, queue.clone(), store.clone());
        Self {
            config,
            queue,
            store,
            components,
        }
    }

    pub fn registration_queue(&self) -> &str {
        &self.config.queue.registration_queue
    }

    pub fn processed_queue(&self) -> &str {
        &self.config.queue.processed_queue
    }

    pub fn assignment_queue(&self) -> &str {
        &self.config.queue.assignment_queue
    }

    pub fn dead_letter_queue(&self) -> &str {
        &self.config.queue.dead_letter_queue
    }

    /// Register an active operator and return its id
    pub fn add_operator(&self, pool: OperatorPool, jurisdiction: &str, workload: i32, limit: i32) -> Uuid {
        let candidate = CandidateBuilder::new(jurisdiction)
            .workload(workload, limit)
            .build();
        let id = candidate.id;
        self.store.add_candidate(pool, candidate);
        id
    }

    /// Store `complaint` and enqueue a reference to it
    pub async fn enqueue_reference(&self, complaint: PersistedComplaint, reference: ProcessedReference) {
        use complaint_pipeline::messaging::ListQueue;
        self.store.insert_complaint(complaint);
        self.queue
            .push(self.processed_queue(), &reference.to_payload().unwrap())
            .await
            .unwrap();
    }
}

pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.assignment.selection_seed = Some(7);
    config
}

pub struct CandidateBuilder {
    candidate: OperatorCandidate,
}

impl CandidateBuilder {
    pub fn new(jurisdiction: &str) -> Self {
        Self {
            candidate: OperatorCandidate {
                id: Uuid::new_v4(),
                name: format!("Operator {}", fastrand::u32(1000..9999)),
                jurisdiction: jurisdiction.to_string(),
                current_workload: 0,
                workload_limit: 10,
                status: OperatorStatus::Active,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.candidate.name = name.to_string();
        self
    }

    pub fn workload(mut self, current: i32, limit: i32) -> Self {
        self.candidate.current_workload = current;
        self.candidate.workload_limit = limit;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.candidate.status = OperatorStatus::Inactive;
        self
    }

    pub fn build(self) -> OperatorCandidate {
        self.candidate
    }
}

pub struct ComplaintBuilder {
    complaint: PersistedComplaint,
}

impl ComplaintBuilder {
    pub fn new(department: Department) -> Self {
        let now = Utc::now();
        Self {
            complaint: PersistedComplaint {
                id: Uuid::new_v4(),
                seq: 0,
                submitter_id: "u1".to_string(),
                category_id: "c1".to_string(),
                sub_category: "General".to_string(),
                description: String::new(),
                description_fingerprint: String::new(),
                urgency: Urgency::Low,
                department,
                is_public: true,
                is_duplicate: false,
                attachment_url: None,
                status: ComplaintStatus::Registered,
                assigned_agent_id: None,
                managed_by_admin_id: None,
                location: None,
                submission_date: now,
                updated_at: now,
            },
        }
    }

    pub fn district(mut self, district: &str) -> Self {
        self.complaint.location = Some(ComplaintLocation {
            pin: "834001".to_string(),
            district: district.to_string(),
            city: district.to_string(),
            locality: "Main Road".to_string(),
            street: None,
            latitude: None,
            longitude: None,
        });
        self
    }

    pub fn build(self) -> PersistedComplaint {
        self.complaint
    }
}

/// Reference as the ingestion stage would push it
pub fn reference_for(complaint: &PersistedComplaint, district: Option<&str>) -> ProcessedReference {
    ProcessedReference {
        id: complaint.id.to_string(),
        assigned_department: Some(complaint.department.as_str().to_string()),
        district: district.map(str::to_string),
    }
}

pub fn submission(submitter: &str, sub_category: &str, description: &str) -> Value {
    json!({
        "submitterId": submitter,
        "categoryId": "c1",
        "subCategory": sub_category,
        "description": description,
        "assignedDepartment": "WATER_SUPPLY_SANITATION",
        "isPublic": true,
        "location": {
            "pin": "834001",
            "district": "Ranchi",
            "city": "Ranchi",
            "locality": "Lewis Road"
        }
    })
}
