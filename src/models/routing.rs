//! # Routing Types
//!
//! Processed Queue references and the result of an assignment attempt.

use super::operator::{OperatorCandidate, OperatorPool};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Processed Queue entry: enough to route without a store round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedReference {
    pub id: String,
    #[serde(default, alias = "department", skip_serializing_if = "Option::is_none")]
    pub assigned_department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

impl ProcessedReference {
    pub fn new(id: Uuid, department: impl Into<String>, district: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            assigned_department: Some(department.into()),
            district: Some(district.into()),
        }
    }

    /// Decode a queue entry, requiring a non-empty id
    pub fn parse(payload: &str) -> Result<Self, String> {
        let reference: Self = serde_json::from_str(payload).map_err(|e| e.to_string())?;
        if reference.id.trim().is_empty() {
            return Err("reference has an empty id".to_string());
        }
        Ok(reference)
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Why an assignment attempt did not produce an assignee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    QueueEmpty,
    ComplaintNotFound,
    MissingDistrict,
    UnknownDepartment,
    NoEligibleCandidate,
    MalformedReference,
    /// Complaint already carries an assignee; the reference is dropped
    AlreadyAssigned,
    /// Store failed transiently; the reference went back on the queue
    TransientStore,
    /// Store failed permanently; the reference was dead-lettered
    StoreFailure,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::QueueEmpty => "queue_empty",
            Self::ComplaintNotFound => "complaint_not_found",
            Self::MissingDistrict => "missing_district",
            Self::UnknownDepartment => "unknown_department",
            Self::NoEligibleCandidate => "no_eligible_candidate",
            Self::MalformedReference => "malformed_reference",
            Self::AlreadyAssigned => "already_assigned",
            Self::TransientStore => "transient_store",
            Self::StoreFailure => "store_failure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub kind: OperatorPool,
    pub id: Uuid,
    pub name: String,
}

impl Assignee {
    pub fn from_candidate(pool: OperatorPool, candidate: &OperatorCandidate) -> Self {
        Self {
            kind: pool,
            id: candidate.id,
            name: candidate.name.clone(),
        }
    }
}

/// Outcome of one assignment attempt; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaint_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureCategory>,
}

impl AssignmentResult {
    pub fn assigned(complaint_id: impl Into<String>, assignee: Assignee) -> Self {
        let complaint_id = complaint_id.into();
        let message = format!(
            "Complaint {complaint_id} assigned to {} {}",
            assignee.kind, assignee.name
        );
        Self {
            success: true,
            complaint_id: Some(complaint_id),
            message,
            assignee: Some(assignee),
            failure: None,
        }
    }

    pub fn failed(
        category: FailureCategory,
        complaint_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            complaint_id,
            message: message.into(),
            assignee: None,
            failure: Some(category),
        }
    }

    pub fn is_queue_empty(&self) -> bool {
        self.failure == Some(FailureCategory::QueueEmpty)
    }
}
