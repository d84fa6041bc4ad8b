//! # Raw Submissions
//!
//! Wire shape of an Ingestion Queue entry and its validation into a typed
//! complaint. Parsing is split in two so that payloads which are not JSON at
//! all can be told apart from JSON that fails the schema.

use super::complaint::{ComplaintLocation, Department, NewComplaint, Urgency};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Schema failure for a submission; carries every issue found
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Invalid complaint submission: {}", issues.join("; "))]
pub struct SubmissionError {
    pub issues: Vec<String>,
}

impl SubmissionError {
    fn single(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub pin: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub street: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// An Ingestion Queue entry as pushed by form-submission collaborators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubmission {
    #[serde(alias = "userId", alias = "complainantId")]
    pub submitter_id: Option<String>,
    pub category_id: Option<String>,
    pub sub_category: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<String>,
    pub assigned_department: Option<String>,
    pub is_public: Option<bool>,
    pub attachment_url: Option<String>,
    pub location: Option<RawLocation>,
}

/// A submission that passed schema validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub submitter_id: String,
    pub category_id: String,
    pub sub_category: String,
    pub description: String,
    pub urgency: Urgency,
    pub department: Department,
    pub is_public: bool,
    pub attachment_url: Option<String>,
    pub location: ComplaintLocation,
}

/// Fields that identify a logical complaint for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub submitter_id: String,
    pub category_id: String,
    pub sub_category: String,
    pub description_fingerprint: String,
}

impl RawSubmission {
    /// Decode a parsed JSON value; type mismatches are schema failures
    pub fn from_value(value: serde_json::Value) -> Result<Self, SubmissionError> {
        if !value.is_object() {
            return Err(SubmissionError::single("submission must be a JSON object"));
        }
        serde_json::from_value(value).map_err(|e| SubmissionError::single(e.to_string()))
    }

    pub fn validate(self) -> Result<ValidatedSubmission, SubmissionError> {
        let mut issues = Vec::new();

        let submitter_id = required(self.submitter_id, "submitterId", &mut issues);
        let category_id = required(self.category_id, "categoryId", &mut issues);
        let sub_category = required(self.sub_category, "subCategory", &mut issues);

        let department = match self.assigned_department.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push("assignedDepartment is required".to_string());
                None
            }
            Some(raw) => match raw.parse::<Department>() {
                Ok(d) => Some(d),
                Err(e) => {
                    issues.push(e);
                    None
                }
            },
        };

        let urgency = match self.urgency.as_deref().map(str::trim) {
            None | Some("") => Urgency::default(),
            Some(raw) => raw.parse::<Urgency>().unwrap_or_else(|e| {
                issues.push(e);
                Urgency::default()
            }),
        };

        if self.is_public.is_none() {
            issues.push("isPublic is required".to_string());
        }

        let location = match self.location {
            Some(raw) => validate_location(raw, &mut issues),
            None => {
                issues.push("location is required".to_string());
                None
            }
        };

        match (submitter_id, category_id, sub_category, department, self.is_public, location) {
            (Some(submitter_id), Some(category_id), Some(sub_category), Some(department), Some(is_public), Some(location))
                if issues.is_empty() =>
            {
                Ok(ValidatedSubmission {
                    submitter_id,
                    category_id,
                    sub_category,
                    description: self.description.unwrap_or_default(),
                    urgency,
                    department,
                    is_public,
                    attachment_url: self.attachment_url.filter(|u| !u.trim().is_empty()),
                    location,
                })
            }
            _ => Err(SubmissionError { issues }),
        }
    }
}

fn required(value: Option<String>, field: &str, issues: &mut Vec<String>) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            issues.push(format!("{field} is required"));
            None
        }
    }
}

fn validate_location(raw: RawLocation, issues: &mut Vec<String>) -> Option<ComplaintLocation> {
    let before = issues.len();

    let pin = match raw.pin.map(|p| p.trim().to_string()) {
        Some(p) if p.len() == 6 && p.chars().all(|c| c.is_ascii_digit()) => Some(p),
        Some(p) => {
            issues.push(format!("location.pin must be 6 digits, got '{p}'"));
            None
        }
        None => {
            issues.push("location.pin is required".to_string());
            None
        }
    };
    let district = required(raw.district, "location.district", issues);
    let city = required(raw.city, "location.city", issues);
    let locality = required(raw.locality, "location.locality", issues);

    if let Some(lat) = raw.latitude {
        if !(-90.0..=90.0).contains(&lat) {
            issues.push(format!("location.latitude out of range: {lat}"));
        }
    }
    if let Some(lon) = raw.longitude {
        if !(-180.0..=180.0).contains(&lon) {
            issues.push(format!("location.longitude out of range: {lon}"));
        }
    }

    if issues.len() != before {
        return None;
    }

    Some(ComplaintLocation {
        pin: pin?,
        district: district?,
        city: city?,
        locality: locality?,
        street: raw.street.filter(|s| !s.trim().is_empty()),
        latitude: raw.latitude,
        longitude: raw.longitude,
    })
}

impl ValidatedSubmission {
    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey {
            submitter_id: self.submitter_id.clone(),
            category_id: self.category_id.clone(),
            sub_category: self.sub_category.clone(),
            description_fingerprint: description_fingerprint(&self.description),
        }
    }

    pub fn into_new_complaint(self, is_duplicate: bool) -> NewComplaint {
        let description_fingerprint = description_fingerprint(&self.description);
        NewComplaint {
            submitter_id: self.submitter_id,
            category_id: self.category_id,
            sub_category: self.sub_category,
            description: self.description,
            description_fingerprint,
            urgency: self.urgency,
            department: self.department,
            is_public: self.is_public,
            is_duplicate,
            attachment_url: self.attachment_url,
            location: self.location,
        }
    }
}

/// SHA-256 (hex) of the description, lower-cased with whitespace collapsed
pub fn description_fingerprint(description: &str) -> String {
    let normalized = description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_json() -> serde_json::Value {
        json!({
            "submitterId": "u1",
            "categoryId": "c1",
            "subCategory": "Water Leakage",
            "description": "Pipe burst near the market",
            "assignedDepartment": "WATER_SUPPLY_SANITATION",
            "isPublic": true,
            "location": {
                "pin": "560001",
                "district": "Ranchi",
                "city": "Ranchi",
                "locality": "Lewis Road"
            }
        })
    }

    #[test]
    fn test_valid_submission() {
        let submission = RawSubmission::from_value(valid_json()).unwrap().validate().unwrap();
        assert_eq!(submission.submitter_id, "u1");
        assert_eq!(submission.department, Department::WaterSupplySanitation);
        assert_eq!(submission.urgency, Urgency::Low);
        assert_eq!(submission.location.street, None);
    }

    #[test]
    fn test_submitter_aliases_accepted() {
        let mut value = valid_json();
        let obj = value.as_object_mut().unwrap();
        obj.remove("submitterId");
        obj.insert("userId".to_string(), json!("u9"));

        let submission = RawSubmission::from_value(value).unwrap().validate().unwrap();
        assert_eq!(submission.submitter_id, "u9");
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let err = RawSubmission::from_value(json!({"categoryId": "c1"}))
            .unwrap()
            .validate()
            .unwrap_err();

        assert!(err.issues.iter().any(|i| i.contains("submitterId")));
        assert!(err.issues.iter().any(|i| i.contains("assignedDepartment")));
        assert!(err.issues.iter().any(|i| i.contains("isPublic")));
        assert!(err.issues.iter().any(|i| i.contains("location")));
    }

    #[test]
    fn test_unknown_department_rejected() {
        let mut value = valid_json();
        value["assignedDepartment"] = json!("SPACE_PROGRAM");
        let err = RawSubmission::from_value(value).unwrap().validate().unwrap_err();
        assert!(err.issues.iter().any(|i| i.contains("Unknown department")));
    }

    #[test]
    fn test_location_rules() {
        let mut value = valid_json();
        value["location"]["pin"] = json!("5600");
        value["location"]["latitude"] = json!(91.5);
        let err = RawSubmission::from_value(value).unwrap().validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }

    #[test]
    fn test_type_mismatch_is_schema_failure() {
        let mut value = valid_json();
        value["isPublic"] = json!("yes");
        assert!(RawSubmission::from_value(value).is_err());
        assert!(RawSubmission::from_value(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_fingerprint_normalizes_case_and_whitespace() {
        assert_eq!(
            description_fingerprint("Pipe  burst\n near market"),
            description_fingerprint("pipe burst near MARKET")
        );
        assert_ne!(
            description_fingerprint("pipe burst"),
            description_fingerprint("pipe leak")
        );
        assert_eq!(description_fingerprint("").len(), 64);
    }
}
