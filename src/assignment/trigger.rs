//! # Assignment Triggers
//!
//! Entries on the assignment-trigger queue arrive in several historical
//! shapes: a JSON object, a JSON string wrapping an object, with the id under
//! `id`, `complaintId` or `_id`, and the jurisdiction under one of several
//! keys. [`TriggerRecord::normalize`] folds them into one record before any
//! business logic runs.

use serde_json::Value;
use thiserror::Error;

/// Object paths searched for the complaint id, in order
const ID_FIELDS: &[&[&str]] = &[&["id"], &["complaintId"], &["_id"]];

/// Object paths searched for the jurisdiction, in order
const JURISDICTION_FIELDS: &[&[&str]] = &[
    &["jurisdiction"],
    &["location", "city"],
    &["location", "municipal"],
    &["municipality"],
    &["location", "district"],
    &["district"],
    &["city"],
];

/// Wrapped JSON strings are unwrapped at most this many times
const MAX_STRING_NESTING: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("Trigger payload is not valid JSON: {0}")]
    Unparseable(String),

    #[error("Trigger payload is not a JSON object")]
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRecord {
    pub complaint_id: Option<String>,
    pub jurisdiction: Option<String>,
}

impl TriggerRecord {
    pub fn normalize(raw: &str) -> Result<Self, TriggerError> {
        let mut value: Value =
            serde_json::from_str(raw).map_err(|e| TriggerError::Unparseable(e.to_string()))?;

        for _ in 0..MAX_STRING_NESTING {
            match value {
                Value::String(inner) => {
                    value = serde_json::from_str(&inner)
                        .map_err(|e| TriggerError::Unparseable(e.to_string()))?;
                }
                _ => break,
            }
        }

        if !value.is_object() {
            return Err(TriggerError::NotAnObject);
        }

        Ok(Self {
            complaint_id: first_present(&value, ID_FIELDS),
            jurisdiction: first_present(&value, JURISDICTION_FIELDS),
        })
    }
}

fn first_present(value: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        let found = path.iter().try_fold(value, |current, key| current.get(key))?;
        scalar_text(found)
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
