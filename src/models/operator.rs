//! # Operator Model
//!
//! Field agents and municipal administrators who receive complaint
//! assignments. The two pools are disjoint and live in separate tables
//! (`agents`, `municipal_admins`) sharing the same shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which operator table a candidate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorPool {
    Agent,
    MunicipalAdmin,
}

impl OperatorPool {
    /// Plural label used in "No available ..." messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Agent => "agents",
            Self::MunicipalAdmin => "municipal admins",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Agent => "agents",
            Self::MunicipalAdmin => "municipal_admins",
        }
    }
}

impl fmt::Display for OperatorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => f.write_str("AGENT"),
            Self::MunicipalAdmin => f.write_str("MUNICIPAL_ADMIN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorStatus {
    Active,
    Inactive,
}

impl OperatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for OperatorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            other => Err(format!("Unknown operator status: {other}")),
        }
    }
}

/// An operator that may receive an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCandidate {
    pub id: Uuid,
    pub name: String,
    /// Municipality the operator serves
    pub jurisdiction: String,
    pub current_workload: i32,
    pub workload_limit: i32,
    pub status: OperatorStatus,
}

impl OperatorCandidate {
    /// Eligible only while ACTIVE and below the workload limit
    pub fn is_eligible(&self) -> bool {
        self.status == OperatorStatus::Active && self.has_capacity()
    }

    pub fn has_capacity(&self) -> bool {
        self.current_workload < self.workload_limit
    }

    pub fn serves(&self, jurisdiction: &str) -> bool {
        same_jurisdiction(&self.jurisdiction, jurisdiction)
    }
}

/// Jurisdiction equality as the store applies it: `LOWER(TRIM(..))` on both sides
pub fn same_jurisdiction(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}
