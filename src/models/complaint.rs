//! # Complaint Model
//!
//! Durable complaint records and the enumerations that classify them.
//!
//! ## Database Schema
//!
//! Maps to the `complaints` table with a 1:1 `complaint_locations` row:
//! - `id`: Primary key (UUID)
//! - `seq`: Human-facing sequence number (BIGSERIAL)
//! - `description_fingerprint`: SHA-256 of the normalized description, used for
//!   duplicate detection together with submitter, category, and sub-category
//! - `is_duplicate`: Set when an earlier matching complaint exists in the window
//! - `assigned_agent_id` / `managed_by_admin_id`: Written by the assignment engine

use super::operator::OperatorPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a persisted complaint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    Registered,
    UnderProcessing,
    Completed,
    OnHold,
    Forwarded,
    Rejected,
    EscalatedToMunicipalLevel,
    EscalatedToStateLevel,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::UnderProcessing => "UNDER_PROCESSING",
            Self::Completed => "COMPLETED",
            Self::OnHold => "ON_HOLD",
            Self::Forwarded => "FORWARDED",
            Self::Rejected => "REJECTED",
            Self::EscalatedToMunicipalLevel => "ESCALATED_TO_MUNICIPAL_LEVEL",
            Self::EscalatedToStateLevel => "ESCALATED_TO_STATE_LEVEL",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTERED" => Ok(Self::Registered),
            "UNDER_PROCESSING" => Ok(Self::UnderProcessing),
            "COMPLETED" => Ok(Self::Completed),
            "ON_HOLD" => Ok(Self::OnHold),
            "FORWARDED" => Ok(Self::Forwarded),
            "REJECTED" => Ok(Self::Rejected),
            "ESCALATED_TO_MUNICIPAL_LEVEL" => Ok(Self::EscalatedToMunicipalLevel),
            "ESCALATED_TO_STATE_LEVEL" => Ok(Self::EscalatedToStateLevel),
            other => Err(format!("Unknown complaint status: {other}")),
        }
    }
}

/// Department a complaint is routed to
///
/// Departments partition exactly into the agent pool and the municipal admin
/// pool; see [`Department::pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    Infrastructure,
    WaterSupplySanitation,
    ElectricityPower,
    MunicipalServices,
    Environment,
    PoliceServices,
    Education,
    Revenue,
    Health,
    Transportation,
    HousingUrbanDevelopment,
    SocialWelfare,
    PublicGrievances,
}

impl Department {
    pub const ALL: [Department; 13] = [
        Self::Infrastructure,
        Self::WaterSupplySanitation,
        Self::ElectricityPower,
        Self::MunicipalServices,
        Self::Environment,
        Self::PoliceServices,
        Self::Education,
        Self::Revenue,
        Self::Health,
        Self::Transportation,
        Self::HousingUrbanDevelopment,
        Self::SocialWelfare,
        Self::PublicGrievances,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Infrastructure => "INFRASTRUCTURE",
            Self::WaterSupplySanitation => "WATER_SUPPLY_SANITATION",
            Self::ElectricityPower => "ELECTRICITY_POWER",
            Self::MunicipalServices => "MUNICIPAL_SERVICES",
            Self::Environment => "ENVIRONMENT",
            Self::PoliceServices => "POLICE_SERVICES",
            Self::Education => "EDUCATION",
            Self::Revenue => "REVENUE",
            Self::Health => "HEALTH",
            Self::Transportation => "TRANSPORTATION",
            Self::HousingUrbanDevelopment => "HOUSING_URBAN_DEVELOPMENT",
            Self::SocialWelfare => "SOCIAL_WELFARE",
            Self::PublicGrievances => "PUBLIC_GRIEVANCES",
        }
    }

    /// Operator pool responsible for this department
    pub fn pool(&self) -> OperatorPool {
        match self {
            Self::Infrastructure
            | Self::WaterSupplySanitation
            | Self::ElectricityPower
            | Self::MunicipalServices
            | Self::Environment
            | Self::PoliceServices => OperatorPool::Agent,
            Self::Education
            | Self::Revenue
            | Self::Health
            | Self::Transportation
            | Self::HousingUrbanDevelopment
            | Self::SocialWelfare
            | Self::PublicGrievances => OperatorPool::MunicipalAdmin,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Unknown department: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("Unknown urgency: {other}")),
        }
    }
}

/// Where a complaint was raised (1:1 with the complaint)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintLocation {
    pub pin: String,
    pub district: String,
    pub city: String,
    pub locality: String,
    pub street: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A durable complaint record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedComplaint {
    pub id: Uuid,
    pub seq: i64,
    pub submitter_id: String,
    pub category_id: String,
    pub sub_category: String,
    pub description: String,
    pub description_fingerprint: String,
    pub urgency: Urgency,
    pub department: Department,
    pub is_public: bool,
    pub is_duplicate: bool,
    pub attachment_url: Option<String>,
    pub status: ComplaintStatus,
    pub assigned_agent_id: Option<Uuid>,
    pub managed_by_admin_id: Option<Uuid>,
    pub location: Option<ComplaintLocation>,
    pub submission_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedComplaint {
    /// District from the stored location, when one exists and is non-blank
    pub fn location_district(&self) -> Option<&str> {
        self.location
            .as_ref()
            .map(|l| l.district.trim())
            .filter(|d| !d.is_empty())
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_agent_id.is_some() || self.managed_by_admin_id.is_some()
    }
}

/// Insert payload for a validated complaint
#[derive(Debug, Clone, PartialEq)]
pub struct NewComplaint {
    pub submitter_id: String,
    pub category_id: String,
    pub sub_category: String,
    pub description: String,
    pub description_fingerprint: String,
    pub urgency: Urgency,
    pub department: Department,
    pub is_public: bool,
    pub is_duplicate: bool,
    pub attachment_url: Option<String>,
    pub location: ComplaintLocation,
}
