use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Rejected,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "OPEN",
            DisputeStatus::UnderReview => "UNDER_REVIEW",
            DisputeStatus::Resolved => "RESOLVED",
            DisputeStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DisputeStatus::Open | DisputeStatus::UnderReview)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DisputeStatus::Resolved | DisputeStatus::Rejected)
    }
}

impl FromStr for DisputeStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "OPEN" => Ok(DisputeStatus::Open),
            "UNDER_REVIEW" => Ok(DisputeStatus::UnderReview),
            "RESOLVED" => Ok(DisputeStatus::Resolved),
            "REJECTED" => Ok(DisputeStatus::Rejected),
            other => Err(AppError::validation(format!(
                "Invalid dispute status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalDispute {
    pub id: String,
    pub appraisal_id: String,
    pub assignment_id: String,
    pub cycle_id: String,
    pub raised_by_employee_id: String,
    pub reason: String,
    pub details: Option<String>,
    pub status: DisputeStatus,
    pub resolved_by_employee_id: Option<String>,
    pub resolution_summary: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisputeCreateInput {
    pub appraisal_id: String,
    pub raised_by_employee_id: String,
    pub reason: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisputeResolutionInput {
    pub status: DisputeStatus,
    #[serde(default)]
    pub resolution_summary: Option<String>,
    #[serde(default)]
    pub resolved_by_employee_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DisputeListFilters {
    pub status: Option<DisputeStatus>,
    pub cycle_id: Option<String>,
}
