use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    NotStarted,
    InProgress,
    Submitted,
    Published,
    Acknowledged,
}

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 5] = [
        AssignmentStatus::NotStarted,
        AssignmentStatus::InProgress,
        AssignmentStatus::Submitted,
        AssignmentStatus::Published,
        AssignmentStatus::Acknowledged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::NotStarted => "NOT_STARTED",
            AssignmentStatus::InProgress => "IN_PROGRESS",
            AssignmentStatus::Submitted => "SUBMITTED",
            AssignmentStatus::Published => "PUBLISHED",
            AssignmentStatus::Acknowledged => "ACKNOWLEDGED",
        }
    }

    /// A manager may still submit ratings.
    pub fn accepts_submission(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::NotStarted | AssignmentStatus::InProgress
        )
    }
}

impl FromStr for AssignmentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "NOT_STARTED" => Ok(AssignmentStatus::NotStarted),
            "IN_PROGRESS" => Ok(AssignmentStatus::InProgress),
            "SUBMITTED" => Ok(AssignmentStatus::Submitted),
            "PUBLISHED" => Ok(AssignmentStatus::Published),
            "ACKNOWLEDGED" => Ok(AssignmentStatus::Acknowledged),
            other => Err(AppError::validation(format!(
                "Invalid assignment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalAssignment {
    pub id: String,
    pub cycle_id: String,
    pub template_id: String,
    pub employee_profile_id: String,
    pub manager_profile_id: Option<String>,
    pub department_id: String,
    pub position_id: Option<String>,
    pub status: AssignmentStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub latest_appraisal_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCreateInput {
    pub cycle_id: String,
    pub template_id: String,
    pub employee_profile_id: String,
    #[serde(default)]
    pub manager_profile_id: Option<String>,
    pub department_id: String,
    #[serde(default)]
    pub position_id: Option<String>,
    #[serde(default)]
    pub status: Option<AssignmentStatus>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}
