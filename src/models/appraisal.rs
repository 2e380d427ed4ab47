use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppraisalRecordStatus {
    ManagerSubmitted,
    HrPublished,
}

impl AppraisalRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppraisalRecordStatus::ManagerSubmitted => "MANAGER_SUBMITTED",
            AppraisalRecordStatus::HrPublished => "HR_PUBLISHED",
        }
    }
}

impl FromStr for AppraisalRecordStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "MANAGER_SUBMITTED" => Ok(AppraisalRecordStatus::ManagerSubmitted),
            "HR_PUBLISHED" => Ok(AppraisalRecordStatus::HrPublished),
            other => Err(AppError::validation(format!(
                "Invalid appraisal record status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingEntry {
    pub key: String,
    pub title: String,
    pub rating_value: Option<f64>,
    #[serde(default)]
    pub rating_label: Option<String>,
    #[serde(default)]
    pub weighted_score: Option<f64>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl RatingEntry {
    /// Value used for scoring: the weighted score when present, else the raw rating.
    pub fn effective_value(&self) -> Option<f64> {
        self.weighted_score.or(self.rating_value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalRecord {
    pub id: String,
    pub assignment_id: String,
    pub cycle_id: String,
    pub template_id: String,
    pub employee_profile_id: String,
    pub manager_profile_id: String,
    pub ratings: Vec<RatingEntry>,
    pub total_score: f64,
    pub status: AppraisalRecordStatus,
    pub manager_submitted_at: DateTime<Utc>,
    pub hr_published_at: Option<DateTime<Utc>>,
    pub published_by_employee_id: Option<String>,
    pub employee_acknowledged_at: Option<DateTime<Utc>>,
    pub employee_acknowledgement_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalSubmitInput {
    pub assignment_id: String,
    #[serde(default)]
    pub ratings: Vec<RatingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppraisalListFilters {
    pub cycle_id: Option<String>,
    pub status: Option<AppraisalRecordStatus>,
}

/// Entry appended to the employee's appraisal history when a record is published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalHistoryEntry {
    pub appraisal_id: String,
    pub cycle_id: String,
    pub template_id: String,
    pub total_score: f64,
    pub published_at: DateTime<Utc>,
}
