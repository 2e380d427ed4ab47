use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::template::AppraisalType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Planned,
    Active,
    Closed,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Planned => "PLANNED",
            CycleStatus::Active => "ACTIVE",
            CycleStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for CycleStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PLANNED" => Ok(CycleStatus::Planned),
            "ACTIVE" => Ok(CycleStatus::Active),
            "CLOSED" => Ok(CycleStatus::Closed),
            other => Err(AppError::validation(format!("Invalid cycle status: {other}"))),
        }
    }
}

/// Binds one template to the departments it is rolled out to within a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleTemplateAssignment {
    pub template_id: String,
    pub department_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalCycle {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cycle_type: AppraisalType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CycleStatus,
    pub template_assignments: Vec<CycleTemplateAssignment>,
    pub manager_due_date: Option<DateTime<Utc>>,
    pub employee_acknowledgement_due_date: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppraisalCycle {
    pub fn department_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .template_assignments
            .iter()
            .flat_map(|assignment| assignment.department_ids.iter().map(String::as_str))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn binds(&self, template_id: &str, department_id: &str) -> bool {
        self.template_assignments.iter().any(|assignment| {
            assignment.template_id == template_id
                && assignment.department_ids.iter().any(|id| id == department_id)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleCreateInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub cycle_type: AppraisalType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub template_assignments: Vec<CycleTemplateAssignment>,
    #[serde(default)]
    pub manager_due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub employee_acknowledgement_due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CycleListFilters {
    pub status: Option<CycleStatus>,
}
