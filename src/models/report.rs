use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::assignment::AssignmentStatus;
use crate::models::cycle::CycleStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStatusBreakdown {
    pub not_started: i64,
    pub in_progress: i64,
    pub submitted: i64,
    pub published: i64,
    pub acknowledged: i64,
}

impl AssignmentStatusBreakdown {
    pub fn record(&mut self, status: AssignmentStatus, count: i64) {
        match status {
            AssignmentStatus::NotStarted => self.not_started += count,
            AssignmentStatus::InProgress => self.in_progress += count,
            AssignmentStatus::Submitted => self.submitted += count,
            AssignmentStatus::Published => self.published += count,
            AssignmentStatus::Acknowledged => self.acknowledged += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.not_started + self.in_progress + self.submitted + self.published + self.acknowledged
    }

    pub fn completed(&self) -> i64 {
        self.published + self.acknowledged
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DisputeTotals {
    pub total: i64,
    pub open: i64,
    pub under_review: i64,
    pub resolved: i64,
    pub rejected: i64,
}

impl DisputeTotals {
    pub fn active(&self) -> i64 {
        self.open + self.under_review
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle_id: String,
    pub cycle_name: String,
    pub status: CycleStatus,
    pub total_assignments: i64,
    pub assignments: AssignmentStatusBreakdown,
    pub submitted_records: i64,
    pub published_records: i64,
    pub acknowledged_records: i64,
    pub average_score: Option<f64>,
    pub disputes: DisputeTotals,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentReport {
    pub department_id: String,
    pub cycle_id: Option<String>,
    pub total_assignments: i64,
    pub completed_assignments: i64,
    pub completion_rate: f64,
    pub average_score: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentProgress {
    pub department_id: String,
    pub cycle_id: Option<String>,
    pub total: i64,
    pub breakdown: AssignmentStatusBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeTrendPoint {
    pub appraisal_id: String,
    pub cycle_id: String,
    pub cycle_name: String,
    pub template_id: String,
    pub total_score: f64,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_templates: i64,
    pub planned_cycles: i64,
    pub active_cycles: i64,
    pub closed_cycles: i64,
    pub assignments: AssignmentStatusBreakdown,
    pub submitted_records: i64,
    pub published_records: i64,
    pub active_disputes: i64,
    pub average_published_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub format: ExportFormat,
    pub content_type: String,
    pub content: String,
    pub record_count: usize,
    pub generated_at: DateTime<Utc>,
}
