use serde::{Deserialize, Serialize};

use crate::models::assignment::AssignmentStatus;

pub const DEFAULT_DISPUTE_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_TREND_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalSettings {
    pub dispute_window_days: i64,
    pub default_assignment_status: AssignmentStatus,
    pub manager_fallback_to_department_head: bool,
    pub trend_history_limit: u32,
}

impl Default for AppraisalSettings {
    fn default() -> Self {
        Self {
            dispute_window_days: DEFAULT_DISPUTE_WINDOW_DAYS,
            default_assignment_status: AssignmentStatus::NotStarted,
            manager_fallback_to_department_head: true,
            trend_history_limit: DEFAULT_TREND_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppraisalSettingsUpdate {
    pub dispute_window_days: Option<i64>,
    pub default_assignment_status: Option<AssignmentStatus>,
    pub manager_fallback_to_department_head: Option<bool>,
    pub trend_history_limit: Option<u32>,
}
