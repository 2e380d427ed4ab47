use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::appraisal_repository::{AppraisalRepository, AppraisalRow};
use crate::db::repositories::assignment_repository::{AssignmentRepository, AssignmentRow};
use crate::db::repositories::codec::encode_time;
use crate::db::repositories::cycle_repository::CycleRepository;
use crate::db::repositories::dispute_repository::DisputeRepository;
use crate::db::repositories::template_repository::TemplateRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::appraisal::{AppraisalListFilters, AppraisalRecord, AppraisalRecordStatus};
use crate::models::assignment::AppraisalAssignment;
use crate::models::cycle::CycleStatus;
use crate::models::dispute::DisputeStatus;
use crate::models::principal::Principal;
use crate::models::report::{
    AssignmentStatusBreakdown, CycleReport, DashboardStats, DepartmentProgress, DepartmentReport,
    DisputeTotals, EmployeeTrendPoint, ExportFormat, ExportPayload,
};
use crate::services::access::ensure_can_act_on;
use crate::services::cycle_service::load_cycle;
use crate::services::directory::OrganizationDirectory;
use crate::services::settings_service::SettingsService;
use crate::utils::clock::SharedClock;

const CSV_HEADER: [&str; 11] = [
    "recordId",
    "assignmentId",
    "cycleId",
    "templateId",
    "employeeProfileId",
    "managerProfileId",
    "status",
    "totalScore",
    "managerSubmittedAt",
    "hrPublishedAt",
    "employeeAcknowledgedAt",
];

/// Read-only rollups over committed appraisal state.
pub struct ReportService {
    db: DbPool,
    organization: Arc<dyn OrganizationDirectory>,
    settings: Arc<SettingsService>,
    clock: SharedClock,
}

impl ReportService {
    pub fn new(
        db: DbPool,
        organization: Arc<dyn OrganizationDirectory>,
        settings: Arc<SettingsService>,
        clock: SharedClock,
    ) -> Self {
        Self {
            db,
            organization,
            settings,
            clock,
        }
    }

    pub fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let stats = self.db.with_connection(|conn| {
            let mut stats = DashboardStats {
                active_templates: TemplateRepository::count_active(conn)?,
                ..DashboardStats::default()
            };

            for (status, count) in CycleRepository::count_by_status(conn)? {
                match status {
                    CycleStatus::Planned => stats.planned_cycles += count,
                    CycleStatus::Active => stats.active_cycles += count,
                    CycleStatus::Closed => stats.closed_cycles += count,
                }
            }
            for (status, count) in AssignmentRepository::count_by_status(conn, None)? {
                stats.assignments.record(status, count);
            }
            for (status, count) in AppraisalRepository::count_by_status(conn, None)? {
                match status {
                    AppraisalRecordStatus::ManagerSubmitted => stats.submitted_records += count,
                    AppraisalRecordStatus::HrPublished => stats.published_records += count,
                }
            }
            stats.active_disputes = dispute_totals(conn, None)?.active();

            let published = published_records_for(conn, None)?;
            stats.average_published_score = average_score(&published);
            Ok(stats)
        })?;

        debug!(target: "app::report", active_cycles = stats.active_cycles, "dashboard stats computed");
        Ok(stats)
    }

    pub fn generate_cycle_report(&self, cycle_id: &str) -> AppResult<CycleReport> {
        let generated_at = self.clock.now();
        let report = self.db.with_connection(|conn| {
            let cycle = load_cycle(conn, cycle_id)?;

            let scope = Some(cycle.id.as_str());

            let mut assignments = AssignmentStatusBreakdown::default();
            for (status, count) in AssignmentRepository::count_by_status(conn, scope)? {
                assignments.record(status, count);
            }

            let mut submitted_records = 0;
            let mut published_records = 0;
            for (status, count) in AppraisalRepository::count_by_status(conn, scope)? {
                match status {
                    AppraisalRecordStatus::ManagerSubmitted => submitted_records += count,
                    AppraisalRecordStatus::HrPublished => published_records += count,
                }
            }

            let published = published_records_for(conn, scope)?;
            Ok(CycleReport {
                cycle_id: cycle.id.clone(),
                cycle_name: cycle.name.clone(),
                status: cycle.status,
                total_assignments: assignments.total(),
                assignments,
                submitted_records,
                published_records,
                acknowledged_records: AppraisalRepository::count_acknowledged(conn, scope)?,
                average_score: average_score(&published),
                disputes: dispute_totals(conn, scope)?,
                generated_at,
            })
        })?;

        info!(
            target: "app::report",
            cycle_id = %report.cycle_id,
            total_assignments = report.total_assignments,
            "cycle report generated"
        );
        Ok(report)
    }

    /// Completion and average score for one department, optionally within one cycle.
    pub fn generate_department_report(
        &self,
        department_id: &str,
        cycle_id: Option<&str>,
    ) -> AppResult<DepartmentReport> {
        let generated_at = self.clock.now();
        let report = self.db.with_connection(|conn| {
            let assignments = self.department_assignments(conn, department_id, cycle_id)?;
            let breakdown = breakdown_of(&assignments);

            let assignment_ids: HashSet<&str> =
                assignments.iter().map(|item| item.id.as_str()).collect();
            let published: Vec<AppraisalRecord> = published_records_for(conn, cycle_id)?
                .into_iter()
                .filter(|record| assignment_ids.contains(record.assignment_id.as_str()))
                .collect();

            Ok(DepartmentReport {
                department_id: department_id.to_string(),
                cycle_id: cycle_id.map(str::to_string),
                total_assignments: breakdown.total(),
                completed_assignments: breakdown.completed(),
                completion_rate: completion_rate(breakdown.completed(), breakdown.total()),
                average_score: average_score(&published),
                generated_at,
            })
        })?;

        info!(
            target: "app::report",
            department_id,
            completion_rate = report.completion_rate,
            "department report generated"
        );
        Ok(report)
    }

    pub fn get_department_progress(
        &self,
        department_id: &str,
        cycle_id: Option<&str>,
    ) -> AppResult<DepartmentProgress> {
        let assignments = self
            .db
            .with_connection(|conn| self.department_assignments(conn, department_id, cycle_id))?;
        let breakdown = breakdown_of(&assignments);
        Ok(DepartmentProgress {
            department_id: department_id.to_string(),
            cycle_id: cycle_id.map(str::to_string),
            total: breakdown.total(),
            breakdown,
        })
    }

    /// Published scores for one employee, newest first.
    pub fn get_employee_trend(
        &self,
        employee_id: &str,
        limit: Option<u32>,
        actor: &Principal,
    ) -> AppResult<Vec<EmployeeTrendPoint>> {
        ensure_can_act_on(actor, employee_id)?;
        let limit = match limit {
            Some(0) => return Err(AppError::validation("Trend limit must be positive")),
            Some(limit) => limit,
            None => self.settings.get()?.trend_history_limit,
        };

        let points = self.db.with_connection(|conn| {
            let rows =
                AppraisalRepository::list_published_for_employee(conn, employee_id, Some(limit))?;
            let mut cycle_names: HashMap<String, String> = HashMap::new();
            let mut points = Vec::with_capacity(rows.len());
            for row in rows {
                let record = row.into_record()?;
                let Some(published_at) = record.hr_published_at else {
                    continue;
                };
                let cycle_name = match cycle_names.get(&record.cycle_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = CycleRepository::find_by_id(conn, &record.cycle_id)?
                            .map(|cycle| cycle.name)
                            .unwrap_or_default();
                        cycle_names.insert(record.cycle_id.clone(), name.clone());
                        name
                    }
                };
                points.push(EmployeeTrendPoint {
                    appraisal_id: record.id,
                    cycle_id: record.cycle_id,
                    cycle_name,
                    template_id: record.template_id,
                    total_score: record.total_score,
                    published_at,
                });
            }
            Ok(points)
        })?;

        debug!(target: "app::report", employee_id, count = points.len(), "employee trend loaded");
        Ok(points)
    }

    pub fn export_all_records(&self, format: ExportFormat) -> AppResult<ExportPayload> {
        let records = self.db.with_connection(|conn| {
            AppraisalRepository::list(conn, &AppraisalListFilters::default())?
                .into_iter()
                .map(AppraisalRow::into_record)
                .collect::<AppResult<Vec<_>>>()
        })?;

        let content = match format {
            ExportFormat::Json => serde_json::to_string_pretty(&records)?,
            ExportFormat::Csv => render_csv(&records),
        };

        info!(
            target: "app::report",
            format = format.content_type(),
            records = records.len(),
            "appraisal records exported"
        );
        Ok(ExportPayload {
            format,
            content_type: format.content_type().to_string(),
            content,
            record_count: records.len(),
            generated_at: self.clock.now(),
        })
    }

    fn department_assignments(
        &self,
        conn: &Connection,
        department_id: &str,
        cycle_id: Option<&str>,
    ) -> AppResult<Vec<AppraisalAssignment>> {
        if self
            .organization
            .resolve_department(conn, department_id)?
            .is_none()
        {
            return Err(AppError::not_found(format!(
                "Department {department_id} not found"
            )));
        }
        if let Some(cycle_id) = cycle_id {
            load_cycle(conn, cycle_id)?;
        }

        AssignmentRepository::list_by_department(conn, department_id)?
            .into_iter()
            .map(AssignmentRow::into_record)
            .filter(|item| match (item, cycle_id) {
                (Ok(assignment), Some(cycle_id)) => assignment.cycle_id == cycle_id,
                _ => true,
            })
            .collect()
    }
}

fn dispute_totals(conn: &Connection, cycle_id: Option<&str>) -> AppResult<DisputeTotals> {
    let mut totals = DisputeTotals::default();
    for (status, count) in DisputeRepository::count_by_status(conn, cycle_id)? {
        totals.total += count;
        match status {
            DisputeStatus::Open => totals.open += count,
            DisputeStatus::UnderReview => totals.under_review += count,
            DisputeStatus::Resolved => totals.resolved += count,
            DisputeStatus::Rejected => totals.rejected += count,
        }
    }
    Ok(totals)
}

fn published_records_for(
    conn: &Connection,
    cycle_id: Option<&str>,
) -> AppResult<Vec<AppraisalRecord>> {
    let filters = AppraisalListFilters {
        cycle_id: cycle_id.map(str::to_string),
        status: Some(AppraisalRecordStatus::HrPublished),
    };
    AppraisalRepository::list(conn, &filters)?
        .into_iter()
        .map(AppraisalRow::into_record)
        .collect()
}

fn breakdown_of(assignments: &[AppraisalAssignment]) -> AssignmentStatusBreakdown {
    let mut breakdown = AssignmentStatusBreakdown::default();
    for assignment in assignments {
        breakdown.record(assignment.status, 1);
    }
    breakdown
}

fn average_score(records: &[AppraisalRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let sum: f64 = records.iter().map(|record| record.total_score).sum();
    Some(round_two(sum / records.len() as f64))
}

/// Completed share of `total` as a percentage; zero when there is nothing to complete.
pub fn completion_rate(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round_two(completed as f64 / total as f64 * 100.0)
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn render_csv(records: &[AppraisalRecord]) -> String {
    let mut content = String::new();
    content.push_str(&CSV_HEADER.join(","));
    content.push_str("\r\n");

    for record in records {
        let fields = [
            record.id.clone(),
            record.assignment_id.clone(),
            record.cycle_id.clone(),
            record.template_id.clone(),
            record.employee_profile_id.clone(),
            record.manager_profile_id.clone(),
            record.status.as_str().to_string(),
            record.total_score.to_string(),
            encode_time(&record.manager_submitted_at),
            record.hr_published_at.as_ref().map(encode_time).unwrap_or_default(),
            record
                .employee_acknowledged_at
                .as_ref()
                .map(encode_time)
                .unwrap_or_default(),
        ];
        let line: Vec<String> = fields.iter().map(|field| escape_csv(field)).collect();
        content.push_str(&line.join(","));
        content.push_str("\r\n");
    }

    content
}

/// Quotes a field when it holds a comma, quote or line break, doubling inner quotes.
pub fn escape_csv(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
