use crate::models::principal::Principal;
use crate::models::report::{
    CycleReport, DashboardStats, DepartmentProgress, DepartmentReport, EmployeeTrendPoint,
    ExportFormat, ExportPayload,
};

use super::{run_blocking, AppState, CommandResult};

pub async fn reports_dashboard_stats(state: &AppState) -> CommandResult<DashboardStats> {
    let service = state.reports();
    run_blocking("reports_dashboard_stats", move || service.dashboard_stats()).await
}

pub async fn reports_cycle(state: &AppState, cycle_id: String) -> CommandResult<CycleReport> {
    let service = state.reports();
    run_blocking("reports_cycle", move || {
        service.generate_cycle_report(&cycle_id)
    })
    .await
}

pub async fn reports_department(
    state: &AppState,
    department_id: String,
    cycle_id: Option<String>,
) -> CommandResult<DepartmentReport> {
    let service = state.reports();
    run_blocking("reports_department", move || {
        service.generate_department_report(&department_id, cycle_id.as_deref())
    })
    .await
}

pub async fn reports_department_progress(
    state: &AppState,
    department_id: String,
    cycle_id: Option<String>,
) -> CommandResult<DepartmentProgress> {
    let service = state.reports();
    run_blocking("reports_department_progress", move || {
        service.get_department_progress(&department_id, cycle_id.as_deref())
    })
    .await
}

pub async fn reports_employee_trend(
    state: &AppState,
    employee_id: String,
    limit: Option<u32>,
    actor: Principal,
) -> CommandResult<Vec<EmployeeTrendPoint>> {
    let service = state.reports();
    run_blocking("reports_employee_trend", move || {
        service.get_employee_trend(&employee_id, limit, &actor)
    })
    .await
}

pub async fn reports_export(
    state: &AppState,
    format: Option<ExportFormat>,
) -> CommandResult<ExportPayload> {
    let service = state.reports();
    run_blocking("reports_export", move || {
        service.export_all_records(format.unwrap_or_default())
    })
    .await
}
