use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::assignment_repository::{AssignmentRepository, AssignmentRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::assignment::{AppraisalAssignment, AssignmentCreateInput, AssignmentStatus};
use crate::models::cycle::CycleStatus;
use crate::models::principal::Principal;
use crate::models::settings::AppraisalSettings;
use crate::services::access::{can_act_on, ensure_can_act_on};
use crate::services::cycle_service::load_cycle;
use crate::services::directory::Directories;
use crate::services::settings_service::SettingsService;
use crate::services::template_service::load_template;
use crate::utils::clock::SharedClock;

pub struct AssignmentService {
    db: DbPool,
    directories: Directories,
    settings: Arc<SettingsService>,
    clock: SharedClock,
}

impl AssignmentService {
    pub fn new(
        db: DbPool,
        directories: Directories,
        settings: Arc<SettingsService>,
        clock: SharedClock,
    ) -> Self {
        Self {
            db,
            directories,
            settings,
            clock,
        }
    }

    /// Validates every item, then inserts the whole batch in one transaction.
    ///
    /// Nothing is written unless every item passes.
    pub fn bulk_assign(
        &self,
        items: Vec<AssignmentCreateInput>,
    ) -> AppResult<Vec<AppraisalAssignment>> {
        if items.is_empty() {
            return Err(AppError::validation("At least one assignment is required"));
        }
        let settings = self.settings.get()?;

        let created = self.db.with_transaction(|conn| {
            let mut seen = HashSet::new();
            let mut prepared = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let record = self.prepare_item(conn, item, &settings).map_err(|err| {
                    debug!(target: "app::assignment", index, error = %err, "batch item rejected");
                    err
                })?;
                let triple = (
                    record.employee_profile_id.clone(),
                    record.cycle_id.clone(),
                    record.template_id.clone(),
                );
                if !seen.insert(triple) {
                    return Err(AppError::conflict(format!(
                        "Duplicate assignment in batch for employee {}",
                        record.employee_profile_id
                    )));
                }
                prepared.push(record);
            }

            for record in &prepared {
                AssignmentRepository::insert(conn, &AssignmentRow::from_record(record))?;
            }
            Ok(prepared)
        })?;

        info!(target: "app::assignment", count = created.len(), "assignments created");
        Ok(created)
    }

    pub fn get_assignments_for_manager(
        &self,
        manager_id: &str,
        actor: &Principal,
    ) -> AppResult<Vec<AppraisalAssignment>> {
        ensure_can_act_on(actor, manager_id)?;
        let rows = self
            .db
            .with_connection(|conn| AssignmentRepository::list_by_manager(conn, manager_id))?;
        let assignments = into_records(rows)?;
        debug!(target: "app::assignment", manager_id, count = assignments.len(), "manager assignments listed");
        Ok(assignments)
    }

    pub fn get_assignments_for_employee(
        &self,
        employee_id: &str,
        actor: &Principal,
    ) -> AppResult<Vec<AppraisalAssignment>> {
        ensure_can_act_on(actor, employee_id)?;
        let rows = self
            .db
            .with_connection(|conn| AssignmentRepository::list_by_employee(conn, employee_id))?;
        let assignments = into_records(rows)?;
        debug!(target: "app::assignment", employee_id, count = assignments.len(), "employee assignments listed");
        Ok(assignments)
    }

    pub fn list_assignments_for_cycle(&self, cycle_id: &str) -> AppResult<Vec<AppraisalAssignment>> {
        let rows = self.db.with_connection(|conn| {
            load_cycle(conn, cycle_id)?;
            AssignmentRepository::list_by_cycle(conn, cycle_id)
        })?;
        into_records(rows)
    }

    /// Visible to the evaluated employee, the evaluating manager and elevated roles.
    pub fn get_assignment_by_id(
        &self,
        id: &str,
        actor: &Principal,
    ) -> AppResult<AppraisalAssignment> {
        let assignment = self.db.with_connection(|conn| load_assignment(conn, id))?;
        let is_manager = assignment
            .manager_profile_id
            .as_deref()
            .map(|manager| can_act_on(actor, manager))
            .unwrap_or(false);
        if !is_manager {
            ensure_can_act_on(actor, &assignment.employee_profile_id)?;
        }
        Ok(assignment)
    }

    /// Marks an assignment as being worked on by its manager.
    pub fn start_assignment(&self, id: &str, actor: &Principal) -> AppResult<AppraisalAssignment> {
        let started = self.db.with_transaction(|conn| {
            let mut assignment = load_assignment(conn, id)?;
            ensure_manager_scope(actor, &assignment)?;
            if assignment.status != AssignmentStatus::NotStarted {
                return Err(AppError::conflict(format!(
                    "Assignment cannot be started from status {}",
                    assignment.status.as_str()
                )));
            }
            assignment.status = AssignmentStatus::InProgress;
            assignment.updated_at = self.clock.now();
            AssignmentRepository::update_progress(conn, &AssignmentRow::from_record(&assignment))?;
            Ok(assignment)
        })?;

        info!(target: "app::assignment", assignment_id = %started.id, "assignment started");
        Ok(started)
    }

    fn prepare_item(
        &self,
        conn: &Connection,
        item: &AssignmentCreateInput,
        settings: &AppraisalSettings,
    ) -> AppResult<AppraisalAssignment> {
        let employees = &self.directories.employees;
        let organization = &self.directories.organization;

        let cycle = load_cycle(conn, &item.cycle_id)
            .map_err(|err| unresolved(err, "Cycle", &item.cycle_id))?;
        if cycle.status == CycleStatus::Closed {
            return Err(AppError::conflict(format!(
                "Cannot assign evaluations in closed cycle {}",
                cycle.id
            )));
        }

        let employee = employees
            .resolve_employee(conn, &item.employee_profile_id)?
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Employee {} does not exist",
                    item.employee_profile_id
                ))
            })?;

        let department = organization
            .resolve_department(conn, &item.department_id)?
            .ok_or_else(|| {
                AppError::validation(format!("Department {} does not exist", item.department_id))
            })?;

        let requested_manager = item
            .manager_profile_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let manager_id = match requested_manager {
            Some(manager_id) => {
                if employees.resolve_employee(conn, manager_id)?.is_none() {
                    return Err(AppError::validation(format!(
                        "Manager {manager_id} does not exist"
                    )));
                }
                manager_id.to_string()
            }
            None => {
                let head = if settings.manager_fallback_to_department_head {
                    department.head_employee_id.clone()
                } else {
                    None
                };
                match head {
                    Some(head_id) if employees.resolve_employee(conn, &head_id)?.is_some() => {
                        head_id
                    }
                    _ => {
                        return Err(AppError::validation(format!(
                            "No manager could be resolved for employee {}",
                            employee.id
                        )))
                    }
                }
            }
        };

        let position_id = item
            .position_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if let Some(position_id) = position_id {
            if organization.resolve_position(conn, position_id)?.is_none() {
                return Err(AppError::validation(format!(
                    "Position {position_id} does not exist"
                )));
            }
        }

        let template = load_template(conn, &item.template_id)
            .map_err(|err| unresolved(err, "Template", &item.template_id))?;

        if employee.department_id.as_deref() != Some(item.department_id.as_str()) {
            return Err(AppError::conflict(format!(
                "Employee {} does not belong to department {}",
                employee.id, item.department_id
            )));
        }
        if !template.applies_to_department(&item.department_id) {
            return Err(AppError::conflict(format!(
                "Template {} is not applicable to department {}",
                template.id, item.department_id
            )));
        }
        if let Some(position_id) = position_id {
            if !template.applies_to_position(position_id) {
                return Err(AppError::conflict(format!(
                    "Template {} is not applicable to position {position_id}",
                    template.id
                )));
            }
        }

        if AssignmentRepository::find_by_triple(conn, &employee.id, &cycle.id, &template.id)?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Assignment already exists for employee {} in cycle {} with template {}",
                employee.id, cycle.id, template.id
            )));
        }

        let status = item.status.unwrap_or(settings.default_assignment_status);
        if !status.accepts_submission() {
            return Err(AppError::validation(
                "New assignments must start as NOT_STARTED or IN_PROGRESS",
            ));
        }

        let now = self.clock.now();
        Ok(AppraisalAssignment {
            id: Uuid::new_v4().to_string(),
            cycle_id: cycle.id.clone(),
            template_id: template.id.clone(),
            employee_profile_id: employee.id.clone(),
            manager_profile_id: Some(manager_id),
            department_id: item.department_id.clone(),
            position_id: position_id.map(str::to_string),
            status,
            due_date: item.due_date.or(cycle.manager_due_date),
            submitted_at: None,
            published_at: None,
            latest_appraisal_id: None,
            created_at: now,
            updated_at: now,
        })
    }
}

pub(crate) fn load_assignment(conn: &Connection, id: &str) -> AppResult<AppraisalAssignment> {
    AssignmentRepository::find_by_id(conn, id)?
        .ok_or_else(|| AppError::not_found(format!("Assignment {id} not found")))?
        .into_record()
}

/// Managers act on their own assignments; elevated roles act on any.
pub(crate) fn ensure_manager_scope(
    actor: &Principal,
    assignment: &AppraisalAssignment,
) -> AppResult<()> {
    match assignment.manager_profile_id.as_deref() {
        Some(manager_id) => ensure_can_act_on(actor, manager_id),
        None if actor.is_elevated() => Ok(()),
        None => Err(AppError::forbidden(format!(
            "Assignment {} has no manager",
            assignment.id
        ))),
    }
}

pub(crate) fn unresolved(err: AppError, kind: &str, id: &str) -> AppError {
    if err.is_not_found() {
        AppError::validation(format!("{kind} {id} does not exist"))
    } else {
        err
    }
}

fn into_records(rows: Vec<AssignmentRow>) -> AppResult<Vec<AppraisalAssignment>> {
    rows.into_iter().map(AssignmentRow::into_record).collect()
}
