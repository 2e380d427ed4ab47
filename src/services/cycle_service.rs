use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::codec::encode_time;
use crate::db::repositories::cycle_repository::CycleRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::cycle::{
    AppraisalCycle, CycleCreateInput, CycleListFilters, CycleStatus, CycleTemplateAssignment,
};
use crate::services::directory::OrganizationDirectory;
use crate::services::template_service::{load_template, normalize_id_list};
use crate::utils::clock::SharedClock;

/// Whether `existing` blocks a new cycle spanning `[start, end]` on a shared department.
///
/// An ACTIVE cycle always blocks. Any other cycle blocks when the date ranges
/// overlap; ranges that merely touch on the boundary count as overlapping.
pub fn blocks_new_cycle(
    existing: &AppraisalCycle,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    existing.status == CycleStatus::Active
        || (existing.start_date <= end && existing.end_date >= start)
}

pub struct CycleService {
    db: DbPool,
    organization: Arc<dyn OrganizationDirectory>,
    clock: SharedClock,
}

impl CycleService {
    pub fn new(
        db: DbPool,
        organization: Arc<dyn OrganizationDirectory>,
        clock: SharedClock,
    ) -> Self {
        Self {
            db,
            organization,
            clock,
        }
    }

    pub fn create_cycle(&self, input: CycleCreateInput) -> AppResult<AppraisalCycle> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Cycle name is required"));
        }
        let template_assignments = normalize_bindings(input.template_assignments)?;

        let now = self.clock.now();
        let record = AppraisalCycle {
            id: Uuid::new_v4().to_string(),
            name,
            description: input
                .description
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            cycle_type: input.cycle_type,
            start_date: input.start_date,
            end_date: input.end_date,
            status: CycleStatus::Planned,
            template_assignments,
            manager_due_date: input.manager_due_date,
            employee_acknowledgement_due_date: input.employee_acknowledgement_due_date,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.db.with_transaction(|conn| {
            self.ensure_binding_references(conn, &record.template_assignments)?;
            validate_dates(&record)?;

            for department_id in record.department_ids() {
                let conflicts: Vec<AppraisalCycle> =
                    CycleRepository::list_for_department(conn, department_id)?
                        .into_iter()
                        .filter(|existing| {
                            blocks_new_cycle(existing, record.start_date, record.end_date)
                        })
                        .collect();
                if let Some(existing) = conflicts.first() {
                    debug!(
                        target: "app::cycle",
                        department_id,
                        conflicting_cycle = %existing.id,
                        status = existing.status.as_str(),
                        "cycle overlap detected"
                    );
                    return Err(AppError::conflict(format!(
                        "overlapping cycle for department {department_id}"
                    )));
                }
            }

            CycleRepository::insert(conn, &record)
        })?;

        info!(
            target: "app::cycle",
            cycle_id = %record.id,
            departments = record.department_ids().len(),
            "cycle created"
        );
        Ok(record)
    }

    pub fn activate_cycle(&self, id: &str) -> AppResult<AppraisalCycle> {
        let activated = self.db.with_transaction(|conn| {
            let mut cycle = load_cycle(conn, id)?;
            if cycle.status != CycleStatus::Planned {
                return Err(AppError::conflict(format!(
                    "Cycle cannot be activated from status {}",
                    cycle.status.as_str()
                )));
            }
            if cycle.template_assignments.is_empty() {
                return Err(AppError::validation(
                    "Cycle needs at least one template assignment before activation",
                ));
            }

            for department_id in cycle.department_ids() {
                let already_active = CycleRepository::list_for_department(conn, department_id)?
                    .into_iter()
                    .any(|other| other.id != cycle.id && other.status == CycleStatus::Active);
                if already_active {
                    return Err(AppError::conflict(format!(
                        "overlapping cycle for department {department_id}"
                    )));
                }
            }

            let now = self.clock.now();
            CycleRepository::update_status(
                conn,
                &cycle.id,
                CycleStatus::Active,
                None,
                &encode_time(&now),
            )?;
            cycle.status = CycleStatus::Active;
            cycle.updated_at = now;
            Ok(cycle)
        })?;

        info!(target: "app::cycle", cycle_id = %activated.id, "cycle activated");
        Ok(activated)
    }

    pub fn close_cycle(&self, id: &str) -> AppResult<AppraisalCycle> {
        let closed = self.db.with_transaction(|conn| {
            let mut cycle = load_cycle(conn, id)?;
            if cycle.status != CycleStatus::Active {
                return Err(AppError::conflict(format!(
                    "Only active cycles can be closed (current status {})",
                    cycle.status.as_str()
                )));
            }

            let now = self.clock.now();
            let stamp = encode_time(&now);
            CycleRepository::update_status(conn, &cycle.id, CycleStatus::Closed, Some(&stamp), &stamp)?;
            cycle.status = CycleStatus::Closed;
            cycle.closed_at = Some(now);
            cycle.updated_at = now;
            Ok(cycle)
        })?;

        info!(target: "app::cycle", cycle_id = %closed.id, "cycle closed");
        Ok(closed)
    }

    pub fn get_cycle(&self, id: &str) -> AppResult<AppraisalCycle> {
        let cycle = self.db.with_connection(|conn| load_cycle(conn, id))?;
        debug!(target: "app::cycle", cycle_id = %cycle.id, "cycle fetched");
        Ok(cycle)
    }

    pub fn list_cycles(&self, filters: CycleListFilters) -> AppResult<Vec<AppraisalCycle>> {
        let cycles = self
            .db
            .with_connection(|conn| CycleRepository::list(conn, filters.status))?;
        debug!(target: "app::cycle", count = cycles.len(), "cycles listed");
        Ok(cycles)
    }

    fn ensure_binding_references(
        &self,
        conn: &Connection,
        bindings: &[CycleTemplateAssignment],
    ) -> AppResult<()> {
        for binding in bindings {
            let template = load_template(conn, &binding.template_id).map_err(|err| {
                if err.is_not_found() {
                    AppError::validation(format!(
                        "Template {} does not exist",
                        binding.template_id
                    ))
                } else {
                    err
                }
            })?;
            if !template.is_active {
                return Err(AppError::validation(format!(
                    "Template {} is inactive",
                    template.id
                )));
            }

            for department_id in &binding.department_ids {
                if self
                    .organization
                    .resolve_department(conn, department_id)?
                    .is_none()
                {
                    return Err(AppError::validation(format!(
                        "Department {department_id} does not exist"
                    )));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn load_cycle(conn: &Connection, id: &str) -> AppResult<AppraisalCycle> {
    CycleRepository::find_by_id(conn, id)?
        .ok_or_else(|| AppError::not_found(format!("Cycle {id} not found")))
}

fn validate_dates(cycle: &AppraisalCycle) -> AppResult<()> {
    if cycle.start_date >= cycle.end_date {
        return Err(AppError::validation("Cycle start date must be before its end date"));
    }
    if let (Some(manager_due), Some(acknowledgement_due)) = (
        cycle.manager_due_date,
        cycle.employee_acknowledgement_due_date,
    ) {
        if acknowledgement_due < manager_due {
            return Err(AppError::validation(
                "Employee acknowledgement due date cannot precede the manager due date",
            ));
        }
    }
    Ok(())
}

/// Merges repeated template ids and rejects bindings without departments.
fn normalize_bindings(
    bindings: Vec<CycleTemplateAssignment>,
) -> AppResult<Vec<CycleTemplateAssignment>> {
    let mut merged: Vec<CycleTemplateAssignment> = Vec::new();
    for binding in bindings {
        let template_id = binding.template_id.trim().to_string();
        if template_id.is_empty() {
            return Err(AppError::validation("Template assignment is missing a template id"));
        }
        let department_ids = normalize_id_list(binding.department_ids);
        if department_ids.is_empty() {
            return Err(AppError::validation(format!(
                "Template assignment {template_id} must list at least one department"
            )));
        }

        match merged
            .iter_mut()
            .find(|existing| existing.template_id == template_id)
        {
            Some(existing) => {
                let combined = existing
                    .department_ids
                    .drain(..)
                    .chain(department_ids)
                    .collect();
                existing.department_ids = normalize_id_list(combined);
            }
            None => merged.push(CycleTemplateAssignment {
                template_id,
                department_ids,
            }),
        }
    }
    Ok(merged)
}
