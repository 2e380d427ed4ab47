use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::dispute_repository::{DisputeRepository, DisputeRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::appraisal::AppraisalRecordStatus;
use crate::models::dispute::{
    AppraisalDispute, DisputeCreateInput, DisputeListFilters, DisputeResolutionInput,
    DisputeStatus,
};
use crate::models::principal::Principal;
use crate::services::access::ensure_can_act_on;
use crate::services::appraisal_service::load_record;
use crate::services::assignment_service::{load_assignment, unresolved};
use crate::services::cycle_service::load_cycle;
use crate::services::directory::Directories;
use crate::services::settings_service::SettingsService;
use crate::utils::clock::{whole_days_between, SharedClock};

pub struct DisputeService {
    db: DbPool,
    directories: Directories,
    settings: Arc<SettingsService>,
    clock: SharedClock,
}

impl DisputeService {
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

    /// Opens a dispute against a published, unacknowledged appraisal inside the
    /// configured window.
    pub fn raise_dispute(
        &self,
        input: DisputeCreateInput,
        actor: &Principal,
    ) -> AppResult<AppraisalDispute> {
        ensure_can_act_on(actor, &input.raised_by_employee_id)?;
        let window_days = self.settings.get()?.dispute_window_days;

        let dispute = self.db.with_transaction(|conn| {
            let record = load_record(conn, &input.appraisal_id)
                .map_err(|err| unresolved(err, "Appraisal", &input.appraisal_id))?;
            let assignment = load_assignment(conn, &record.assignment_id)
                .map_err(|err| unresolved(err, "Assignment", &record.assignment_id))?;
            let cycle = load_cycle(conn, &record.cycle_id)
                .map_err(|err| unresolved(err, "Cycle", &record.cycle_id))?;

            let published_at = match (record.status, record.hr_published_at) {
                (AppraisalRecordStatus::HrPublished, Some(published_at)) => published_at,
                _ => {
                    return Err(AppError::validation(
                        "Only published appraisals can be disputed",
                    ))
                }
            };
            if record.employee_acknowledged_at.is_some() {
                return Err(AppError::conflict(
                    "Appraisal has already been acknowledged",
                ));
            }
            if record.employee_profile_id != input.raised_by_employee_id {
                return Err(AppError::validation(format!(
                    "Appraisal {} does not belong to employee {}",
                    record.id, input.raised_by_employee_id
                )));
            }

            let now = self.clock.now();
            let days_since_publish = whole_days_between(published_at, now);
            if days_since_publish > window_days {
                return Err(AppError::validation(format!(
                    "Dispute window of {window_days} days has passed"
                )));
            }

            if DisputeRepository::find_active_for_appraisal(conn, &record.id)?.is_some() {
                return Err(AppError::conflict(
                    "An active dispute already exists for this appraisal",
                ));
            }

            let reason = input.reason.trim();
            if reason.is_empty() {
                return Err(AppError::validation("Dispute reason is required"));
            }

            let dispute = AppraisalDispute {
                id: Uuid::new_v4().to_string(),
                appraisal_id: record.id.clone(),
                assignment_id: assignment.id.clone(),
                cycle_id: cycle.id.clone(),
                raised_by_employee_id: input.raised_by_employee_id.clone(),
                reason: reason.to_string(),
                details: trimmed(input.details.as_deref()),
                status: DisputeStatus::Open,
                resolved_by_employee_id: None,
                resolution_summary: None,
                submitted_at: now,
                resolved_at: None,
                updated_at: now,
            };
            DisputeRepository::insert(conn, &DisputeRow::from_record(&dispute))?;
            debug!(
                target: "app::dispute",
                appraisal_id = %dispute.appraisal_id,
                days_since_publish,
                "dispute accepted inside window"
            );
            Ok(dispute)
        })?;

        info!(
            target: "app::dispute",
            dispute_id = %dispute.id,
            appraisal_id = %dispute.appraisal_id,
            "dispute raised"
        );
        Ok(dispute)
    }

    /// Moves an OPEN dispute to UNDER_REVIEW.
    pub fn review_dispute(&self, id: &str) -> AppResult<AppraisalDispute> {
        let reviewed = self.db.with_transaction(|conn| {
            let mut dispute = load_dispute(conn, id)?;
            if dispute.status != DisputeStatus::Open {
                return Err(AppError::conflict(format!(
                    "Dispute cannot move to review from status {}",
                    dispute.status.as_str()
                )));
            }
            dispute.status = DisputeStatus::UnderReview;
            dispute.updated_at = self.clock.now();
            DisputeRepository::update_status(conn, &DisputeRow::from_record(&dispute))?;
            Ok(dispute)
        })?;

        info!(target: "app::dispute", dispute_id = %reviewed.id, "dispute under review");
        Ok(reviewed)
    }

    /// Closes an active dispute with the caller's terminal decision.
    pub fn resolve_dispute(
        &self,
        id: &str,
        input: DisputeResolutionInput,
    ) -> AppResult<AppraisalDispute> {
        if !input.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Dispute resolution status must be RESOLVED or REJECTED, got {}",
                input.status.as_str()
            )));
        }

        let resolved = self.db.with_transaction(|conn| {
            let mut dispute = load_dispute(conn, id)?;
            if !dispute.status.is_active() {
                return Err(AppError::conflict(format!(
                    "Dispute is already {}",
                    dispute.status.as_str()
                )));
            }

            let resolver = trimmed(input.resolved_by_employee_id.as_deref());
            if let Some(resolver_id) = resolver.as_deref() {
                if self
                    .directories
                    .employees
                    .resolve_employee(conn, resolver_id)?
                    .is_none()
                {
                    return Err(AppError::validation(format!(
                        "Resolver {resolver_id} does not exist"
                    )));
                }
            }

            let now = self.clock.now();
            dispute.status = input.status;
            dispute.resolution_summary = trimmed(input.resolution_summary.as_deref());
            dispute.resolved_by_employee_id = resolver;
            dispute.resolved_at = Some(now);
            dispute.updated_at = now;
            DisputeRepository::update_status(conn, &DisputeRow::from_record(&dispute))?;
            Ok(dispute)
        })?;

        info!(
            target: "app::dispute",
            dispute_id = %resolved.id,
            status = resolved.status.as_str(),
            "dispute resolved"
        );
        Ok(resolved)
    }

    /// Visible to the employee who raised it and to elevated roles.
    pub fn get_dispute_by_id(&self, id: &str, actor: &Principal) -> AppResult<AppraisalDispute> {
        let dispute = self.db.with_connection(|conn| load_dispute(conn, id))?;
        ensure_can_act_on(actor, &dispute.raised_by_employee_id)?;
        Ok(dispute)
    }

    pub fn list_disputes(&self, filters: DisputeListFilters) -> AppResult<Vec<AppraisalDispute>> {
        let rows = self
            .db
            .with_connection(|conn| DisputeRepository::list(conn, &filters))?;
        let disputes = rows
            .into_iter()
            .map(DisputeRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::dispute", count = disputes.len(), "disputes listed");
        Ok(disputes)
    }
}

fn load_dispute(conn: &Connection, id: &str) -> AppResult<AppraisalDispute> {
    DisputeRepository::find_by_id(conn, id)?
        .ok_or_else(|| AppError::not_found(format!("Dispute {id} not found")))?
        .into_record()
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
