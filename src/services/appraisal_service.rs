use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::appraisal_repository::{AppraisalRepository, AppraisalRow};
use crate::db::repositories::assignment_repository::{AssignmentRepository, AssignmentRow};
use crate::db::repositories::dispute_repository::DisputeRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::appraisal::{
    AppraisalHistoryEntry, AppraisalListFilters, AppraisalRecord, AppraisalRecordStatus,
    AppraisalSubmitInput, RatingEntry,
};
use crate::models::assignment::AssignmentStatus;
use crate::models::cycle::CycleStatus;
use crate::models::principal::Principal;
use crate::models::template::AppraisalTemplate;
use crate::services::access::{can_act_on, ensure_can_act_on};
use crate::services::assignment_service::{ensure_manager_scope, load_assignment};
use crate::services::cycle_service::load_cycle;
use crate::services::directory::Directories;
use crate::services::template_service::load_template;
use crate::utils::clock::SharedClock;

/// Ratings after scale validation, with labels filled in and the summed score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRatings {
    pub ratings: Vec<RatingEntry>,
    pub total_score: f64,
}

/// Validates `ratings` against the template and sums their effective values.
pub fn score_ratings(
    template: &AppraisalTemplate,
    ratings: Vec<RatingEntry>,
) -> AppResult<ScoredRatings> {
    ensure_ratings_present(&ratings)?;

    let scale = &template.rating_scale;
    let mut seen = HashSet::new();
    let mut scored = Vec::with_capacity(ratings.len());
    let mut total_score = 0.0;

    for mut entry in ratings {
        entry.key = entry.key.trim().to_string();
        if entry.key.is_empty() {
            return Err(AppError::validation("Every rating needs a criterion key"));
        }
        if !seen.insert(entry.key.clone()) {
            return Err(AppError::validation(format!(
                "Criterion {} was rated more than once",
                entry.key
            )));
        }

        let criterion = template
            .criteria
            .iter()
            .find(|criterion| criterion.key == entry.key);
        if criterion.is_none() && !template.criteria.is_empty() {
            return Err(AppError::validation(format!(
                "Criterion {} is not part of template {}",
                entry.key, template.id
            )));
        }

        let value = entry.effective_value().ok_or_else(|| {
            AppError::validation(format!("Rating {} has no value", entry.key))
        })?;
        if !scale.contains(value) {
            return Err(AppError::validation_with_details(
                format!(
                    "Rating {} is outside the scale [{}, {}]",
                    entry.key, scale.min, scale.max
                ),
                serde_json::json!({ "key": entry.key, "value": value }),
            ));
        }

        if entry.title.trim().is_empty() {
            if let Some(criterion) = criterion {
                entry.title = criterion.title.clone();
            }
        }
        if entry.rating_label.is_none() {
            entry.rating_label = entry
                .rating_value
                .and_then(|raw| scale.label_for(raw))
                .map(str::to_string);
        }

        total_score += value;
        scored.push(entry);
    }

    let missing: Vec<&str> = template
        .criteria
        .iter()
        .filter(|criterion| criterion.required && !seen.contains(&criterion.key))
        .map(|criterion| criterion.key.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "Missing ratings for required criteria: {}",
            missing.join(", ")
        )));
    }

    Ok(ScoredRatings {
        ratings: scored,
        total_score,
    })
}

fn ensure_ratings_present(ratings: &[RatingEntry]) -> AppResult<()> {
    if ratings.is_empty() {
        return Err(AppError::validation("At least one rating is required"));
    }
    if let Some(entry) = ratings
        .iter()
        .find(|entry| entry.rating_value.is_none() && entry.weighted_score.is_none())
    {
        return Err(AppError::validation(format!(
            "Rating {} needs a rating value or a weighted score",
            entry.key
        )));
    }
    Ok(())
}

pub struct AppraisalService {
    db: DbPool,
    directories: Directories,
    clock: SharedClock,
}

impl AppraisalService {
    pub fn new(db: DbPool, directories: Directories, clock: SharedClock) -> Self {
        Self {
            db,
            directories,
            clock,
        }
    }

    /// Stores the manager's ratings and moves the assignment to SUBMITTED atomically.
    pub fn submit_record(
        &self,
        input: AppraisalSubmitInput,
        actor: &Principal,
    ) -> AppResult<AppraisalRecord> {
        ensure_ratings_present(&input.ratings)?;

        let record = self.db.with_transaction(|conn| {
            let mut assignment = load_assignment(conn, &input.assignment_id).map_err(|err| {
                if err.is_not_found() {
                    AppError::validation(format!(
                        "Assignment {} does not exist",
                        input.assignment_id
                    ))
                } else {
                    err
                }
            })?;
            ensure_manager_scope(actor, &assignment)?;
            if !assignment.status.accepts_submission() {
                return Err(AppError::conflict(format!(
                    "Assignment cannot be submitted from status {}",
                    assignment.status.as_str()
                )));
            }

            let template = load_template(conn, &assignment.template_id).map_err(|err| {
                if err.is_not_found() {
                    AppError::validation(format!(
                        "Template {} does not exist",
                        assignment.template_id
                    ))
                } else {
                    err
                }
            })?;
            let scored = score_ratings(&template, input.ratings.clone())?;

            let manager_profile_id = assignment
                .manager_profile_id
                .clone()
                .or_else(|| actor.employee_id.clone())
                .ok_or_else(|| AppError::validation("Assignment has no evaluating manager"))?;

            let now = self.clock.now();
            let record = AppraisalRecord {
                id: Uuid::new_v4().to_string(),
                assignment_id: assignment.id.clone(),
                cycle_id: assignment.cycle_id.clone(),
                template_id: assignment.template_id.clone(),
                employee_profile_id: assignment.employee_profile_id.clone(),
                manager_profile_id,
                ratings: scored.ratings,
                total_score: scored.total_score,
                status: AppraisalRecordStatus::ManagerSubmitted,
                manager_submitted_at: now,
                hr_published_at: None,
                published_by_employee_id: None,
                employee_acknowledged_at: None,
                employee_acknowledgement_comment: None,
                created_at: now,
                updated_at: now,
            };
            AppraisalRepository::insert(conn, &AppraisalRow::from_record(&record)?)?;

            assignment.status = AssignmentStatus::Submitted;
            assignment.submitted_at = Some(now);
            assignment.latest_appraisal_id = Some(record.id.clone());
            assignment.updated_at = now;
            AssignmentRepository::update_progress(conn, &AssignmentRow::from_record(&assignment))?;

            Ok(record)
        })?;

        info!(
            target: "app::appraisal",
            appraisal_id = %record.id,
            assignment_id = %record.assignment_id,
            total_score = record.total_score,
            "appraisal submitted"
        );
        Ok(record)
    }

    /// Publishes a submitted record, appends the employee's history entry and
    /// marks the assignment PUBLISHED in one transaction.
    pub fn publish_record(
        &self,
        id: &str,
        hr_published_by_id: Option<&str>,
    ) -> AppResult<AppraisalRecord> {
        let published = self.db.with_transaction(|conn| {
            let mut record = load_record(conn, id)?;
            if record.status != AppraisalRecordStatus::ManagerSubmitted
                || record.hr_published_at.is_some()
            {
                return Err(AppError::conflict(format!(
                    "Appraisal {} has already been published",
                    record.id
                )));
            }

            let cycle = load_cycle(conn, &record.cycle_id)?;
            if cycle.status == CycleStatus::Closed {
                return Err(AppError::conflict("Cannot publish for a closed cycle"));
            }

            let publisher = hr_published_by_id
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(publisher_id) = publisher {
                if self
                    .directories
                    .employees
                    .resolve_employee(conn, publisher_id)?
                    .is_none()
                {
                    return Err(AppError::validation(format!(
                        "Publisher {publisher_id} does not exist"
                    )));
                }
            }

            let now = self.clock.now();
            record.status = AppraisalRecordStatus::HrPublished;
            record.hr_published_at = Some(now);
            record.published_by_employee_id = publisher.map(str::to_string);
            record.updated_at = now;
            AppraisalRepository::update_lifecycle(conn, &AppraisalRow::from_record(&record)?)?;

            self.directories.employees.append_appraisal_history(
                conn,
                &record.employee_profile_id,
                &AppraisalHistoryEntry {
                    appraisal_id: record.id.clone(),
                    cycle_id: record.cycle_id.clone(),
                    template_id: record.template_id.clone(),
                    total_score: record.total_score,
                    published_at: now,
                },
            )?;

            let mut assignment = load_assignment(conn, &record.assignment_id)?;
            assignment.status = AssignmentStatus::Published;
            assignment.published_at = Some(now);
            assignment.updated_at = now;
            AssignmentRepository::update_progress(conn, &AssignmentRow::from_record(&assignment))?;

            Ok(record)
        })?;

        info!(
            target: "app::appraisal",
            appraisal_id = %published.id,
            published_by = ?published.published_by_employee_id,
            "appraisal published"
        );
        Ok(published)
    }

    pub fn acknowledge_record(
        &self,
        id: &str,
        employee_id: &str,
        comment: Option<String>,
        actor: &Principal,
    ) -> AppResult<AppraisalRecord> {
        ensure_can_act_on(actor, employee_id)?;

        let acknowledged = self.db.with_transaction(|conn| {
            let mut record = load_record(conn, id)?;
            if record.employee_acknowledged_at.is_some() {
                return Err(AppError::conflict(format!(
                    "Appraisal {} has already been acknowledged",
                    record.id
                )));
            }
            if record.status != AppraisalRecordStatus::HrPublished {
                return Err(AppError::conflict(
                    "Only published appraisals can be acknowledged",
                ));
            }
            if record.employee_profile_id != employee_id {
                return Err(AppError::validation(format!(
                    "Appraisal {} does not belong to employee {employee_id}",
                    record.id
                )));
            }
            if DisputeRepository::find_active_for_appraisal(conn, &record.id)?.is_some() {
                return Err(AppError::conflict(
                    "Appraisal has an open dispute and cannot be acknowledged",
                ));
            }

            let now = self.clock.now();
            record.employee_acknowledged_at = Some(now);
            record.employee_acknowledgement_comment = comment
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            record.updated_at = now;
            AppraisalRepository::update_lifecycle(conn, &AppraisalRow::from_record(&record)?)?;

            let mut assignment = load_assignment(conn, &record.assignment_id)?;
            assignment.status = AssignmentStatus::Acknowledged;
            assignment.updated_at = now;
            AssignmentRepository::update_progress(conn, &AssignmentRow::from_record(&assignment))?;

            Ok(record)
        })?;

        info!(target: "app::appraisal", appraisal_id = %acknowledged.id, "appraisal acknowledged");
        Ok(acknowledged)
    }

    /// Visible to the evaluated employee, the evaluating manager and elevated roles.
    pub fn get_record_by_id(&self, id: &str, actor: &Principal) -> AppResult<AppraisalRecord> {
        let record = self.db.with_connection(|conn| load_record(conn, id))?;
        if !can_act_on(actor, &record.manager_profile_id) {
            ensure_can_act_on(actor, &record.employee_profile_id)?;
        }
        debug!(target: "app::appraisal", appraisal_id = %record.id, "appraisal fetched");
        Ok(record)
    }

    pub fn list_records(&self, filters: AppraisalListFilters) -> AppResult<Vec<AppraisalRecord>> {
        let rows = self
            .db
            .with_connection(|conn| AppraisalRepository::list(conn, &filters))?;
        let records = rows
            .into_iter()
            .map(AppraisalRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::appraisal", count = records.len(), "appraisals listed");
        Ok(records)
    }
}

pub(crate) fn load_record(conn: &Connection, id: &str) -> AppResult<AppraisalRecord> {
    AppraisalRepository::find_by_id(conn, id)?
        .ok_or_else(|| AppError::not_found(format!("Appraisal {id} not found")))?
        .into_record()
}
