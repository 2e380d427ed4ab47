use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::cycle_repository::CycleRepository;
use crate::db::repositories::template_repository::{TemplateRepository, TemplateRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::template::{
    AppraisalTemplate, RatingScale, TemplateCreateInput, TemplateCriterion, TemplateListFilters,
    TemplateUpdateInput,
};
use crate::services::directory::OrganizationDirectory;
use crate::utils::clock::SharedClock;

const MAX_NAME_CHARS: usize = 160;

pub struct TemplateService {
    db: DbPool,
    organization: Arc<dyn OrganizationDirectory>,
    clock: SharedClock,
}

impl TemplateService {
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

    pub fn create_template(&self, input: TemplateCreateInput) -> AppResult<AppraisalTemplate> {
        let name = normalize_name(&input.name)?;
        let department_ids = normalize_id_list(input.applicable_department_ids);
        let position_ids = normalize_id_list(input.applicable_position_ids);
        if department_ids.is_empty() || position_ids.is_empty() {
            return Err(AppError::validation(
                "At least one applicable department and position is required",
            ));
        }
        validate_rating_scale(&input.rating_scale)?;
        let criteria = normalize_criteria(input.criteria)?;

        let now = self.clock.now();
        let record = AppraisalTemplate {
            id: Uuid::new_v4().to_string(),
            name,
            description: normalize_optional_string(input.description),
            template_type: input.template_type,
            rating_scale: input.rating_scale,
            criteria,
            applicable_department_ids: department_ids,
            applicable_position_ids: position_ids,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db.with_transaction(|conn| {
            if TemplateRepository::find_by_name(conn, &record.name)?.is_some() {
                return Err(AppError::conflict("Template name already exists"));
            }
            self.ensure_org_references(
                conn,
                &record.applicable_department_ids,
                &record.applicable_position_ids,
            )?;
            TemplateRepository::insert(conn, &TemplateRow::from_record(&record)?)
        })?;

        info!(target: "app::template", template_id = %record.id, name = %record.name, "template created");
        Ok(record)
    }

    pub fn update_template(
        &self,
        id: &str,
        update: TemplateUpdateInput,
    ) -> AppResult<AppraisalTemplate> {
        let updated = self.db.with_transaction(|conn| {
            let mut existing = load_template(conn, id)?;
            ensure_not_in_active_cycle(conn, id)?;

            if let Some(name) = update.name {
                let name = normalize_name(&name)?;
                if name != existing.name {
                    if let Some(other) = TemplateRepository::find_by_name(conn, &name)? {
                        if other.id != existing.id {
                            return Err(AppError::conflict("Template name already exists"));
                        }
                    }
                }
                existing.name = name;
            }

            if let Some(description) = update.description {
                existing.description = normalize_optional_string(description);
            }

            if let Some(template_type) = update.template_type {
                existing.template_type = template_type;
            }

            if let Some(rating_scale) = update.rating_scale {
                validate_rating_scale(&rating_scale)?;
                existing.rating_scale = rating_scale;
            }

            if let Some(criteria) = update.criteria {
                existing.criteria = normalize_criteria(criteria)?;
            }

            if let Some(department_ids) = update.applicable_department_ids {
                let department_ids = normalize_id_list(department_ids);
                if department_ids.is_empty() {
                    return Err(AppError::validation(
                        "At least one applicable department is required",
                    ));
                }
                self.ensure_org_references(conn, &department_ids, &[])?;
                existing.applicable_department_ids = department_ids;
            }

            if let Some(position_ids) = update.applicable_position_ids {
                let position_ids = normalize_id_list(position_ids);
                if position_ids.is_empty() {
                    return Err(AppError::validation(
                        "At least one applicable position is required",
                    ));
                }
                self.ensure_org_references(conn, &[], &position_ids)?;
                existing.applicable_position_ids = position_ids;
            }

            existing.updated_at = self.clock.now();
            TemplateRepository::update(conn, &TemplateRow::from_record(&existing)?)?;
            Ok(existing)
        })?;

        info!(target: "app::template", template_id = %updated.id, "template updated");
        Ok(updated)
    }

    pub fn deactivate_template(&self, id: &str) -> AppResult<AppraisalTemplate> {
        let updated = self.db.with_transaction(|conn| {
            let mut existing = load_template(conn, id)?;
            if !existing.is_active {
                return Err(AppError::conflict("Template is already inactive"));
            }
            ensure_not_in_active_cycle(conn, id)?;

            existing.is_active = false;
            existing.updated_at = self.clock.now();
            TemplateRepository::update(conn, &TemplateRow::from_record(&existing)?)?;
            Ok(existing)
        })?;

        info!(target: "app::template", template_id = %updated.id, "template deactivated");
        Ok(updated)
    }

    pub fn get_template(&self, id: &str) -> AppResult<AppraisalTemplate> {
        let record = self.db.with_connection(|conn| load_template(conn, id))?;
        debug!(target: "app::template", template_id = %record.id, "template fetched");
        Ok(record)
    }

    pub fn list_templates(&self, filters: TemplateListFilters) -> AppResult<Vec<AppraisalTemplate>> {
        let rows = self
            .db
            .with_connection(|conn| TemplateRepository::list(conn, &filters))?;
        let templates = rows
            .into_iter()
            .map(TemplateRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "app::template", count = templates.len(), "templates listed");
        Ok(templates)
    }

    fn ensure_org_references(
        &self,
        conn: &Connection,
        department_ids: &[String],
        position_ids: &[String],
    ) -> AppResult<()> {
        for department_id in department_ids {
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
        for position_id in position_ids {
            if self
                .organization
                .resolve_position(conn, position_id)?
                .is_none()
            {
                return Err(AppError::validation(format!(
                    "Position {position_id} does not exist"
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn load_template(conn: &Connection, id: &str) -> AppResult<AppraisalTemplate> {
    TemplateRepository::find_by_id(conn, id)?
        .ok_or_else(|| AppError::not_found(format!("Template {id} not found")))?
        .into_record()
}

fn ensure_not_in_active_cycle(conn: &Connection, template_id: &str) -> AppResult<()> {
    let active = CycleRepository::active_cycle_ids_for_template(conn, template_id)?;
    if active.is_empty() {
        Ok(())
    } else {
        Err(AppError::conflict(format!(
            "Template is referenced by active cycle(s): {}",
            active.join(", ")
        )))
    }
}

fn normalize_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Template name is required"));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::validation(
            "Template name must be at most 160 characters",
        ));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Trims, drops blanks and removes duplicates while keeping first-seen order.
pub(crate) fn normalize_id_list(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

fn validate_rating_scale(scale: &RatingScale) -> AppResult<()> {
    if !scale.min.is_finite() || !scale.max.is_finite() {
        return Err(AppError::validation("Rating scale bounds must be finite"));
    }
    if scale.min >= scale.max {
        return Err(AppError::validation(
            "Rating scale minimum must be below its maximum",
        ));
    }
    if let Some(step) = scale.step {
        if !step.is_finite() || step <= 0.0 {
            return Err(AppError::validation("Rating scale step must be positive"));
        }
    }
    Ok(())
}

fn normalize_criteria(criteria: Vec<TemplateCriterion>) -> AppResult<Vec<TemplateCriterion>> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(criteria.len());
    for mut criterion in criteria {
        criterion.key = criterion.key.trim().to_string();
        criterion.title = criterion.title.trim().to_string();
        if criterion.key.is_empty() || criterion.title.is_empty() {
            return Err(AppError::validation("Every criterion needs a key and a title"));
        }
        if !seen.insert(criterion.key.clone()) {
            return Err(AppError::validation(format!(
                "Duplicate criterion key: {}",
                criterion.key
            )));
        }
        if let Some(weight) = criterion.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AppError::validation(format!(
                    "Criterion {} has an invalid weight",
                    criterion.key
                )));
            }
        }
        if let Some(max_score) = criterion.max_score {
            if !max_score.is_finite() || max_score <= 0.0 {
                return Err(AppError::validation(format!(
                    "Criterion {} has an invalid max score",
                    criterion.key
                )));
            }
        }
        criterion.details = normalize_optional_string(criterion.details.take());
        result.push(criterion);
    }
    Ok(result)
}
