use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::codec::{
    decode_enum, decode_json, decode_time, encode_json, encode_time,
};
use crate::error::{AppError, AppResult};
use crate::models::template::{AppraisalTemplate, RatingScale, TemplateListFilters};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        name,
        description,
        template_type,
        rating_scale,
        criteria,
        applicable_department_ids,
        applicable_position_ids,
        is_active,
        created_at,
        updated_at
    FROM appraisal_templates
"#;

#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub template_type: String,
    pub rating_scale: String,
    pub criteria: String,
    pub applicable_department_ids: String,
    pub applicable_position_ids: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TemplateRow {
    pub fn from_record(record: &AppraisalTemplate) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            template_type: record.template_type.as_str().to_string(),
            rating_scale: encode_json(&record.rating_scale)?,
            criteria: encode_json(&record.criteria)?,
            applicable_department_ids: encode_json(&record.applicable_department_ids)?,
            applicable_position_ids: encode_json(&record.applicable_position_ids)?,
            is_active: record.is_active,
            created_at: encode_time(&record.created_at),
            updated_at: encode_time(&record.updated_at),
        })
    }

    pub fn into_record(self) -> AppResult<AppraisalTemplate> {
        let rating_scale: RatingScale = serde_json::from_str(&self.rating_scale)?;
        Ok(AppraisalTemplate {
            id: self.id,
            name: self.name,
            description: self.description,
            template_type: decode_enum(&self.template_type)?,
            rating_scale,
            criteria: decode_json(Some(self.criteria))?,
            applicable_department_ids: decode_json(Some(self.applicable_department_ids))?,
            applicable_position_ids: decode_json(Some(self.applicable_position_ids))?,
            is_active: self.is_active,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for TemplateRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TemplateRow {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            template_type: row.get("template_type")?,
            rating_scale: row.get("rating_scale")?,
            criteria: row.get("criteria")?,
            applicable_department_ids: row.get("applicable_department_ids")?,
            applicable_position_ids: row.get("applicable_position_ids")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct TemplateRepository;

impl TemplateRepository {
    pub fn insert(conn: &Connection, row: &TemplateRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO appraisal_templates (
                    id,
                    name,
                    description,
                    template_type,
                    rating_scale,
                    criteria,
                    applicable_department_ids,
                    applicable_position_ids,
                    is_active,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :name,
                    :description,
                    :template_type,
                    :rating_scale,
                    :criteria,
                    :applicable_department_ids,
                    :applicable_position_ids,
                    :is_active,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":description": &row.description,
                ":template_type": &row.template_type,
                ":rating_scale": &row.rating_scale,
                ":criteria": &row.criteria,
                ":applicable_department_ids": &row.applicable_department_ids,
                ":applicable_position_ids": &row.applicable_position_ids,
                ":is_active": row.is_active as i64,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &TemplateRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE appraisal_templates SET
                    name = :name,
                    description = :description,
                    template_type = :template_type,
                    rating_scale = :rating_scale,
                    criteria = :criteria,
                    applicable_department_ids = :applicable_department_ids,
                    applicable_position_ids = :applicable_position_ids,
                    is_active = :is_active,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":description": &row.description,
                ":template_type": &row.template_type,
                ":rating_scale": &row.rating_scale,
                ":criteria": &row.criteria,
                ":applicable_department_ids": &row.applicable_department_ids,
                ":applicable_position_ids": &row.applicable_position_ids,
                ":is_active": row.is_active as i64,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found(format!("Template {} not found", row.id)));
        }

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<TemplateRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| TemplateRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn find_by_name(conn: &Connection, name: &str) -> AppResult<Option<TemplateRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE name = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([name], |row| TemplateRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list(conn: &Connection, filters: &TemplateListFilters) -> AppResult<Vec<TemplateRow>> {
        let mut clauses: Vec<&str> = Vec::new();
        if filters.active_only {
            clauses.push("is_active = 1");
        }
        if filters.template_type.is_some() {
            clauses.push("template_type = :template_type");
        }

        let mut sql = BASE_SELECT.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, name ASC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = match filters.template_type {
            Some(template_type) => stmt
                .query_map(
                    named_params! { ":template_type": template_type.as_str() },
                    |row| TemplateRow::try_from(row),
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], |row| TemplateRow::try_from(row))?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    pub fn count_active(conn: &Connection) -> AppResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM appraisal_templates WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
