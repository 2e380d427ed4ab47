use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::codec::{
    decode_enum, decode_json, decode_time, decode_time_opt, encode_json, encode_time,
    encode_time_opt,
};
use crate::error::{AppError, AppResult};
use crate::models::appraisal::{AppraisalListFilters, AppraisalRecord, AppraisalRecordStatus};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        assignment_id,
        cycle_id,
        template_id,
        employee_profile_id,
        manager_profile_id,
        ratings,
        total_score,
        status,
        manager_submitted_at,
        hr_published_at,
        published_by_employee_id,
        employee_acknowledged_at,
        employee_acknowledgement_comment,
        created_at,
        updated_at
    FROM appraisal_records
"#;

#[derive(Debug, Clone)]
pub struct AppraisalRow {
    pub id: String,
    pub assignment_id: String,
    pub cycle_id: String,
    pub template_id: String,
    pub employee_profile_id: String,
    pub manager_profile_id: String,
    pub ratings: String,
    pub total_score: f64,
    pub status: String,
    pub manager_submitted_at: String,
    pub hr_published_at: Option<String>,
    pub published_by_employee_id: Option<String>,
    pub employee_acknowledged_at: Option<String>,
    pub employee_acknowledgement_comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AppraisalRow {
    pub fn from_record(record: &AppraisalRecord) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            assignment_id: record.assignment_id.clone(),
            cycle_id: record.cycle_id.clone(),
            template_id: record.template_id.clone(),
            employee_profile_id: record.employee_profile_id.clone(),
            manager_profile_id: record.manager_profile_id.clone(),
            ratings: encode_json(&record.ratings)?,
            total_score: record.total_score,
            status: record.status.as_str().to_string(),
            manager_submitted_at: encode_time(&record.manager_submitted_at),
            hr_published_at: encode_time_opt(record.hr_published_at.as_ref()),
            published_by_employee_id: record.published_by_employee_id.clone(),
            employee_acknowledged_at: encode_time_opt(record.employee_acknowledged_at.as_ref()),
            employee_acknowledgement_comment: record.employee_acknowledgement_comment.clone(),
            created_at: encode_time(&record.created_at),
            updated_at: encode_time(&record.updated_at),
        })
    }

    pub fn into_record(self) -> AppResult<AppraisalRecord> {
        Ok(AppraisalRecord {
            id: self.id,
            assignment_id: self.assignment_id,
            cycle_id: self.cycle_id,
            template_id: self.template_id,
            employee_profile_id: self.employee_profile_id,
            manager_profile_id: self.manager_profile_id,
            ratings: decode_json(Some(self.ratings))?,
            total_score: self.total_score,
            status: decode_enum(&self.status)?,
            manager_submitted_at: decode_time(&self.manager_submitted_at)?,
            hr_published_at: decode_time_opt(self.hr_published_at)?,
            published_by_employee_id: self.published_by_employee_id,
            employee_acknowledged_at: decode_time_opt(self.employee_acknowledged_at)?,
            employee_acknowledgement_comment: self.employee_acknowledgement_comment,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for AppraisalRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(AppraisalRow {
            id: row.get("id")?,
            assignment_id: row.get("assignment_id")?,
            cycle_id: row.get("cycle_id")?,
            template_id: row.get("template_id")?,
            employee_profile_id: row.get("employee_profile_id")?,
            manager_profile_id: row.get("manager_profile_id")?,
            ratings: row.get("ratings")?,
            total_score: row.get("total_score")?,
            status: row.get("status")?,
            manager_submitted_at: row.get("manager_submitted_at")?,
            hr_published_at: row.get("hr_published_at")?,
            published_by_employee_id: row.get("published_by_employee_id")?,
            employee_acknowledged_at: row.get("employee_acknowledged_at")?,
            employee_acknowledgement_comment: row.get("employee_acknowledgement_comment")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct AppraisalRepository;

impl AppraisalRepository {
    pub fn insert(conn: &Connection, row: &AppraisalRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO appraisal_records (
                    id,
                    assignment_id,
                    cycle_id,
                    template_id,
                    employee_profile_id,
                    manager_profile_id,
                    ratings,
                    total_score,
                    status,
                    manager_submitted_at,
                    hr_published_at,
                    published_by_employee_id,
                    employee_acknowledged_at,
                    employee_acknowledgement_comment,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :assignment_id,
                    :cycle_id,
                    :template_id,
                    :employee_profile_id,
                    :manager_profile_id,
                    :ratings,
                    :total_score,
                    :status,
                    :manager_submitted_at,
                    :hr_published_at,
                    :published_by_employee_id,
                    :employee_acknowledged_at,
                    :employee_acknowledgement_comment,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":assignment_id": &row.assignment_id,
                ":cycle_id": &row.cycle_id,
                ":template_id": &row.template_id,
                ":employee_profile_id": &row.employee_profile_id,
                ":manager_profile_id": &row.manager_profile_id,
                ":ratings": &row.ratings,
                ":total_score": row.total_score,
                ":status": &row.status,
                ":manager_submitted_at": &row.manager_submitted_at,
                ":hr_published_at": &row.hr_published_at,
                ":published_by_employee_id": &row.published_by_employee_id,
                ":employee_acknowledged_at": &row.employee_acknowledged_at,
                ":employee_acknowledgement_comment": &row.employee_acknowledgement_comment,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    /// Persists publication and acknowledgement stamps; ratings stay immutable.
    pub fn update_lifecycle(conn: &Connection, row: &AppraisalRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE appraisal_records SET
                    status = :status,
                    hr_published_at = :hr_published_at,
                    published_by_employee_id = :published_by_employee_id,
                    employee_acknowledged_at = :employee_acknowledged_at,
                    employee_acknowledgement_comment = :employee_acknowledgement_comment,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":status": &row.status,
                ":hr_published_at": &row.hr_published_at,
                ":published_by_employee_id": &row.published_by_employee_id,
                ":employee_acknowledged_at": &row.employee_acknowledged_at,
                ":employee_acknowledgement_comment": &row.employee_acknowledgement_comment,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found(format!("Appraisal {} not found", row.id)));
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<AppraisalRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| AppraisalRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list(conn: &Connection, filters: &AppraisalListFilters) -> AppResult<Vec<AppraisalRow>> {
        let mut stmt = conn.prepare(&format!(
            r#"{}
                WHERE (:cycle_id IS NULL OR cycle_id = :cycle_id)
                  AND (:status IS NULL OR status = :status)
                ORDER BY manager_submitted_at DESC, id
            "#,
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":cycle_id": filters.cycle_id.as_deref(),
                    ":status": filters.status.map(|status| status.as_str()),
                },
                |row| AppraisalRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Published records for one employee, newest publication first.
    pub fn list_published_for_employee(
        conn: &Connection,
        employee_id: &str,
        limit: Option<u32>,
    ) -> AppResult<Vec<AppraisalRow>> {
        let mut stmt = conn.prepare(&format!(
            r#"{}
                WHERE employee_profile_id = :employee_id AND status = :status
                ORDER BY hr_published_at DESC, id
                LIMIT :limit
            "#,
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":employee_id": employee_id,
                    ":status": AppraisalRecordStatus::HrPublished.as_str(),
                    ":limit": limit.map(i64::from).unwrap_or(-1),
                },
                |row| AppraisalRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_by_status(
        conn: &Connection,
        cycle_id: Option<&str>,
    ) -> AppResult<Vec<(AppraisalRecordStatus, i64)>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT status, COUNT(*)
                FROM appraisal_records
                WHERE (?1 IS NULL OR cycle_id = ?1)
                GROUP BY status
            "#,
        )?;
        let raw = stmt
            .query_map([cycle_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(status, count)| Ok((decode_enum(&status)?, count)))
            .collect()
    }

    pub fn count_acknowledged(conn: &Connection, cycle_id: Option<&str>) -> AppResult<i64> {
        let count = conn.query_row(
            r#"
                SELECT COUNT(*)
                FROM appraisal_records
                WHERE employee_acknowledged_at IS NOT NULL
                  AND (?1 IS NULL OR cycle_id = ?1)
            "#,
            [cycle_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
