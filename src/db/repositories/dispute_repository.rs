use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::codec::{
    decode_enum, decode_time, decode_time_opt, encode_time, encode_time_opt,
};
use crate::error::{AppError, AppResult};
use crate::models::dispute::{AppraisalDispute, DisputeListFilters, DisputeStatus};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        appraisal_id,
        assignment_id,
        cycle_id,
        raised_by_employee_id,
        reason,
        details,
        status,
        resolved_by_employee_id,
        resolution_summary,
        submitted_at,
        resolved_at,
        updated_at
    FROM appraisal_disputes
"#;

#[derive(Debug, Clone)]
pub struct DisputeRow {
    pub id: String,
    pub appraisal_id: String,
    pub assignment_id: String,
    pub cycle_id: String,
    pub raised_by_employee_id: String,
    pub reason: String,
    pub details: Option<String>,
    pub status: String,
    pub resolved_by_employee_id: Option<String>,
    pub resolution_summary: Option<String>,
    pub submitted_at: String,
    pub resolved_at: Option<String>,
    pub updated_at: String,
}

impl DisputeRow {
    pub fn from_record(record: &AppraisalDispute) -> Self {
        Self {
            id: record.id.clone(),
            appraisal_id: record.appraisal_id.clone(),
            assignment_id: record.assignment_id.clone(),
            cycle_id: record.cycle_id.clone(),
            raised_by_employee_id: record.raised_by_employee_id.clone(),
            reason: record.reason.clone(),
            details: record.details.clone(),
            status: record.status.as_str().to_string(),
            resolved_by_employee_id: record.resolved_by_employee_id.clone(),
            resolution_summary: record.resolution_summary.clone(),
            submitted_at: encode_time(&record.submitted_at),
            resolved_at: encode_time_opt(record.resolved_at.as_ref()),
            updated_at: encode_time(&record.updated_at),
        }
    }

    pub fn into_record(self) -> AppResult<AppraisalDispute> {
        Ok(AppraisalDispute {
            id: self.id,
            appraisal_id: self.appraisal_id,
            assignment_id: self.assignment_id,
            cycle_id: self.cycle_id,
            raised_by_employee_id: self.raised_by_employee_id,
            reason: self.reason,
            details: self.details,
            status: decode_enum(&self.status)?,
            resolved_by_employee_id: self.resolved_by_employee_id,
            resolution_summary: self.resolution_summary,
            submitted_at: decode_time(&self.submitted_at)?,
            resolved_at: decode_time_opt(self.resolved_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for DisputeRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(DisputeRow {
            id: row.get("id")?,
            appraisal_id: row.get("appraisal_id")?,
            assignment_id: row.get("assignment_id")?,
            cycle_id: row.get("cycle_id")?,
            raised_by_employee_id: row.get("raised_by_employee_id")?,
            reason: row.get("reason")?,
            details: row.get("details")?,
            status: row.get("status")?,
            resolved_by_employee_id: row.get("resolved_by_employee_id")?,
            resolution_summary: row.get("resolution_summary")?,
            submitted_at: row.get("submitted_at")?,
            resolved_at: row.get("resolved_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct DisputeRepository;

impl DisputeRepository {
    pub fn insert(conn: &Connection, row: &DisputeRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO appraisal_disputes (
                    id,
                    appraisal_id,
                    assignment_id,
                    cycle_id,
                    raised_by_employee_id,
                    reason,
                    details,
                    status,
                    resolved_by_employee_id,
                    resolution_summary,
                    submitted_at,
                    resolved_at,
                    updated_at
                ) VALUES (
                    :id,
                    :appraisal_id,
                    :assignment_id,
                    :cycle_id,
                    :raised_by_employee_id,
                    :reason,
                    :details,
                    :status,
                    :resolved_by_employee_id,
                    :resolution_summary,
                    :submitted_at,
                    :resolved_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":appraisal_id": &row.appraisal_id,
                ":assignment_id": &row.assignment_id,
                ":cycle_id": &row.cycle_id,
                ":raised_by_employee_id": &row.raised_by_employee_id,
                ":reason": &row.reason,
                ":details": &row.details,
                ":status": &row.status,
                ":resolved_by_employee_id": &row.resolved_by_employee_id,
                ":resolution_summary": &row.resolution_summary,
                ":submitted_at": &row.submitted_at,
                ":resolved_at": &row.resolved_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn update_status(conn: &Connection, row: &DisputeRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE appraisal_disputes SET
                    status = :status,
                    resolved_by_employee_id = :resolved_by_employee_id,
                    resolution_summary = :resolution_summary,
                    resolved_at = :resolved_at,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":status": &row.status,
                ":resolved_by_employee_id": &row.resolved_by_employee_id,
                ":resolution_summary": &row.resolution_summary,
                ":resolved_at": &row.resolved_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found(format!("Dispute {} not found", row.id)));
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<DisputeRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| DisputeRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// The OPEN or UNDER_REVIEW dispute against an appraisal, if any.
    pub fn find_active_for_appraisal(
        conn: &Connection,
        appraisal_id: &str,
    ) -> AppResult<Option<DisputeRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE appraisal_id = ?1 AND status IN ('OPEN', 'UNDER_REVIEW')",
            BASE_SELECT
        ))?;
        let row = stmt
            .query_row([appraisal_id], |row| DisputeRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list(conn: &Connection, filters: &DisputeListFilters) -> AppResult<Vec<DisputeRow>> {
        let mut stmt = conn.prepare(&format!(
            r#"{}
                WHERE (:status IS NULL OR status = :status)
                  AND (:cycle_id IS NULL OR cycle_id = :cycle_id)
                ORDER BY submitted_at DESC, id
            "#,
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":status": filters.status.map(|status| status.as_str()),
                    ":cycle_id": filters.cycle_id.as_deref(),
                },
                |row| DisputeRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_by_status(
        conn: &Connection,
        cycle_id: Option<&str>,
    ) -> AppResult<Vec<(DisputeStatus, i64)>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT status, COUNT(*)
                FROM appraisal_disputes
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
}
