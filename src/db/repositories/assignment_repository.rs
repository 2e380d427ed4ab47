use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::codec::{
    decode_enum, decode_time, decode_time_opt, encode_time, encode_time_opt,
};
use crate::error::{AppError, AppResult};
use crate::models::assignment::{AppraisalAssignment, AssignmentStatus};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        cycle_id,
        template_id,
        employee_profile_id,
        manager_profile_id,
        department_id,
        position_id,
        status,
        due_date,
        submitted_at,
        published_at,
        latest_appraisal_id,
        created_at,
        updated_at
    FROM appraisal_assignments
"#;

#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub id: String,
    pub cycle_id: String,
    pub template_id: String,
    pub employee_profile_id: String,
    pub manager_profile_id: Option<String>,
    pub department_id: String,
    pub position_id: Option<String>,
    pub status: String,
    pub due_date: Option<String>,
    pub submitted_at: Option<String>,
    pub published_at: Option<String>,
    pub latest_appraisal_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl AssignmentRow {
    pub fn from_record(record: &AppraisalAssignment) -> Self {
        Self {
            id: record.id.clone(),
            cycle_id: record.cycle_id.clone(),
            template_id: record.template_id.clone(),
            employee_profile_id: record.employee_profile_id.clone(),
            manager_profile_id: record.manager_profile_id.clone(),
            department_id: record.department_id.clone(),
            position_id: record.position_id.clone(),
            status: record.status.as_str().to_string(),
            due_date: encode_time_opt(record.due_date.as_ref()),
            submitted_at: encode_time_opt(record.submitted_at.as_ref()),
            published_at: encode_time_opt(record.published_at.as_ref()),
            latest_appraisal_id: record.latest_appraisal_id.clone(),
            created_at: encode_time(&record.created_at),
            updated_at: encode_time(&record.updated_at),
        }
    }

    pub fn into_record(self) -> AppResult<AppraisalAssignment> {
        Ok(AppraisalAssignment {
            id: self.id,
            cycle_id: self.cycle_id,
            template_id: self.template_id,
            employee_profile_id: self.employee_profile_id,
            manager_profile_id: self.manager_profile_id,
            department_id: self.department_id,
            position_id: self.position_id,
            status: decode_enum(&self.status)?,
            due_date: decode_time_opt(self.due_date)?,
            submitted_at: decode_time_opt(self.submitted_at)?,
            published_at: decode_time_opt(self.published_at)?,
            latest_appraisal_id: self.latest_appraisal_id,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for AssignmentRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(AssignmentRow {
            id: row.get("id")?,
            cycle_id: row.get("cycle_id")?,
            template_id: row.get("template_id")?,
            employee_profile_id: row.get("employee_profile_id")?,
            manager_profile_id: row.get("manager_profile_id")?,
            department_id: row.get("department_id")?,
            position_id: row.get("position_id")?,
            status: row.get("status")?,
            due_date: row.get("due_date")?,
            submitted_at: row.get("submitted_at")?,
            published_at: row.get("published_at")?,
            latest_appraisal_id: row.get("latest_appraisal_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct AssignmentRepository;

impl AssignmentRepository {
    pub fn insert(conn: &Connection, row: &AssignmentRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO appraisal_assignments (
                    id,
                    cycle_id,
                    template_id,
                    employee_profile_id,
                    manager_profile_id,
                    department_id,
                    position_id,
                    status,
                    due_date,
                    submitted_at,
                    published_at,
                    latest_appraisal_id,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :cycle_id,
                    :template_id,
                    :employee_profile_id,
                    :manager_profile_id,
                    :department_id,
                    :position_id,
                    :status,
                    :due_date,
                    :submitted_at,
                    :published_at,
                    :latest_appraisal_id,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":cycle_id": &row.cycle_id,
                ":template_id": &row.template_id,
                ":employee_profile_id": &row.employee_profile_id,
                ":manager_profile_id": &row.manager_profile_id,
                ":department_id": &row.department_id,
                ":position_id": &row.position_id,
                ":status": &row.status,
                ":due_date": &row.due_date,
                ":submitted_at": &row.submitted_at,
                ":published_at": &row.published_at,
                ":latest_appraisal_id": &row.latest_appraisal_id,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    /// Writes the mutable progress columns of an assignment.
    pub fn update_progress(conn: &Connection, row: &AssignmentRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE appraisal_assignments SET
                    status = :status,
                    submitted_at = :submitted_at,
                    published_at = :published_at,
                    latest_appraisal_id = :latest_appraisal_id,
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":status": &row.status,
                ":submitted_at": &row.submitted_at,
                ":published_at": &row.published_at,
                ":latest_appraisal_id": &row.latest_appraisal_id,
                ":updated_at": &row.updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found(format!("Assignment {} not found", row.id)));
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<AssignmentRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| AssignmentRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn find_by_triple(
        conn: &Connection,
        employee_profile_id: &str,
        cycle_id: &str,
        template_id: &str,
    ) -> AppResult<Option<AssignmentRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE employee_profile_id = ?1 AND cycle_id = ?2 AND template_id = ?3",
            BASE_SELECT
        ))?;
        let row = stmt
            .query_row([employee_profile_id, cycle_id, template_id], |row| {
                AssignmentRow::try_from(row)
            })
            .optional()?;
        Ok(row)
    }

    pub fn list_by_manager(conn: &Connection, manager_id: &str) -> AppResult<Vec<AssignmentRow>> {
        Self::list_where(conn, "manager_profile_id = ?1", manager_id)
    }

    pub fn list_by_employee(conn: &Connection, employee_id: &str) -> AppResult<Vec<AssignmentRow>> {
        Self::list_where(conn, "employee_profile_id = ?1", employee_id)
    }

    pub fn list_by_cycle(conn: &Connection, cycle_id: &str) -> AppResult<Vec<AssignmentRow>> {
        Self::list_where(conn, "cycle_id = ?1", cycle_id)
    }

    pub fn list_by_department(
        conn: &Connection,
        department_id: &str,
    ) -> AppResult<Vec<AssignmentRow>> {
        Self::list_where(conn, "department_id = ?1", department_id)
    }

    pub fn count_by_status(
        conn: &Connection,
        cycle_id: Option<&str>,
    ) -> AppResult<Vec<(AssignmentStatus, i64)>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT status, COUNT(*)
                FROM appraisal_assignments
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

    fn list_where(conn: &Connection, clause: &str, value: &str) -> AppResult<Vec<AssignmentRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE {} ORDER BY created_at DESC, id",
            BASE_SELECT, clause
        ))?;
        let rows = stmt
            .query_map([value], |row| AssignmentRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
