use std::convert::TryFrom;

use rusqlite::{named_params, params, Connection, OptionalExtension, Row};

use crate::db::repositories::codec::{decode_enum, decode_time, decode_time_opt, encode_time};
use crate::error::{AppError, AppResult};
use crate::models::cycle::{AppraisalCycle, CycleStatus, CycleTemplateAssignment};

const BASE_SELECT: &str = r#"
    SELECT
        c.id,
        c.name,
        c.description,
        c.cycle_type,
        c.start_date,
        c.end_date,
        c.status,
        c.manager_due_date,
        c.employee_acknowledgement_due_date,
        c.closed_at,
        c.created_at,
        c.updated_at
    FROM appraisal_cycles c
"#;

#[derive(Debug, Clone)]
pub struct CycleRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cycle_type: String,
    pub start_date: String,
    pub end_date: String,
    pub status: String,
    pub manager_due_date: Option<String>,
    pub employee_acknowledgement_due_date: Option<String>,
    pub closed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl CycleRow {
    pub fn from_record(record: &AppraisalCycle) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            cycle_type: record.cycle_type.as_str().to_string(),
            start_date: encode_time(&record.start_date),
            end_date: encode_time(&record.end_date),
            status: record.status.as_str().to_string(),
            manager_due_date: record.manager_due_date.as_ref().map(encode_time),
            employee_acknowledgement_due_date: record
                .employee_acknowledgement_due_date
                .as_ref()
                .map(encode_time),
            closed_at: record.closed_at.as_ref().map(encode_time),
            created_at: encode_time(&record.created_at),
            updated_at: encode_time(&record.updated_at),
        }
    }

    pub fn into_record(
        self,
        template_assignments: Vec<CycleTemplateAssignment>,
    ) -> AppResult<AppraisalCycle> {
        Ok(AppraisalCycle {
            id: self.id,
            name: self.name,
            description: self.description,
            cycle_type: decode_enum(&self.cycle_type)?,
            start_date: decode_time(&self.start_date)?,
            end_date: decode_time(&self.end_date)?,
            status: decode_enum(&self.status)?,
            template_assignments,
            manager_due_date: decode_time_opt(self.manager_due_date)?,
            employee_acknowledgement_due_date: decode_time_opt(
                self.employee_acknowledgement_due_date,
            )?,
            closed_at: decode_time_opt(self.closed_at)?,
            created_at: decode_time(&self.created_at)?,
            updated_at: decode_time(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for CycleRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(CycleRow {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            cycle_type: row.get("cycle_type")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            status: row.get("status")?,
            manager_due_date: row.get("manager_due_date")?,
            employee_acknowledgement_due_date: row.get("employee_acknowledgement_due_date")?,
            closed_at: row.get("closed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct CycleRepository;

impl CycleRepository {
    /// Inserts the cycle and one binding row per (template, department) pair.
    pub fn insert(conn: &Connection, record: &AppraisalCycle) -> AppResult<()> {
        let row = CycleRow::from_record(record);
        conn.execute(
            r#"
                INSERT INTO appraisal_cycles (
                    id,
                    name,
                    description,
                    cycle_type,
                    start_date,
                    end_date,
                    status,
                    manager_due_date,
                    employee_acknowledgement_due_date,
                    closed_at,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :name,
                    :description,
                    :cycle_type,
                    :start_date,
                    :end_date,
                    :status,
                    :manager_due_date,
                    :employee_acknowledgement_due_date,
                    :closed_at,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":description": &row.description,
                ":cycle_type": &row.cycle_type,
                ":start_date": &row.start_date,
                ":end_date": &row.end_date,
                ":status": &row.status,
                ":manager_due_date": &row.manager_due_date,
                ":employee_acknowledgement_due_date": &row.employee_acknowledgement_due_date,
                ":closed_at": &row.closed_at,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        let mut stmt = conn.prepare(
            "INSERT INTO appraisal_cycle_templates (cycle_id, template_id, department_id, position) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, binding) in record.template_assignments.iter().enumerate() {
            for department_id in &binding.department_ids {
                stmt.execute(params![
                    &record.id,
                    &binding.template_id,
                    department_id,
                    position as i64
                ])?;
            }
        }

        Ok(())
    }

    pub fn update_status(
        conn: &Connection,
        id: &str,
        status: CycleStatus,
        closed_at: Option<&str>,
        updated_at: &str,
    ) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE appraisal_cycles SET
                    status = :status,
                    closed_at = COALESCE(:closed_at, closed_at),
                    updated_at = :updated_at
                WHERE id = :id
            "#,
            named_params! {
                ":id": id,
                ":status": status.as_str(),
                ":closed_at": closed_at,
                ":updated_at": updated_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found(format!("Cycle {id} not found")));
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<AppraisalCycle>> {
        let mut stmt = conn.prepare(&format!("{} WHERE c.id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| CycleRow::try_from(row))
            .optional()?;
        match row {
            Some(row) => Ok(Some(Self::hydrate(conn, row)?)),
            None => Ok(None),
        }
    }

    pub fn list(conn: &Connection, status: Option<CycleStatus>) -> AppResult<Vec<AppraisalCycle>> {
        let rows = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE c.status = ?1 ORDER BY c.start_date DESC",
                    BASE_SELECT
                ))?;
                let rows = stmt
                    .query_map([status.as_str()], |row| CycleRow::try_from(row))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{} ORDER BY c.start_date DESC", BASE_SELECT))?;
                let rows = stmt
                    .query_map([], |row| CycleRow::try_from(row))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        rows.into_iter()
            .map(|row| Self::hydrate(conn, row))
            .collect()
    }

    /// Every cycle that binds any template to `department_id`, in any status.
    pub fn list_for_department(
        conn: &Connection,
        department_id: &str,
    ) -> AppResult<Vec<AppraisalCycle>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE c.id IN (SELECT cycle_id FROM appraisal_cycle_templates WHERE department_id = ?1) ORDER BY c.start_date",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([department_id], |row| CycleRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|row| Self::hydrate(conn, row))
            .collect()
    }

    pub fn active_cycle_ids_for_template(
        conn: &Connection,
        template_id: &str,
    ) -> AppResult<Vec<String>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT DISTINCT c.id
                FROM appraisal_cycles c
                JOIN appraisal_cycle_templates t ON t.cycle_id = c.id
                WHERE t.template_id = ?1 AND c.status = 'ACTIVE'
                ORDER BY c.id
            "#,
        )?;
        let ids = stmt
            .query_map([template_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn count_by_status(conn: &Connection) -> AppResult<Vec<(CycleStatus, i64)>> {
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM appraisal_cycles GROUP BY status")?;
        let raw = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(status, count)| Ok((decode_enum(&status)?, count)))
            .collect()
    }

    fn hydrate(conn: &Connection, row: CycleRow) -> AppResult<AppraisalCycle> {
        let bindings = Self::load_bindings(conn, &row.id)?;
        row.into_record(bindings)
    }

    fn load_bindings(conn: &Connection, cycle_id: &str) -> AppResult<Vec<CycleTemplateAssignment>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT template_id, department_id
                FROM appraisal_cycle_templates
                WHERE cycle_id = ?1
                ORDER BY position, rowid
            "#,
        )?;
        let pairs = stmt
            .query_map([cycle_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut bindings: Vec<CycleTemplateAssignment> = Vec::new();
        for (template_id, department_id) in pairs {
            match bindings
                .iter_mut()
                .find(|binding| binding.template_id == template_id)
            {
                Some(binding) => binding.department_ids.push(department_id),
                None => bindings.push(CycleTemplateAssignment {
                    template_id,
                    department_ids: vec![department_id],
                }),
            }
        }
        Ok(bindings)
    }
}
