use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::db::repositories::codec::{decode_time, encode_time};
use crate::error::AppResult;
use crate::models::appraisal::AppraisalHistoryEntry;
use crate::models::directory::{Department, EmployeeProfile, Position};

impl TryFrom<&Row<'_>> for EmployeeProfile {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(EmployeeProfile {
            id: row.get("id")?,
            full_name: row.get("full_name")?,
            email: row.get("email")?,
            department_id: row.get("department_id")?,
            position_id: row.get("position_id")?,
        })
    }
}

impl TryFrom<&Row<'_>> for Department {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Department {
            id: row.get("id")?,
            name: row.get("name")?,
            head_employee_id: row.get("head_employee_id")?,
        })
    }
}

impl TryFrom<&Row<'_>> for Position {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Position {
            id: row.get("id")?,
            title: row.get("title")?,
            department_id: row.get("department_id")?,
        })
    }
}

/// Storage for the employee and organization master data the engine consults.
pub struct DirectoryRepository;

impl DirectoryRepository {
    pub fn find_employee(conn: &Connection, id: &str) -> AppResult<Option<EmployeeProfile>> {
        let mut stmt = conn.prepare(
            "SELECT id, full_name, email, department_id, position_id FROM employees WHERE id = ?1",
        )?;
        let row = stmt
            .query_row([id], |row| EmployeeProfile::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn find_department(conn: &Connection, id: &str) -> AppResult<Option<Department>> {
        let mut stmt =
            conn.prepare("SELECT id, name, head_employee_id FROM departments WHERE id = ?1")?;
        let row = stmt
            .query_row([id], |row| Department::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn find_position(conn: &Connection, id: &str) -> AppResult<Option<Position>> {
        let mut stmt =
            conn.prepare("SELECT id, title, department_id FROM positions WHERE id = ?1")?;
        let row = stmt
            .query_row([id], |row| Position::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn upsert_employee(conn: &Connection, employee: &EmployeeProfile, now: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO employees (id, full_name, email, department_id, position_id, created_at)
                VALUES (:id, :full_name, :email, :department_id, :position_id, :created_at)
                ON CONFLICT(id) DO UPDATE SET
                    full_name = excluded.full_name,
                    email = excluded.email,
                    department_id = excluded.department_id,
                    position_id = excluded.position_id
            "#,
            named_params! {
                ":id": &employee.id,
                ":full_name": &employee.full_name,
                ":email": &employee.email,
                ":department_id": &employee.department_id,
                ":position_id": &employee.position_id,
                ":created_at": now,
            },
        )?;
        Ok(())
    }

    pub fn upsert_department(conn: &Connection, department: &Department, now: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO departments (id, name, head_employee_id, created_at)
                VALUES (:id, :name, :head_employee_id, :created_at)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    head_employee_id = excluded.head_employee_id
            "#,
            named_params! {
                ":id": &department.id,
                ":name": &department.name,
                ":head_employee_id": &department.head_employee_id,
                ":created_at": now,
            },
        )?;
        Ok(())
    }

    pub fn upsert_position(conn: &Connection, position: &Position, now: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO positions (id, title, department_id, created_at)
                VALUES (:id, :title, :department_id, :created_at)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    department_id = excluded.department_id
            "#,
            named_params! {
                ":id": &position.id,
                ":title": &position.title,
                ":department_id": &position.department_id,
                ":created_at": now,
            },
        )?;
        Ok(())
    }

    pub fn insert_history(
        conn: &Connection,
        id: &str,
        employee_id: &str,
        entry: &AppraisalHistoryEntry,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO employee_appraisal_history (
                    id, employee_id, appraisal_id, cycle_id, template_id, total_score, published_at
                ) VALUES (
                    :id, :employee_id, :appraisal_id, :cycle_id, :template_id, :total_score, :published_at
                )
            "#,
            named_params! {
                ":id": id,
                ":employee_id": employee_id,
                ":appraisal_id": &entry.appraisal_id,
                ":cycle_id": &entry.cycle_id,
                ":template_id": &entry.template_id,
                ":total_score": entry.total_score,
                ":published_at": encode_time(&entry.published_at),
            },
        )?;
        Ok(())
    }

    pub fn list_history(conn: &Connection, employee_id: &str) -> AppResult<Vec<AppraisalHistoryEntry>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT appraisal_id, cycle_id, template_id, total_score, published_at
                FROM employee_appraisal_history
                WHERE employee_id = ?1
                ORDER BY published_at DESC
            "#,
        )?;
        let raw = stmt
            .query_map([employee_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(
                |(appraisal_id, cycle_id, template_id, total_score, published_at)| {
                    Ok(AppraisalHistoryEntry {
                        appraisal_id,
                        cycle_id,
                        template_id,
                        total_score,
                        published_at: decode_time(&published_at)?,
                    })
                },
            )
            .collect()
    }
}
