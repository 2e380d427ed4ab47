//! Contracts for the employee and organization stores the engine depends on.
//!
//! Lookups take the caller's connection so that collaborator reads and the
//! history append join whatever transaction the engine has open.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repositories::codec::encode_time;
use crate::db::repositories::directory_repository::DirectoryRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::appraisal::AppraisalHistoryEntry;
use crate::models::directory::{Department, EmployeeProfile, Position};

pub trait EmployeeDirectory: Send + Sync {
    fn resolve_employee(&self, conn: &Connection, id: &str) -> AppResult<Option<EmployeeProfile>>;

    fn append_appraisal_history(
        &self,
        conn: &Connection,
        employee_id: &str,
        entry: &AppraisalHistoryEntry,
    ) -> AppResult<()>;

    fn list_appraisal_history(
        &self,
        conn: &Connection,
        employee_id: &str,
    ) -> AppResult<Vec<AppraisalHistoryEntry>>;
}

pub trait OrganizationDirectory: Send + Sync {
    fn resolve_department(&self, conn: &Connection, id: &str) -> AppResult<Option<Department>>;

    fn resolve_position(&self, conn: &Connection, id: &str) -> AppResult<Option<Position>>;
}

/// Directory backed by the same SQLite file as the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDirectory;

impl EmployeeDirectory for SqliteDirectory {
    fn resolve_employee(&self, conn: &Connection, id: &str) -> AppResult<Option<EmployeeProfile>> {
        DirectoryRepository::find_employee(conn, id)
    }

    fn append_appraisal_history(
        &self,
        conn: &Connection,
        employee_id: &str,
        entry: &AppraisalHistoryEntry,
    ) -> AppResult<()> {
        let id = Uuid::new_v4().to_string();
        DirectoryRepository::insert_history(conn, &id, employee_id, entry)
    }

    fn list_appraisal_history(
        &self,
        conn: &Connection,
        employee_id: &str,
    ) -> AppResult<Vec<AppraisalHistoryEntry>> {
        DirectoryRepository::list_history(conn, employee_id)
    }
}

impl OrganizationDirectory for SqliteDirectory {
    fn resolve_department(&self, conn: &Connection, id: &str) -> AppResult<Option<Department>> {
        DirectoryRepository::find_department(conn, id)
    }

    fn resolve_position(&self, conn: &Connection, id: &str) -> AppResult<Option<Position>> {
        DirectoryRepository::find_position(conn, id)
    }
}

impl SqliteDirectory {
    pub fn upsert_employee(&self, db: &DbPool, employee: &EmployeeProfile) -> AppResult<()> {
        let now = encode_time(&Utc::now());
        db.with_connection(|conn| DirectoryRepository::upsert_employee(conn, employee, &now))
    }

    pub fn upsert_department(&self, db: &DbPool, department: &Department) -> AppResult<()> {
        let now = encode_time(&Utc::now());
        db.with_connection(|conn| DirectoryRepository::upsert_department(conn, department, &now))
    }

    pub fn upsert_position(&self, db: &DbPool, position: &Position) -> AppResult<()> {
        let now = encode_time(&Utc::now());
        db.with_connection(|conn| DirectoryRepository::upsert_position(conn, position, &now))
    }
}

/// Both collaborator handles, shared across services.
#[derive(Clone)]
pub struct Directories {
    pub employees: Arc<dyn EmployeeDirectory>,
    pub organization: Arc<dyn OrganizationDirectory>,
}

impl Directories {
    pub fn new(
        employees: Arc<dyn EmployeeDirectory>,
        organization: Arc<dyn OrganizationDirectory>,
    ) -> Self {
        Self {
            employees,
            organization,
        }
    }

    pub fn sqlite() -> Self {
        let directory = Arc::new(SqliteDirectory);
        Self {
            employees: directory.clone(),
            organization: directory,
        }
    }
}
