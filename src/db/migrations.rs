use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::settings::AppraisalSettings;
use crate::services::settings_service::{
    KEY_DEFAULT_ASSIGNMENT_STATUS, KEY_DISPUTE_WINDOW_DAYS, KEY_MANAGER_FALLBACK,
    KEY_TREND_HISTORY_LIMIT,
};

const USER_VERSION: i32 = 2;

#[derive(Debug)]
pub struct MigrationInfo {
    pub version: i32,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            rollback_sql TEXT
        );
        "#,
    )?;

    let mut current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version < 1 {
        info!(target: "app::db", version = current_version, "running migration v1");
        migrate_to_v1(conn)?;
        current_version = 1;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            1,
            "Seed default appraisal settings",
            Some("DELETE FROM app_settings;"),
        )?;
    }

    if current_version < 2 {
        info!(target: "app::db", version = current_version, "running migration v2");
        migrate_to_v2(conn)?;
        current_version = 2;
        conn.execute(&format!("PRAGMA user_version = {}", current_version), [])?;
        record_migration(
            conn,
            2,
            "Add reporting indexes for records, assignments and disputes",
            Some(
                r#"
                DROP INDEX IF EXISTS idx_appraisal_records_cycle_status;
                DROP INDEX IF EXISTS idx_appraisal_assignments_cycle_status;
                DROP INDEX IF EXISTS idx_appraisal_disputes_cycle;
                "#,
            ),
        )?;
    }

    if current_version != USER_VERSION {
        conn.execute(&format!("PRAGMA user_version = {}", USER_VERSION), [])?;
    }

    Ok(())
}

fn record_migration(
    conn: &Connection,
    version: i32,
    description: &str,
    rollback_sql: Option<&str>,
) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO migration_history (version, description, applied_at, rollback_sql) VALUES (?, ?, ?, ?)",
        (version, description, now, rollback_sql),
    )?;
    Ok(())
}

pub fn rollback_to_version(conn: &Connection, target_version: i32) -> AppResult<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if target_version >= current_version {
        warn!(target: "app::db", target_version, current_version, "rollback target is not below current version");
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT version, rollback_sql FROM migration_history WHERE version > ? ORDER BY version DESC",
    )?;
    let scripts = stmt
        .query_map([target_version], |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (version, rollback_sql) in scripts {
        match rollback_sql {
            Some(sql) => {
                info!(target: "app::db", version, "rolling back migration");
                conn.execute_batch(&sql)?;
            }
            None => warn!(target: "app::db", version, "no rollback script for migration"),
        }
    }

    conn.execute(&format!("PRAGMA user_version = {}", target_version), [])?;
    conn.execute("DELETE FROM migration_history WHERE version > ?", [target_version])?;

    Ok(())
}

pub fn get_migration_history(conn: &Connection) -> AppResult<Vec<MigrationInfo>> {
    let mut stmt = conn.prepare(
        "SELECT version, description, applied_at FROM migration_history ORDER BY version",
    )?;

    let migrations = stmt
        .query_map([], |row| {
            let applied_at_str: String = row.get(2)?;
            let applied_at = DateTime::parse_from_rfc3339(&applied_at_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "applied_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Utc);

            Ok(MigrationInfo {
                version: row.get(0)?,
                description: row.get(1)?,
                applied_at,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(migrations)
}

fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    let defaults = AppraisalSettings::default();
    let now = Utc::now().to_rfc3339();
    let seeds = [
        (
            KEY_DISPUTE_WINDOW_DAYS,
            defaults.dispute_window_days.to_string(),
        ),
        (
            KEY_DEFAULT_ASSIGNMENT_STATUS,
            defaults.default_assignment_status.as_str().to_string(),
        ),
        (
            KEY_MANAGER_FALLBACK,
            defaults.manager_fallback_to_department_head.to_string(),
        ),
        (
            KEY_TREND_HISTORY_LIMIT,
            defaults.trend_history_limit.to_string(),
        ),
    ];

    for (key, value) in seeds {
        conn.execute(
            "INSERT OR IGNORE INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            (key, value, &now),
        )?;
    }

    Ok(())
}

fn migrate_to_v2(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_appraisal_records_cycle_status
            ON appraisal_records(cycle_id, status);
        CREATE INDEX IF NOT EXISTS idx_appraisal_assignments_cycle_status
            ON appraisal_assignments(cycle_id, status);
        CREATE INDEX IF NOT EXISTS idx_appraisal_disputes_cycle
            ON appraisal_disputes(cycle_id);
        "#,
    )?;
    Ok(())
}
