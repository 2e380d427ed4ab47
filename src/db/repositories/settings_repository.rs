use std::collections::HashMap;
use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for SettingRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            key: row.get("key")?,
            value: row.get("value")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct SettingsRepository;

impl SettingsRepository {
    pub fn get(conn: &Connection, key: &str) -> AppResult<Option<SettingRow>> {
        let mut stmt =
            conn.prepare("SELECT key, value, updated_at FROM app_settings WHERE key = ?1")?;
        let row = stmt
            .query_row([key], |row| SettingRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// All stored settings keyed by name.
    pub fn load_map(conn: &Connection) -> AppResult<HashMap<String, String>> {
        let mut stmt = conn.prepare("SELECT key, value, updated_at FROM app_settings")?;
        let rows = stmt
            .query_map([], |row| SettingRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    pub fn upsert(conn: &Connection, key: &str, value: &str, updated_at: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO app_settings (key, value, updated_at)
                VALUES (:key, :value, :updated_at)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
            "#,
            named_params! {":key": key, ":value": value, ":updated_at": updated_at},
        )?;
        Ok(())
    }
}
