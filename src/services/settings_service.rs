use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{info, warn};

use crate::db::repositories::codec::encode_time;
use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{AppraisalSettings, AppraisalSettingsUpdate};
use crate::utils::clock::SharedClock;

pub const KEY_DISPUTE_WINDOW_DAYS: &str = "dispute_window_days";
pub const KEY_DEFAULT_ASSIGNMENT_STATUS: &str = "default_assignment_status";
pub const KEY_MANAGER_FALLBACK: &str = "manager_fallback_to_department_head";
pub const KEY_TREND_HISTORY_LIMIT: &str = "trend_history_limit";

const DISPUTE_WINDOW_RANGE: std::ops::RangeInclusive<i64> = 1..=90;
const TREND_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

pub struct SettingsService {
    db: DbPool,
    clock: SharedClock,
    cache: RwLock<Option<AppraisalSettings>>,
}

impl SettingsService {
    pub fn new(db: DbPool, clock: SharedClock) -> Self {
        Self {
            db,
            clock,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<AppraisalSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let stored = self.db.with_connection(SettingsRepository::load_map)?;
        let settings = settings_from_map(&stored);
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: AppraisalSettingsUpdate) -> AppResult<AppraisalSettings> {
        let mut current = self.get()?;

        if let Some(days) = input.dispute_window_days {
            if !DISPUTE_WINDOW_RANGE.contains(&days) {
                return Err(AppError::validation(
                    "Dispute window must be between 1 and 90 days",
                ));
            }
            current.dispute_window_days = days;
        }

        if let Some(status) = input.default_assignment_status {
            if !status.accepts_submission() {
                return Err(AppError::validation(
                    "Default assignment status must be NOT_STARTED or IN_PROGRESS",
                ));
            }
            current.default_assignment_status = status;
        }

        if let Some(fallback) = input.manager_fallback_to_department_head {
            current.manager_fallback_to_department_head = fallback;
        }

        if let Some(limit) = input.trend_history_limit {
            if !TREND_LIMIT_RANGE.contains(&limit) {
                return Err(AppError::validation(
                    "Trend history limit must be between 1 and 100",
                ));
            }
            current.trend_history_limit = limit;
        }

        let now = encode_time(&self.clock.now());
        let entries = [
            (
                KEY_DISPUTE_WINDOW_DAYS,
                current.dispute_window_days.to_string(),
            ),
            (
                KEY_DEFAULT_ASSIGNMENT_STATUS,
                current.default_assignment_status.as_str().to_string(),
            ),
            (
                KEY_MANAGER_FALLBACK,
                current.manager_fallback_to_department_head.to_string(),
            ),
            (
                KEY_TREND_HISTORY_LIMIT,
                current.trend_history_limit.to_string(),
            ),
        ];
        self.db.with_transaction(|conn| {
            for (key, value) in &entries {
                SettingsRepository::upsert(conn, key, value, &now)?;
            }
            Ok(())
        })?;

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }
        info!(
            target: "app::settings",
            dispute_window_days = current.dispute_window_days,
            trend_history_limit = current.trend_history_limit,
            "appraisal settings updated"
        );
        Ok(current)
    }
}

fn settings_from_map(stored: &HashMap<String, String>) -> AppraisalSettings {
    let defaults = AppraisalSettings::default();

    let dispute_window_days = parse_or(
        stored,
        KEY_DISPUTE_WINDOW_DAYS,
        defaults.dispute_window_days,
        |raw| raw.parse::<i64>().ok().filter(|days| DISPUTE_WINDOW_RANGE.contains(days)),
    );
    let default_assignment_status = parse_or(
        stored,
        KEY_DEFAULT_ASSIGNMENT_STATUS,
        defaults.default_assignment_status,
        |raw| raw.parse().ok(),
    );
    let manager_fallback_to_department_head = parse_or(
        stored,
        KEY_MANAGER_FALLBACK,
        defaults.manager_fallback_to_department_head,
        |raw| raw.parse::<bool>().ok(),
    );
    let trend_history_limit = parse_or(
        stored,
        KEY_TREND_HISTORY_LIMIT,
        defaults.trend_history_limit,
        |raw| raw.parse::<u32>().ok().filter(|limit| TREND_LIMIT_RANGE.contains(limit)),
    );

    AppraisalSettings {
        dispute_window_days,
        default_assignment_status,
        manager_fallback_to_department_head,
        trend_history_limit,
    }
}

fn parse_or<T>(
    stored: &HashMap<String, String>,
    key: &str,
    fallback: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match stored.get(key) {
        Some(raw) => match parse(raw) {
            Some(value) => value,
            None => {
                warn!(target: "app::settings", %key, %raw, "ignoring malformed setting");
                fallback
            }
        },
        None => fallback,
    }
}
