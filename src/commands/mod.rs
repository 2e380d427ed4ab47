pub mod appraisals;
pub mod assignments;
pub mod cycles;
pub mod disputes;
pub mod reports;
pub mod settings;
pub mod templates;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::appraisal_service::AppraisalService;
use crate::services::assignment_service::AssignmentService;
use crate::services::cycle_service::CycleService;
use crate::services::directory::Directories;
use crate::services::dispute_service::DisputeService;
use crate::services::report_service::ReportService;
use crate::services::settings_service::SettingsService;
use crate::services::template_service::TemplateService;
use crate::utils::clock::{system_clock, SharedClock};

/// Composition root: every service shares one pool, one clock and one set of directories.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    clock: SharedClock,
    directories: Directories,
    settings_service: Arc<SettingsService>,
    template_service: Arc<TemplateService>,
    cycle_service: Arc<CycleService>,
    assignment_service: Arc<AssignmentService>,
    appraisal_service: Arc<AppraisalService>,
    dispute_service: Arc<DisputeService>,
    report_service: Arc<ReportService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> Self {
        Self::with_dependencies(db_pool, Directories::sqlite(), system_clock())
    }

    pub fn with_dependencies(
        db_pool: DbPool,
        directories: Directories,
        clock: SharedClock,
    ) -> Self {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone(), Arc::clone(&clock)));
        let template_service = Arc::new(TemplateService::new(
            db_pool.clone(),
            Arc::clone(&directories.organization),
            Arc::clone(&clock),
        ));
        let cycle_service = Arc::new(CycleService::new(
            db_pool.clone(),
            Arc::clone(&directories.organization),
            Arc::clone(&clock),
        ));
        let assignment_service = Arc::new(AssignmentService::new(
            db_pool.clone(),
            directories.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&clock),
        ));
        let appraisal_service = Arc::new(AppraisalService::new(
            db_pool.clone(),
            directories.clone(),
            Arc::clone(&clock),
        ));
        let dispute_service = Arc::new(DisputeService::new(
            db_pool.clone(),
            directories.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&clock),
        ));
        let report_service = Arc::new(ReportService::new(
            db_pool.clone(),
            Arc::clone(&directories.organization),
            Arc::clone(&settings_service),
            Arc::clone(&clock),
        ));

        Self {
            db_pool,
            clock,
            directories,
            settings_service,
            template_service,
            cycle_service,
            assignment_service,
            appraisal_service,
            dispute_service,
            report_service,
        }
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn templates(&self) -> Arc<TemplateService> {
        Arc::clone(&self.template_service)
    }

    pub fn cycles(&self) -> Arc<CycleService> {
        Arc::clone(&self.cycle_service)
    }

    pub fn assignments(&self) -> Arc<AssignmentService> {
        Arc::clone(&self.assignment_service)
    }

    pub fn appraisals(&self) -> Arc<AppraisalService> {
        Arc::clone(&self.appraisal_service)
    }

    pub fn disputes(&self) -> Arc<DisputeService> {
        Arc::clone(&self.dispute_service)
    }

    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.report_service)
    }

    pub fn directories(&self) -> Directories {
        self.directories.clone()
    }

    pub fn clock(&self) -> SharedClock {
        Arc::clone(&self.clock)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL", message, None)
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::NotFound { message } => CommandError::new("NOT_FOUND", message, None),
            AppError::Forbidden { message } => CommandError::new("FORBIDDEN", message, None),
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::internal("Storage operation failed")
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::internal("Serialization failed")
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::internal("File system operation failed")
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::internal(message)
            }
        }
    }
}

/// Runs a blocking service call on the tokio blocking pool.
///
/// `operation` names the command in logs when the call fails.
pub(crate) async fn run_blocking<T: Send + 'static>(
    operation: &'static str,
    task: impl FnOnce() -> AppResult<T> + Send + 'static,
) -> CommandResult<T> {
    let outcome = tokio::task::spawn_blocking(task).await.map_err(|err| {
        error!(target: "app::command", operation, error = %err, "command task aborted");
        CommandError::internal(format!("{operation} did not complete"))
    })?;

    outcome.map_err(|err| {
        match &err {
            AppError::Validation { .. }
            | AppError::Conflict { .. }
            | AppError::NotFound { .. }
            | AppError::Forbidden { .. } => {
                warn!(target: "app::command", operation, error = %err, "command rejected");
            }
            _ => {
                error!(target: "app::command", operation, error = %err, "command failed");
            }
        }
        CommandError::from(err)
    })
}
