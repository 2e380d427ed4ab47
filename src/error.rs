use rusqlite;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {message}")]
    Database { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        details: Option<JsonValue>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            source: None,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            source: None,
            details: Some(details),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::conflict", %message, "conflict error");
        AppError::Conflict { message }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::database", %message, "resource not found");
        AppError::NotFound { message }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::access", %message, "forbidden");
        AppError::Forbidden { message }
    }

    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::database", %message, "database error");
        AppError::Database { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, AppError::Forbidden { .. })
    }

    /// Human-readable message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            AppError::Database { message }
            | AppError::NotFound { message }
            | AppError::Conflict { message }
            | AppError::Forbidden { message }
            | AppError::Validation { message, .. } => message.clone(),
            AppError::Serialization(error) => error.to_string(),
            AppError::Io(error) => error.to_string(),
            AppError::Other(message) => message.clone(),
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::{QueryReturnedNoRows, SqliteFailure};
        use rusqlite::ErrorCode;

        match &error {
            QueryReturnedNoRows => AppError::not_found("query returned no rows"),
            SqliteFailure(err, detail) if err.code == ErrorCode::ConstraintViolation => {
                AppError::conflict(constraint_message(detail.as_deref()))
            }
            _ => {
                error!(target: "app::database", error = ?error, "sqlite error");
                AppError::database(error.to_string())
            }
        }
    }
}

fn constraint_message(detail: Option<&str>) -> String {
    let detail = detail.unwrap_or_default();
    if detail.contains("templates.name") {
        "Template name already exists".to_string()
    } else if detail.contains("assignments.employee_profile_id") {
        "Assignment already exists for this employee, cycle and template".to_string()
    } else if detail.contains("disputes.appraisal_id") {
        "An active dispute already exists for this appraisal".to_string()
    } else {
        "unique or foreign key constraint violated".to_string()
    }
}
