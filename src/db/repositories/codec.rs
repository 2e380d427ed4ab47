//! Column encoding shared by the appraisal repositories.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn encode_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn encode_time_opt(value: Option<&DateTime<Utc>>) -> Option<String> {
    value.map(encode_time)
}

pub fn decode_time(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("invalid stored timestamp {raw:?}: {err}")))
}

pub fn decode_time_opt(raw: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(decode_time).transpose()
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned + Default>(raw: Option<String>) -> AppResult<T> {
    match raw {
        Some(value) if !value.is_empty() => Ok(serde_json::from_str(&value)?),
        _ => Ok(T::default()),
    }
}

pub fn decode_enum<T: FromStr<Err = AppError>>(raw: &str) -> AppResult<T> {
    raw.parse::<T>()
        .map_err(|err| AppError::database(format!("invalid stored value: {}", err.message())))
}
