use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::DateError;

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern should compile"));

/// A date bound in one of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    /// `YYYY-MM-DD`
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DateInput {
    /// Interpret a loosely typed value (YAML/JSON) as a date bound.
    /// Only strings are accepted; their format is checked later by `ensure_datetime`.
    pub fn from_value(value: &Value, param: &str) -> Result<Self, DateError> {
        match value {
            Value::String(s) => Ok(DateInput::Text(s.clone())),
            other => Err(DateError::UnsupportedType {
                param: param.to_string(),
                found: value_kind(other).to_string(),
            }),
        }
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

impl From<String> for DateInput {
    fn from(s: String) -> Self {
        DateInput::Text(s)
    }
}

impl From<NaiveDate> for DateInput {
    fn from(d: NaiveDate) -> Self {
        DateInput::Date(d)
    }
}

impl From<NaiveDateTime> for DateInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateInput::DateTime(dt)
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Normalize a date bound to a naive datetime, midnight when no time was given.
pub fn ensure_datetime(input: &DateInput, param: &str) -> Result<NaiveDateTime, DateError> {
    match input {
        DateInput::Text(s) => {
            let invalid = || DateError::InvalidFormat {
                param: param.to_string(),
                value: s.clone(),
            };
            if !ISO_DATE.is_match(s) {
                return Err(invalid());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::MIN))
                .map_err(|_| invalid())
        }
        DateInput::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
        DateInput::DateTime(dt) => Ok(*dt),
    }
}

/// Check that `dt` can be localized at `offset` (e.g. `"-04:00"`) and converted to UTC.
/// The converted value is discarded; callers keep working with the naive datetime.
pub fn check_timezone(dt: NaiveDateTime, offset: &str, param: &str) -> Result<(), DateError> {
    let fail = |reason: String| DateError::Timezone {
        param: param.to_string(),
        offset: offset.to_string(),
        reason,
    };
    let tz: FixedOffset = offset
        .parse()
        .map_err(|e: chrono::ParseError| fail(e.to_string()))?;
    tz.from_local_datetime(&dt)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| fail("ambiguous or out of range".into()))?;
    Ok(())
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse report timestamp text → naive millis since epoch.
pub fn parse_timestamp_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.len() < 10 {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Inverse of `parse_timestamp_millis`, for display and grouping.
pub fn millis_to_datetime(ms: i64) -> Option<NaiveDateTime> {
    chrono::DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}
