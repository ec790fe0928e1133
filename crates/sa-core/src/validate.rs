//! Schema validation for raw call and agent records.
//!
//! Validation is pure and total: the same raw mapping always yields the same
//! outcome. CSV sources carry every cell as a string, so numeric fields accept
//! either a JSON number or a string that parses as one.

use chrono::{DateTime, NaiveDateTime, Utc};
use sa_common::{AgentId, AgentRecord, CallId, CallRecord, ResolutionStatus};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A raw record as read from a source file.
pub type RawRecord = Map<String, Value>;

/// Field reported when a source element is not a mapping at all.
pub const RECORD_FIELD: &str = "<record>";

/// Upper bound of the customer rating scale.
pub const MAX_RATING: f64 = 5.0;

/// Which contract a raw record is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Call,
    Agent,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Call => write!(f, "call"),
            RecordKind::Agent => write!(f, "agent"),
        }
    }
}

/// A record that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedRecord {
    Call(CallRecord),
    Agent(AgentRecord),
}

/// Why a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("field '{field}': {reason}")]
pub struct SchemaError {
    pub field: String,
    pub reason: String,
}

impl SchemaError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(field, "required field is missing")
    }

    fn wrong_type(field: &str, expected: &str, got: &Value) -> Self {
        Self::new(field, format!("expected {expected}, got {}", type_name(got)))
    }
}

/// View one source element as a raw record.
pub fn as_record(value: &Value) -> Result<&RawRecord, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::wrong_type(RECORD_FIELD, "object", value))
}

/// Validate a raw record against the contract for `kind`.
pub fn validate(kind: RecordKind, raw: &RawRecord) -> Result<ValidatedRecord, SchemaError> {
    match kind {
        RecordKind::Call => validate_call(raw).map(ValidatedRecord::Call),
        RecordKind::Agent => validate_agent(raw).map(ValidatedRecord::Agent),
    }
}

/// Validate one raw call.
pub fn validate_call(raw: &RawRecord) -> Result<CallRecord, SchemaError> {
    let duration_seconds = required_u64(raw, "duration_seconds")?;
    let status_raw = required_string(raw, "resolution_status")?;
    let resolution_status = status_raw
        .parse::<ResolutionStatus>()
        .map_err(|reason| SchemaError::new("resolution_status", reason))?;

    Ok(CallRecord {
        id: CallId(required_string(raw, "id")?),
        agent_id: AgentId(required_string(raw, "agent_id")?),
        customer_region: required_string(raw, "customer_region")?,
        issue_type: required_string(raw, "issue_type")?,
        duration_seconds,
        resolution_status,
        started_at: required_timestamp(raw, "started_at")?,
        rating: optional_rating(raw, "rating")?,
    })
}

/// Validate one raw agent metadata row.
pub fn validate_agent(raw: &RawRecord) -> Result<AgentRecord, SchemaError> {
    Ok(AgentRecord {
        agent_id: AgentId(required_string(raw, "agent_id")?),
        name: required_string(raw, "name")?,
        team: optional_string(raw, "team")?,
        region: optional_string(raw, "region")?,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Absent, null, and blank strings all count as "no value".
fn present<'a>(raw: &'a RawRecord, field: &str) -> Option<&'a Value> {
    match raw.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn required_string(raw: &RawRecord, field: &str) -> Result<String, SchemaError> {
    match present(raw, field) {
        None => Err(SchemaError::missing(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Err(SchemaError::wrong_type(field, "string", other)),
    }
}

fn optional_string(raw: &RawRecord, field: &str) -> Result<Option<String>, SchemaError> {
    match present(raw, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(SchemaError::wrong_type(field, "string", other)),
    }
}

fn required_u64(raw: &RawRecord, field: &str) -> Result<u64, SchemaError> {
    let value = present(raw, field).ok_or_else(|| SchemaError::missing(field))?;
    let number = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Ok(u);
            }
            if n.as_i64().is_some() {
                return Err(SchemaError::new(field, format!("must be >= 0, got {n}")));
            }
            n.as_f64()
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(u) = s.parse::<u64>() {
                return Ok(u);
            }
            match s.parse::<i64>() {
                Ok(neg) => return Err(SchemaError::new(field, format!("must be >= 0, got {neg}"))),
                Err(_) => s.parse::<f64>().ok(),
            }
        }
        other => return Err(SchemaError::wrong_type(field, "non-negative integer", other)),
    };
    match number {
        Some(f) if f < 0.0 => Err(SchemaError::new(field, format!("must be >= 0, got {f}"))),
        Some(f) => Err(SchemaError::new(field, format!("expected a whole number, got {f}"))),
        None => Err(SchemaError::new(field, "expected non-negative integer")),
    }
}

fn optional_rating(raw: &RawRecord, field: &str) -> Result<Option<f64>, SchemaError> {
    let rating = match present(raw, field) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(other) => return Err(SchemaError::wrong_type(field, "number", other)),
    };
    match rating {
        Some(r) if r.is_finite() && (0.0..=MAX_RATING).contains(&r) => Ok(Some(r)),
        Some(r) => Err(SchemaError::new(
            field,
            format!("must be within [0, {MAX_RATING}], got {r}"),
        )),
        None => Err(SchemaError::new(field, "expected a number")),
    }
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` read as UTC.
/// Normalized to millisecond precision, the resolution the artifact stores.
fn required_timestamp(raw: &RawRecord, field: &str) -> Result<DateTime<Utc>, SchemaError> {
    let text = required_string(raw, field)?;
    let parsed = DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f").map(|n| n.and_utc())
        })
        .map_err(|_| SchemaError::new(field, format!("not an ISO-8601 timestamp: '{text}'")))?;
    DateTime::from_timestamp_millis(parsed.timestamp_millis())
        .ok_or_else(|| SchemaError::new(field, "timestamp out of range"))
}
