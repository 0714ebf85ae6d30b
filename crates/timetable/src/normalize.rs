//! Schedule normalizer: untrusted extraction text → [`Schedule`].
//!
//! The extraction service returns free-form text that is *usually* JSON in the
//! requested shape. Only two failures are fatal:
//!
//! - the text is not JSON at all (`NormalizeError::InvalidJson`)
//! - the top level is not an object keyed by weekday (`NormalizeError::InvalidShape`)
//!
//! Everything below that level is repaired or dropped entry-by-entry: a
//! partially correct timetable is more useful to the reviewer than none.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schedule::{ClockTime, Schedule, SessionEntry, Weekday};

/// Key the extraction prompt wraps the schedule in.
const WRAPPER_KEY: &str = "timetable";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("extraction output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("extraction output has the wrong shape: {0}")]
    InvalidShape(String),
}

/// Why a single cell was discarded.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
    #[error("day key is not a weekday (Monday-Friday)")]
    UnknownDay,

    #[error("day value is not a list of sessions")]
    NotAList,

    #[error("session is not an object")]
    NotAnObject,

    #[error("session has no subject")]
    MissingSubject,

    #[error("{field} is missing or not HH:MM (got {value})")]
    InvalidTime { field: &'static str, value: String },

    #[error("session does not end after it starts ({start} >= {end})")]
    NonPositiveDuration { start: String, end: String },
}

/// A discarded cell, kept for the review report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedEntry {
    /// Day key exactly as the extraction produced it.
    pub day: String,
    /// Position within that day's list, when the drop concerns a single cell.
    pub index: Option<usize>,
    #[serde(flatten)]
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeReport {
    pub schedule: Schedule,
    pub dropped: Vec<DroppedEntry>,
}

/// Normalize extraction text into a schedule, logging every dropped cell.
pub fn normalize(raw: &str) -> Result<Schedule, NormalizeError> {
    let report = normalize_with_report(raw)?;
    for dropped in &report.dropped {
        tracing::warn!(
            day = %dropped.day,
            index = ?dropped.index,
            reason = %dropped.reason,
            "dropping timetable entry"
        );
    }
    Ok(report.schedule)
}

/// Normalize extraction text and return the dropped cells alongside the schedule.
pub fn normalize_with_report(raw: &str) -> Result<NormalizeReport, NormalizeError> {
    let value: Value =
        serde_json::from_str(raw.trim()).map_err(|e| NormalizeError::InvalidJson(e.to_string()))?;

    let days = day_map(value)?;

    let mut schedule = Schedule::empty();
    let mut dropped = Vec::new();

    for (key, cells) in days {
        let Some(day) = Weekday::from_key(&key) else {
            dropped.push(DroppedEntry {
                day: key,
                index: None,
                reason: DropReason::UnknownDay,
            });
            continue;
        };

        let cells = match cells {
            Value::Array(cells) => cells,
            Value::Null => continue,
            _ => {
                dropped.push(DroppedEntry {
                    day: key,
                    index: None,
                    reason: DropReason::NotAList,
                });
                continue;
            }
        };

        for (index, cell) in cells.iter().enumerate() {
            match parse_cell(cell) {
                Ok(Some(entry)) => schedule.insert(day, entry),
                Ok(None) => {}
                Err(reason) => dropped.push(DroppedEntry {
                    day: key.clone(),
                    index: Some(index),
                    reason,
                }),
            }
        }
    }

    Ok(NormalizeReport { schedule, dropped })
}

/// Unwrap `{"timeTable": {...}}` if present and require an object keyed by day.
///
/// Keys beside the wrapper are ignored; the model sometimes echoes slot
/// details next to it.
fn day_map(value: Value) -> Result<Map<String, Value>, NormalizeError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(NormalizeError::InvalidShape(format!(
                "expected an object keyed by weekday, found {}",
                json_kind(&other)
            )));
        }
    };

    let wrapper = map
        .iter()
        .find(|(k, v)| k.eq_ignore_ascii_case(WRAPPER_KEY) && v.is_object())
        .map(|(k, _)| k.clone());

    match wrapper.and_then(|key| map.remove(&key)) {
        Some(Value::Object(inner)) => Ok(inner),
        _ => Ok(map),
    }
}

/// `Ok(None)` means an empty cell, which is not an error.
fn parse_cell(cell: &Value) -> Result<Option<SessionEntry>, DropReason> {
    let obj = match cell {
        Value::Null => return Ok(None),
        Value::Object(obj) if obj.is_empty() => return Ok(None),
        Value::Object(obj) => obj,
        _ => return Err(DropReason::NotAnObject),
    };

    let subject = text_field(obj, "subject");
    let teacher = text_field(obj, "teacher");
    let room = text_field(obj, "room");
    let has_times = obj.contains_key("startTime") || obj.contains_key("endTime");

    if subject.is_empty() {
        if teacher.is_empty() && room.is_empty() && !has_times {
            return Ok(None);
        }
        return Err(DropReason::MissingSubject);
    }

    let start = time_field(obj, "startTime")?;
    let end = time_field(obj, "endTime")?;
    if start >= end {
        return Err(DropReason::NonPositiveDuration {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    SessionEntry::new(subject, teacher, room, start, end)
        .map(Some)
        .map_err(|_| DropReason::MissingSubject)
}

/// String-ish field; numbers are accepted (rooms are often bare numbers).
fn text_field(obj: &Map<String, Value>, name: &str) -> String {
    match obj.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn time_field(obj: &Map<String, Value>, field: &'static str) -> Result<ClockTime, DropReason> {
    let invalid = |value: String| DropReason::InvalidTime { field, value };
    match obj.get(field) {
        Some(Value::String(s)) => s.parse().map_err(|_| invalid(s.clone())),
        Some(other) => Err(invalid(other.to_string())),
        None => Err(invalid("nothing".to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
