//! Calendar and event values decoded from Calendar API records.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use gworkspace_core::time::{parse_zone, start_of_day};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::{ApiError, ApiResult};
use crate::transport::decode;

/// Title used for events that have none.
pub const UNTITLED_EVENT: &str = "Untitled Event";

/// An entry of the user's calendar list.
#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    pub id: String,
    /// `summaryOverride` when the user renamed the calendar, else `summary`.
    pub name: String,
    pub time_zone: Tz,
    pub description: String,
    pub access_role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
    summary_override: Option<String>,
    time_zone: String,
    description: Option<String>,
    access_role: Option<String>,
}

impl Calendar {
    /// Decodes a `calendarList` entry.
    ///
    /// Fails with `InvalidResponse` when required fields are missing or the
    /// time zone is not a known IANA name.
    pub fn from_entry(entry: Value) -> ApiResult<Self> {
        let entry: CalendarListEntry = decode(entry, "calendar list entry")?;
        let time_zone = parse_zone(&entry.time_zone).map_err(|e| {
            ApiError::invalid_response(format!("calendar {}: {}", entry.id, e)).with_source(e)
        })?;
        Ok(Self {
            name: entry
                .summary_override
                .or(entry.summary)
                .unwrap_or_default(),
            id: entry.id,
            time_zone,
            description: entry.description.unwrap_or_default(),
            access_role: entry.access_role.unwrap_or_default(),
        })
    }

    /// A calendar known only by id, e.g. `"primary"` from the command line.
    pub fn with_id(id: impl Into<String>, time_zone: Tz) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            time_zone,
            description: String::new(),
            access_role: String::new(),
        }
    }
}

/// A concrete event (or the master of a recurring series).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// The calendar this event was listed from.
    pub calendar: Arc<Calendar>,
    /// The client's display zone.
    pub tz: Tz,
    /// RRULE/EXDATE lines of a recurring master.
    pub recurrence: Option<Vec<String>>,
}

/// Why a raw event record could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventDecodeError {
    #[error("malformed event record: {0}")]
    Malformed(String),
    #[error("event is missing {0}")]
    MissingField(&'static str),
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    #[error("invalid date-time {0:?}")]
    InvalidDateTime(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord {
    id: Option<String>,
    summary: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    recurrence: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Returns true for records with `status: "cancelled"`.
pub fn is_cancelled(record: &Value) -> bool {
    record.get("status").and_then(Value::as_str) == Some("cancelled")
}

/// Resolves a start or end field.
///
/// A whole date becomes local midnight in the calendar's zone; a date-time
/// is taken as-is with its own offset.
fn parse_event_time(
    time: Option<EventTime>,
    field: &'static str,
    calendar_tz: &Tz,
) -> Result<DateTime<FixedOffset>, EventDecodeError> {
    let time = time.ok_or(EventDecodeError::MissingField(field))?;
    if let Some(date) = time.date {
        let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| EventDecodeError::InvalidDate(date))?;
        return Ok(start_of_day(parsed, calendar_tz));
    }
    let raw = time.date_time.ok_or(EventDecodeError::MissingField(field))?;
    DateTime::parse_from_rfc3339(&raw).map_err(|_| EventDecodeError::InvalidDateTime(raw))
}

impl Event {
    /// Decodes an `events.list` or `events.instances` item.
    pub fn from_record(
        record: Value,
        calendar: &Arc<Calendar>,
        tz: Tz,
    ) -> Result<Self, EventDecodeError> {
        let record: EventRecord = serde_json::from_value(record)
            .map_err(|e| EventDecodeError::Malformed(e.to_string()))?;
        let id = record.id.ok_or(EventDecodeError::MissingField("id"))?;
        let start = parse_event_time(record.start, "start", &calendar.time_zone)?;
        let end = parse_event_time(record.end, "end", &calendar.time_zone)?;

        Ok(Self {
            id,
            name: record.summary.unwrap_or_else(|| UNTITLED_EVENT.to_string()),
            start,
            end,
            calendar: Arc::clone(calendar),
            tz,
            recurrence: record.recurrence,
        })
    }

    /// True when both ends sit exactly on midnight.
    pub fn all_day(&self) -> bool {
        self.start.time() == NaiveTime::MIN && self.end.time() == NaiveTime::MIN
    }

    /// True for the master of a recurring series.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Start converted to the display zone.
    pub fn local_start(&self) -> DateTime<Tz> {
        self.start.with_timezone(&self.tz)
    }

    pub fn local_end(&self) -> DateTime<Tz> {
        self.end.with_timezone(&self.tz)
    }
}
