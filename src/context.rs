//! Briefing context assembly
//!
//! Merges the user identity, the current local time and the collected weather
//! and calendar records into the one document the text model sees.

use chrono::{DateTime, SecondsFormat, TimeZone};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;

/// Weather for one configured location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRecord {
    pub name: String,
    pub friendly_description: String,
    pub notes: String,
    /// Raw weather payload, passed through untouched
    pub weather_data: Map<String, Value>,
}

/// Today's events for one configured calendar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarRecord {
    /// Calendar summary from its metadata
    pub name: String,
    pub notes: String,
    /// `{ "items": [...] }`
    pub events: Map<String, Value>,
}

impl CalendarRecord {
    /// Build a record from a calendar name, notes and today's event list
    #[must_use]
    pub fn new(name: String, notes: String, items: Vec<Value>) -> Self {
        let mut events = Map::new();
        events.insert("items".to_string(), Value::Array(items));
        Self {
            name,
            notes,
            events,
        }
    }

    /// Events included in this record
    #[must_use]
    pub fn items(&self) -> &[Value] {
        self.events
            .get("items")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }
}

/// Who the briefing is for and when it was asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContext {
    pub name: String,
    /// RFC 3339 local timestamp with offset
    #[serde(rename = "dateTime")]
    pub date_time: String,
    /// Full English weekday name
    pub day: String,
}

/// The document submitted to the text model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BriefingContext {
    pub user: UserContext,
    pub locations: Vec<LocationRecord>,
    pub calendars: Vec<CalendarRecord>,
}

impl BriefingContext {
    /// Assemble a context from already collected data
    #[must_use]
    pub fn build<Tz>(
        user_name: &str,
        now: &DateTime<Tz>,
        locations: Vec<LocationRecord>,
        calendars: Vec<CalendarRecord>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            user: UserContext {
                name: user_name.to_string(),
                date_time: now.to_rfc3339_opts(SecondsFormat::Secs, false),
                day: now.format("%A").to_string(),
            },
            locations,
            calendars,
        }
    }

    /// Compact JSON form sent as the model's user turn
    ///
    /// # Errors
    ///
    /// Returns error if a payload cannot be serialized
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Total number of calendar events across all records
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.calendars.iter().map(|c| c.items().len()).sum()
    }
}
