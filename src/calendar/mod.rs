//! Calendar collection
//!
//! Reads today's events for each configured calendar. Calendar data is
//! optional enrichment: a calendar that fails is logged and left out, and
//! collection carries on with the next one.

pub mod auth;
mod google;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, SecondsFormat, TimeZone};
use serde_json::Value;

pub use auth::{AccessToken, CALENDAR_READONLY_SCOPE, ServiceAccount, ServiceAccountAuth, StaticToken};
pub use google::GoogleCalendarClient;

use crate::config::CalendarConfig;
use crate::context::CalendarRecord;
use crate::{Error, Result};

/// Calendar backend
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Display name of a calendar
    ///
    /// # Errors
    ///
    /// Returns error if the metadata request fails
    async fn summary(&self, calendar_id: &str) -> Result<String>;

    /// Events in `window`, deleted events excluded, recurring events expanded,
    /// ordered by start time
    ///
    /// # Errors
    ///
    /// Returns error if the listing fails
    async fn events(&self, calendar_id: &str, window: &DayWindow) -> Result<Vec<Value>>;
}

/// The local day a briefing covers: `[midnight, midnight + 24h)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DayWindow {
    /// Window for the local day containing `now`
    ///
    /// # Errors
    ///
    /// Returns error if no local midnight can be resolved for the day
    pub fn containing<Tz: TimeZone>(now: &DateTime<Tz>) -> Result<Self> {
        let tz = now.timezone();
        let date = now.date_naive();

        // Midnight can fall in a DST gap; take the first instant of the day that exists
        let start = (0..=2)
            .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
            .find_map(|local| tz.from_local_datetime(&local).earliest())
            .ok_or_else(|| Error::Calendar(format!("no local midnight for {date}")))?
            .fixed_offset();

        Ok(Self {
            start,
            end: start + Duration::hours(24),
        })
    }

    /// Half-open containment check
    #[must_use]
    pub fn contains(&self, instant: &DateTime<FixedOffset>) -> bool {
        *instant >= self.start && *instant < self.end
    }

    /// Lower bound in RFC 3339
    #[must_use]
    pub fn time_min(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Upper bound in RFC 3339
    #[must_use]
    pub fn time_max(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Local date the window covers
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Whether an event payload starts inside the window
    ///
    /// Timed events use `start.dateTime`. All-day events match when
    /// `start.date` is the window's local date, which also holds on days whose
    /// first hour was skipped. Events without a readable start are kept.
    #[must_use]
    pub fn includes_event(&self, event: &Value) -> bool {
        match event_start(event) {
            Some(EventStart::At(start)) => self.contains(&start),
            Some(EventStart::AllDay(date)) => date == self.date(),
            None => true,
        }
    }
}

enum EventStart {
    At(DateTime<FixedOffset>),
    AllDay(NaiveDate),
}

fn event_start(event: &Value) -> Option<EventStart> {
    let start = event.get("start")?;

    if let Some(date_time) = start.get("dateTime").and_then(Value::as_str) {
        return DateTime::parse_from_rfc3339(date_time).ok().map(EventStart::At);
    }

    let date = start.get("date").and_then(Value::as_str)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(EventStart::AllDay)
}

/// Collect today's events for every calendar, in configuration order
///
/// Calendars whose metadata or events cannot be fetched are skipped.
pub async fn collect_calendars(
    source: &dyn CalendarSource,
    calendars: &[CalendarConfig],
    window: &DayWindow,
) -> Vec<CalendarRecord> {
    let mut records = Vec::with_capacity(calendars.len());

    for calendar in calendars {
        let name = match source.summary(&calendar.id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(calendar = %calendar.id, error = %e, "unable to retrieve calendar, skipping");
                continue;
            }
        };

        let events = match source.events(&calendar.id, window).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(calendar = %calendar.id, error = %e, "unable to list events, skipping");
                continue;
            }
        };

        let listed = events.len();
        let items: Vec<Value> = events
            .into_iter()
            .filter(|event| window.includes_event(event))
            .collect();

        tracing::debug!(
            calendar = %calendar.id,
            name = %name,
            listed,
            kept = items.len(),
            "calendar collected"
        );

        records.push(CalendarRecord::new(name, calendar.notes.clone(), items));
    }

    records
}
