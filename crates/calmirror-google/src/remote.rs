//! The remote calendar surface.
//!
//! This module defines [`RemoteCalendar`], the abstraction the sync
//! pipeline writes through, together with the payload types it consumes.
//! The HTTP implementation lives in [`crate::client`]; tests substitute
//! in-memory fakes.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;

use calmirror_core::diff::MirroredEvent;
use calmirror_core::event::NormalizedEvent;
use calmirror_core::time::EventTime;

use crate::error::RemoteResult;

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe so the executor can hold a
/// `&dyn RemoteCalendar`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A calendar known to the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    /// The remote calendar id.
    pub id: String,
    /// The calendar summary (display name).
    pub summary: String,
}

/// The shape of a calendar to create remotely.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewCalendar {
    /// Display name.
    pub summary: String,
    /// Description shown in the calendar settings.
    pub description: String,
    /// Default IANA timezone for the calendar.
    pub time_zone: String,
    /// Display color.
    pub background_color: String,
}

/// A start or end value in the remote service's wire shape: either a
/// calendar date or a zoned date-time.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    fn all_day(date: chrono::NaiveDate, time_zone: &str) -> Self {
        Self {
            date: Some(date.format("%Y-%m-%d").to_string()),
            date_time: None,
            time_zone: Some(time_zone.to_string()),
        }
    }

    fn timed(instant: DateTime<Utc>, time_zone: &str) -> Self {
        Self {
            date: None,
            date_time: Some(instant.to_rfc3339_opts(SecondsFormat::Secs, true)),
            time_zone: Some(time_zone.to_string()),
        }
    }
}

/// Opaque metadata linking a mirrored event back to its source.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrivateProperties {
    /// The source event uid (plain or instance uid).
    pub source_uid: String,
    /// The calendar source the event came from.
    pub source_calendar: String,
    /// When the event was written, RFC 3339.
    pub synced_at: String,
}

/// Container for the private metadata block.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtendedProperties {
    pub private: PrivateProperties,
}

/// An event in the remote service's creation shape.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub extended_properties: ExtendedProperties,
}

impl EventPayload {
    /// Builds the creation payload for a normalized event.
    ///
    /// Events without an end get one: start date for all-day events,
    /// start plus one hour for timed ones. The private metadata carries
    /// the source uid so later runs can reconcile.
    pub fn from_event(
        event: &NormalizedEvent,
        time_zone: &str,
        synced_at: DateTime<Utc>,
    ) -> Self {
        let description = event
            .description
            .clone()
            .unwrap_or_else(|| format!("Synced from {}", event.source_calendar));

        let (start, end) = match &event.start {
            EventTime::AllDay(date) => {
                let end_date = event.end.as_ref().map(|e| e.date()).unwrap_or(*date);
                (
                    EventDateTime::all_day(*date, time_zone),
                    EventDateTime::all_day(end_date, time_zone),
                )
            }
            EventTime::DateTime(start_dt) => {
                let end_dt = event
                    .end
                    .as_ref()
                    .map(|e| e.to_utc_datetime())
                    .unwrap_or(*start_dt + Duration::hours(1));
                (
                    EventDateTime::timed(*start_dt, time_zone),
                    EventDateTime::timed(end_dt, time_zone),
                )
            }
        };

        Self {
            summary: event.summary.clone(),
            description,
            location: event.location.clone(),
            start,
            end,
            extended_properties: ExtendedProperties {
                private: PrivateProperties {
                    source_uid: event.uid.clone(),
                    source_calendar: event.source_calendar.clone(),
                    synced_at: synced_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                },
            },
        }
    }
}

/// The remote calendar operations the pipeline consumes.
///
/// One implementation talks to the Google Calendar API
/// ([`crate::client::GoogleCalendarClient`]); tests use in-memory fakes
/// so the executor and session logic run without a network.
pub trait RemoteCalendar: Send + Sync {
    /// Lists the calendars the account can see.
    fn list_calendars(&self) -> BoxFuture<'_, RemoteResult<Vec<CalendarEntry>>>;

    /// Creates a calendar.
    fn create_calendar(&self, spec: NewCalendar) -> BoxFuture<'_, RemoteResult<CalendarEntry>>;

    /// Grants a principal owner access to a calendar.
    fn share_calendar(&self, calendar_id: &str, email: &str) -> BoxFuture<'_, RemoteResult<()>>;

    /// Lists mirrored events starting at or after the given lower bound.
    fn list_events(
        &self,
        calendar_id: &str,
        lower_bound: DateTime<Utc>,
    ) -> BoxFuture<'_, RemoteResult<Vec<MirroredEvent>>>;

    /// Creates an event, returning the remote event id.
    fn create_event(
        &self,
        calendar_id: &str,
        payload: EventPayload,
    ) -> BoxFuture<'_, RemoteResult<String>>;

    /// Deletes an event by id.
    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, RemoteResult<()>>;
}
