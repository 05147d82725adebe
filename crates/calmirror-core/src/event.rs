//! Event types for the reconciliation engine.
//!
//! This module provides the core entities produced by feed parsing and
//! consumed by expansion and diffing:
//! - [`NormalizedEvent`]: the canonical event representation
//! - [`RecurrenceRule`]: the decoded weekly recurrence pattern
//! - [`instance_uid`]: the deterministic uid for an expanded instance

use chrono::{Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// The recurrence frequency of a rule.
///
/// Only weekly recurrence is expanded; any other frequency makes the owning
/// event pass through as a single non-recurring instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Weekly recurrence, expandable.
    Weekly,
    /// Any other frequency, passed through unexpanded.
    Other(String),
}

/// A decoded recurrence rule.
///
/// Parsed from the raw rule value of a feed event. Only the parts the
/// expander understands are retained: frequency, weekday list, end bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// The recurrence frequency.
    pub freq: Frequency,
    /// The weekdays the event recurs on.
    pub by_weekday: Vec<Weekday>,
    /// The last instant an occurrence may start, if bounded.
    pub until: Option<EventTime>,
}

impl RecurrenceRule {
    /// Parses a raw rule value of the form `FREQ=WEEKLY;BYDAY=MO,WE;...`.
    ///
    /// Returns `None` when no frequency is present; the caller drops the
    /// field and treats the event as non-recurring. Unknown keys and
    /// unknown weekday tokens are skipped.
    pub fn parse(value: &str) -> Option<Self> {
        let mut freq = None;
        let mut by_weekday = Vec::new();
        let mut until = None;

        for part in value.split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(match val.to_ascii_uppercase().as_str() {
                        "WEEKLY" => Frequency::Weekly,
                        other => Frequency::Other(other.to_string()),
                    });
                }
                "BYDAY" => {
                    by_weekday = val.split(',').filter_map(weekday_from_token).collect();
                }
                "UNTIL" => {
                    until = crate::time::normalize_timestamp(val, None);
                }
                _ => {}
            }
        }

        freq.map(|freq| Self {
            freq,
            by_weekday,
            until,
        })
    }

    /// Returns `true` when this rule can be expanded.
    pub fn is_expandable(&self) -> bool {
        self.freq == Frequency::Weekly && !self.by_weekday.is_empty()
    }
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    match token.trim().to_ascii_uppercase().as_str() {
        "SU" => Some(Weekday::Sun),
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        _ => None,
    }
}

/// A normalized calendar event.
///
/// Produced by the feed parser and carried through expansion, override
/// resolution and diffing. Expanded recurrence instances are represented
/// with the same type: their `uid` is the generated instance uid and
/// `base_uid` points back at the recurring base event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Unique identifier within the source feed.
    pub uid: String,
    /// The event title.
    pub summary: String,
    /// The event description, if any.
    pub description: Option<String>,
    /// The event location, if any.
    pub location: Option<String>,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends, if the feed carried an end.
    pub end: Option<EventTime>,
    /// The raw status value (e.g. `CONFIRMED`), if any.
    pub status: Option<String>,
    /// The decoded recurrence rule, if the event recurs.
    pub rrule: Option<RecurrenceRule>,
    /// Dates explicitly excluded from the recurrence.
    pub exdates: Vec<EventTime>,
    /// The anchor instant this event overrides, if it is an override.
    pub recurrence_id: Option<EventTime>,
    /// Name of the calendar source this event came from.
    pub source_calendar: String,
    /// For expanded instances and applied overrides: the base event uid.
    pub base_uid: Option<String>,
    /// Whether an override record replaced this event's content.
    pub overridden: bool,
}

impl NormalizedEvent {
    /// Creates a new event with required fields.
    pub fn new(
        uid: impl Into<String>,
        summary: impl Into<String>,
        start: EventTime,
        source_calendar: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            summary: summary.into(),
            description: None,
            location: None,
            start,
            end: None,
            status: None,
            rrule: None,
            exdates: Vec::new(),
            recurrence_id: None,
            source_calendar: source_calendar.into(),
            base_uid: None,
            overridden: false,
        }
    }

    /// Builder method to set the end time.
    pub fn with_end(mut self, end: EventTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the recurrence rule.
    pub fn with_rrule(mut self, rrule: RecurrenceRule) -> Self {
        self.rrule = Some(rrule);
        self
    }

    /// Builder method to set the exclusion dates.
    pub fn with_exdates(mut self, exdates: Vec<EventTime>) -> Self {
        self.exdates = exdates;
        self
    }

    /// Builder method to set the override anchor.
    pub fn with_recurrence_id(mut self, anchor: EventTime) -> Self {
        self.recurrence_id = Some(anchor);
        self
    }

    /// Returns `true` if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns `true` if this is a per-instance override record.
    pub fn is_override(&self) -> bool {
        self.recurrence_id.is_some()
    }

    /// Returns `true` if this is a recurring base event (not an override).
    pub fn is_recurring_base(&self) -> bool {
        self.rrule.is_some() && self.recurrence_id.is_none()
    }

    /// The uid identifying this event's recurring series: the base uid for
    /// expanded instances, the event's own uid otherwise.
    pub fn series_uid(&self) -> &str {
        self.base_uid.as_deref().unwrap_or(&self.uid)
    }

    /// The event duration: end minus start, defaulting to one hour when the
    /// event has no end.
    pub fn duration(&self) -> Duration {
        match &self.end {
            Some(end) => end.to_utc_datetime() - self.start.to_utc_datetime(),
            None => Duration::hours(1),
        }
    }
}

/// The deterministic uid of a recurrence instance: the base uid joined with
/// the instance's UTC calendar date.
///
/// Pure function of its inputs, so repeated runs generate identical uids
/// for identical instances.
pub fn instance_uid(base_uid: &str, date: NaiveDate) -> String {
    format!("{}-{}", base_uid, date.format("%Y-%m-%d"))
}

/// Reverses the feed text escapes `\n`, `\,`, `\;` and `\\`.
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
