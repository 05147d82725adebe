//! Recurrence expansion.
//!
//! Weekly-recurring base events are materialized into concretely dated
//! instances bounded by an expansion window. Only weekly-by-weekday rules
//! are expanded; events with any other rule pass through as a single
//! instance, as do all-day recurring events (their feeds carry no
//! time-of-day to project onto instance dates).

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::event::{NormalizedEvent, RecurrenceRule, instance_uid};
use crate::overrides::apply_overrides;
use crate::time::{EventTime, TimeWindow};

/// Expands a parsed event set over the given window.
///
/// Splits the input into override records, recurring bases and plain
/// events; expands each base into dated instances; then resolves overrides
/// against the expanded set. Plain events pass through untouched.
pub fn expand_events(events: Vec<NormalizedEvent>, window: &TimeWindow) -> Vec<NormalizedEvent> {
    let mut overrides = Vec::new();
    let mut bases = Vec::new();
    let mut expanded = Vec::new();

    for event in events {
        if event.is_override() {
            overrides.push(event);
        } else if event.rrule.is_some() {
            bases.push(event);
        } else {
            expanded.push(event);
        }
    }

    for base in bases {
        match base.rrule.clone() {
            Some(rule) => {
                let exclusions: HashSet<NaiveDate> =
                    base.exdates.iter().map(|e| e.date()).collect();
                expanded.extend(expand_base(&base, &rule, window, &exclusions));
            }
            None => expanded.push(base),
        }
    }

    apply_overrides(expanded, overrides)
}

/// Expands one base event under one rule.
///
/// Walks every calendar day in the window, keeping days whose weekday is
/// listed in the rule and which fall on or before the rule's end bound.
/// A day whose date appears in `exclusions` (exception dates, and any
/// extra exclusions the caller supplies) produces no instance.
///
/// Each instance starts on the kept day at the base event's time-of-day
/// and lasts the base event's duration. Instance uids are a pure function
/// of the base uid and the instance date, so repeated expansions of the
/// same inputs yield identical uids.
///
/// Rules that are not weekly-by-weekday, and all-day bases, return the
/// base unchanged as a single instance.
pub fn expand_base(
    base: &NormalizedEvent,
    rule: &RecurrenceRule,
    window: &TimeWindow,
    exclusions: &HashSet<NaiveDate>,
) -> Vec<NormalizedEvent> {
    if !rule.is_expandable() {
        return vec![base.clone()];
    }
    let Some(base_start) = base.start.as_datetime() else {
        return vec![base.clone()];
    };

    let time_of_day = base_start.time();
    let duration = base.duration();

    // Instances may not start after the rule's UNTIL bound or the window
    // end, whichever comes first.
    let mut last_date = window.end.date_naive();
    if let Some(until) = &rule.until {
        last_date = last_date.min(until.date());
    }

    let mut instances = Vec::new();
    for day in window.days() {
        if day > last_date {
            break;
        }
        if !rule.by_weekday.contains(&day.weekday()) {
            continue;
        }
        if exclusions.contains(&day) {
            continue;
        }

        let start = day.and_time(time_of_day).and_utc();
        let end = start + duration;

        instances.push(NormalizedEvent {
            uid: instance_uid(&base.uid, day),
            summary: base.summary.clone(),
            description: base.description.clone(),
            location: base.location.clone(),
            start: EventTime::from_utc(start),
            end: Some(EventTime::from_utc(end)),
            status: base.status.clone(),
            rrule: None,
            exdates: Vec::new(),
            recurrence_id: None,
            source_calendar: base.source_calendar.clone(),
            base_uid: Some(base.uid.clone()),
            overridden: false,
        });
    }

    debug!(
        base_uid = %base.uid,
        count = instances.len(),
        "expanded recurring event"
    );
    instances
}
