//! Calendar feed parsing.
//!
//! This module turns raw feed text into [`NormalizedEvent`]s. The parser is
//! a line-oriented state machine: it tracks whether it is inside a
//! `BEGIN:VEVENT`/`END:VEVENT` block and dispatches each recognized
//! property line to a decoder. A block is emitted only when it carries both
//! a summary and a start; malformed lines and unrecognized properties are
//! skipped so a single bad event never aborts the rest of the feed.
//!
//! Folded (continuation) lines are not unfolded before parsing; see
//! DESIGN.md.

use tracing::{debug, warn};

use crate::event::{NormalizedEvent, RecurrenceRule, unescape_text};
use crate::time::{EventTime, normalize_timestamp};

/// Parses feed text into normalized (pre-expansion) events.
pub fn parse_feed(text: &str, source_calendar: &str) -> Vec<NormalizedEvent> {
    let mut events = Vec::new();
    let mut current: Option<PendingEvent> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if line == "BEGIN:VEVENT" {
            current = Some(PendingEvent::default());
            continue;
        }
        if line == "END:VEVENT" {
            if let Some(pending) = current.take() {
                match pending.finish(source_calendar) {
                    Some(event) => events.push(event),
                    None => debug!(source_calendar, "dropping event without summary or start"),
                }
            }
            continue;
        }

        // Property lines outside a VEVENT block, and lines without a
        // colon, are ignored.
        let Some(pending) = current.as_mut() else {
            continue;
        };
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let mut parts = key.split(';');
        let name = parts.next().unwrap_or_default().to_ascii_uppercase();
        let params: Vec<&str> = parts.collect();
        pending.apply(&name, &params, value);
    }

    debug!(
        source_calendar,
        count = events.len(),
        "parsed events from feed"
    );
    events
}

/// Returns the `TZID=` parameter value, if present.
fn timezone_param<'a>(params: &[&'a str]) -> Option<&'a str> {
    params.iter().find_map(|p| p.strip_prefix("TZID="))
}

/// Returns `true` when the parameter list marks a date-only value.
fn is_date_only(params: &[&str]) -> bool {
    params.iter().any(|p| *p == "VALUE=DATE")
}

/// An event under construction while its VEVENT block is being read.
#[derive(Debug, Default)]
struct PendingEvent {
    uid: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    status: Option<String>,
    rrule: Option<RecurrenceRule>,
    exdates: Vec<EventTime>,
    recurrence_id: Option<EventTime>,
}

impl PendingEvent {
    fn apply(&mut self, name: &str, params: &[&str], value: &str) {
        match name {
            "SUMMARY" => self.summary = Some(unescape_text(value)),
            "DESCRIPTION" => self.description = Some(unescape_text(value)),
            "LOCATION" => self.location = Some(unescape_text(value)),
            "UID" => self.uid = Some(value.to_string()),
            "STATUS" => self.status = Some(value.to_string()),
            "DTSTART" => self.start = self.decode_time(params, value),
            "DTEND" => self.end = self.decode_time(params, value),
            "RRULE" => {
                self.rrule = RecurrenceRule::parse(value);
                if self.rrule.is_none() {
                    warn!(rule = value, "unparseable recurrence rule, dropping field");
                }
            }
            "EXDATE" => {
                // EXDATE may carry a comma-separated list of values.
                let tzid = timezone_param(params);
                for part in value.split(',') {
                    match normalize_timestamp(part, tzid) {
                        Some(et) => self.exdates.push(et),
                        None => warn!(value = part, "unparseable exclusion date, dropping"),
                    }
                }
            }
            "RECURRENCE-ID" => {
                self.recurrence_id = normalize_timestamp(value, timezone_param(params));
            }
            _ => {}
        }
    }

    fn decode_time(&self, params: &[&str], value: &str) -> Option<EventTime> {
        let decoded = if is_date_only(params) {
            normalize_timestamp(value, None)
        } else {
            normalize_timestamp(value, timezone_param(params))
        };
        if decoded.is_none() {
            warn!(value, "unparseable timestamp, dropping field");
        }
        decoded
    }

    /// Emits the event when it has both a summary and a start.
    fn finish(self, source_calendar: &str) -> Option<NormalizedEvent> {
        let summary = self.summary?;
        let start = self.start?;

        // Feeds occasionally omit UID; derive a stable one so repeated
        // runs still reconcile instead of re-creating the event.
        let uid = self.uid.unwrap_or_else(|| {
            format!(
                "{}-{}",
                summary,
                start.to_utc_datetime().format("%Y%m%dT%H%M%SZ")
            )
        });

        Some(NormalizedEvent {
            uid,
            summary,
            description: self.description,
            location: self.location,
            start,
            end: self.end,
            status: self.status,
            rrule: self.rrule,
            exdates: self.exdates,
            recurrence_id: self.recurrence_id,
            source_calendar: source_calendar.to_string(),
            base_uid: None,
            overridden: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Frequency;
    use chrono::{DateTime, TimeZone, Utc, Weekday};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn sample_feed() -> &'static str {
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Test//Test//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:standup-1@example.com\r\n\
         DTSTART;TZID=Europe/Paris:20250205T100000\r\n\
         DTEND;TZID=Europe/Paris:20250205T103000\r\n\
         SUMMARY:Team Standup\r\n\
         DESCRIPTION:Weekly sync\\, all hands\r\n\
         LOCATION:Room A\r\n\
         STATUS:CONFIRMED\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR"
    }

    #[test]
    fn parses_timed_event() {
        let events = parse_feed(sample_feed(), "Work");
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.uid, "standup-1@example.com");
        assert_eq!(event.summary, "Team Standup");
        assert_eq!(event.description.as_deref(), Some("Weekly sync, all hands"));
        assert_eq!(event.location.as_deref(), Some("Room A"));
        assert_eq!(event.status.as_deref(), Some("CONFIRMED"));
        assert_eq!(event.source_calendar, "Work");
        // Paris is UTC+1 in February.
        assert_eq!(event.start, EventTime::from_utc(utc(2025, 2, 5, 9, 0, 0)));
        assert_eq!(
            event.end,
            Some(EventTime::from_utc(utc(2025, 2, 5, 9, 30, 0)))
        );
        assert!(!event.is_all_day());
    }

    #[test]
    fn parses_all_day_event() {
        let feed = "BEGIN:VEVENT\r\n\
             UID:holiday-1@example.com\r\n\
             DTSTART;VALUE=DATE:20250210\r\n\
             DTEND;VALUE=DATE:20250211\r\n\
             SUMMARY:Holiday\r\n\
             END:VEVENT";
        let events = parse_feed(feed, "Personal");
        assert_eq!(events.len(), 1);
        assert!(events[0].is_all_day());
        assert_eq!(
            events[0].start.as_date().unwrap().to_string(),
            "2025-02-10"
        );
    }

    #[test]
    fn parses_recurrence_fields() {
        let feed = "BEGIN:VEVENT\r\n\
             UID:gym-1@example.com\r\n\
             DTSTART:20250203T180000Z\r\n\
             SUMMARY:Gym\r\n\
             RRULE:FREQ=WEEKLY;BYDAY=MO,WE\r\n\
             EXDATE:20250210T180000Z,20250212T180000Z\r\n\
             END:VEVENT";
        let events = parse_feed(feed, "Personal");
        assert_eq!(events.len(), 1);

        let rule = events[0].rrule.as_ref().unwrap();
        assert_eq!(rule.freq, Frequency::Weekly);
        assert_eq!(rule.by_weekday, vec![Weekday::Mon, Weekday::Wed]);
        assert_eq!(events[0].exdates.len(), 2);
    }

    #[test]
    fn parses_override_record() {
        let feed = "BEGIN:VEVENT\r\n\
             UID:gym-1@example.com\r\n\
             DTSTART:20250212T190000Z\r\n\
             SUMMARY:Gym (moved)\r\n\
             RECURRENCE-ID:20250212T180000Z\r\n\
             END:VEVENT";
        let events = parse_feed(feed, "Personal");
        assert_eq!(events.len(), 1);
        assert!(events[0].is_override());
        assert_eq!(
            events[0].recurrence_id,
            Some(EventTime::from_utc(utc(2025, 2, 12, 18, 0, 0)))
        );
    }

    #[test]
    fn event_missing_start_is_dropped() {
        let feed = "BEGIN:VEVENT\r\n\
             UID:broken-1@example.com\r\n\
             SUMMARY:No start here\r\n\
             END:VEVENT\r\n\
             BEGIN:VEVENT\r\n\
             UID:ok-1@example.com\r\n\
             DTSTART:20250205T100000Z\r\n\
             SUMMARY:Fine\r\n\
             END:VEVENT";
        let events = parse_feed(feed, "Work");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "ok-1@example.com");
    }

    #[test]
    fn event_missing_summary_is_dropped() {
        let feed = "BEGIN:VEVENT\r\n\
             UID:quiet-1@example.com\r\n\
             DTSTART:20250205T100000Z\r\n\
             END:VEVENT";
        assert!(parse_feed(feed, "Work").is_empty());
    }

    #[test]
    fn malformed_lines_do_not_abort_the_parse() {
        let feed = "garbage outside any block\r\n\
             BEGIN:VEVENT\r\n\
             UID:ok-1@example.com\r\n\
             this line has no colon\r\n\
             DTSTART:20250205T100000Z\r\n\
             SUMMARY:Survivor\r\n\
             END:VEVENT";
        let events = parse_feed(feed, "Work");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Survivor");
    }

    #[test]
    fn unparseable_timestamp_drops_only_the_field() {
        let feed = "BEGIN:VEVENT\r\n\
             UID:odd-1@example.com\r\n\
             DTSTART:20250205T100000Z\r\n\
             DTEND:not-a-time\r\n\
             SUMMARY:Odd end\r\n\
             END:VEVENT";
        let events = parse_feed(feed, "Work");
        assert_eq!(events.len(), 1);
        assert!(events[0].end.is_none());
    }

    #[test]
    fn unrecognized_properties_are_ignored() {
        let feed = "BEGIN:VEVENT\r\n\
             UID:x-1@example.com\r\n\
             DTSTART:20250205T100000Z\r\n\
             SUMMARY:Plain\r\n\
             X-APPLE-TRAVEL-ADVISORY-BEHAVIOR:AUTOMATIC\r\n\
             SEQUENCE:3\r\n\
             END:VEVENT";
        let events = parse_feed(feed, "Work");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn missing_uid_gets_a_stable_fallback() {
        let feed = "BEGIN:VEVENT\r\n\
             DTSTART:20250205T100000Z\r\n\
             SUMMARY:Anonymous\r\n\
             END:VEVENT";
        let first = parse_feed(feed, "Work");
        let second = parse_feed(feed, "Work");
        assert_eq!(first[0].uid, "Anonymous-20250205T100000Z");
        assert_eq!(first[0].uid, second[0].uid);
    }
}
