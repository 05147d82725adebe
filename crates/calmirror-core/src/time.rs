//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (a specific instant or an all-day date), [`TimeWindow`] for bounding
//! recurrence expansion, and [`normalize_timestamp`] for decoding the
//! date/date-time encodings found in calendar feeds.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

/// How far back recurrence expansion reaches, in days.
pub const EXPANSION_LOOKBACK_DAYS: i64 = 30;

/// How far forward recurrence expansion reaches, in days.
pub const EXPANSION_LOOKAHEAD_DAYS: i64 = 90;

/// How far back an event may start and still be a sync candidate, in days.
pub const RELEVANCE_LOOKBACK_DAYS: i64 = 7;

/// Represents the time of a calendar event.
///
/// Feed events carry two shapes of time:
/// - **DateTime**: a specific instant, stored as UTC
/// - **AllDay**: a calendar date without a time-of-day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates an `EventTime::DateTime` from a UTC instant.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates an `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the instant if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Returns the date if this is an `AllDay` variant.
    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::AllDay(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Projects to a UTC instant for comparison purposes.
    ///
    /// All-day times project to midnight UTC on their date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }

    /// Returns the UTC date portion of this event time.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A closed time window bounding recurrence expansion.
///
/// Both bounds are inclusive: expansion walks every calendar day whose date
/// falls between `start` and `end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// The expansion window anchored at `now`: 30 days back, 90 days forward.
    pub fn expansion(now: DateTime<Utc>) -> Self {
        Self::new(
            now - Duration::days(EXPANSION_LOOKBACK_DAYS),
            now + Duration::days(EXPANSION_LOOKAHEAD_DAYS),
        )
    }

    /// Iterates every calendar day in the window, by UTC date.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let start = self.start.date_naive();
        let end = self.end.date_naive();
        start.iter_days().take_while(move |d| *d <= end)
    }

    /// Checks whether an instant falls inside the window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt <= self.end
    }
}

/// The relevance cutoff anchored at `now`: events starting earlier than this
/// are not sync candidates. There is no upper bound.
pub fn relevance_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RELEVANCE_LOOKBACK_DAYS)
}

/// Decodes a feed date/date-time value into an [`EventTime`].
///
/// Rules, in order:
/// - an 8-digit value is a calendar date
/// - `YYYYMMDDTHHMMSSZ` is a UTC instant
/// - `YYYYMMDDTHHMMSS` with a named timezone is interpreted in that zone
///   (DST-aware) and converted to UTC; without one it is treated as UTC
/// - anything else goes through an RFC 3339 fallback
///
/// Returns `None` when the value matches none of these; the caller drops
/// the field without failing the owning event.
pub fn normalize_timestamp(value: &str, tzid: Option<&str>) -> Option<EventTime> {
    let value = value.trim();

    // Date only (YYYYMMDD).
    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some(EventTime::AllDay(date));
    }

    // Basic date-time, UTC (YYYYMMDDTHHMMSSZ).
    if let Some(stripped) = value.strip_suffix('Z') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S") {
            return Some(EventTime::DateTime(naive.and_utc()));
        }
    }

    // Basic date-time, zoned or unzoned (YYYYMMDDTHHMMSS).
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(EventTime::DateTime(resolve_local(naive, tzid)));
    }

    // Fallback for anything already in an ISO-8601 shape.
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| EventTime::DateTime(dt.with_timezone(&Utc)))
}

/// Resolves an unzoned wall-clock time against an optional named timezone.
///
/// Unzoned values are treated as UTC so runs do not depend on the host
/// timezone. A local time made ambiguous or nonexistent by a DST transition
/// resolves to the earliest valid instant.
fn resolve_local(naive: NaiveDateTime, tzid: Option<&str>) -> DateTime<Utc> {
    let Some(tzid) = tzid else {
        return naive.and_utc();
    };

    let tz: Tz = match tzid.parse() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(tzid, "unknown timezone, treating local time as UTC");
            return naive.and_utc();
        }
    };

    match tz.from_local_datetime(&naive).earliest() {
        Some(zoned) => zoned.with_timezone(&Utc),
        None => {
            // The wall-clock time was skipped by a DST gap.
            warn!(tzid, %naive, "local time does not exist, treating as UTC");
            naive.and_utc()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod event_time {
        use super::*;

        #[test]
        fn datetime_creation() {
            let dt = utc(2025, 2, 5, 10, 30, 0);
            let et = EventTime::from_utc(dt);
            assert!(!et.is_all_day());
            assert_eq!(et.as_datetime(), Some(&dt));
            assert_eq!(et.as_date(), None);
        }

        #[test]
        fn allday_creation() {
            let d = date(2025, 2, 5);
            let et = EventTime::from_date(d);
            assert!(et.is_all_day());
            assert_eq!(et.as_date(), Some(&d));
            assert_eq!(et.as_datetime(), None);
        }

        #[test]
        fn utc_projection() {
            let et = EventTime::from_date(date(2025, 2, 5));
            assert_eq!(et.to_utc_datetime(), utc(2025, 2, 5, 0, 0, 0));
        }

        #[test]
        fn ordering() {
            let et1 = EventTime::from_date(date(2025, 2, 5));
            let et2 = EventTime::from_utc(utc(2025, 2, 5, 10, 0, 0));
            let et3 = EventTime::from_utc(utc(2025, 2, 5, 11, 0, 0));
            assert!(et1 < et2); // midnight < 10:00
            assert!(et2 < et3);
        }

        #[test]
        fn serde_roundtrip() {
            let et = EventTime::from_utc(utc(2025, 2, 5, 10, 30, 0));
            let json = serde_json::to_string(&et).unwrap();
            let parsed: EventTime = serde_json::from_str(&json).unwrap();
            assert_eq!(et, parsed);
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn expansion_bounds() {
            let now = utc(2025, 2, 5, 12, 0, 0);
            let window = TimeWindow::expansion(now);
            assert_eq!(window.start, utc(2025, 1, 6, 12, 0, 0));
            assert_eq!(window.end, utc(2025, 5, 6, 12, 0, 0));
        }

        #[test]
        fn day_walk_covers_both_ends() {
            let window = TimeWindow::new(utc(2025, 2, 5, 12, 0, 0), utc(2025, 2, 8, 12, 0, 0));
            let days: Vec<NaiveDate> = window.days().collect();
            assert_eq!(
                days,
                vec![
                    date(2025, 2, 5),
                    date(2025, 2, 6),
                    date(2025, 2, 7),
                    date(2025, 2, 8)
                ]
            );
        }

        #[test]
        fn contains_is_inclusive() {
            let window = TimeWindow::new(utc(2025, 2, 5, 0, 0, 0), utc(2025, 2, 6, 0, 0, 0));
            assert!(window.contains(utc(2025, 2, 5, 0, 0, 0)));
            assert!(window.contains(utc(2025, 2, 6, 0, 0, 0)));
            assert!(!window.contains(utc(2025, 2, 6, 0, 0, 1)));
        }

        #[test]
        #[should_panic(expected = "start must be <= end")]
        fn invalid_window() {
            TimeWindow::new(utc(2025, 2, 6, 0, 0, 0), utc(2025, 2, 5, 0, 0, 0));
        }

        #[test]
        fn relevance_is_subset_of_expansion() {
            let now = utc(2025, 2, 5, 12, 0, 0);
            let window = TimeWindow::expansion(now);
            assert!(relevance_cutoff(now) > window.start);
        }
    }

    mod normalizer {
        use super::*;

        #[test]
        fn eight_digits_is_a_date() {
            assert_eq!(
                normalize_timestamp("20250205", None),
                Some(EventTime::AllDay(date(2025, 2, 5)))
            );
        }

        #[test]
        fn z_suffix_is_utc() {
            assert_eq!(
                normalize_timestamp("20250205T143000Z", None),
                Some(EventTime::DateTime(utc(2025, 2, 5, 14, 30, 0)))
            );
        }

        #[test]
        fn zoned_local_time_converts_to_utc() {
            // Paris is UTC+1 in February.
            assert_eq!(
                normalize_timestamp("20250205T100000", Some("Europe/Paris")),
                Some(EventTime::DateTime(utc(2025, 2, 5, 9, 0, 0)))
            );
        }

        #[test]
        fn zoned_local_time_respects_dst() {
            // Paris is UTC+2 in July.
            assert_eq!(
                normalize_timestamp("20250705T100000", Some("Europe/Paris")),
                Some(EventTime::DateTime(utc(2025, 7, 5, 8, 0, 0)))
            );
        }

        #[test]
        fn unzoned_local_time_is_utc() {
            assert_eq!(
                normalize_timestamp("20250205T100000", None),
                Some(EventTime::DateTime(utc(2025, 2, 5, 10, 0, 0)))
            );
        }

        #[test]
        fn unknown_timezone_falls_back_to_utc() {
            assert_eq!(
                normalize_timestamp("20250205T100000", Some("Not/AZone")),
                Some(EventTime::DateTime(utc(2025, 2, 5, 10, 0, 0)))
            );
        }

        #[test]
        fn dst_gap_falls_back_to_utc() {
            // 02:30 on 2025-03-09 does not exist in New York.
            assert_eq!(
                normalize_timestamp("20250309T023000", Some("America/New_York")),
                Some(EventTime::DateTime(utc(2025, 3, 9, 2, 30, 0)))
            );
        }

        #[test]
        fn rfc3339_fallback() {
            assert_eq!(
                normalize_timestamp("2025-02-05T10:00:00+02:00", None),
                Some(EventTime::DateTime(utc(2025, 2, 5, 8, 0, 0)))
            );
        }

        #[test]
        fn garbage_is_none() {
            assert_eq!(normalize_timestamp("not-a-date", None), None);
            assert_eq!(normalize_timestamp("2025020", None), None);
            assert_eq!(normalize_timestamp("20250205T9999", None), None);
        }
    }
}
