//! Reconciliation of current feed state against the remote mirror.
//!
//! The remote side is fully derived: every mirrored event carries the
//! source uid it was created from, and the diff decides which source
//! events must be created remotely and which mirrored events must be
//! deleted because their source is gone. Mirrored events without a source
//! tag were not created by this system and are never touched.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::event::NormalizedEvent;

/// Matches the date suffix of an expanded-instance uid.
static INSTANCE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// A remote-side mirrored event, as listed from the remote calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirroredEvent {
    /// The remote service's event id, used for deletion.
    pub id: String,
    /// The remote event summary, carried for log readability.
    pub summary: Option<String>,
    /// The source uid tag embedded at creation time, if any.
    pub source_uid: Option<String>,
}

/// What must change on the remote side to match the source.
///
/// Creates are applied before deletes; within each list the order is the
/// insertion order of the corresponding input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffPlan {
    /// Source events with no mirrored counterpart.
    pub to_create: Vec<NormalizedEvent>,
    /// Mirrored events whose source is gone.
    pub to_delete: Vec<MirroredEvent>,
}

impl DiffPlan {
    /// Returns `true` when nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Restricts events to the relevance window: events starting before the
/// cutoff are not sync candidates. There is no upper bound.
pub fn restrict_to_relevance(
    events: Vec<NormalizedEvent>,
    cutoff: DateTime<Utc>,
) -> Vec<NormalizedEvent> {
    events
        .into_iter()
        .filter(|e| e.start.to_utc_datetime() >= cutoff)
        .collect()
}

/// Diffs the current (relevance-restricted) event set against the remote
/// mirror.
///
/// Creation: any current event whose uid is not tagged on a mirrored event.
///
/// Deletion: any tagged mirrored event whose source uid is absent from the
/// current set, refined for dated instance uids. When the instance's base
/// uid still names a live series, the instance is deleted only if that
/// exact dated uid is truly absent (the recurrence no longer covers that
/// date); when the base uid is entirely gone, the instance is deleted
/// unconditionally.
pub fn diff(current: &[NormalizedEvent], remote: &[MirroredEvent]) -> DiffPlan {
    let mirrored_uids: HashSet<&str> = remote
        .iter()
        .filter_map(|r| r.source_uid.as_deref())
        .collect();

    let current_uids: HashSet<&str> = current.iter().map(|e| e.uid.as_str()).collect();
    let current_base_uids: HashSet<&str> = current.iter().map(|e| e.series_uid()).collect();

    let to_create = current
        .iter()
        .filter(|e| !mirrored_uids.contains(e.uid.as_str()))
        .cloned()
        .collect();

    let mut to_delete = Vec::new();
    for mirrored in remote {
        let Some(source_uid) = mirrored.source_uid.as_deref() else {
            continue;
        };
        if current_uids.contains(source_uid) {
            continue;
        }

        if let Some(base_uid) = instance_base_uid(source_uid) {
            if current_base_uids.contains(base_uid) {
                // The series still recurs; drop the instance only when its
                // exact date no longer does.
                let date_still_recurs = current.iter().any(|e| e.uid == source_uid);
                if !date_still_recurs {
                    to_delete.push(mirrored.clone());
                }
                continue;
            }
            // The whole series is gone.
            to_delete.push(mirrored.clone());
            continue;
        }

        // Plain event no longer present in the source.
        to_delete.push(mirrored.clone());
    }

    DiffPlan {
        to_create,
        to_delete,
    }
}

/// For a date-suffixed instance uid, the uid of its base event.
fn instance_base_uid(uid: &str) -> Option<&str> {
    let suffix = INSTANCE_SUFFIX.find(uid)?;
    Some(&uid[..suffix.start()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::EventTime;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn event(uid: &str, start: DateTime<Utc>) -> NormalizedEvent {
        NormalizedEvent::new(uid, "Event", EventTime::from_utc(start), "Work")
    }

    fn instance(base_uid: &str, start: DateTime<Utc>) -> NormalizedEvent {
        let mut e = event(
            &format!("{}-{}", base_uid, start.format("%Y-%m-%d")),
            start,
        );
        e.base_uid = Some(base_uid.to_string());
        e
    }

    fn mirrored(id: &str, source_uid: Option<&str>) -> MirroredEvent {
        MirroredEvent {
            id: id.to_string(),
            summary: Some("Event".to_string()),
            source_uid: source_uid.map(String::from),
        }
    }

    mod relevance {
        use super::*;

        #[test]
        fn drops_events_before_the_cutoff() {
            let cutoff = utc(2025, 2, 1, 0, 0, 0);
            let events = vec![
                event("old", utc(2025, 1, 20, 10, 0, 0)),
                event("new", utc(2025, 2, 5, 10, 0, 0)),
                event("far", utc(2026, 7, 1, 10, 0, 0)), // no upper bound
            ];
            let relevant = restrict_to_relevance(events, cutoff);
            let uids: Vec<&str> = relevant.iter().map(|e| e.uid.as_str()).collect();
            assert_eq!(uids, vec!["new", "far"]);
        }

        #[test]
        fn cutoff_is_inclusive() {
            let cutoff = utc(2025, 2, 1, 0, 0, 0);
            let relevant = restrict_to_relevance(vec![event("edge", cutoff)], cutoff);
            assert_eq!(relevant.len(), 1);
        }
    }

    mod creation {
        use super::*;

        #[test]
        fn untagged_current_events_are_created() {
            let current = vec![
                event("A", utc(2025, 2, 5, 10, 0, 0)),
                event("B", utc(2025, 2, 6, 10, 0, 0)),
            ];
            let remote = vec![mirrored("g1", Some("A"))];

            let plan = diff(&current, &remote);
            let uids: Vec<&str> = plan.to_create.iter().map(|e| e.uid.as_str()).collect();
            assert_eq!(uids, vec!["B"]);
        }

        #[test]
        fn creation_order_is_input_order() {
            let current = vec![
                event("C", utc(2025, 2, 7, 10, 0, 0)),
                event("A", utc(2025, 2, 5, 10, 0, 0)),
                event("B", utc(2025, 2, 6, 10, 0, 0)),
            ];
            let plan = diff(&current, &[]);
            let uids: Vec<&str> = plan.to_create.iter().map(|e| e.uid.as_str()).collect();
            assert_eq!(uids, vec!["C", "A", "B"]);
        }
    }

    mod deletion {
        use super::*;

        #[test]
        fn plain_event_removed_from_source_is_deleted() {
            let plan = diff(&[], &[mirrored("g1", Some("GONE"))]);
            assert_eq!(plan.to_delete.len(), 1);
            assert_eq!(plan.to_delete[0].id, "g1");
        }

        #[test]
        fn untagged_remote_events_are_never_touched() {
            let plan = diff(&[], &[mirrored("g1", None)]);
            assert!(plan.to_delete.is_empty());
        }

        #[test]
        fn live_instance_is_kept() {
            let current = vec![instance("E1", utc(2025, 2, 5, 18, 0, 0))];
            let remote = vec![mirrored("g1", Some("E1-2025-02-05"))];
            let plan = diff(&current, &remote);
            assert!(plan.to_delete.is_empty());
            assert!(plan.to_create.is_empty());
        }

        #[test]
        fn instance_with_live_base_but_dead_date_is_deleted() {
            // The rule moved off Wednesdays: the base still recurs but the
            // Feb 5 instance no longer exists.
            let current = vec![instance("E1", utc(2025, 2, 6, 18, 0, 0))];
            let remote = vec![mirrored("g1", Some("E1-2025-02-05"))];
            let plan = diff(&current, &remote);
            assert_eq!(plan.to_delete.len(), 1);
        }

        #[test]
        fn instance_with_dead_base_is_deleted_unconditionally() {
            let current = vec![event("OTHER", utc(2025, 2, 5, 10, 0, 0))];
            let remote = vec![mirrored("g1", Some("E1-2025-02-05"))];
            let plan = diff(&current, &remote);
            assert_eq!(plan.to_delete.len(), 1);
        }

        #[test]
        fn base_event_itself_counts_for_the_series() {
            // An unexpanded base (rule changed to non-weekly) keeps its
            // mirrored instances only where the dated uid still exists.
            let current = vec![event("E1", utc(2025, 2, 5, 10, 0, 0))];
            let remote = vec![mirrored("g1", Some("E1-2025-02-05"))];
            let plan = diff(&current, &remote);
            // Base uid "E1" is present, dated uid absent: delete.
            assert_eq!(plan.to_delete.len(), 1);
        }
    }

    mod idempotence {
        use super::*;

        #[test]
        fn synced_state_yields_an_empty_plan() {
            let current = vec![
                event("A", utc(2025, 2, 5, 10, 0, 0)),
                instance("E1", utc(2025, 2, 5, 18, 0, 0)),
            ];
            let remote = vec![
                mirrored("g1", Some("A")),
                mirrored("g2", Some("E1-2025-02-05")),
            ];
            let plan = diff(&current, &remote);
            assert!(plan.is_empty());
        }
    }
}
