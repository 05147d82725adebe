//! Per-instance override resolution.
//!
//! Feeds represent a one-off change to a recurring occurrence as a second
//! event sharing the base event's uid and carrying the original occurrence
//! instant. Resolution merges each override into the expanded instance
//! whose start equals that anchor, keeping the instance's generated uid so
//! the remote mirror stays keyed consistently across runs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::event::NormalizedEvent;

/// Merges override records into an expanded instance set.
///
/// Each override applies at most once, to the instance matching its
/// `(base uid, anchor instant)` key. The merged event takes the override's
/// content but retains the instance's generated uid and a backlink to the
/// base uid. Overrides that match nothing (anchor outside the expansion
/// window, or base event absent from the feed) are appended standalone,
/// marked overridden, with a backlink to their own declared uid; none is
/// dropped.
pub fn apply_overrides(
    instances: Vec<NormalizedEvent>,
    overrides: Vec<NormalizedEvent>,
) -> Vec<NormalizedEvent> {
    // Index into `overrides` keyed by (base uid, anchor instant).
    let mut lookup: HashMap<(String, DateTime<Utc>), usize> = HashMap::new();
    for (idx, record) in overrides.iter().enumerate() {
        if let Some(anchor) = &record.recurrence_id {
            lookup.insert((record.uid.clone(), anchor.to_utc_datetime()), idx);
        }
    }

    let mut applied = vec![false; overrides.len()];
    let mut out = Vec::with_capacity(instances.len() + overrides.len());

    for instance in instances {
        let key = (
            instance.series_uid().to_string(),
            instance.start.to_utc_datetime(),
        );
        match lookup.get(&key) {
            Some(&idx) if !applied[idx] => {
                applied[idx] = true;
                debug!(uid = %instance.uid, "applying override to instance");
                out.push(merge(instance, overrides[idx].clone()));
            }
            _ => out.push(instance),
        }
    }

    // Append the leftovers in feed order so output stays deterministic.
    for (idx, record) in overrides.into_iter().enumerate() {
        if applied[idx] {
            continue;
        }
        debug!(uid = %record.uid, "override matched no instance, keeping standalone");
        let base_uid = record.uid.clone();
        out.push(NormalizedEvent {
            base_uid: Some(base_uid),
            overridden: true,
            ..record
        });
    }

    out
}

/// The override's content under the instance's identity.
fn merge(instance: NormalizedEvent, record: NormalizedEvent) -> NormalizedEvent {
    NormalizedEvent {
        uid: instance.uid,
        summary: record.summary,
        description: record.description,
        location: record.location,
        start: record.start,
        end: record.end,
        status: record.status,
        rrule: None,
        exdates: Vec::new(),
        recurrence_id: record.recurrence_id,
        source_calendar: instance.source_calendar,
        base_uid: Some(
            instance
                .base_uid
                .unwrap_or_else(|| record.uid.clone()),
        ),
        overridden: true,
    }
}
