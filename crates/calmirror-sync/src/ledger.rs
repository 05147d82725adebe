//! Run ledger persistence.
//!
//! The ledger is a small JSON file recording the last run: when it
//! happened, how much it synced, per-source summaries, and the
//! source-name to remote-calendar-id map. It is loaded once at run start,
//! mutated only at run end, and persisted atomically (temp file + rename)
//! so a crash mid-write cannot corrupt it. Exactly one run at a time may
//! use a given ledger file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::report::{CalendarSummary, RunSummary};

/// Persisted state across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunLedger {
    /// When the last run finished.
    pub last_sync: Option<DateTime<Utc>>,
    /// Events created by the last run.
    pub last_sync_count: usize,
    /// Events created across all runs, cumulative.
    pub total_events_synced: usize,
    /// Per-source summaries of the last run.
    pub calendars: Vec<CalendarSummary>,
    /// Source name to remote calendar id.
    pub google_calendars: BTreeMap<String, String>,
}

impl RunLedger {
    /// Loads the ledger, falling back to an empty one when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(ledger) => {
                    debug!(path = %path.display(), "loaded run ledger");
                    ledger
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not parse run ledger, starting fresh");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no run ledger yet");
                Self::default()
            }
        }
    }

    /// Persists the ledger atomically: write to a sibling temp file, then
    /// rename over the target.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "saved run ledger");
        Ok(())
    }

    /// Folds one run's outcome into the ledger.
    pub fn record_run(
        &mut self,
        now: DateTime<Utc>,
        summary: &RunSummary,
        calendar_ids: &BTreeMap<String, String>,
    ) {
        let synced = summary.synced();
        self.last_sync = Some(now);
        self.last_sync_count = synced;
        self.total_events_synced += synced;
        self.calendars = summary.calendars.clone();
        self.google_calendars = calendar_ids.clone();
    }
}
