//! Per-source and per-run reporting.
//!
//! Every run produces a [`RunSummary`], whatever happened: source-level
//! failures are isolated into their [`CalendarSummary`] entries instead of
//! aborting the run. The summary is rendered at the end of the run and
//! folded into the persisted ledger.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Outcome of one source's sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// The source was fetched and its plan applied (possibly with
    /// operation-level errors, counted in `error_count`).
    Success,
    /// The source could not be synced at all.
    Failed,
}

/// Per-source sync summary, in the shape the ledger persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSummary {
    /// The source name.
    pub name: String,
    /// Events parsed from the feed (after expansion).
    pub event_count: usize,
    /// Events inside the relevance window.
    pub relevant_count: usize,
    /// Events created remotely this run.
    pub synced_count: usize,
    /// Mirrored events deleted this run.
    pub deleted_count: usize,
    /// Failed remote operations.
    pub error_count: usize,
    /// Overall outcome for the source.
    pub status: SourceStatus,
    /// Why the source failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CalendarSummary {
    /// A summary for a source that could not be synced at all.
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_count: 0,
            relevant_count: 0,
            synced_count: 0,
            deleted_count: 0,
            error_count: 0,
            status: SourceStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Aggregated outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// One entry per configured source, in processing order.
    pub calendars: Vec<CalendarSummary>,
}

impl RunSummary {
    /// Total events created remotely this run.
    pub fn synced(&self) -> usize {
        self.calendars.iter().map(|c| c.synced_count).sum()
    }

    /// Total mirrored events deleted this run.
    pub fn deleted(&self) -> usize {
        self.calendars.iter().map(|c| c.deleted_count).sum()
    }

    /// Total relevant events across sources.
    pub fn relevant(&self) -> usize {
        self.calendars.iter().map(|c| c.relevant_count).sum()
    }

    /// Number of sources that synced successfully.
    pub fn succeeded_sources(&self) -> usize {
        self.calendars
            .iter()
            .filter(|c| c.status == SourceStatus::Success)
            .count()
    }

    /// Renders the end-of-run summary block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Sync summary");
        let _ = writeln!(
            out,
            "  sources: {}/{} synced",
            self.succeeded_sources(),
            self.calendars.len()
        );
        let _ = writeln!(out, "  relevant events: {}", self.relevant());
        let _ = writeln!(out, "  created: {}", self.synced());
        if self.deleted() > 0 {
            let _ = writeln!(out, "  deleted: {}", self.deleted());
        }
        for calendar in &self.calendars {
            match calendar.status {
                SourceStatus::Success => {
                    let _ = writeln!(
                        out,
                        "  {}: {}/{} created, {} deleted, {} errors",
                        calendar.name,
                        calendar.synced_count,
                        calendar.relevant_count,
                        calendar.deleted_count,
                        calendar.error_count
                    );
                }
                SourceStatus::Failed => {
                    let _ = writeln!(
                        out,
                        "  {}: failed ({})",
                        calendar.name,
                        calendar.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(name: &str, synced: usize, deleted: usize, errors: usize) -> CalendarSummary {
        CalendarSummary {
            name: name.to_string(),
            event_count: 10,
            relevant_count: 8,
            synced_count: synced,
            deleted_count: deleted,
            error_count: errors,
            status: SourceStatus::Success,
            error: None,
        }
    }

    #[test]
    fn totals_sum_across_sources() {
        let summary = RunSummary {
            calendars: vec![
                success("Work", 3, 1, 0),
                success("Personal", 2, 0, 1),
                CalendarSummary::failed("Health", "feed fetch failed"),
            ],
        };
        assert_eq!(summary.synced(), 5);
        assert_eq!(summary.deleted(), 1);
        assert_eq!(summary.relevant(), 16);
        assert_eq!(summary.succeeded_sources(), 2);
    }

    #[test]
    fn render_mentions_failures() {
        let summary = RunSummary {
            calendars: vec![
                success("Work", 3, 0, 0),
                CalendarSummary::failed("Health", "HTTP 404"),
            ],
        };
        let rendered = summary.render();
        assert!(rendered.contains("1/2 synced"));
        assert!(rendered.contains("Health: failed (HTTP 404)"));
    }

    #[test]
    fn ledger_shape_uses_camel_case() {
        let entry = success("Work", 1, 0, 0);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("eventCount").is_some());
        assert!(json.get("relevantCount").is_some());
        assert!(json.get("syncedCount").is_some());
        assert_eq!(json["status"], "success");
    }
}
