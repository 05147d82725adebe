//! Per-run session state.
//!
//! A [`SyncSession`] carries the state the pipeline stages need: the
//! source-name to remote-calendar-id map built during setup. It is an
//! explicit value threaded through the run rather than ambient state, so
//! the pure stages stay independently testable.

use std::collections::BTreeMap;

use tracing::{info, warn};

use calmirror_google::{NewCalendar, RemoteCalendar};

use crate::config::CalendarSource;

/// Display color per source name, with a gray default.
fn calendar_color(name: &str) -> &'static str {
    match name {
        "Personal" => "#F09300",
        "Work" => "#0D7377",
        "Health" => "#E74C3C",
        "Travel" => "#3498DB",
        "Events" => "#9B59B6",
        _ => "#616161",
    }
}

/// Session state for one sync run.
#[derive(Debug, Default)]
pub struct SyncSession {
    calendar_ids: BTreeMap<String, String>,
}

impl SyncSession {
    /// Finds or creates the remote calendar for every configured source.
    ///
    /// Each source's remote calendar is looked up by its expected summary
    /// (`"<prefix> <name>"`); missing calendars are created and shared
    /// with `share_with` when one is configured. A source whose calendar
    /// cannot be set up is left out of the map and skipped by the run;
    /// a share failure is only a warning.
    pub async fn prepare(
        remote: &dyn RemoteCalendar,
        sources: &[CalendarSource],
        prefix: &str,
        time_zone: &str,
        share_with: Option<&str>,
    ) -> Self {
        let existing = match remote.list_calendars().await {
            Ok(calendars) => calendars,
            Err(e) => {
                warn!(error = %e, "could not list remote calendars");
                Vec::new()
            }
        };

        let mut calendar_ids = BTreeMap::new();
        for source in sources {
            let expected_summary = format!("{} {}", prefix, source.name);

            if let Some(found) = existing.iter().find(|c| c.summary == expected_summary) {
                info!(name = %source.name, id = %found.id, "found remote calendar");
                calendar_ids.insert(source.name.clone(), found.id.clone());
                continue;
            }

            let spec = NewCalendar {
                summary: expected_summary.clone(),
                description: format!("Synced from {}", source.name),
                time_zone: time_zone.to_string(),
                background_color: calendar_color(&source.name).to_string(),
            };
            let created = match remote.create_calendar(spec).await {
                Ok(created) => created,
                Err(e) => {
                    warn!(name = %source.name, error = %e, "could not set up remote calendar, skipping source");
                    continue;
                }
            };
            info!(name = %source.name, id = %created.id, "created remote calendar");

            if let Some(email) = share_with {
                if let Err(e) = remote.share_calendar(&created.id, email).await {
                    warn!(name = %source.name, error = %e, "could not share calendar");
                }
            }

            calendar_ids.insert(source.name.clone(), created.id);
        }

        Self { calendar_ids }
    }

    /// The remote calendar id for a source, if setup succeeded for it.
    pub fn calendar_id(&self, source_name: &str) -> Option<&str> {
        self.calendar_ids.get(source_name).map(String::as_str)
    }

    /// The full source-name to calendar-id map, for the ledger.
    pub fn calendar_ids(&self) -> &BTreeMap<String, String> {
        &self.calendar_ids
    }
}
