//! Plan execution against the remote calendar.
//!
//! Applies a [`DiffPlan`] one operation at a time: creates first, then
//! deletes. A fixed pacing delay follows every remote call as a courtesy
//! to the external API. Individual failures are counted and do not abort
//! the remaining operations, with one guard: too many consecutive create
//! failures abandon the rest of the source's creates (the delete phase
//! still runs).

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use calmirror_core::diff::DiffPlan;
use calmirror_google::{EventPayload, RemoteCalendar};

/// Tuning knobs for plan execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Delay after every remote call.
    pub pacing: Duration,
    /// Consecutive create failures tolerated before the remaining creates
    /// for the source are abandoned.
    pub max_consecutive_create_failures: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(200),
            max_consecutive_create_failures: 5,
        }
    }
}

/// Counters for one operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    /// Operations started.
    pub attempted: usize,
    /// Operations that completed.
    pub succeeded: usize,
    /// Operations that failed.
    pub failed: usize,
}

/// Outcome of executing one source's plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Create-operation counters.
    pub creates: OpCounts,
    /// Delete-operation counters.
    pub deletes: OpCounts,
    /// Whether the create phase was abandoned by the failure guard.
    pub creates_abandoned: bool,
}

/// Applies a plan to one remote calendar.
pub async fn execute_plan(
    remote: &dyn RemoteCalendar,
    calendar_id: &str,
    plan: &DiffPlan,
    time_zone: &str,
    config: &ExecutorConfig,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let mut consecutive_failures = 0usize;

    for event in &plan.to_create {
        let payload = EventPayload::from_event(event, time_zone, Utc::now());
        report.creates.attempted += 1;

        match remote.create_event(calendar_id, payload).await {
            Ok(remote_id) => {
                debug!(uid = %event.uid, remote_id, "created event");
                report.creates.succeeded += 1;
                consecutive_failures = 0;
            }
            Err(e) => {
                warn!(uid = %event.uid, error = %e, "failed to create event");
                report.creates.failed += 1;
                consecutive_failures += 1;
            }
        }
        tokio::time::sleep(config.pacing).await;

        if consecutive_failures > config.max_consecutive_create_failures {
            warn!(
                calendar_id,
                remaining = plan.to_create.len() - report.creates.attempted,
                "too many consecutive create failures, abandoning remaining creates"
            );
            report.creates_abandoned = true;
            break;
        }
    }

    for mirrored in &plan.to_delete {
        report.deletes.attempted += 1;

        match remote.delete_event(calendar_id, &mirrored.id).await {
            Ok(()) => {
                debug!(remote_id = %mirrored.id, "deleted event");
                report.deletes.succeeded += 1;
            }
            Err(e) => {
                warn!(remote_id = %mirrored.id, error = %e, "failed to delete event");
                report.deletes.failed += 1;
            }
        }
        tokio::time::sleep(config.pacing).await;
    }

    report
}
