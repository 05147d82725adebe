//! Run orchestration.
//!
//! One run processes the configured sources strictly sequentially: fetch
//! the feed, parse, expand over the expansion window, restrict to the
//! relevance window, list the remote mirror, diff, and execute the plan.
//! A failing source is reported and skipped; the run always finishes with
//! a summary, and the ledger is written once at the end.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use calmirror_core::diff::{diff, restrict_to_relevance};
use calmirror_core::expand::expand_events;
use calmirror_core::feed::parse_feed;
use calmirror_core::time::{TimeWindow, relevance_cutoff};
use calmirror_google::{Authenticator, GoogleCalendarClient, RemoteCalendar};

use crate::config::{CalendarSource, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::executor::{ExecutorConfig, execute_plan};
use crate::fetch::{feed_http_client, fetch_feed};
use crate::ledger::RunLedger;
use crate::report::{CalendarSummary, RunSummary, SourceStatus};
use crate::session::SyncSession;

/// Timeout for remote calendar API calls.
const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes one full sync run.
///
/// # Errors
///
/// Only configuration and authentication failures surface as errors;
/// everything else is absorbed into the per-source summaries.
pub async fn run(config: &SyncConfig, dry_run: bool) -> SyncResult<RunSummary> {
    let mut ledger = RunLedger::load(&config.ledger_path);

    // The token is fetched once and reused for the rest of the run; a run
    // outliving the token's validity will begin failing mid-run.
    let authenticator = Authenticator::new(config.service_account.clone(), REMOTE_TIMEOUT);
    let token = authenticator.fetch_token().await.map_err(SyncError::Auth)?;
    let client = GoogleCalendarClient::new(token.token, REMOTE_TIMEOUT);
    let remote: &dyn RemoteCalendar = &client;

    let session = SyncSession::prepare(
        remote,
        &config.sources,
        &config.calendar_prefix,
        &config.time_zone,
        config.share_with.as_deref(),
    )
    .await;

    let feed_client = feed_http_client();
    let now = Utc::now();
    let mut calendars = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        info!(source = %source.name, "syncing source");
        let summary = sync_source(
            remote,
            &session,
            &feed_client,
            source,
            &config.time_zone,
            dry_run,
        )
        .await;
        if summary.status == SourceStatus::Failed {
            warn!(
                source = %source.name,
                error = summary.error.as_deref().unwrap_or("unknown"),
                "source sync failed"
            );
        }
        calendars.push(summary);
    }

    let summary = RunSummary { calendars };

    if dry_run {
        info!("dry run: leaving ledger untouched");
    } else {
        ledger.record_run(now, &summary, session.calendar_ids());
        if let Err(e) = ledger.save(&config.ledger_path) {
            warn!(error = %e, "could not save run ledger");
        }
    }

    Ok(summary)
}

/// Syncs one source, isolating its failures into the returned summary.
async fn sync_source(
    remote: &dyn RemoteCalendar,
    session: &SyncSession,
    feed_client: &reqwest::Client,
    source: &CalendarSource,
    time_zone: &str,
    dry_run: bool,
) -> CalendarSummary {
    let Some(calendar_id) = session.calendar_id(&source.name) else {
        return CalendarSummary::failed(&source.name, "remote calendar unavailable");
    };

    let text = match fetch_feed(feed_client, &source.feed_url).await {
        Ok(text) => text,
        Err(e) => return CalendarSummary::failed(&source.name, e.to_string()),
    };

    let now = Utc::now();
    let window = TimeWindow::expansion(now);
    let parsed = parse_feed(&text, &source.name);
    let expanded = expand_events(parsed, &window);
    let event_count = expanded.len();

    let relevant = restrict_to_relevance(expanded, relevance_cutoff(now));
    let relevant_count = relevant.len();
    info!(
        source = %source.name,
        events = event_count,
        relevant = relevant_count,
        "expanded feed"
    );

    // List from the expansion lower bound so stale mirrored instances in
    // the lookback tail are still cleaned up.
    let mirrored = match remote.list_events(calendar_id, window.start).await {
        Ok(events) => events,
        Err(e) => return CalendarSummary::failed(&source.name, e.to_string()),
    };

    let plan = diff(&relevant, &mirrored);
    info!(
        source = %source.name,
        create = plan.to_create.len(),
        delete = plan.to_delete.len(),
        "computed sync plan"
    );

    if dry_run {
        for event in &plan.to_create {
            info!(uid = %event.uid, summary = %event.summary, "would create");
        }
        for mirrored in &plan.to_delete {
            info!(id = %mirrored.id, "would delete");
        }
        return CalendarSummary {
            name: source.name.clone(),
            event_count,
            relevant_count,
            synced_count: 0,
            deleted_count: 0,
            error_count: 0,
            status: SourceStatus::Success,
            error: None,
        };
    }

    let report = execute_plan(
        remote,
        calendar_id,
        &plan,
        time_zone,
        &ExecutorConfig::default(),
    )
    .await;

    CalendarSummary {
        name: source.name.clone(),
        event_count,
        relevant_count,
        synced_count: report.creates.succeeded,
        deleted_count: report.deletes.succeeded,
        error_count: report.creates.failed + report.deletes.failed,
        status: SourceStatus::Success,
        error: None,
    }
}
