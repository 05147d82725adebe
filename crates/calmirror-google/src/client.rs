//! Google Calendar API client.
//!
//! A low-level HTTP client for the Google Calendar v3 API: request
//! building, status-code mapping and response parsing. It implements
//! [`RemoteCalendar`] for use by the sync pipeline.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::debug;

use calmirror_core::diff::MirroredEvent;

use crate::error::{RemoteError, RemoteResult};
use crate::remote::{
    BoxFuture, CalendarEntry, EventPayload, NewCalendar, RemoteCalendar,
};

/// Base URL for the Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Page size for event listing.
const EVENTS_PAGE_SIZE: usize = 2500;

/// The metadata key carrying the source uid on mirrored events.
const SOURCE_UID_KEY: &str = "sourceUid";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    /// Creates a new client with the given bearer token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self {
            http,
            access_token: access_token.into(),
        }
    }

    /// Sends a request and maps non-success statuses onto error codes.
    async fn send_checked(&self, request: reqwest::RequestBuilder) -> RemoteResult<String> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::network("request timeout")
                } else if e.is_connect() {
                    RemoteError::network(format!("connection failed: {}", e))
                } else {
                    RemoteError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::network(format!("failed to read response: {}", e)))?;

        if status.is_success() {
            return Ok(body);
        }

        Err(match status {
            reqwest::StatusCode::UNAUTHORIZED => {
                RemoteError::authentication("access token expired or invalid")
            }
            reqwest::StatusCode::NOT_FOUND => RemoteError::not_found("resource not found"),
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                RemoteError::rate_limited("rate limit exceeded")
            }
            s if s.is_server_error() => {
                RemoteError::server(format!("API error ({}): {}", status, body))
            }
            _ => RemoteError::bad_request(format!("API error ({}): {}", status, body)),
        })
    }

    fn parse<T: serde::de::DeserializeOwned>(body: &str) -> RemoteResult<T> {
        serde_json::from_str(body)
            .map_err(|e| RemoteError::invalid_response(format!("failed to parse response: {}", e)))
    }

    /// Lists the calendars visible to the account.
    pub async fn list_calendars(&self) -> RemoteResult<Vec<CalendarEntry>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);
        let body = self.send_checked(self.http.get(&url)).await?;
        let parsed: CalendarListResponse = Self::parse(&body)?;
        Ok(parsed
            .items
            .into_iter()
            .map(|c| CalendarEntry {
                id: c.id,
                summary: c.summary,
            })
            .collect())
    }

    /// Creates a calendar.
    pub async fn create_calendar(&self, spec: &NewCalendar) -> RemoteResult<CalendarEntry> {
        let url = format!("{}/calendars", CALENDAR_API_BASE);
        let body = self
            .send_checked(self.http.post(&url).json(spec))
            .await?;
        let created: ApiCalendar = Self::parse(&body)?;
        debug!(id = %created.id, summary = %created.summary, "created remote calendar");
        Ok(CalendarEntry {
            id: created.id,
            summary: created.summary,
        })
    }

    /// Grants owner access on a calendar to the given account.
    pub async fn share_calendar(&self, calendar_id: &str, email: &str) -> RemoteResult<()> {
        let url = format!(
            "{}/calendars/{}/acl",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );
        let rule = serde_json::json!({
            "role": "owner",
            "scope": { "type": "user", "value": email },
        });
        self.send_checked(self.http.post(&url).json(&rule)).await?;
        Ok(())
    }

    /// Lists mirrored events starting at or after `lower_bound`, following
    /// pagination to the end.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        lower_bound: DateTime<Utc>,
    ) -> RemoteResult<Vec<MirroredEvent>> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(&url).query(&[
                (
                    "timeMin",
                    lower_bound.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("maxResults", EVENTS_PAGE_SIZE.to_string()),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let body = self.send_checked(request).await?;
            let page: EventListResponse = Self::parse(&body)?;

            events.extend(page.items.into_iter().filter_map(mirrored_from_api));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            calendar_id,
            count = events.len(),
            "listed mirrored events"
        );
        Ok(events)
    }

    /// Creates an event, returning the remote id.
    pub async fn create_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> RemoteResult<String> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );
        let body = self
            .send_checked(self.http.post(&url).json(payload))
            .await?;
        let created: ApiEvent = Self::parse(&body)?;
        created
            .id
            .ok_or_else(|| RemoteError::invalid_response("created event has no id"))
    }

    /// Deletes an event by id.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> RemoteResult<()> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );
        self.send_checked(self.http.delete(&url)).await?;
        Ok(())
    }
}

impl RemoteCalendar for GoogleCalendarClient {
    fn list_calendars(&self) -> BoxFuture<'_, RemoteResult<Vec<CalendarEntry>>> {
        Box::pin(self.list_calendars())
    }

    fn create_calendar(&self, spec: NewCalendar) -> BoxFuture<'_, RemoteResult<CalendarEntry>> {
        Box::pin(async move { self.create_calendar(&spec).await })
    }

    fn share_calendar(&self, calendar_id: &str, email: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let calendar_id = calendar_id.to_string();
        let email = email.to_string();
        Box::pin(async move { self.share_calendar(&calendar_id, &email).await })
    }

    fn list_events(
        &self,
        calendar_id: &str,
        lower_bound: DateTime<Utc>,
    ) -> BoxFuture<'_, RemoteResult<Vec<MirroredEvent>>> {
        let calendar_id = calendar_id.to_string();
        Box::pin(async move { self.list_events(&calendar_id, lower_bound).await })
    }

    fn create_event(
        &self,
        calendar_id: &str,
        payload: EventPayload,
    ) -> BoxFuture<'_, RemoteResult<String>> {
        let calendar_id = calendar_id.to_string();
        Box::pin(async move { self.create_event(&calendar_id, &payload).await })
    }

    fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, RemoteResult<()>> {
        let calendar_id = calendar_id.to_string();
        let event_id = event_id.to_string();
        Box::pin(async move { self.delete_event(&calendar_id, &event_id).await })
    }
}

/// Converts an API event into the reconciler's mirror shape.
fn mirrored_from_api(event: ApiEvent) -> Option<MirroredEvent> {
    let id = event.id?;
    let source_uid = event
        .extended_properties
        .and_then(|ep| ep.private)
        .and_then(|mut private| private.remove(SOURCE_UID_KEY));
    Some(MirroredEvent {
        id,
        summary: event.summary,
        source_uid,
    })
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    extended_properties: Option<ApiExtendedProperties>,
}

/// The extendedProperties block of an API event.
#[derive(Debug, Deserialize)]
struct ApiExtendedProperties {
    private: Option<HashMap<String, String>>,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<ApiCalendar>,
}

/// A calendar resource from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendar {
    id: String,
    summary: String,
}
