//! Run configuration.
//!
//! Everything comes from the environment (a `.env` file is honored).
//! Calendar sources are discovered from `CALENDAR_*_URL` variables; the
//! source name is the variable infix, title-cased with underscores as
//! spaces (`CALENDAR_WORK_TEAM_URL` becomes "Work Team"). Sources are
//! ordered by variable name so runs are reproducible.
//!
//! Required: `GOOGLE_SERVICE_ACCOUNT_EMAIL`, `GOOGLE_PRIVATE_KEY`,
//! `GOOGLE_PROJECT_ID`, and at least one `CALENDAR_*_URL`.
//!
//! Optional: `PERSONAL_GMAIL` (account the mirrored calendars are shared
//! with), `CALENDAR_PREFIX` (remote calendar name prefix, default
//! "Mirrored"), `CALENDAR_TIMEZONE` (default timezone for created
//! calendars and events, default "UTC"), `LEDGER_PATH`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::info;

use calmirror_google::ServiceAccountKey;

use crate::error::{SyncError, SyncResult};

/// Default remote calendar name prefix.
pub const DEFAULT_CALENDAR_PREFIX: &str = "Mirrored";

/// Default timezone for created calendars and event payloads.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Default run ledger location.
pub const DEFAULT_LEDGER_PATH: &str = "calmirror-ledger.json";

/// One configured feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSource {
    /// Human-readable source name, derived from the variable name.
    pub name: String,
    /// The feed URL (`https://` or `webcal://`).
    pub feed_url: String,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// The feed sources, in variable-name order.
    pub sources: Vec<CalendarSource>,
    /// Service-account credentials for the remote side.
    pub service_account: ServiceAccountKey,
    /// Account the mirrored calendars are shared with, if any.
    pub share_with: Option<String>,
    /// Prefix for remote calendar names.
    pub calendar_prefix: String,
    /// Default timezone for created calendars and event payloads.
    pub time_zone: String,
    /// Where the run ledger is persisted.
    pub ledger_path: PathBuf,
}

impl SyncConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when required credentials are missing
    /// or no sources are configured.
    pub fn load() -> SyncResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Builds configuration from an explicit variable set.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> SyncResult<Self> {
        // BTreeMap gives deterministic source ordering by variable name.
        let vars: BTreeMap<String, String> = vars.into_iter().collect();

        let required = |key: &str| -> SyncResult<String> {
            vars.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| SyncError::config(format!("missing environment variable: {}", key)))
        };

        let service_account = ServiceAccountKey {
            client_email: required("GOOGLE_SERVICE_ACCOUNT_EMAIL")?,
            private_key: required("GOOGLE_PRIVATE_KEY")?,
            project_id: required("GOOGLE_PROJECT_ID")?,
        };

        let mut sources = Vec::new();
        for (key, value) in &vars {
            if !key.starts_with("CALENDAR_") || !key.ends_with("_URL") || value.is_empty() {
                continue;
            }
            let source = CalendarSource {
                name: source_name(key),
                feed_url: value.clone(),
            };
            info!(name = %source.name, variable = %key, "loaded calendar source");
            sources.push(source);
        }

        if sources.is_empty() {
            return Err(SyncError::config(
                "no calendar sources found; set CALENDAR_*_URL environment variables",
            ));
        }

        Ok(Self {
            sources,
            service_account,
            share_with: vars.get("PERSONAL_GMAIL").filter(|v| !v.is_empty()).cloned(),
            calendar_prefix: vars
                .get("CALENDAR_PREFIX")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_CALENDAR_PREFIX.to_string()),
            time_zone: vars
                .get("CALENDAR_TIMEZONE")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            ledger_path: vars
                .get("LEDGER_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH)),
        })
    }
}

/// Derives the display name from a `CALENDAR_*_URL` variable name.
fn source_name(env_key: &str) -> String {
    let infix = env_key
        .trim_start_matches("CALENDAR_")
        .trim_end_matches("_URL");
    infix
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
