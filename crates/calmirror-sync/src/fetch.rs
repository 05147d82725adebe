//! Feed fetching.
//!
//! Fetches each source's feed over HTTP(S). `webcal://` URLs are rewritten
//! to `https://` before the request. Redirects are followed iteratively
//! with a hop cap so a redirect loop cannot hang the run; the body is
//! streamed with a size cap; the whole request is bounded by a timeout.

use std::time::Duration;

use reqwest::header::LOCATION;
use tracing::{debug, info};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Maximum number of redirect hops before the fetch is abandoned.
pub const MAX_REDIRECTS: usize = 10;

/// Maximum feed size in bytes.
const MAX_FEED_BYTES: usize = 10 * 1024 * 1024;

/// Per-request timeout.
const FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Some feed hosts reject non-browser user agents.
const FEED_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

/// Builds the HTTP client used for feed fetches.
///
/// Redirects are disabled at the client level; [`fetch_feed`] follows
/// them itself so the hop count stays bounded.
pub fn feed_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(FEED_TIMEOUT)
        .user_agent(FEED_USER_AGENT)
        .build()
        .expect("failed to create HTTP client")
}

/// Rewrites `webcal://` to `https://` and parses the URL.
pub fn normalize_feed_url(raw: &str) -> SyncResult<Url> {
    let rewritten = match raw.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => raw.to_string(),
    };
    Url::parse(&rewritten)
        .map_err(|e| SyncError::network(format!("invalid feed URL {}: {}", raw, e)))
}

/// Resolves a redirect target, which may be relative, against the URL
/// that produced it.
fn redirect_target(current: &Url, location: &str) -> SyncResult<Url> {
    current
        .join(location)
        .map_err(|e| SyncError::network(format!("invalid redirect target {}: {}", location, e)))
}

/// Fetches a feed, following redirects up to [`MAX_REDIRECTS`] hops.
///
/// # Errors
///
/// Returns a network error on timeout, connection failure, a non-success
/// status, an oversized body, or a redirect loop.
pub async fn fetch_feed(client: &reqwest::Client, feed_url: &str) -> SyncResult<String> {
    let mut url = normalize_feed_url(feed_url)?;

    for _hop in 0..=MAX_REDIRECTS {
        debug!(%url, "fetching feed");
        let response = client
            .get(url.clone())
            .header("Accept", "text/calendar,*/*")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::network(format!("feed request timed out: {}", url))
                } else {
                    SyncError::network(format!("feed request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    SyncError::network(format!("redirect ({}) without a Location header", status))
                })?;
            url = redirect_target(&url, location)?;
            debug!(%url, "following redirect");
            continue;
        }

        if !status.is_success() {
            return Err(SyncError::network(format!(
                "feed fetch failed with HTTP {} for {}",
                status, url
            )));
        }

        let mut body: Vec<u8> = Vec::new();
        let mut response = response;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SyncError::network(format!("failed to read feed body: {}", e)))?
        {
            if body.len() + chunk.len() > MAX_FEED_BYTES {
                return Err(SyncError::network(format!(
                    "feed larger than {} MiB: {}",
                    MAX_FEED_BYTES / (1024 * 1024),
                    url
                )));
            }
            body.extend_from_slice(&chunk);
        }

        info!(%url, bytes = body.len(), "downloaded feed");
        return Ok(String::from_utf8_lossy(&body).into_owned());
    }

    Err(SyncError::network(format!(
        "more than {} redirects while fetching {}",
        MAX_REDIRECTS, feed_url
    )))
}
