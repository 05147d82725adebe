//! Sync pipeline error types.

use thiserror::Error;

use calmirror_google::RemoteError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync run.
///
/// Only configuration and authentication errors are fatal: they abort the
/// run before (or while) acquiring credentials and produce a nonzero exit.
/// Everything else is recovered at the call site: a failing source is
/// reported and skipped, a failing operation is counted and the run goes
/// on.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing credentials, no configured sources, or invalid settings.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Credential exchange with the remote service failed.
    #[error("Authentication error: {0}")]
    Auth(RemoteError),

    /// A transport-level failure: timeout, connection error, oversized or
    /// malformed response.
    #[error("Network error: {message}")]
    Network { message: String },

    /// A non-auth failure reported by the remote service.
    #[error("Remote API error: {0}")]
    Remote(RemoteError),

    /// Filesystem failure while reading or writing local state.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure on local state.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Returns `true` when the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Auth(_))
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        if err.is_auth() {
            Self::Auth(err)
        } else {
            Self::Remote(err)
        }
    }
}
