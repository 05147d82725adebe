//! Error types for remote calendar operations.

use std::fmt;
use thiserror::Error;

/// The category of a remote calendar error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorCode {
    /// Credential exchange failed or the token is invalid/expired.
    AuthenticationFailed,
    /// Connection failure, timeout, DNS resolution, oversized body.
    NetworkError,
    /// Too many requests.
    RateLimited,
    /// The service returned a 5xx status.
    ServerError,
    /// The response could not be parsed.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// The request was rejected (4xx other than the above).
    BadRequest,
}

impl RemoteErrorCode {
    /// Returns a machine-readable name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
        }
    }
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error from the remote calendar service or the transport under it.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    code: RemoteErrorCode,
    message: String,
}

impl RemoteError {
    /// Creates a new error with the given code and message.
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::AuthenticationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::BadRequest, message)
    }

    /// Returns the error code.
    pub fn code(&self) -> RemoteErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` for credential failures, which abort the whole run
    /// rather than a single source or operation.
    pub fn is_auth(&self) -> bool {
        self.code == RemoteErrorCode::AuthenticationFailed
    }
}

/// A specialized Result type for remote calendar operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_names() {
        assert_eq!(
            RemoteErrorCode::AuthenticationFailed.as_str(),
            "authentication_failed"
        );
        assert_eq!(RemoteErrorCode::RateLimited.as_str(), "rate_limited");
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = RemoteError::rate_limited("too many requests");
        let rendered = format!("{}", err);
        assert!(rendered.contains("rate_limited"));
        assert!(rendered.contains("too many requests"));
    }

    #[test]
    fn auth_classification() {
        assert!(RemoteError::authentication("expired").is_auth());
        assert!(!RemoteError::network("timeout").is_auth());
    }
}
