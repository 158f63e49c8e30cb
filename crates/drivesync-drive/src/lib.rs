//! DriveSync Drive - Google Drive v3 adapter
//!
//! Provides async access to:
//! - The changes feed (`/changes/startPageToken`, `/changes`)
//! - File metadata lookups (`/files/{id}`)
//! - Binary downloads and native-document exports
//! - Bearer credentials (static token or OAuth2 refresh-token grant)
//!
//! ## Modules
//!
//! - [`auth`] - Credential providers and keyring storage for the refresh token
//! - [`client`] - Authenticated HTTP client with rate limiting and retries
//! - [`changes`] - Change feed requests and response parsing
//! - [`files`] - Metadata, download and export requests
//! - [`provider`] - Port implementations consumed by `drivesync-core`
//! - [`rate_limit`] - Per-endpoint adaptive token buckets

pub mod auth;
pub mod changes;
pub mod client;
pub mod files;
pub mod provider;
pub mod rate_limit;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// No credential could be obtained for the request
    #[error("Credential unavailable: {0:#}")]
    Credential(#[source] anyhow::Error),

    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DriveError {
    /// Classify a non-success response status
    ///
    /// `body` is the (possibly truncated) response body, used as the message.
    pub fn from_status(status: StatusCode, body: &str, retry_after: Duration) -> Self {
        let message = summarize_body(body);
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::FORBIDDEN if is_rate_limit_reason(body) => {
                Self::TooManyRequests { retry_after }
            }
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => Self::TooManyRequests { retry_after },
            s if s.is_server_error() => Self::ServerError {
                status: s.as_u16(),
                message,
            },
            s => Self::InvalidResponse(format!("unexpected status {s}: {message}")),
        }
    }

    /// Returns true for failures worth retrying later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TooManyRequests { .. } | Self::ServerError { .. } => true,
            Self::NetworkError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Drive reports per-user quota exhaustion as 403 with one of these reasons
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

fn is_rate_limit_reason(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    value
        .pointer("/error/errors")
        .and_then(|errors| errors.as_array())
        .is_some_and(|errors| {
            errors.iter().any(|e| {
                e.get("reason")
                    .and_then(|r| r.as_str())
                    .is_some_and(|r| RATE_LIMIT_REASONS.contains(&r))
            })
        })
}

/// Prefer the API's `error.message`; fall back to the raw body
fn summarize_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}
