//! Google Drive v3 HTTP client
//!
//! Wraps `reqwest::Client` with bearer authentication, base URL
//! construction, proactive rate limiting and bounded retries for throttle
//! and server errors.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drivesync_drive::{auth::StaticTokenProvider, client::DriveClient, rate_limit::Endpoint};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new(Arc::new(StaticTokenProvider::new("ya29.token")));
//! let response = client
//!     .get("/changes/startPageToken", &[("supportsAllDrives", "true")], Endpoint::Changes)
//!     .await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use drivesync_core::ports::ICredentialProvider;
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use crate::{
    rate_limit::{parse_retry_after, AdaptiveRateLimiter, Endpoint},
    DriveError,
};

/// Base URL of the Drive v3 REST API
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Retry-After used when a throttle response carries none
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Retry bound when no rate limiter is configured
const DEFAULT_MAX_RETRIES: u32 = 5;

/// First backoff step for 5xx responses
const DEFAULT_SERVER_ERROR_DELAY: Duration = Duration::from_millis(500);

/// HTTP client for Drive API calls
///
/// Credentials are fetched from the provider for every request, so a
/// refreshing provider transparently rotates the bearer token.
pub struct DriveClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn ICredentialProvider>,
    rate_limiter: Option<Arc<AdaptiveRateLimiter>>,
    server_error_delay: Duration,
}

impl DriveClient {
    /// Creates a client for the public Drive API
    pub fn new(credentials: Arc<dyn ICredentialProvider>) -> Self {
        Self::with_base_url(credentials, DRIVE_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(
        credentials: Arc<dyn ICredentialProvider>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            rate_limiter: None,
            server_error_delay: DEFAULT_SERVER_ERROR_DELAY,
        }
    }

    /// Attach a shared adaptive rate limiter
    pub fn with_rate_limiter(mut self, limiter: Arc<AdaptiveRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// First backoff step for 5xx retries; doubles on each attempt
    pub fn with_server_error_delay(mut self, delay: Duration) -> Self {
        self.server_error_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rate_limiter(&self) -> Option<&Arc<AdaptiveRateLimiter>> {
        self.rate_limiter.as_ref()
    }

    fn max_retries(&self) -> u32 {
        self.rate_limiter
            .as_ref()
            .map(|rl| rl.max_retries())
            .unwrap_or(DEFAULT_MAX_RETRIES)
    }

    /// Issue an authenticated GET with rate limiting and retries
    ///
    /// 429 responses (and 403 rate-limit reasons) wait for `Retry-After`
    /// and halve the endpoint's bucket; 5xx responses back off
    /// exponentially. Both are bounded by the limiter's `max_retries`.
    /// Any other non-success status is returned as a [`DriveError`].
    ///
    /// # Arguments
    /// * `path` - API path relative to the base URL (e.g. `/changes`)
    /// * `query` - Query parameters
    /// * `endpoint` - Rate-limit class of the request
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> Result<Response, DriveError> {
        let url = format!("{}{}", self.base_url, path);
        let max_retries = self.max_retries();

        let mut attempt: u32 = 0;
        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.acquire(endpoint).await;
            }

            let credential = self
                .credentials
                .get_credential()
                .await
                .map_err(DriveError::Credential)?;

            let response = self
                .client
                .get(&url)
                .query(query)
                .bearer_auth(&credential.access_token)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                if let Some(limiter) = &self.rate_limiter {
                    limiter.on_success(endpoint);
                }
                if attempt > 0 {
                    info!(path, attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                .unwrap_or(DEFAULT_RETRY_AFTER);
            let body = response.text().await.unwrap_or_default();
            let error = DriveError::from_status(status, &body, retry_after);

            let delay = match &error {
                DriveError::TooManyRequests { retry_after } => {
                    if let Some(limiter) = &self.rate_limiter {
                        limiter.on_throttle(endpoint);
                    }
                    *retry_after
                }
                DriveError::ServerError { .. } => self.server_error_delay * 2u32.pow(attempt.min(10)),
                _ => {
                    debug!(path, status = status.as_u16(), "Request failed");
                    return Err(error);
                }
            };

            if attempt >= max_retries {
                warn!(
                    path,
                    status = status.as_u16(),
                    attempts = attempt + 1,
                    "Retry limit exhausted"
                );
                return Err(error);
            }

            info!(
                path,
                status = status.as_u16(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retryable response, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET and deserialize a JSON body
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> Result<T, DriveError> {
        let response = self.get(path, query, endpoint).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DriveError::InvalidResponse(format!("{path}: {e}")))
    }

    /// GET and return the raw body
    pub async fn get_bytes(
        &self,
        path: &str,
        query: &[(&str, &str)],
        endpoint: Endpoint,
    ) -> Result<Vec<u8>, DriveError> {
        let response = self.get(path, query, endpoint).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
