//! Retry logic
//!
//! Transient errors (network, timeout, rate limiting, server errors) are
//! retried with exponential backoff: with the default base delay of one
//! second the schedule is 1s, 2s, 4s, 8s, 16s (max 5 retries). Anything else
//! is returned on the first failure.
//!
//! [`RetryingTransport`] and [`RetryingSink`] wrap a port implementation and
//! implement the same port, so the reconciliation core sees a drop-in
//! substitute.

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use drivesync_core::{
    domain::StorageKey,
    ports::{IContentTransport, IObjectSink, ObjectMetadata},
};
use drivesync_drive::DriveError;
use tracing::{info, warn};

use crate::SinkError;

/// Maximum number of retries for transient errors
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (1 second)
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// How often and how patiently an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

/// Determines whether an error is transient (retryable)
///
/// The whole error chain is inspected, so context added with
/// `anyhow::Context` does not hide the underlying cause.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<DriveError>() {
            return e.is_transient();
        }
        if let Some(e) = cause.downcast_ref::<SinkError>() {
            return e.is_transient();
        }
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_timeout() || e.is_connect();
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            );
        }
        false
    })
}

/// Executes an async operation with exponential backoff retry
///
/// Only retries on transient errors. Non-transient errors and the error of
/// the last permitted attempt are returned as they are.
pub async fn with_retry<F, Fut, T>(operation_name: &str, policy: &RetryPolicy, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries && is_transient_error(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %format!("{err:#}"),
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// Port decorators
// ============================================================================

/// Content transport that retries transient download and export failures
pub struct RetryingTransport<T: ?Sized> {
    inner: Arc<T>,
    policy: RetryPolicy,
}

impl<T: IContentTransport + ?Sized> RetryingTransport<T> {
    pub fn new(inner: Arc<T>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T: IContentTransport + ?Sized> IContentTransport for RetryingTransport<T> {
    async fn download(&self, id: &str) -> Result<Vec<u8>> {
        with_retry("download", &self.policy, || self.inner.download(id)).await
    }

    async fn export(&self, id: &str, target_mime: &str) -> Result<Vec<u8>> {
        with_retry("export", &self.policy, || self.inner.export(id, target_mime)).await
    }
}

/// Object sink that retries transient write failures
pub struct RetryingSink<S: ?Sized> {
    inner: Arc<S>,
    policy: RetryPolicy,
}

impl<S: IObjectSink + ?Sized> RetryingSink<S> {
    pub fn new(inner: Arc<S>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: IObjectSink + ?Sized> IObjectSink for RetryingSink<S> {
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<()> {
        with_retry("put_object", &self.policy, || {
            self.inner
                .put_object(key, body.clone(), content_type, metadata)
        })
        .await
    }
}
