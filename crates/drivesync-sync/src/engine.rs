//! Sync engine
//!
//! The [`SyncEngine`] runs one reconciliation of the change feed into the
//! object sink.
//!
//! ## Sync Flow
//!
//! 1. **Wiring**: Content transport and sink are wrapped in retrying
//!    decorators built from `sync.max_retries` and `sync.retry_base_delay_ms`
//! 2. **Run**: The reconciliation use case pages the feed under the engine's
//!    cancellation token
//! 3. **Bookkeeping**: The outcome is returned with the wall-clock duration
//!
//! Cancelling the token stops the run at the next record boundary; the
//! checkpoint stays at the last page that was fully processed.

use std::{sync::Arc, time::Duration};

use drivesync_core::{
    config::Config,
    domain::{RunOutcome, RunState, SyncError},
    usecases::{ReconcileChangesUseCase, ReconcilePorts},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::retry::{RetryPolicy, RetryingSink, RetryingTransport};

/// Summary of a completed synchronization run
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub outcome: RunOutcome,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

/// Reconciliation runner with cancellation and timing
pub struct SyncEngine {
    use_case: ReconcileChangesUseCase,
    cancel: CancellationToken,
    policy: RetryPolicy,
}

impl SyncEngine {
    /// Build an engine from configuration and adapters
    ///
    /// `ports.content` and `ports.sink` are used through retrying
    /// decorators; the other ports are used as given.
    pub fn new(ports: ReconcilePorts, config: &Config) -> Self {
        let policy = RetryPolicy::new(
            config.sync.max_retries,
            Duration::from_millis(config.sync.retry_base_delay_ms),
        );
        let ports = ReconcilePorts {
            content: Arc::new(RetryingTransport::new(ports.content, policy)),
            sink: Arc::new(RetryingSink::new(ports.sink, policy)),
            ..ports
        };

        Self {
            use_case: ReconcileChangesUseCase::new(ports, config.reconcile_settings()),
            cancel: CancellationToken::new(),
            policy,
        }
    }

    /// Use `token` instead of the engine's own cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle that cancels the running (or next) sync
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run one reconciliation
    ///
    /// # Errors
    ///
    /// Returns the [`SyncError`] that aborted the run, including
    /// [`SyncError::Cancelled`] when the token fired mid-run.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncResult, SyncError> {
        let started = Instant::now();
        let mut state = RunState::new();

        let result = self.use_case.execute_with(&mut state, &self.cancel).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => {
                info!(
                    uploaded = outcome.uploaded(),
                    skipped = outcome.skipped(),
                    checkpoint = outcome.checkpoint().unwrap_or_default(),
                    duration_ms,
                    "Sync finished"
                );
                Ok(SyncResult {
                    outcome,
                    duration_ms,
                })
            }
            Err(err) => {
                error!(kind = err.kind(), duration_ms, error = %err, "Sync aborted");
                Err(err)
            }
        }
    }
}
