//! DriveSync Sync - sinks, retries and the sync engine
//!
//! Provides:
//! - Object sinks for mirrored content
//! - Bounded retry with exponential backoff around transport and sink
//! - The engine that runs one reconciliation with cancellation and timing
//!
//! ## Modules
//!
//! - [`engine`] - Sync engine wiring a reconciliation run
//! - [`filesystem`] - Local directory sink (atomic writes, metadata sidecars)
//! - [`http_sink`] - Object storage sink over HTTP `PUT`
//! - [`retry`] - Retry helper and retrying port decorators

pub mod engine;
pub mod filesystem;
pub mod http_sink;
pub mod retry;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use drivesync_core::{config::StorageConfig, ports::IObjectSink};
use thiserror::Error;

pub use engine::{SyncEngine, SyncResult};
pub use filesystem::{LocalDirectorySink, ObjectSidecar};
pub use http_sink::HttpObjectSink;
pub use retry::{with_retry, RetryPolicy, RetryingSink, RetryingTransport};

/// Errors raised by the sink adapters
#[derive(Debug, Error)]
pub enum SinkError {
    /// The key cannot be mapped onto the sink's namespace
    #[error("Invalid object key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The sink configuration is unusable
    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),

    /// A metadata entry cannot be sent as an HTTP header
    #[error("Invalid metadata entry {name}: {reason}")]
    InvalidMetadata { name: String, reason: String },

    /// The object store answered with a non-2xx status
    #[error("Object store rejected {key} with HTTP {status}: {message}")]
    Rejected {
        key: String,
        status: u16,
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A filesystem operation failed
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    /// Whether retrying the same write may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Build the sink selected by `storage.backend`
///
/// # Errors
/// Returns an error for an unknown backend or an unusable HTTP endpoint.
pub fn build_sink(storage: &StorageConfig) -> anyhow::Result<Arc<dyn IObjectSink>> {
    match storage.backend.as_str() {
        "directory" => Ok(Arc::new(LocalDirectorySink::new(&storage.directory))),
        "http" => {
            let endpoint = storage
                .endpoint
                .as_deref()
                .context("storage.endpoint is required for the http backend")?;
            let sink = HttpObjectSink::new(endpoint, &storage.bucket)?
                .with_metadata_header_prefix(&storage.metadata_header_prefix);
            Ok(Arc::new(sink))
        }
        other => anyhow::bail!("Unknown storage backend '{other}'"),
    }
}
