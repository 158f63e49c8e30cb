//! Adapter wiring shared by the commands
//!
//! Turns the loaded [`Config`] and the process environment into concrete
//! adapters: credential provider, Drive client, checkpoint store and sink.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use drivesync_core::{
    config::{Config, ENV_ACCESS_TOKEN, ENV_REFRESH_TOKEN},
    ports::{ICheckpointStore, ICredentialProvider},
};
use drivesync_drive::{
    auth::{KeyringSecretStorage, OAuthClientConfig, RefreshTokenProvider, StaticTokenProvider},
    client::DriveClient,
    provider::DriveProvider,
    rate_limit::{AdaptiveRateLimiter, RateLimitConfig},
};
use drivesync_state::{DatabasePool, JsonFileCheckpointStore, SqliteCheckpointStore};
use tracing::{debug, info};

/// Configuration plus the file it came from
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
}

impl AppContext {
    /// Load the configuration
    ///
    /// An explicit `--config` path must exist and parse; the default path
    /// falls back to built-in defaults when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (mut config, config_path) = match explicit {
            Some(path) => (
                Config::load(path)
                    .with_context(|| format!("Failed to load configuration {}", path.display()))?,
                path.to_path_buf(),
            ),
            None => {
                let path = Config::default_path();
                (Config::load_or_default(&path), path)
            }
        };
        config.apply_env_overrides();
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Select the credential provider
    ///
    /// `DRIVESYNC_ACCESS_TOKEN` wins; otherwise a refresh token from
    /// `DRIVESYNC_REFRESH_TOKEN` or the keyring is exchanged using the
    /// configured OAuth client.
    pub fn credentials(&self) -> Result<Arc<dyn ICredentialProvider>> {
        if let Some(token) = non_empty_env(ENV_ACCESS_TOKEN) {
            debug!("Using static access token from environment");
            return Ok(Arc::new(StaticTokenProvider::new(token)));
        }

        let client_id = self.config.drive.client_id.clone().context(
            "No credentials: set DRIVESYNC_ACCESS_TOKEN, or configure drive.client_id and store a refresh token with 'drivesync auth store'",
        )?;

        let refresh_token = match non_empty_env(ENV_REFRESH_TOKEN) {
            Some(token) => token,
            None => KeyringSecretStorage::load(&client_id)?.with_context(|| {
                format!("No refresh token stored for client {client_id}. Run 'drivesync auth store' first.")
            })?,
        };

        let oauth = OAuthClientConfig::new(client_id, self.config.drive.client_secret.clone())
            .with_token_url(&self.config.drive.token_url);
        Ok(Arc::new(RefreshTokenProvider::new(&oauth, refresh_token)?))
    }

    /// Drive client with the configured base URL and rate limits
    pub fn drive_client(&self, credentials: Arc<dyn ICredentialProvider>) -> Arc<DriveClient> {
        let limits = &self.config.rate_limiting;
        let limiter = AdaptiveRateLimiter::new(
            RateLimitConfig::from_requests_per_minute(
                limits.changes_requests_per_minute,
                limits.metadata_requests_per_minute,
                limits.content_requests_per_minute,
            )
            .with_max_retries(self.config.sync.max_retries),
        );
        Arc::new(
            DriveClient::with_base_url(credentials, &self.config.drive.api_base_url)
                .with_rate_limiter(Arc::new(limiter)),
        )
    }

    /// Drive provider serving feed, metadata and content
    pub fn drive_provider(&self, credentials: Arc<dyn ICredentialProvider>) -> Arc<DriveProvider> {
        Arc::new(
            DriveProvider::new(self.drive_client(credentials))
                .with_page_size(self.config.drive.page_size),
        )
    }

    /// Open the checkpoint store selected by `checkpoint.backend`
    pub async fn checkpoint_backend(&self) -> Result<CheckpointBackend> {
        let cfg = &self.config.checkpoint;
        match cfg.backend.as_str() {
            "sqlite" => {
                let pool = DatabasePool::new(&cfg.database)
                    .await
                    .context("Failed to open checkpoint database")?;
                info!(path = %cfg.database.display(), name = %cfg.name, "Using SQLite checkpoint");
                Ok(CheckpointBackend::Sqlite(SqliteCheckpointStore::new(
                    pool.pool().clone(),
                    cfg.name.clone(),
                )))
            }
            "file" => {
                info!(path = %cfg.file.display(), "Using file checkpoint");
                Ok(CheckpointBackend::File(JsonFileCheckpointStore::new(
                    &cfg.file,
                )))
            }
            other => anyhow::bail!("Unknown checkpoint backend '{other}'"),
        }
    }
}

/// One of the two checkpoint store implementations
#[derive(Clone)]
pub enum CheckpointBackend {
    Sqlite(SqliteCheckpointStore),
    File(JsonFileCheckpointStore),
}

impl CheckpointBackend {
    pub fn store(&self) -> Arc<dyn ICheckpointStore> {
        match self {
            CheckpointBackend::Sqlite(store) => Arc::new(store.clone()),
            CheckpointBackend::File(store) => Arc::new(store.clone()),
        }
    }

    /// Where the checkpoint lives, for display
    pub fn location(&self, config: &Config) -> String {
        match self {
            CheckpointBackend::Sqlite(store) => format!(
                "{} (name '{}')",
                config.checkpoint.database.display(),
                store.name()
            ),
            CheckpointBackend::File(store) => store.path().display().to_string(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
