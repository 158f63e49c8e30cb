//! Configuration module for DriveSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::usecases::ReconcileSettings;

/// Environment variable holding a pre-issued bearer token
pub const ENV_ACCESS_TOKEN: &str = "DRIVESYNC_ACCESS_TOKEN";
/// Environment variable holding an OAuth refresh token
pub const ENV_REFRESH_TOKEN: &str = "DRIVESYNC_REFRESH_TOKEN";
/// Environment variable overriding `drive.client_id`
pub const ENV_CLIENT_ID: &str = "DRIVESYNC_CLIENT_ID";
/// Environment variable overriding `drive.client_secret`
pub const ENV_CLIENT_SECRET: &str = "DRIVESYNC_CLIENT_SECRET";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DriveSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub drive: DriveConfig,
    pub storage: StorageConfig,
    pub checkpoint: CheckpointConfig,
    pub sync: SyncConfig,
    pub rate_limiting: RateLimitingConfig,
    pub logging: LoggingConfig,
}

/// Google Drive API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 REST API.
    pub api_base_url: String,
    /// OAuth token endpoint used for the refresh-token grant.
    pub token_url: String,
    /// OAuth client ID. `None` until configured.
    pub client_id: Option<String>,
    /// OAuth client secret. `None` until configured.
    pub client_secret: Option<String>,
    /// Number of change records requested per page.
    pub page_size: u32,
}

/// Object storage (sink) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Sink backend: `directory` or `http`.
    pub backend: String,
    /// First key component(s) of every object.
    pub prefix: String,
    /// Root of the mirror when `backend` is `directory`.
    pub directory: PathBuf,
    /// Object storage endpoint when `backend` is `http`.
    pub endpoint: Option<String>,
    /// Bucket name appended to the endpoint.
    pub bucket: String,
    /// Prefix of the HTTP headers carrying object metadata.
    pub metadata_header_prefix: String,
}

/// Checkpoint persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Store backend: `sqlite` or `file`.
    pub backend: String,
    /// Checkpoint identity (one row per name in the SQLite store).
    pub name: String,
    /// SQLite database path.
    pub database: PathBuf,
    /// JSON state file path.
    pub file: PathBuf,
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Label used for the account root in object keys.
    pub root_label: String,
    /// Maximum folder ancestry depth before falling back to the root.
    pub max_path_depth: usize,
    /// Retries for transient content and sink failures.
    pub max_retries: u32,
    /// Base delay of the exponential backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
}

/// Drive API rate-limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    pub changes_requests_per_minute: u32,
    pub metadata_requests_per_minute: u32,
    pub content_requests_per_minute: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivesync")
            .join("config.yaml")
    }

    /// Apply `DRIVESYNC_CLIENT_ID` / `DRIVESYNC_CLIENT_SECRET` overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var(ENV_CLIENT_ID) {
            if !id.trim().is_empty() {
                self.drive.client_id = Some(id);
            }
        }
        if let Ok(secret) = std::env::var(ENV_CLIENT_SECRET) {
            if !secret.trim().is_empty() {
                self.drive.client_secret = Some(secret);
            }
        }
    }

    /// Settings consumed by the reconciliation loop.
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            key_prefix: self.storage.prefix.clone(),
            root_label: self.sync.root_label.clone(),
            max_path_depth: self.sync.max_path_depth,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("drivesync")
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            client_id: None,
            client_secret: None,
            page_size: 100,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "directory".to_string(),
            prefix: "drivesync".to_string(),
            directory: data_dir().join("mirror"),
            endpoint: None,
            bucket: "google-drivesync-backup".to_string(),
            metadata_header_prefix: "x-amz-meta-".to_string(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        let dir = data_dir();
        Self {
            backend: "sqlite".to_string(),
            name: "default".to_string(),
            database: dir.join("state.db"),
            file: dir.join("start_page_token.json"),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_label: "My Drive".to_string(),
            max_path_depth: 100,
            max_retries: 5,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            changes_requests_per_minute: 60,
            metadata_requests_per_minute: 600,
            content_requests_per_minute: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error with the offending field path and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. `sync.max_path_depth`).
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Valid values for `storage.backend`.
const VALID_STORAGE_BACKENDS: &[&str] = &["directory", "http"];

/// Valid values for `checkpoint.backend`.
const VALID_CHECKPOINT_BACKENDS: &[&str] = &["sqlite", "file"];

fn one_of(errors: &mut Vec<ValidationError>, field: &str, value: &str, valid: &[&str]) {
    if !valid.contains(&value) {
        errors.push(ValidationError {
            field: field.into(),
            message: format!(
                "invalid value '{}'; valid options: {}",
                value,
                valid.join(", ")
            ),
        });
    }
}

fn positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

fn http_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        errors.push(ValidationError {
            field: field.into(),
            message: format!("must be an http(s) URL: {value}"),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- drive ---
        http_url(&mut errors, "drive.api_base_url", &self.drive.api_base_url);
        http_url(&mut errors, "drive.token_url", &self.drive.token_url);
        if self.drive.page_size == 0 || self.drive.page_size > 1000 {
            errors.push(ValidationError {
                field: "drive.page_size".into(),
                message: "must be in range 1..=1000".into(),
            });
        }

        // --- storage ---
        one_of(
            &mut errors,
            "storage.backend",
            &self.storage.backend,
            VALID_STORAGE_BACKENDS,
        );
        if self.storage.backend == "http" {
            match &self.storage.endpoint {
                Some(endpoint) => http_url(&mut errors, "storage.endpoint", endpoint),
                None => errors.push(ValidationError {
                    field: "storage.endpoint".into(),
                    message: "required when storage.backend is 'http'".into(),
                }),
            }
            if self.storage.bucket.trim().is_empty() || self.storage.bucket.contains('/') {
                errors.push(ValidationError {
                    field: "storage.bucket".into(),
                    message: "must be a non-empty name without '/'".into(),
                });
            }
        }
        if self.storage.prefix.split('/').any(|p| p == "..") {
            errors.push(ValidationError {
                field: "storage.prefix".into(),
                message: "must not contain '..' components".into(),
            });
        }

        // --- checkpoint ---
        one_of(
            &mut errors,
            "checkpoint.backend",
            &self.checkpoint.backend,
            VALID_CHECKPOINT_BACKENDS,
        );
        if self.checkpoint.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "checkpoint.name".into(),
                message: "must not be empty".into(),
            });
        }

        // --- sync ---
        if self.sync.root_label.trim().is_empty() {
            errors.push(ValidationError {
                field: "sync.root_label".into(),
                message: "must not be empty".into(),
            });
        }
        positive(
            &mut errors,
            "sync.max_path_depth",
            self.sync.max_path_depth as u64,
        );
        if self.sync.max_retries > 10 {
            errors.push(ValidationError {
                field: "sync.max_retries".into(),
                message: "must be in range 0..=10".into(),
            });
        }

        // --- rate_limiting ---
        positive(
            &mut errors,
            "rate_limiting.changes_requests_per_minute",
            self.rate_limiting.changes_requests_per_minute.into(),
        );
        positive(
            &mut errors,
            "rate_limiting.metadata_requests_per_minute",
            self.rate_limiting.metadata_requests_per_minute.into(),
        );
        positive(
            &mut errors,
            "rate_limiting.content_requests_per_minute",
            self.rate_limiting.content_requests_per_minute.into(),
        );

        // --- logging ---
        one_of(
            &mut errors,
            "logging.level",
            &self.logging.level,
            VALID_LOG_LEVELS,
        );
        one_of(
            &mut errors,
            "logging.format",
            &self.logging.format,
            VALID_LOG_FORMATS,
        );

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivesync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .storage_prefix("backup")
///     .sync_root_label("Drive")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- drive ---

    pub fn drive_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.api_base_url = url.into();
        self
    }

    pub fn drive_token_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.token_url = url.into();
        self
    }

    pub fn drive_client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.drive.client_id = Some(id.into());
        self.config.drive.client_secret = Some(secret.into());
        self
    }

    pub fn drive_page_size(mut self, n: u32) -> Self {
        self.config.drive.page_size = n;
        self
    }

    // --- storage ---

    pub fn storage_directory(mut self, dir: PathBuf) -> Self {
        self.config.storage.backend = "directory".to_string();
        self.config.storage.directory = dir;
        self
    }

    pub fn storage_http(mut self, endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        self.config.storage.backend = "http".to_string();
        self.config.storage.endpoint = Some(endpoint.into());
        self.config.storage.bucket = bucket.into();
        self
    }

    pub fn storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.storage.prefix = prefix.into();
        self
    }

    // --- checkpoint ---

    pub fn checkpoint_sqlite(mut self, database: PathBuf) -> Self {
        self.config.checkpoint.backend = "sqlite".to_string();
        self.config.checkpoint.database = database;
        self
    }

    pub fn checkpoint_file(mut self, file: PathBuf) -> Self {
        self.config.checkpoint.backend = "file".to_string();
        self.config.checkpoint.file = file;
        self
    }

    pub fn checkpoint_name(mut self, name: impl Into<String>) -> Self {
        self.config.checkpoint.name = name.into();
        self
    }

    // --- sync ---

    pub fn sync_root_label(mut self, label: impl Into<String>) -> Self {
        self.config.sync.root_label = label.into();
        self
    }

    pub fn sync_max_path_depth(mut self, depth: usize) -> Self {
        self.config.sync.max_path_depth = depth;
        self
    }

    pub fn sync_retries(mut self, max_retries: u32, base_delay_ms: u64) -> Self {
        self.config.sync.max_retries = max_retries;
        self.config.sync.retry_base_delay_ms = base_delay_ms;
        self
    }

    // --- rate_limiting ---

    pub fn rate_limiting_changes_requests_per_minute(mut self, n: u32) -> Self {
        self.config.rate_limiting.changes_requests_per_minute = n;
        self
    }

    pub fn rate_limiting_metadata_requests_per_minute(mut self, n: u32) -> Self {
        self.config.rate_limiting.metadata_requests_per_minute = n;
        self
    }

    pub fn rate_limiting_content_requests_per_minute(mut self, n: u32) -> Self {
        self.config.rate_limiting.content_requests_per_minute = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    /// Consume the builder and return the final [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
