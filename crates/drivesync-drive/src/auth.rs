//! Credential providers for the Drive API
//!
//! ## Components
//!
//! - [`StaticTokenProvider`] - A fixed, pre-issued bearer token
//! - [`RefreshTokenProvider`] - OAuth2 refresh-token grant with an in-memory
//!   access token cache
//! - [`KeyringSecretStorage`] - Refresh token storage in the system keyring
//!
//! Obtaining the refresh token in the first place (browser consent) happens
//! outside this crate; `drivesync auth store` saves one to the keyring.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use drivesync_core::ports::{Credential, ICredentialProvider};
use oauth2::{
    basic::BasicClient, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken,
    TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default Google OAuth2 token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Keyring service name for stored secrets
const KEYRING_SERVICE: &str = "drivesync";

/// Cached tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// ============================================================================
// StaticTokenProvider
// ============================================================================

/// Provider returning the same bearer token on every call
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl ICredentialProvider for StaticTokenProvider {
    async fn get_credential(&self) -> Result<Credential> {
        if self.token.trim().is_empty() {
            anyhow::bail!("Static access token is empty");
        }
        Ok(Credential::bearer(self.token.clone()))
    }
}

// ============================================================================
// RefreshTokenProvider
// ============================================================================

/// OAuth client registration used for the refresh-token grant
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl OAuthClientConfig {
    /// Creates a config for Google's token endpoint
    pub fn new(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

type TokenClient = BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

struct TokenState {
    refresh_token: String,
    cached: Option<Credential>,
}

/// Exchanges a long-lived refresh token for short-lived access tokens
///
/// The access token is cached and reused until it is within a minute of
/// expiry. Concurrent callers wait on the same refresh.
pub struct RefreshTokenProvider {
    client: TokenClient,
    http: reqwest::Client,
    state: Mutex<TokenState>,
}

impl RefreshTokenProvider {
    /// Creates a provider
    ///
    /// # Errors
    /// Returns an error if the token URL is invalid or the refresh token is empty.
    pub fn new(config: &OAuthClientConfig, refresh_token: impl Into<String>) -> Result<Self> {
        let refresh_token = refresh_token.into();
        if refresh_token.trim().is_empty() {
            anyhow::bail!("Refresh token is empty");
        }

        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?);
        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client for token requests")?;

        Ok(Self {
            client,
            http,
            state: Mutex::new(TokenState {
                refresh_token,
                cached: None,
            }),
        })
    }

    async fn refresh(&self, state: &mut TokenState) -> Result<Credential> {
        info!("Refreshing access token");

        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(state.refresh_token.clone()))
            .request_async(&self.http)
            .await
            .context("Failed to refresh access token")?;

        let lifetime = response
            .expires_in()
            .and_then(|d| i64::try_from(d.as_secs()).ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        if let Some(rotated) = response.refresh_token() {
            debug!("Token endpoint rotated the refresh token");
            state.refresh_token = rotated.secret().to_string();
        }

        Ok(Credential {
            access_token: response.access_token().secret().to_string(),
            expires_at: Some(Utc::now() + Duration::seconds(lifetime)),
        })
    }
}

#[async_trait]
impl ICredentialProvider for RefreshTokenProvider {
    async fn get_credential(&self) -> Result<Credential> {
        let mut state = self.state.lock().await;

        if let Some(cached) = &state.cached {
            if !cached.expires_within(Duration::seconds(REFRESH_MARGIN_SECS)) {
                return Ok(cached.clone());
            }
            debug!("Cached access token near expiry");
        }

        let credential = self.refresh(&mut state).await?;
        state.cached = Some(credential.clone());
        Ok(credential)
    }
}

// ============================================================================
// KeyringSecretStorage
// ============================================================================

/// Stores the refresh token in the OS credential store
///
/// Entries live under the service name `drivesync` with the configured
/// account name as the keyring username.
pub struct KeyringSecretStorage;

impl KeyringSecretStorage {
    /// Store `secret` for `account`, replacing any existing value
    pub fn store(account: &str, secret: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(secret)
            .context("Failed to store secret in keyring")?;
        debug!(account, "Stored secret in keyring");
        Ok(())
    }

    /// Load the secret for `account`, `None` if nothing is stored
    pub fn load(account: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;
        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!(account, "No secret found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Remove the secret for `account`; missing entries are not an error
    pub fn clear(account: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, account)
            .context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) => {
                info!(account, "Cleared secret from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}
