//! Credential provider port
//!
//! The core treats credential acquisition as opaque: it only asks for a
//! bearer token and aborts the run if none can be produced.

use chrono::{DateTime, Utc};

/// Bearer credential for the source account
#[derive(Clone)]
pub struct Credential {
    /// Token sent in the `Authorization: Bearer` header
    pub access_token: String,
    /// When the token expires, if known
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Credential without a known expiry
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Returns true if the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if the token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        self.expires_at
            .is_some_and(|at| Utc::now() + duration >= at)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer credentials
#[async_trait::async_trait]
pub trait ICredentialProvider: Send + Sync {
    /// Returns a currently valid credential
    ///
    /// Implementations may refresh and cache tokens internally.
    async fn get_credential(&self) -> anyhow::Result<Credential>;
}
