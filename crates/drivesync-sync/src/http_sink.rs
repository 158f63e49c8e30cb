//! Object storage sink over HTTP
//!
//! Each object is written with a single `PUT {endpoint}/{bucket}/{key}`.
//! Key components are percent-encoded individually, so `/` keeps its role as
//! the key separator. Metadata entries travel as one header each, named by
//! a configurable prefix (`x-amz-meta-` by default) followed by the entry
//! name.

use drivesync_core::{
    domain::StorageKey,
    ports::{IObjectSink, ObjectMetadata},
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::SinkError;

/// Default prefix of metadata headers
pub const DEFAULT_METADATA_HEADER_PREFIX: &str = "x-amz-meta-";

/// Maximum number of response body characters kept in a rejection
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Sink issuing HTTP `PUT` requests against an object store
#[derive(Clone)]
pub struct HttpObjectSink {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
    header_prefix: String,
    bearer_token: Option<String>,
}

impl HttpObjectSink {
    /// Creates a sink for `bucket` at `endpoint`
    ///
    /// # Errors
    /// Returns [`SinkError::InvalidConfig`] if the endpoint is not an
    /// absolute http(s) URL or the bucket name is empty or contains `/`.
    pub fn new(endpoint: &str, bucket: &str) -> Result<Self, SinkError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SinkError::InvalidConfig(format!("endpoint {endpoint}: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.cannot_be_a_base() {
            return Err(SinkError::InvalidConfig(format!(
                "endpoint must be an http(s) URL: {endpoint}"
            )));
        }
        if bucket.is_empty() || bucket.contains('/') {
            return Err(SinkError::InvalidConfig(format!(
                "bucket must be a non-empty name without '/': {bucket:?}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            bucket: bucket.to_string(),
            header_prefix: DEFAULT_METADATA_HEADER_PREFIX.to_string(),
            bearer_token: None,
        })
    }

    pub fn with_metadata_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.header_prefix = prefix.into().to_ascii_lowercase();
        self
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// URL an object with `key` is written to
    pub fn object_url(&self, key: &StorageKey) -> Result<Url, SinkError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SinkError::InvalidConfig(format!("endpoint {} has no path", self.endpoint))
            })?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.components());
        Ok(url)
    }

    fn headers(
        &self,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<HeaderMap, SinkError> {
        let invalid = |name: &str, reason: String| SinkError::InvalidMetadata {
            name: name.to_string(),
            reason,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type)
                .map_err(|e| invalid("Content-Type", e.to_string()))?,
        );
        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| invalid("Authorization", e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in metadata.iter() {
            let full_name = format!("{}{}", self.header_prefix, name).to_ascii_lowercase();
            let header_name = HeaderName::from_bytes(full_name.as_bytes())
                .map_err(|e| invalid(name, e.to_string()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| invalid(name, e.to_string()))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

impl std::fmt::Debug for HttpObjectSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectSink")
            .field("endpoint", &self.endpoint.as_str())
            .field("bucket", &self.bucket)
            .field("header_prefix", &self.header_prefix)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait::async_trait]
impl IObjectSink for HttpObjectSink {
    #[instrument(skip(self, body, metadata), fields(key = %key, bytes = body.len()))]
    async fn put_object(
        &self,
        key: &StorageKey,
        body: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> anyhow::Result<()> {
        let url = self.object_url(key)?;
        let headers = self.headers(content_type, metadata)?;

        let response = self
            .client
            .put(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(SinkError::from)?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "object stored");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
        warn!(status = status.as_u16(), "object store rejected write");
        Err(SinkError::Rejected {
            key: key.to_string(),
            status: status.as_u16(),
            message,
        }
        .into())
    }
}
