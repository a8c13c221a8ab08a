//! Upload credential and identifier resolvers.
//!
//! Every backend needs something from the service before bytes can be sent:
//! Streamable mints temporary AWS credentials and an object key sized to the
//! payload, Streamff and Streamja hand out a short identifier, and Mixture
//! embeds a link id in its upload page. These calls sit behind traits so the
//! orchestrator can be driven with fakes and so page scraping stays outside
//! this crate.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use vidhost_auth::AwsCredentials;
use vidhost_core::{AwsRegion, Backend, StreamableConfig};

use crate::error::{StageFailure, UploadStage};
use crate::transport::{HttpTransport, TransportError, TransportRequest, TransportResponse};

/// Credentials for one signed upload attempt.
///
/// Never persisted or reused: the service issues a fresh object key and
/// credential set for every attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    /// Object key the credentials are scoped to; also the public identifier.
    pub object_key: String,
    /// Temporary AWS credentials.
    pub credentials: AwsCredentials,
    /// Token presented to the activation call.
    pub activation_token: String,
    /// Region of the target bucket.
    pub region: AwsRegion,
}

impl fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("object_key", &self.object_key)
            .field("credentials", &self.credentials)
            .field("activation_token", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Errors from a resolver call.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The request could not be sent or no response was read.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with a non-success status.
    #[error("service rejected the request with status {}", .0.status)]
    Rejected(TransportResponse),

    /// The service answered successfully but the body is unusable.
    #[error("malformed response: {reason}")]
    Malformed {
        /// What was wrong with the body.
        reason: String,
        /// The response as received.
        response: TransportResponse,
    },

    /// An external resolver failed for its own reasons.
    #[error("{0}")]
    Unavailable(String),
}

impl ResolveError {
    pub(crate) fn into_failure(self, backend: Backend, stage: UploadStage) -> StageFailure {
        match self {
            Self::Rejected(response) => {
                StageFailure::from_response(backend, stage, &response, "service rejected the request")
            }
            Self::Malformed { reason, response } => {
                StageFailure::from_response(backend, stage, &response, reason)
            }
            other => StageFailure::new(backend, stage, other.to_string()),
        }
    }
}

/// Obtains temporary credentials for a signed upload of `size` bytes.
#[async_trait]
pub trait CredentialResolver: Send + Sync + fmt::Debug {
    /// Resolve credentials; any failure is final for the attempt.
    async fn resolve(&self, size: u64) -> Result<UploadCredentials, ResolveError>;
}

/// Obtains the short identifier an unsigned backend keys its upload on.
#[async_trait]
pub trait IdentifierResolver: Send + Sync + fmt::Debug {
    /// Resolve a fresh identifier.
    async fn resolve(&self) -> Result<String, ResolveError>;
}

/// Answers whether an uploaded video is still being processed.
///
/// Implementations usually scrape the public page, which is out of scope for
/// this crate; callers plug their own in.
#[async_trait]
pub trait ProcessingProbe: Send + Sync + fmt::Debug {
    /// Whether the video is still processing.
    async fn is_processing(&self, backend: Backend, id: &str) -> Result<bool, ResolveError>;
}

#[derive(Deserialize)]
struct ShortcodeResponse {
    shortcode: String,
    credentials: AwsCredentials,
    transcoder_options: TranscoderOptions,
}

#[derive(Deserialize)]
struct TranscoderOptions {
    token: String,
}

/// Streamable shortcode endpoint: `GET {api}/shortcode?version=..&size=..`.
#[derive(Debug, Clone)]
pub struct StreamableResolver {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    client_version: String,
    region: AwsRegion,
}

impl StreamableResolver {
    /// Create a resolver from the Streamable configuration.
    pub fn new(transport: Arc<dyn HttpTransport>, config: &StreamableConfig) -> Self {
        Self {
            transport,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            client_version: config.client_version.clone(),
            region: config.region.clone(),
        }
    }

    /// Override the bucket region for credentials this resolver returns.
    #[must_use]
    pub fn with_region(mut self, region: AwsRegion) -> Self {
        self.region = region;
        self
    }
}

#[async_trait]
impl CredentialResolver for StreamableResolver {
    async fn resolve(&self, size: u64) -> Result<UploadCredentials, ResolveError> {
        let size = size.to_string();
        let mut query = Vec::with_capacity(2);
        if !self.client_version.is_empty() {
            query.push(("version", self.client_version.as_str()));
        }
        query.push(("size", size.as_str()));

        let request = TransportRequest::get(format!("{}/shortcode", self.api_url)).query(&query);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ResolveError::Rejected(response));
        }

        let parsed: ShortcodeResponse = match response.json() {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(ResolveError::Malformed {
                    reason: e.to_string(),
                    response,
                });
            }
        };

        let missing = [
            ("shortcode", parsed.shortcode.is_empty()),
            ("accessKeyId", parsed.credentials.access_key_id.is_empty()),
            ("secretAccessKey", parsed.credentials.secret_access_key.is_empty()),
            ("sessionToken", parsed.credentials.session_token.is_empty()),
        ]
        .into_iter()
        .find_map(|(field, empty)| empty.then_some(field));
        if let Some(field) = missing {
            return Err(ResolveError::Malformed {
                reason: format!("empty {field}"),
                response,
            });
        }

        debug!(shortcode = %parsed.shortcode, region = %self.region, "Resolved Streamable upload credentials");
        Ok(UploadCredentials {
            object_key: parsed.shortcode,
            credentials: parsed.credentials,
            activation_token: parsed.transcoder_options.token,
            region: self.region.clone(),
        })
    }
}

/// Streamff link endpoint: `POST {site}/api/videos/generate-link`, plain-text id.
#[derive(Debug, Clone)]
pub struct StreamffLinkResolver {
    transport: Arc<dyn HttpTransport>,
    site_url: String,
}

impl StreamffLinkResolver {
    /// Create a resolver for the given site.
    pub fn new(transport: Arc<dyn HttpTransport>, site_url: &str) -> Self {
        Self {
            transport,
            site_url: site_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl IdentifierResolver for StreamffLinkResolver {
    async fn resolve(&self) -> Result<String, ResolveError> {
        let request =
            TransportRequest::post(format!("{}/api/videos/generate-link", self.site_url));
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ResolveError::Rejected(response));
        }

        let id = response.text().trim().to_owned();
        if id.is_empty() {
            return Err(ResolveError::Malformed {
                reason: "empty link id".to_owned(),
                response,
            });
        }
        Ok(id)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortIdResponse {
    short_id: Option<String>,
    error: Option<serde_json::Value>,
}

/// Streamja short id endpoint: form `POST {site}/shortId.php` with `new=1`.
#[derive(Debug, Clone)]
pub struct StreamjaShortIdResolver {
    transport: Arc<dyn HttpTransport>,
    site_url: String,
}

impl StreamjaShortIdResolver {
    /// Create a resolver for the given site.
    pub fn new(transport: Arc<dyn HttpTransport>, site_url: &str) -> Self {
        Self {
            transport,
            site_url: site_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl IdentifierResolver for StreamjaShortIdResolver {
    async fn resolve(&self) -> Result<String, ResolveError> {
        let request = TransportRequest::post(format!("{}/shortId.php", self.site_url))
            .form(&[("new", "1")]);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ResolveError::Rejected(response));
        }

        let parsed: ShortIdResponse = match response.json() {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(ResolveError::Malformed {
                    reason: e.to_string(),
                    response,
                });
            }
        };

        match (parsed.error, parsed.short_id) {
            (Some(error), _) => Err(ResolveError::Malformed {
                reason: format!("service error: {error}"),
                response,
            }),
            (None, Some(id)) if !id.is_empty() => Ok(id),
            (None, _) => Err(ResolveError::Malformed {
                reason: "missing shortId".to_owned(),
                response,
            }),
        }
    }
}
