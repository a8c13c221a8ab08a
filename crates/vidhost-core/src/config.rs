//! Client configuration.
//!
//! Provides [`ClientConfig`], which holds the user agent and the endpoints of
//! every backend. All values default to the public services and can be
//! overridden from environment variables via [`ClientConfig::from_env`], which
//! is how tests and mirrors point the client somewhere else.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::MIB;
use crate::profile::BackendProfile;
use crate::types::{AwsRegion, Backend};

/// Endpoints and limits of the signed (Streamable) backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamableConfig {
    /// Public site URL.
    pub site_url: String,
    /// JSON API URL (credential, metadata and transcode calls).
    pub api_url: String,
    /// Object storage bucket URL the signed PUT goes to.
    pub bucket_url: String,
    /// Region of the bucket, part of the credential scope.
    pub region: AwsRegion,
    /// Web client version sent with credential requests; omitted when empty.
    pub client_version: String,
    /// Maximum payload size in bytes.
    pub max_size: u64,
}

impl Default for StreamableConfig {
    fn default() -> Self {
        Self {
            site_url: "https://streamable.com".to_owned(),
            api_url: "https://ajax.streamable.com".to_owned(),
            bucket_url: "https://streamables-upload.s3.amazonaws.com".to_owned(),
            region: AwsRegion::default(),
            client_version: String::new(),
            max_size: 250 * MIB,
        }
    }
}

/// Endpoints and limits of a form-upload backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendEndpoint {
    /// Public site URL.
    pub site_url: String,
    /// API URL; equal to the site URL for backends without a separate API host.
    pub api_url: String,
    /// Maximum payload size in bytes.
    pub max_size: u64,
}

impl BackendEndpoint {
    fn new(site_url: &str, api_url: &str, max_size: u64) -> Self {
        Self {
            site_url: site_url.to_owned(),
            api_url: api_url.to_owned(),
            max_size,
        }
    }

    /// Default JustStreamLive endpoints.
    #[must_use]
    pub fn juststreamlive() -> Self {
        Self::new(
            "https://juststream.live",
            "https://api.juststream.live",
            200 * MIB,
        )
    }

    /// Default Mixture endpoints.
    #[must_use]
    pub fn mixture() -> Self {
        Self::new("https://mixture.gg", "https://mixture.gg", 512 * MIB)
    }

    /// Default Streamff endpoints.
    #[must_use]
    pub fn streamff() -> Self {
        Self::new("https://streamff.com", "https://streamff.com", 200 * MIB)
    }

    /// Default Streamja endpoints.
    #[must_use]
    pub fn streamja() -> Self {
        Self::new("https://streamja.com", "https://streamja.com", 30 * MIB)
    }
}

/// Global configuration for the vidhost client.
///
/// # Examples
///
/// ```
/// use vidhost_core::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert!(config.user_agent.starts_with("vidhost/"));
/// assert_eq!(config.streamable.region.as_str(), "us-east-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// User agent sent with every request.
    #[builder(default = default_user_agent())]
    pub user_agent: String,

    /// Streamable endpoints.
    #[builder(default)]
    pub streamable: StreamableConfig,

    /// JustStreamLive endpoints.
    #[builder(default = BackendEndpoint::juststreamlive())]
    pub juststreamlive: BackendEndpoint,

    /// Mixture endpoints.
    #[builder(default = BackendEndpoint::mixture())]
    pub mixture: BackendEndpoint,

    /// Streamff endpoints.
    #[builder(default = BackendEndpoint::streamff())]
    pub streamff: BackendEndpoint,

    /// Streamja endpoints.
    #[builder(default = BackendEndpoint::streamja())]
    pub streamja: BackendEndpoint,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            streamable: StreamableConfig::default(),
            juststreamlive: BackendEndpoint::juststreamlive(),
            mixture: BackendEndpoint::mixture(),
            streamff: BackendEndpoint::streamff(),
            streamja: BackendEndpoint::streamja(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VIDHOST_USER_AGENT` | `vidhost/<version>` |
    /// | `VIDHOST_STREAMABLE_URL` | `https://streamable.com` |
    /// | `VIDHOST_STREAMABLE_API_URL` | `https://ajax.streamable.com` |
    /// | `VIDHOST_STREAMABLE_BUCKET_URL` | `https://streamables-upload.s3.amazonaws.com` |
    /// | `VIDHOST_STREAMABLE_REGION` | `us-east-1` |
    /// | `VIDHOST_STREAMABLE_CLIENT_VERSION` | *(empty)* |
    /// | `VIDHOST_JUSTSTREAMLIVE_URL` | `https://juststream.live` |
    /// | `VIDHOST_JUSTSTREAMLIVE_API_URL` | `https://api.juststream.live` |
    /// | `VIDHOST_MIXTURE_URL` | `https://mixture.gg` |
    /// | `VIDHOST_STREAMFF_URL` | `https://streamff.com` |
    /// | `VIDHOST_STREAMJA_URL` | `https://streamja.com` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("VIDHOST_USER_AGENT") {
            config.user_agent = v;
        }
        if let Some(v) = lookup("VIDHOST_STREAMABLE_URL") {
            config.streamable.site_url = v;
        }
        if let Some(v) = lookup("VIDHOST_STREAMABLE_API_URL") {
            config.streamable.api_url = v;
        }
        if let Some(v) = lookup("VIDHOST_STREAMABLE_BUCKET_URL") {
            config.streamable.bucket_url = v;
        }
        if let Some(v) = lookup("VIDHOST_STREAMABLE_REGION") {
            config.streamable.region = AwsRegion::new(v);
        }
        if let Some(v) = lookup("VIDHOST_STREAMABLE_CLIENT_VERSION") {
            config.streamable.client_version = v;
        }
        if let Some(v) = lookup("VIDHOST_JUSTSTREAMLIVE_URL") {
            config.juststreamlive.site_url = v;
        }
        if let Some(v) = lookup("VIDHOST_JUSTSTREAMLIVE_API_URL") {
            config.juststreamlive.api_url = v;
        }
        if let Some(v) = lookup("VIDHOST_MIXTURE_URL") {
            config.mixture.api_url.clone_from(&v);
            config.mixture.site_url = v;
        }
        if let Some(v) = lookup("VIDHOST_STREAMFF_URL") {
            config.streamff.api_url.clone_from(&v);
            config.streamff.site_url = v;
        }
        if let Some(v) = lookup("VIDHOST_STREAMJA_URL") {
            config.streamja.api_url.clone_from(&v);
            config.streamja.site_url = v;
        }

        config
    }

    /// Endpoints of a form-upload backend.
    ///
    /// Returns `None` for the signed backend, whose endpoints live in
    /// [`ClientConfig::streamable`].
    #[must_use]
    pub fn endpoint(&self, backend: Backend) -> Option<&BackendEndpoint> {
        match backend {
            Backend::Streamable => None,
            Backend::JustStreamLive => Some(&self.juststreamlive),
            Backend::Mixture => Some(&self.mixture),
            Backend::Streamff => Some(&self.streamff),
            Backend::Streamja => Some(&self.streamja),
        }
    }

    /// Resolve the upload rules and URL templates for a backend.
    #[must_use]
    pub fn profile(&self, backend: Backend) -> BackendProfile {
        let (site_url, max_size) = match self.endpoint(backend) {
            Some(endpoint) => (endpoint.site_url.clone(), endpoint.max_size),
            None => (
                self.streamable.site_url.clone(),
                self.streamable.max_size,
            ),
        };

        BackendProfile {
            backend,
            site_url,
            max_size,
        }
    }
}

fn default_user_agent() -> String {
    format!("vidhost/{}", env!("CARGO_PKG_VERSION"))
}
