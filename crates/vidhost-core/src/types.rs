//! Common type definitions shared across backends.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// AWS Region identifier used to scope signed uploads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AwsRegion(String);

impl AwsRegion {
    /// Region the signed backend's bucket lives in.
    pub const DEFAULT: &str = "us-east-1";

    /// Create a new region.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Get the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AwsRegion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for AwsRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A video hosting service this client can upload to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Streamable: direct-to-S3 upload signed with SigV4, then transcoded.
    Streamable,
    /// JustStreamLive: single multipart POST.
    JustStreamLive,
    /// Mixture: multipart POST keyed by a page-issued link id.
    Mixture,
    /// Streamff: multipart POST keyed by a generated link id.
    Streamff,
    /// Streamja: multipart POST keyed by a generated short id.
    Streamja,
}

impl Backend {
    /// All supported backends.
    pub const ALL: [Self; 5] = [
        Self::Streamable,
        Self::JustStreamLive,
        Self::Mixture,
        Self::Streamff,
        Self::Streamja,
    ];

    /// Return the lowercase name of the backend.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streamable => "streamable",
            Self::JustStreamLive => "juststreamlive",
            Self::Mixture => "mixture",
            Self::Streamff => "streamff",
            Self::Streamja => "streamja",
        }
    }

    /// File extensions (lowercase, without the dot) the backend accepts.
    #[must_use]
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Streamable | Self::JustStreamLive => &["mp4", "mkv"],
            Self::Mixture | Self::Streamff | Self::Streamja => &["mp4"],
        }
    }

    /// Template of the public page URL; `{site}` and `{id}` are substituted.
    #[must_use]
    pub fn url_template(&self) -> &'static str {
        match self {
            Self::Streamable | Self::JustStreamLive | Self::Streamja => "{site}/{id}",
            Self::Mixture | Self::Streamff => "{site}/v/{id}",
        }
    }

    /// Template of the embeddable player URL, for backends that publish one.
    #[must_use]
    pub fn embed_url_template(&self) -> Option<&'static str> {
        match self {
            Self::Streamja => Some("{site}/embed/{id}"),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownBackend(s.to_owned()))
    }
}
