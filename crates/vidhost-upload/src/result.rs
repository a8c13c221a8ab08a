//! Terminal record of a completed upload.

use serde::Serialize;
use vidhost_core::{Backend, BackendProfile};

/// A completed upload: the stable identifier and the URLs derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// The backend that stored the video.
    pub backend: Backend,
    /// Stable identifier assigned by the backend.
    pub id: String,
    /// Public page URL.
    pub url: String,
    /// Embeddable player URL, where the backend publishes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
}

impl UploadResult {
    /// Derive the result for `id` from the backend's URL templates.
    pub fn new(profile: &BackendProfile, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            backend: profile.backend,
            url: profile.public_url(&id),
            embed_url: profile.embed_url(&id),
            id,
        }
    }
}
