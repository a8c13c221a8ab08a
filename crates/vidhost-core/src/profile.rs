//! Per-backend upload rules and public URL derivation.
//!
//! A [`BackendProfile`] is resolved from the [`ClientConfig`](crate::ClientConfig)
//! and answers two questions: is this request acceptable for the backend
//! (checked before any network call), and what public URL does a stable
//! identifier map to.

use std::path::Path;

use crate::error::ValidationError;
use crate::types::Backend;

/// Upload rules and URL templates for one backend.
///
/// # Examples
///
/// ```
/// use vidhost_core::{Backend, ClientConfig};
///
/// let profile = ClientConfig::default().profile(Backend::Streamable);
/// assert!(profile.validate("movie.mp4", 10).is_ok());
/// assert!(profile.validate("movie.avi", 10).is_err());
/// assert_eq!(profile.public_url("abc123"), "https://streamable.com/abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    /// The backend these rules apply to.
    pub backend: Backend,
    /// Public site URL, without a trailing slash.
    pub site_url: String,
    /// Maximum accepted payload size in bytes.
    pub max_size: u64,
}

impl BackendProfile {
    /// Check a filename and declared size against the backend's rules.
    ///
    /// Extensions are compared case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first violated rule.
    pub fn validate(&self, filename: &str, size: u64) -> Result<(), ValidationError> {
        if filename.is_empty() {
            return Err(ValidationError::EmptyFilename);
        }

        let accepted = self.backend.accepted_extensions();
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let supported = extension
            .as_deref()
            .is_some_and(|ext| accepted.contains(&ext));
        if !supported {
            return Err(ValidationError::UnsupportedExtension {
                filename: filename.to_owned(),
                accepted: accepted.join(", "),
            });
        }

        if size == 0 {
            return Err(ValidationError::EmptyPayload {
                filename: filename.to_owned(),
            });
        }

        if size > self.max_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_size,
            });
        }

        Ok(())
    }

    /// Public page URL for a stable identifier.
    #[must_use]
    pub fn public_url(&self, id: &str) -> String {
        render(self.backend.url_template(), &self.site_url, id)
    }

    /// Embeddable player URL for a stable identifier, if the backend has one.
    #[must_use]
    pub fn embed_url(&self, id: &str) -> Option<String> {
        self.backend
            .embed_url_template()
            .map(|template| render(template, &self.site_url, id))
    }
}

fn render(template: &str, site: &str, id: &str) -> String {
    template
        .replace("{site}", site.trim_end_matches('/'))
        .replace("{id}", id)
}
