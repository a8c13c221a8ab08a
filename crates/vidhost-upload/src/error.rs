//! Upload error taxonomy.

use std::fmt;

use http::StatusCode;
use vidhost_auth::SigningError;
use vidhost_core::{Backend, ValidationError};

use crate::transport::TransportResponse;

/// Upstream response bodies kept in errors are truncated to this many bytes.
pub const MAX_ERROR_BODY: usize = 1024;

/// Steps of one upload attempt, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UploadStage {
    /// Filename and size checked against the backend profile.
    Validated,
    /// Upload identifier or credentials obtained.
    CredentialsAcquired,
    /// Filename, size and title registered against the object key.
    MetadataRegistered,
    /// Payload bytes stored by the backend.
    Transferred,
    /// Backend-side processing triggered.
    Activated,
    /// The result has been returned.
    Complete,
}

impl UploadStage {
    /// Snake-case name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::CredentialsAcquired => "credentials_acquired",
            Self::MetadataRegistered => "metadata_registered",
            Self::Transferred => "transferred",
            Self::Activated => "activated",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how a network stage failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    /// The backend being uploaded to.
    pub backend: Backend,
    /// The stage that was being entered.
    pub stage: UploadStage,
    /// Upstream status, if a response was received.
    pub status: Option<StatusCode>,
    /// Upstream response body, truncated to [`MAX_ERROR_BODY`] bytes.
    pub body: String,
    /// Human-readable cause.
    pub message: String,
}

impl StageFailure {
    /// A failure without an upstream response.
    pub fn new(backend: Backend, stage: UploadStage, message: impl Into<String>) -> Self {
        Self {
            backend,
            stage,
            status: None,
            body: String::new(),
            message: message.into(),
        }
    }

    /// A failure caused by an upstream response.
    pub fn from_response(
        backend: Backend,
        stage: UploadStage,
        response: &TransportResponse,
        message: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            stage,
            status: Some(response.status),
            body: truncate_body(&response.body),
            message: message.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.backend, self.stage, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (status {status})")?;
        }
        Ok(())
    }
}

/// Errors surfaced by an upload attempt.
///
/// No variant is retried internally. A caller that wants to retry restarts
/// the whole attempt from validation with a fresh content read position.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The request was rejected before any network call.
    #[error("{backend}: invalid upload request: {source}")]
    Validation {
        /// The backend being uploaded to.
        backend: Backend,
        /// What was wrong with the request.
        #[source]
        source: ValidationError,
    },

    /// The identifier or credential call failed or returned malformed data.
    #[error("credential acquisition failed: {0}")]
    Credential(StageFailure),

    /// Metadata registration or the byte transfer failed.
    #[error("transfer failed: {0}")]
    Transfer(StageFailure),

    /// The bytes are stored but the activation call failed.
    #[error("activation failed: {0}")]
    Activation(StageFailure),

    /// The signed request could not be built from the given inputs.
    #[error("{backend}: failed to sign request: {source}")]
    Signing {
        /// The backend being uploaded to.
        backend: Backend,
        /// The signing contract violation.
        #[source]
        source: SigningError,
    },

    /// The caller cancelled the attempt while a stage was in flight.
    #[error("{backend}: upload cancelled at {stage}")]
    Cancelled {
        /// The backend being uploaded to.
        backend: Backend,
        /// The stage that was in flight.
        stage: UploadStage,
    },
}

impl UploadError {
    /// The backend the failed attempt targeted.
    #[must_use]
    pub fn backend(&self) -> Backend {
        match self {
            Self::Validation { backend, .. }
            | Self::Signing { backend, .. }
            | Self::Cancelled { backend, .. } => *backend,
            Self::Credential(failure) | Self::Transfer(failure) | Self::Activation(failure) => {
                failure.backend
            }
        }
    }

    /// The stage that was being entered when the attempt failed.
    #[must_use]
    pub fn stage(&self) -> UploadStage {
        match self {
            Self::Validation { .. } => UploadStage::Validated,
            Self::Signing { .. } => UploadStage::Transferred,
            Self::Cancelled { stage, .. } => *stage,
            Self::Credential(failure) | Self::Transfer(failure) | Self::Activation(failure) => {
                failure.stage
            }
        }
    }

    /// The upstream status, if the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Credential(failure) | Self::Transfer(failure) | Self::Activation(failure) => {
                failure.status
            }
            _ => None,
        }
    }
}

fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_ERROR_BODY {
        return text.into_owned();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_order_stages() {
        assert!(UploadStage::Validated < UploadStage::CredentialsAcquired);
        assert!(UploadStage::MetadataRegistered < UploadStage::Transferred);
        assert!(UploadStage::Activated < UploadStage::Complete);
        assert_eq!(UploadStage::MetadataRegistered.to_string(), "metadata_registered");
    }

    #[test]
    fn test_should_truncate_long_bodies_on_char_boundary() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let response = TransportResponse::new(StatusCode::FORBIDDEN, body);
        let failure = StageFailure::from_response(
            Backend::Streamable,
            UploadStage::Transferred,
            &response,
            "rejected",
        );
        assert_eq!(failure.body.len(), MAX_ERROR_BODY);
        assert_eq!(failure.status, Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_should_expose_context_of_network_failures() {
        let response = TransportResponse::new(StatusCode::FORBIDDEN, "SignatureDoesNotMatch");
        let error = UploadError::Transfer(StageFailure::from_response(
            Backend::Streamable,
            UploadStage::Transferred,
            &response,
            "signed upload rejected",
        ));

        assert_eq!(error.backend(), Backend::Streamable);
        assert_eq!(error.stage(), UploadStage::Transferred);
        assert_eq!(error.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(
            error.to_string(),
            "transfer failed: streamable at transferred: signed upload rejected (status 403 Forbidden)"
        );
    }

    #[test]
    fn test_should_report_validation_stage() {
        let error = UploadError::Validation {
            backend: Backend::Streamja,
            source: ValidationError::EmptyFilename,
        };
        assert_eq!(error.stage(), UploadStage::Validated);
        assert_eq!(error.status(), None);
    }
}
