//! Error types for the vidhost core.

/// Reasons an upload request is rejected before any network call.
///
/// These are always recoverable by the caller fixing its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The filename is empty.
    #[error("filename must not be empty")]
    EmptyFilename,

    /// The declared payload size is zero.
    #[error("{filename}: payload must not be empty")]
    EmptyPayload {
        /// The offending filename.
        filename: String,
    },

    /// The filename extension is not accepted by the backend.
    #[error("{filename}: unsupported file type (accepted: {accepted})")]
    UnsupportedExtension {
        /// The offending filename.
        filename: String,
        /// Comma-separated list of accepted extensions.
        accepted: String,
    },

    /// The declared payload size exceeds the backend ceiling.
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// The declared payload size.
        size: u64,
        /// The backend ceiling.
        max: u64,
    },
}

/// Core error type for vidhost infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Unknown backend name.
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
}
