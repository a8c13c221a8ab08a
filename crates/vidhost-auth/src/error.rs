//! Error types for request signing and payload digests.

/// Errors that can occur while building or signing a SigV4 request.
///
/// Every variant is a contract violation by the caller; none depends on the
/// network, so they surface before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    /// The HTTP method is not one of the standard verbs.
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The header set lacks the `x-amz-content-sha256` entry.
    #[error("missing required header: x-amz-content-sha256")]
    MissingContentSha256,

    /// The secret access key is empty.
    #[error("secret access key must not be empty")]
    EmptySecret,

    /// The access key ID is empty.
    #[error("access key ID must not be empty")]
    EmptyAccessKey,

    /// The timestamp is not in `YYYYMMDDTHHMMSSZ` form.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Errors that can occur while digesting a seekable payload.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Reading or seeking the source failed.
    #[error("failed to read payload: {0}")]
    Io(#[from] std::io::Error),

    /// The source returned more bytes than the chunk it was asked for.
    #[error("source returned {read} bytes for a {limit} byte chunk")]
    ChunkOverrun {
        /// Bytes reported by the read.
        read: usize,
        /// The chunk size requested.
        limit: usize,
    },

    /// The source length differs from the declared payload size.
    #[error("payload is {actual} bytes but {expected} were declared")]
    LengthMismatch {
        /// The declared payload size.
        expected: u64,
        /// The bytes actually read.
        actual: u64,
    },
}
