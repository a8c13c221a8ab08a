//! Payload hashing for signed uploads.
//!
//! The `x-amz-content-sha256` header carries either the hex SHA-256 of the
//! body or the literal `UNSIGNED-PAYLOAD`. Seekable bodies are digested in
//! bounded chunks with [`digest_seekable`], which rewinds the source so the
//! same bytes can be read again for the transfer. One-shot streams cannot be
//! read twice and are sent with [`PayloadHash::Unsigned`]; their integrity is
//! then not covered by the signature.

use std::fmt;
use std::io::SeekFrom;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::debug;

use crate::error::DigestError;

/// Size of each read while digesting a seekable payload.
pub const DIGEST_CHUNK_SIZE: usize = 4096;

/// Sentinel sent in place of a digest for bodies that cannot be re-read.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// The value of the `x-amz-content-sha256` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadHash {
    /// Hex-encoded SHA-256 of the full body.
    Sha256(String),
    /// The body is not covered by the signature.
    Unsigned,
}

impl PayloadHash {
    /// The header value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sha256(hex) => hex,
            Self::Unsigned => UNSIGNED_PAYLOAD,
        }
    }

    /// Whether the payload bytes are covered by the signature.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Sha256(_))
    }
}

impl fmt::Display for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digest a seekable source from its start and rewind it afterwards.
///
/// When `expected_len` is given, the number of bytes read must match it.
///
/// # Errors
///
/// Returns [`DigestError::Io`] if reading or seeking fails,
/// [`DigestError::ChunkOverrun`] if a read reports more bytes than requested,
/// and [`DigestError::LengthMismatch`] if the source length differs from
/// `expected_len`.
///
/// # Examples
///
/// ```
/// # tokio_test::block_on(async {
/// use std::io::Cursor;
/// use vidhost_auth::payload::digest_seekable;
///
/// let mut source = Cursor::new(b"hello".to_vec());
/// let digest = digest_seekable(&mut source, Some(5)).await.unwrap();
/// assert_eq!(
///     digest,
///     "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
/// );
/// assert_eq!(source.position(), 0);
/// # });
/// ```
pub async fn digest_seekable<R>(
    source: &mut R,
    expected_len: Option<u64>,
) -> Result<String, DigestError>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    source.seek(SeekFrom::Start(0)).await?;

    let mut hasher = Sha256::new();
    let mut chunk = [0_u8; DIGEST_CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let read = source.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        if read > DIGEST_CHUNK_SIZE {
            return Err(DigestError::ChunkOverrun {
                read,
                limit: DIGEST_CHUNK_SIZE,
            });
        }
        hasher.update(&chunk[..read]);
        total += read as u64;
    }

    source.seek(SeekFrom::Start(0)).await?;

    if let Some(expected) = expected_len {
        if total != expected {
            return Err(DigestError::LengthMismatch {
                expected,
                actual: total,
            });
        }
    }

    let digest = hex::encode(hasher.finalize());
    debug!(bytes = total, digest, "Digested seekable payload");
    Ok(digest)
}

/// Compute the SHA-256 hash of an in-memory payload as a hex string.
///
/// # Examples
///
/// ```
/// use vidhost_auth::payload::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
