//! Upload body sources.
//!
//! A body is either seekable, so it can be digested and then re-read for the
//! transfer, or a one-shot stream that can only be read once. The distinction
//! is made once, by the variant, and the signed flow branches on it exactly
//! once.

use std::fmt;
use std::io::{self, Cursor, SeekFrom};
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// A boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A body that supports seeking back to its start.
pub trait SeekableSource: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> SeekableSource for T where T: AsyncRead + AsyncSeek + Send + Unpin + ?Sized {}

/// The content of an upload.
pub enum ContentSource {
    /// Re-readable content, e.g. a file or an in-memory buffer.
    Seekable(Box<dyn SeekableSource>),
    /// One-shot content that is consumed by reading it.
    Stream(ByteStream),
}

impl ContentSource {
    /// Wrap an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Seekable(Box::new(Cursor::new(bytes.into())))
    }

    /// Wrap any seekable reader, such as a [`tokio::fs::File`].
    pub fn seekable(source: impl SeekableSource + 'static) -> Self {
        Self::Seekable(Box::new(source))
    }

    /// Wrap a one-shot stream of chunks.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(Box::pin(stream))
    }

    /// Whether the content can be read more than once.
    #[must_use]
    pub fn is_seekable(&self) -> bool {
        matches!(self, Self::Seekable(_))
    }

    /// Move a seekable source back to its first byte.
    ///
    /// One-shot streams are left untouched.
    pub async fn rewind(&mut self) -> io::Result<()> {
        if let Self::Seekable(reader) = self {
            reader.seek(SeekFrom::Start(0)).await?;
        }
        Ok(())
    }

    /// Turn the source into a chunk stream for the transport.
    ///
    /// Seekable sources are read from their current position; call
    /// [`ContentSource::rewind`] first to send the whole content.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        match self {
            Self::Seekable(reader) => Box::pin(ReaderStream::new(reader)),
            Self::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seekable(_) => f.write_str("ContentSource::Seekable"),
            Self::Stream(_) => f.write_str("ContentSource::Stream"),
        }
    }
}
