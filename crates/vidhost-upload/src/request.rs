//! Caller-supplied upload requests.

use std::io;
use std::path::Path;

use crate::source::ContentSource;

/// One file to upload.
///
/// The orchestrator takes the request by value; once passed it is not
/// observable by the caller any more.
#[derive(Debug)]
pub struct UploadRequest {
    /// Original filename, used for validation and reported to the backend.
    pub filename: String,
    /// Declared payload size in bytes.
    pub size: u64,
    /// The bytes to upload.
    pub source: ContentSource,
    /// Optional title; backends that take one fall back to the filename stem.
    pub title: Option<String>,
}

impl UploadRequest {
    /// Create a request without a title.
    pub fn new(filename: impl Into<String>, size: u64, source: ContentSource) -> Self {
        Self {
            filename: filename.into(),
            size,
            source,
            title: None,
        }
    }

    /// Create a request for an in-memory payload; the size is the buffer length.
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<bytes::Bytes>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(filename, size, ContentSource::from_bytes(bytes))
    }

    /// Open a file and take its name and size from the filesystem.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("path has no UTF-8 file name: {}", path.display()),
                )
            })?
            .to_owned();

        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        Ok(Self::new(filename, size, ContentSource::seekable(file)))
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The title, or the filename without its extension.
    #[must_use]
    pub fn title_or_stem(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            Path::new(&self.filename)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(&self.filename)
                .to_owned()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_should_fall_back_to_filename_stem_for_title() {
        let request = UploadRequest::from_bytes("holiday clip.mp4", b"x".to_vec());
        assert_eq!(request.title_or_stem(), "holiday clip");
        assert_eq!(request.size, 1);

        let titled = request.with_title("Best of 2021");
        assert_eq!(titled.title_or_stem(), "Best of 2021");
    }

    #[tokio::test]
    async fn test_should_read_name_and_size_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[1_u8; 1234])
            .unwrap();

        let request = UploadRequest::from_path(&path).await.unwrap();
        assert_eq!(request.filename, "clip.mkv");
        assert_eq!(request.size, 1234);
        assert!(request.source.is_seekable());
    }

    #[tokio::test]
    async fn test_should_fail_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = UploadRequest::from_path(dir.path().join("missing.mp4")).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
