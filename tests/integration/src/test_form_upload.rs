//! Multipart uploads to the unsigned backends.

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use serde_json::json;
    use vidhost_core::Backend;
    use vidhost_upload::{IdentifierResolver, ResolveError, UploadError, UploadRequest};

    use crate::{mock_uploader, sample_payload, write_sample_file};

    #[derive(Debug)]
    struct FixedLinkId(&'static str);

    #[async_trait::async_trait]
    impl IdentifierResolver for FixedLinkId {
        async fn resolve(&self) -> Result<String, ResolveError> {
            Ok(self.0.to_owned())
        }
    }

    #[tokio::test]
    async fn test_should_stream_file_to_juststreamlive() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_sample_file(dir.path(), "match.mkv", 9000);

        let (mock, uploader) = mock_uploader();
        mock.respond_json(&json!({ "id": "jsl-9000" }));

        let result = uploader
            .upload_juststreamlive(UploadRequest::from_path(&path).await?)
            .await?;

        assert_eq!(result.backend, Backend::JustStreamLive);
        assert_eq!(result.url, "https://juststream.live/jsl-9000");
        let upload = &mock.requests()[0];
        assert_eq!(upload.method, Method::POST);
        assert_eq!(upload.declared_length, Some(9000));
        assert_eq!(upload.body.as_ref(), sample_payload(9000).as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn test_should_key_mixture_upload_on_resolved_link_id() -> anyhow::Result<()> {
        let (mock, uploader) = mock_uploader();
        mock.respond(StatusCode::OK, "<html>ok</html>");

        let request = UploadRequest::from_bytes("goal.mp4", sample_payload(128));
        let result = uploader
            .upload_mixture(request, &FixedLinkId("lnk-5"))
            .await?;

        assert_eq!(result.url, "https://mixture.gg/v/lnk-5");
        let upload = &mock.requests()[0];
        assert_eq!(upload.field("link_id"), Some("lnk-5"));
        assert_eq!(upload.file.as_ref().map(|f| f.filename.as_str()), Some("goal.mp4"));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_generate_link_then_upload_to_streamff() -> anyhow::Result<()> {
        let (mock, uploader) = mock_uploader();
        mock.respond(StatusCode::OK, "ff77").respond(StatusCode::OK, "");

        let result = uploader
            .upload_streamff(UploadRequest::from_bytes("save.mp4", sample_payload(32)))
            .await?;

        assert_eq!(result.url, "https://streamff.com/v/ff77");
        assert_eq!(mock.count_matching(&Method::POST, "/api/videos/generate-link"), 1);
        assert_eq!(mock.count_matching(&Method::POST, "/api/videos/upload/ff77"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_should_fail_streamja_upload_on_rejected_post() -> anyhow::Result<()> {
        let (mock, uploader) = mock_uploader();
        mock.respond_json(&json!({ "shortId": "sj1" }))
            .respond(StatusCode::PAYLOAD_TOO_LARGE, "too big");

        let error = uploader
            .upload_streamja(UploadRequest::from_bytes("clip.mp4", sample_payload(32)))
            .await
            .expect_err("upload should be rejected");

        assert!(matches!(error, UploadError::Transfer(_)));
        assert_eq!(error.status(), Some(StatusCode::PAYLOAD_TOO_LARGE));
        Ok(())
    }
}
