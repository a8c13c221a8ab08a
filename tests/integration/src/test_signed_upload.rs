//! Signed Streamable uploads end to end.

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use vidhost_auth::{AwsCredentials, CanonicalRequest, SigV4Signer, SigningContext, hash_payload};
    use vidhost_core::ClientConfig;
    use vidhost_upload::{UploadError, UploadRequest, UploadStage};

    use crate::{
        mock_uploader, mock_uploader_with, sample_payload, script_streamable_credentials,
        write_sample_file,
    };

    #[tokio::test]
    async fn test_should_upload_file_from_disk_with_verifiable_signature() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_sample_file(dir.path(), "holiday.mp4", 10_000);

        let (mock, uploader) = mock_uploader();
        script_streamable_credentials(&mock, "abc123");
        mock.respond(StatusCode::OK, "")
            .respond(StatusCode::OK, "")
            .respond(StatusCode::OK, "");

        let request = UploadRequest::from_path(&path).await?;
        let result = uploader.upload_streamable(request).await?;
        assert_eq!(result.url, "https://streamable.com/abc123");

        let requests = mock.requests();
        let transfer = &requests[2];
        let payload = sample_payload(10_000);
        assert_eq!(transfer.body.as_ref(), payload.as_slice());
        assert_eq!(
            transfer.header("x-amz-content-sha256"),
            Some("0cd0bf930677960951dda8588edcb6b293c0c3b26ef3ba72cddff4ddfc6822c7")
        );
        assert_eq!(requests[1].json()?["title"], "holiday");

        // Re-derive the signature from what went over the wire.
        let signed: Vec<(&str, &str)> = [
            "content-type",
            "host",
            "x-amz-acl",
            "x-amz-content-sha256",
            "x-amz-date",
            "x-amz-security-token",
        ]
        .into_iter()
        .map(|name| (name, transfer.header(name).unwrap_or_default()))
        .collect();
        let sent: http::Uri = transfer.url.parse()?;
        let canonical = CanonicalRequest::new("PUT", sent.path(), &[], &signed)?;
        let credentials =
            AwsCredentials::new("ASIATESTACCESSKEY", "test/secret/KEY", "FQoGZXIvYXdzEXAMPLE");
        let context = SigningContext::from_amz_date("20210601T120000Z", "us-east-1")?;
        let expected = SigV4Signer::new(&credentials)?.authorization(&canonical, &context);

        assert_eq!(transfer.header("authorization"), Some(expected.as_str()));
        assert_eq!(hash_payload(&payload), canonical.payload_hash());
        Ok(())
    }

    #[tokio::test]
    async fn test_should_sign_upload_to_path_style_bucket() -> anyhow::Result<()> {
        let mut config = ClientConfig::default();
        config.streamable.bucket_url = "http://127.0.0.1:9000/streamables-upload/".to_owned();
        let (mock, uploader) = mock_uploader_with(config);
        script_streamable_credentials(&mock, "abc123");
        mock.respond(StatusCode::OK, "")
            .respond(StatusCode::OK, "")
            .respond(StatusCode::OK, "");

        let request = UploadRequest::from_bytes("clip.mp4", sample_payload(2048));
        uploader.upload_streamable(request).await?;

        let requests = mock.requests();
        let transfer = &requests[2];
        assert_eq!(
            transfer.url,
            "http://127.0.0.1:9000/streamables-upload/upload/abc123"
        );

        let signed: Vec<(&str, &str)> = [
            "content-type",
            "host",
            "x-amz-acl",
            "x-amz-content-sha256",
            "x-amz-date",
            "x-amz-security-token",
        ]
        .into_iter()
        .map(|name| (name, transfer.header(name).unwrap_or_default()))
        .collect();
        let sent: http::Uri = transfer.url.parse()?;
        let canonical = CanonicalRequest::new("PUT", sent.path(), &[], &signed)?;
        let credentials =
            AwsCredentials::new("ASIATESTACCESSKEY", "test/secret/KEY", "FQoGZXIvYXdzEXAMPLE");
        let context = SigningContext::from_amz_date("20210601T120000Z", "us-east-1")?;
        let expected = SigV4Signer::new(&credentials)?.authorization(&canonical, &context);

        assert_eq!(transfer.header("host"), Some("127.0.0.1:9000"));
        assert_eq!(transfer.header("authorization"), Some(expected.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_report_rejected_transfer_without_activation() -> anyhow::Result<()> {
        let (mock, uploader) = mock_uploader();
        script_streamable_credentials(&mock, "burned1");
        mock.respond(StatusCode::OK, "").respond(
            StatusCode::FORBIDDEN,
            "<Error><Code>SignatureDoesNotMatch</Code></Error>",
        );

        let request = UploadRequest::from_bytes("clip.mp4", sample_payload(64));
        let error = uploader
            .upload_streamable(request)
            .await
            .expect_err("transfer should be rejected");

        let failure = match error {
            UploadError::Transfer(failure) => failure,
            other => anyhow::bail!("expected transfer error, got {other:?}"),
        };
        assert_eq!(failure.stage, UploadStage::Transferred);
        assert_eq!(failure.status, Some(StatusCode::FORBIDDEN));
        assert!(failure.body.contains("SignatureDoesNotMatch"));
        assert_eq!(mock.count_matching(&Method::POST, "/transcode/"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_should_run_concurrent_uploads_with_independent_credentials() -> anyhow::Result<()> {
        let (first_mock, first) = mock_uploader();
        let (second_mock, second) = mock_uploader();
        for (mock, code) in [(&first_mock, "one111"), (&second_mock, "two222")] {
            script_streamable_credentials(mock, code);
            mock.respond(StatusCode::OK, "")
                .respond(StatusCode::OK, "")
                .respond(StatusCode::OK, "");
        }

        let (a, b) = tokio::join!(
            first.upload_streamable(UploadRequest::from_bytes("a.mp4", sample_payload(5000))),
            second.upload_streamable(UploadRequest::from_bytes("b.mkv", sample_payload(7000))),
        );

        assert_eq!(a?.id, "one111");
        assert_eq!(b?.id, "two222");
        assert_eq!(first_mock.requests()[2].body.len(), 5000);
        assert_eq!(second_mock.requests()[2].body.len(), 7000);
        Ok(())
    }
}
