//! Uploads against the real hosting services.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tracing::info;
    use vidhost_core::Backend;
    use vidhost_upload::UploadRequest;

    use crate::{live_sample, live_uploader};

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_should_upload_sample_to_streamja() -> anyhow::Result<()> {
        let uploader = live_uploader();
        let request = UploadRequest::from_path(live_sample()).await?;

        let result = uploader.upload_streamja(request).await?;
        info!(url = %result.url, "Uploaded sample");

        assert_eq!(result.backend, Backend::Streamja);
        assert!(result.embed_url.is_some());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_should_upload_sample_to_streamable() -> anyhow::Result<()> {
        let uploader = live_uploader();
        let request = UploadRequest::from_path(live_sample()).await?;

        let result = uploader.upload_streamable(request).await?;
        info!(url = %result.url, "Uploaded sample");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(uploader.is_available(Backend::Streamable, &result.id).await?);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_should_report_unknown_streamff_video_as_unavailable() -> anyhow::Result<()> {
        let uploader = live_uploader();

        let available = uploader
            .is_available(Backend::Streamff, "vidhost-missing-0000")
            .await?;

        assert!(!available);
        Ok(())
    }
}
