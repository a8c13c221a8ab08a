//! Pre-flight validation and cancellation across every backend.

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;
    use tokio_util::sync::CancellationToken;
    use vidhost_core::{Backend, MIB, ValidationError};
    use vidhost_upload::{
        ContentSource, IdentifierResolver, ResolveError, UploadError, UploadRequest, UploadResult,
        UploadStage, Uploader,
    };

    use crate::mock_uploader;

    #[derive(Debug)]
    struct NeverCalled;

    #[async_trait::async_trait]
    impl IdentifierResolver for NeverCalled {
        async fn resolve(&self) -> Result<String, ResolveError> {
            Err(ResolveError::Unavailable("resolver must not be called".to_owned()))
        }
    }

    async fn upload(
        uploader: &Uploader,
        backend: Backend,
        request: UploadRequest,
    ) -> Result<UploadResult, UploadError> {
        match backend {
            Backend::Streamable => uploader.upload_streamable(request).await,
            Backend::JustStreamLive => uploader.upload_juststreamlive(request).await,
            Backend::Mixture => uploader.upload_mixture(request, &NeverCalled).await,
            Backend::Streamff => uploader.upload_streamff(request).await,
            Backend::Streamja => uploader.upload_streamja(request).await,
        }
    }

    fn lazy_stream() -> ContentSource {
        ContentSource::stream(futures::stream::once(async {
            Ok::<_, io::Error>(Bytes::from_static(b"never read"))
        }))
    }

    #[tokio::test]
    async fn test_should_reject_unsupported_extensions_before_any_call() {
        for backend in Backend::ALL {
            let (mock, uploader) = mock_uploader();
            let request = UploadRequest::new("movie.avi", 10, lazy_stream());

            let error = upload(&uploader, backend, request)
                .await
                .expect_err("avi must be rejected");

            assert!(
                matches!(
                    error,
                    UploadError::Validation {
                        source: ValidationError::UnsupportedExtension { .. },
                        ..
                    }
                ),
                "{backend}: unexpected {error:?}"
            );
            assert_eq!(error.backend(), backend);
            assert_eq!(mock.request_count(), 0, "{backend} issued a request");
        }
    }

    #[tokio::test]
    async fn test_should_reject_payloads_over_each_ceiling() {
        for backend in Backend::ALL {
            let (mock, uploader) = mock_uploader();
            let ceiling = uploader.profile(backend).max_size;
            let request = UploadRequest::new("movie.mp4", ceiling + 1, lazy_stream());

            let error = upload(&uploader, backend, request)
                .await
                .expect_err("oversized payload must be rejected");

            assert!(matches!(
                error,
                UploadError::Validation {
                    source: ValidationError::TooLarge { .. },
                    ..
                }
            ));
            assert_eq!(mock.request_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_should_reject_600_mib_for_streamable() {
        let (mock, uploader) = mock_uploader();
        let request = UploadRequest::new("movie.mp4", 600 * MIB, lazy_stream());

        let error = uploader
            .upload_streamable(request)
            .await
            .expect_err("600 MiB exceeds the 250 MiB ceiling");

        assert_eq!(error.stage(), UploadStage::Validated);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_should_cancel_credential_call_in_flight() {
        let (mock, uploader) = mock_uploader();
        mock.hang();

        let cancel = CancellationToken::new();
        let request = UploadRequest::new("movie.mp4", 10, lazy_stream());
        let upload = uploader.upload_streamable_with_cancel(request, &cancel);
        let trigger = async {
            tokio::task::yield_now().await;
            cancel.cancel();
        };

        let (result, ()) = tokio::join!(upload, trigger);

        let error = result.expect_err("upload must be cancelled");
        assert!(matches!(
            error,
            UploadError::Cancelled {
                backend: Backend::Streamable,
                stage: UploadStage::CredentialsAcquired
            }
        ));
        assert_eq!(mock.request_count(), 1);
    }
}
