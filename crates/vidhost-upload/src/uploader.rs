//! Upload orchestration.
//!
//! Every upload attempt walks the same strictly sequential stages:
//!
//! ```text
//! Validated -> CredentialsAcquired -> MetadataRegistered -> Transferred -> Activated -> Complete
//! ```
//!
//! Validation never touches the network. Backends without a metadata or
//! activation step skip those stages; none goes back to an earlier one and
//! nothing is retried. Each network step races the caller's
//! [`CancellationToken`].

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vidhost_auth::{
    CanonicalRequest, PayloadHash, SigV4Signer, SigningContext, SigningError, digest_seekable,
};
use vidhost_core::{Backend, BackendProfile, ClientConfig};

use crate::error::{StageFailure, UploadError, UploadStage};
use crate::request::UploadRequest;
use crate::resolver::{
    CredentialResolver, IdentifierResolver, ProcessingProbe, ResolveError, StreamableResolver,
    StreamffLinkResolver, StreamjaShortIdResolver, UploadCredentials,
};
use crate::result::UploadResult;
use crate::source::ContentSource;
use crate::transport::{
    HttpTransport, MultipartForm, ReqwestTransport, TransportError, TransportRequest,
    TransportResponse,
};

const OCTET_STREAM: &str = "application/octet-stream";
const PUBLIC_READ: &str = "public-read";
const UPLOAD_SOURCE: &str = "web";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Uploads videos to the supported backends through an injected transport.
///
/// Holds no per-attempt state: credentials, digests and signatures live only
/// inside one call, so a single `Uploader` can drive concurrent uploads as
/// long as each has its own content source.
#[derive(Clone)]
pub struct Uploader {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
    clock: Clock,
}

impl fmt::Debug for Uploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uploader")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct VideoMetadata<'a> {
    original_name: &'a str,
    original_size: u64,
    title: &'a str,
    upload_source: &'static str,
}

#[derive(Serialize)]
struct TranscodeRequest<'a> {
    shortcode: &'a str,
    size: u64,
    token: &'a str,
    upload_source: &'static str,
    url: &'a str,
}

#[derive(Deserialize)]
struct JustStreamLiveVideo {
    id: String,
}

#[derive(Deserialize)]
struct StreamjaUploadStatus {
    status: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamffVideo {
    video_link: String,
}

impl Uploader {
    /// Create an uploader over the given transport.
    pub fn new(transport: Arc<dyn HttpTransport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            clock: Arc::new(Utc::now),
        }
    }

    /// Create an uploader backed by [`ReqwestTransport`].
    pub fn from_config(config: ClientConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Create an uploader from `VIDHOST_*` environment variables.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_config(ClientConfig::from_env())
    }

    /// Replace the source of signing timestamps.
    #[must_use]
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The upload rules and URL templates of `backend`.
    #[must_use]
    pub fn profile(&self, backend: Backend) -> BackendProfile {
        self.config.profile(backend)
    }

    /// The built-in Streamable credential resolver.
    #[must_use]
    pub fn streamable_resolver(&self) -> StreamableResolver {
        StreamableResolver::new(self.transport.clone(), &self.config.streamable)
    }

    /// Upload to Streamable with the built-in credential resolver.
    pub async fn upload_streamable(
        &self,
        request: UploadRequest,
    ) -> Result<UploadResult, UploadError> {
        self.upload_signed(request, &self.streamable_resolver())
            .await
    }

    /// Cancellable [`Uploader::upload_streamable`].
    pub async fn upload_streamable_with_cancel(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        self.upload_signed_with_cancel(request, &self.streamable_resolver(), cancel)
            .await
    }

    /// Upload to Streamable with credentials from `resolver`.
    pub async fn upload_signed(
        &self,
        request: UploadRequest,
        resolver: &dyn CredentialResolver,
    ) -> Result<UploadResult, UploadError> {
        self.upload_signed_with_cancel(request, resolver, &CancellationToken::new())
            .await
    }

    /// Signed direct-to-storage upload.
    ///
    /// Acquires credentials, registers metadata, PUTs the payload under a
    /// SigV4 signature and triggers transcoding. Seekable payloads are
    /// digested first and signed with their SHA-256; one-shot streams are
    /// signed as `UNSIGNED-PAYLOAD`.
    pub async fn upload_signed_with_cancel(
        &self,
        request: UploadRequest,
        resolver: &dyn CredentialResolver,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        let backend = Backend::Streamable;
        let profile = self.validate(backend, &request)?;

        let stage = UploadStage::CredentialsAcquired;
        let credentials = guard(cancel, backend, stage, resolver.resolve(request.size))
            .await?
            .map_err(|e| UploadError::Credential(e.into_failure(backend, stage)))?;
        info!(
            backend = %backend,
            stage = %stage,
            object_key = %credentials.object_key,
            region = %credentials.region,
            "Upload credentials acquired"
        );

        self.register_metadata(&request, &credentials, cancel)
            .await?;

        let UploadRequest { size, source, .. } = request;
        self.transfer_signed(&credentials, size, source, cancel)
            .await?;
        self.activate(&credentials, size, cancel).await?;

        Ok(complete(&profile, credentials.object_key))
    }

    /// Upload to JustStreamLive; the identifier is returned by the upload.
    pub async fn upload_juststreamlive(
        &self,
        request: UploadRequest,
    ) -> Result<UploadResult, UploadError> {
        self.upload_juststreamlive_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Cancellable [`Uploader::upload_juststreamlive`].
    pub async fn upload_juststreamlive_with_cancel(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        let backend = Backend::JustStreamLive;
        let profile = self.validate(backend, &request)?;

        let url = format!("{}/videos/upload", trimmed(&self.config.juststreamlive.api_url));
        let response = self
            .post_file(backend, TransportRequest::post(url), "file", &[], request, cancel)
            .await?;

        let video: JustStreamLiveVideo = response.json().map_err(|e| {
            UploadError::Transfer(StageFailure::from_response(
                backend,
                UploadStage::Transferred,
                &response,
                format!("unexpected upload response: {e}"),
            ))
        })?;

        Ok(complete(&profile, video.id))
    }

    /// Upload to Mixture; the link id comes from `link_ids`, usually a page
    /// scraper supplied by the caller.
    pub async fn upload_mixture(
        &self,
        request: UploadRequest,
        link_ids: &dyn IdentifierResolver,
    ) -> Result<UploadResult, UploadError> {
        self.upload_mixture_with_cancel(request, link_ids, &CancellationToken::new())
            .await
    }

    /// Cancellable [`Uploader::upload_mixture`].
    pub async fn upload_mixture_with_cancel(
        &self,
        request: UploadRequest,
        link_ids: &dyn IdentifierResolver,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        let backend = Backend::Mixture;
        let profile = self.validate(backend, &request)?;
        let link_id = acquire_identifier(backend, link_ids, cancel).await?;

        let url = format!("{}/upload_file.php", trimmed(&self.config.mixture.api_url));
        self.post_file(
            backend,
            TransportRequest::post(url),
            "upload_file",
            &[("link_id", link_id.as_str())],
            request,
            cancel,
        )
        .await?;

        Ok(complete(&profile, link_id))
    }

    /// Upload to Streamff.
    pub async fn upload_streamff(
        &self,
        request: UploadRequest,
    ) -> Result<UploadResult, UploadError> {
        self.upload_streamff_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Cancellable [`Uploader::upload_streamff`].
    pub async fn upload_streamff_with_cancel(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        let backend = Backend::Streamff;
        let profile = self.validate(backend, &request)?;
        let api_url = trimmed(&self.config.streamff.api_url);

        let resolver = StreamffLinkResolver::new(self.transport.clone(), api_url);
        let id = acquire_identifier(backend, &resolver, cancel).await?;

        let url = format!("{api_url}/api/videos/upload/{id}");
        self.post_file(backend, TransportRequest::post(url), "file", &[], request, cancel)
            .await?;

        Ok(complete(&profile, id))
    }

    /// Upload to Streamja.
    pub async fn upload_streamja(
        &self,
        request: UploadRequest,
    ) -> Result<UploadResult, UploadError> {
        self.upload_streamja_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Cancellable [`Uploader::upload_streamja`].
    pub async fn upload_streamja_with_cancel(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, UploadError> {
        let backend = Backend::Streamja;
        let profile = self.validate(backend, &request)?;
        let api_url = trimmed(&self.config.streamja.api_url);

        let resolver = StreamjaShortIdResolver::new(self.transport.clone(), api_url);
        let short_id = acquire_identifier(backend, &resolver, cancel).await?;

        let upload = TransportRequest::post(format!("{api_url}/upload.php"))
            .query(&[("shortId", short_id.as_str())]);
        let response = self
            .post_file(backend, upload, "file", &[], request, cancel)
            .await?;

        let accepted = response
            .json::<StreamjaUploadStatus>()
            .is_ok_and(|body| body.status == 1);
        if !accepted {
            warn!(backend = %backend, short_id = %short_id, "Upload not accepted");
            return Err(UploadError::Transfer(StageFailure::from_response(
                backend,
                UploadStage::Transferred,
                &response,
                "upload was not accepted",
            )));
        }

        Ok(complete(&profile, short_id))
    }

    /// Whether the public page of `id` answers with a success status.
    ///
    /// Mixture serves its not-found page with `200 OK`, so it cannot be
    /// answered from the status and is reported as unavailable to check.
    pub async fn is_available(&self, backend: Backend, id: &str) -> Result<bool, ResolveError> {
        if backend == Backend::Mixture {
            return Err(ResolveError::Unavailable(
                "mixture availability requires page inspection".to_owned(),
            ));
        }

        let url = self.profile(backend).public_url(id);
        let response = self.transport.send(TransportRequest::get(url)).await?;
        debug!(backend = %backend, id, status = %response.status, "Checked video availability");
        Ok(response.is_success())
    }

    /// Whether `id` is available and no longer processing according to `probe`.
    pub async fn is_ready(
        &self,
        backend: Backend,
        id: &str,
        probe: &dyn ProcessingProbe,
    ) -> Result<bool, ResolveError> {
        if !self.is_available(backend, id).await? {
            return Ok(false);
        }
        Ok(!probe.is_processing(backend, id).await?)
    }

    /// Resolve the direct video URL of a Streamff upload.
    pub async fn streamff_video_url(&self, id: &str) -> Result<String, ResolveError> {
        let api_url = trimmed(&self.config.streamff.api_url);
        let request = TransportRequest::get(format!("{api_url}/api/videos/{id}"));
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ResolveError::Rejected(response));
        }

        match response.json::<StreamffVideo>() {
            Ok(video) => Ok(format!("{api_url}{}", video.video_link)),
            Err(e) => Err(ResolveError::Malformed {
                reason: e.to_string(),
                response,
            }),
        }
    }

    fn validate(
        &self,
        backend: Backend,
        request: &UploadRequest,
    ) -> Result<BackendProfile, UploadError> {
        let profile = self.profile(backend);
        if let Err(source) = profile.validate(&request.filename, request.size) {
            warn!(backend = %backend, filename = %request.filename, size = request.size, error = %source, "Upload request rejected");
            return Err(UploadError::Validation { backend, source });
        }

        info!(
            backend = %backend,
            stage = %UploadStage::Validated,
            filename = %request.filename,
            size = request.size,
            seekable = request.source.is_seekable(),
            "Upload request validated"
        );
        Ok(profile)
    }

    async fn register_metadata(
        &self,
        request: &UploadRequest,
        credentials: &UploadCredentials,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let backend = Backend::Streamable;
        let stage = UploadStage::MetadataRegistered;
        let title = request.title_or_stem();
        let metadata = VideoMetadata {
            original_name: &request.filename,
            original_size: request.size,
            title: &title,
            upload_source: UPLOAD_SOURCE,
        };

        let url = format!(
            "{}/videos/{}",
            trimmed(&self.config.streamable.api_url),
            credentials.object_key
        );
        let registration = TransportRequest::put(url)
            .query(&[("purge", "")])
            .json(&metadata)
            .map_err(|e| UploadError::Transfer(StageFailure::new(backend, stage, e.to_string())))?;

        self.exchange(backend, stage, registration, cancel, UploadError::Transfer)
            .await?;
        info!(backend = %backend, stage = %stage, title = %title, "Upload metadata registered");
        Ok(())
    }

    async fn transfer_signed(
        &self,
        credentials: &UploadCredentials,
        size: u64,
        source: ContentSource,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let backend = Backend::Streamable;
        let stage = UploadStage::Transferred;
        let transfer_failed =
            |message: String| UploadError::Transfer(StageFailure::new(backend, stage, message));
        let signing_failed = |source: SigningError| UploadError::Signing { backend, source };

        let target = object_target(&self.config.streamable.bucket_url, &credentials.object_key)
            .map_err(transfer_failed)?;

        let (payload_hash, body) = match source {
            ContentSource::Seekable(mut reader) => {
                let digest = guard(cancel, backend, stage, digest_seekable(&mut reader, Some(size)))
                    .await?
                    .map_err(|e| transfer_failed(e.to_string()))?;
                (
                    PayloadHash::Sha256(digest),
                    ContentSource::Seekable(reader).into_stream(),
                )
            }
            ContentSource::Stream(stream) => {
                debug!(backend = %backend, "Payload is a one-shot stream, signing it as unsigned");
                (PayloadHash::Unsigned, stream)
            }
        };

        let context = SigningContext::new((self.clock)(), credentials.region.as_str());
        let amz_date = context.amz_date();
        let signed_headers = [
            ("Host", target.host.as_str()),
            ("Content-Type", OCTET_STREAM),
            ("X-Amz-Acl", PUBLIC_READ),
            ("X-Amz-Content-Sha256", payload_hash.as_str()),
            ("X-Amz-Security-Token", credentials.credentials.session_token.as_str()),
            ("X-Amz-Date", amz_date.as_str()),
        ];

        let canonical =
            CanonicalRequest::new("PUT", &target.path, &[], &signed_headers).map_err(signing_failed)?;
        let authorization = SigV4Signer::new(&credentials.credentials)
            .map_err(signing_failed)?
            .authorization(&canonical, &context);

        let mut transfer = TransportRequest::put(target.url);
        for (name, value) in signed_headers {
            transfer = transfer
                .header(name, value)
                .map_err(|e| transfer_failed(e.to_string()))?;
        }
        let transfer = transfer
            .header("Authorization", &authorization)
            .map_err(|e| transfer_failed(e.to_string()))?
            .stream(body, size);

        self.exchange(backend, stage, transfer, cancel, UploadError::Transfer)
            .await?;
        info!(
            backend = %backend,
            stage = %stage,
            payload_signed = payload_hash.is_signed(),
            bytes = size,
            "Payload transferred"
        );
        Ok(())
    }

    async fn activate(
        &self,
        credentials: &UploadCredentials,
        size: u64,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let backend = Backend::Streamable;
        let stage = UploadStage::Activated;
        let object_url = format!(
            "{}/upload/{}",
            trimmed(&self.config.streamable.bucket_url),
            credentials.object_key
        );
        let body = TranscodeRequest {
            shortcode: &credentials.object_key,
            size,
            token: &credentials.activation_token,
            upload_source: UPLOAD_SOURCE,
            url: &object_url,
        };

        let url = format!(
            "{}/transcode/{}",
            trimmed(&self.config.streamable.api_url),
            credentials.object_key
        );
        let activation = TransportRequest::post(url).json(&body).map_err(|e| {
            UploadError::Activation(StageFailure::new(backend, stage, e.to_string()))
        })?;

        self.exchange(backend, stage, activation, cancel, UploadError::Activation)
            .await?;
        info!(backend = %backend, stage = %stage, "Transcoding triggered");
        Ok(())
    }

    async fn post_file(
        &self,
        backend: Backend,
        upload: TransportRequest,
        field: &str,
        fields: &[(&str, &str)],
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, UploadError> {
        let stage = UploadStage::Transferred;
        let UploadRequest {
            filename,
            size,
            mut source,
            ..
        } = request;
        source
            .rewind()
            .await
            .map_err(|e| UploadError::Transfer(StageFailure::new(backend, stage, e.to_string())))?;

        let content_type = video_mime(&filename);
        let mut form = MultipartForm::new().file(field, filename, content_type, size, source.into_stream());
        for (name, value) in fields {
            form = form.text(*name, *value);
        }

        let response = self
            .exchange(backend, stage, upload.multipart(form), cancel, UploadError::Transfer)
            .await?;
        info!(backend = %backend, stage = %stage, bytes = size, "Payload transferred");
        Ok(response)
    }

    async fn exchange(
        &self,
        backend: Backend,
        stage: UploadStage,
        request: TransportRequest,
        cancel: &CancellationToken,
        wrap: fn(StageFailure) -> UploadError,
    ) -> Result<TransportResponse, UploadError> {
        debug!(backend = %backend, stage = %stage, method = %request.method, url = %request.url, "Sending request");
        let response = guard(cancel, backend, stage, self.transport.send(request))
            .await?
            .map_err(|e| {
                warn!(backend = %backend, stage = %stage, error = %e, "Request failed");
                wrap(StageFailure::new(backend, stage, e.to_string()))
            })?;

        if !response.is_success() {
            warn!(backend = %backend, stage = %stage, status = %response.status, "Upstream rejected request");
            return Err(wrap(StageFailure::from_response(
                backend,
                stage,
                &response,
                "upstream returned a non-success status",
            )));
        }
        Ok(response)
    }
}

async fn acquire_identifier(
    backend: Backend,
    resolver: &dyn IdentifierResolver,
    cancel: &CancellationToken,
) -> Result<String, UploadError> {
    let stage = UploadStage::CredentialsAcquired;
    let id = guard(cancel, backend, stage, resolver.resolve())
        .await?
        .map_err(|e| UploadError::Credential(e.into_failure(backend, stage)))?;
    info!(backend = %backend, stage = %stage, id = %id, "Upload identifier acquired");
    Ok(id)
}

async fn guard<T>(
    cancel: &CancellationToken,
    backend: Backend,
    stage: UploadStage,
    future: impl Future<Output = T>,
) -> Result<T, UploadError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            warn!(backend = %backend, stage = %stage, "Upload cancelled");
            Err(UploadError::Cancelled { backend, stage })
        }
        output = future => Ok(output),
    }
}

fn complete(profile: &BackendProfile, id: String) -> UploadResult {
    let result = UploadResult::new(profile, id);
    info!(
        backend = %result.backend,
        stage = %UploadStage::Complete,
        id = %result.id,
        url = %result.url,
        "Upload complete"
    );
    result
}

fn trimmed(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Where the signed PUT of an object goes.
///
/// `path` is both the canonical URI and the path sent on the wire, so a
/// path-style bucket URL keeps its prefix in the signature.
#[derive(Debug, PartialEq, Eq)]
struct ObjectTarget {
    host: String,
    path: String,
    url: String,
}

fn object_target(bucket_url: &str, object_key: &str) -> Result<ObjectTarget, String> {
    let uri: http::Uri = bucket_url
        .parse()
        .map_err(|e| format!("invalid bucket url {bucket_url}: {e}"))?;
    let authority = uri
        .authority()
        .ok_or_else(|| format!("bucket url {bucket_url} has no host"))?;
    let scheme = uri.scheme_str().unwrap_or("https");
    let path = format!("{}/upload/{object_key}", uri.path().trim_end_matches('/'));

    Ok(ObjectTarget {
        host: authority.as_str().to_owned(),
        url: format!("{scheme}://{authority}{path}"),
        path,
    })
}

fn video_mime(filename: &str) -> mime::Mime {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let essence = match extension.as_deref() {
        Some("mp4") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        _ => OCTET_STREAM,
    };
    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
