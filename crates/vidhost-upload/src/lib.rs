//! Upload orchestration for vidhost.
//!
//! [`Uploader`] drives one upload attempt per call through
//! `Validated -> CredentialsAcquired -> MetadataRegistered -> Transferred ->
//! Activated -> Complete`, talking to the network only through an injected
//! [`HttpTransport`]. Streamable uploads go straight to object storage under a
//! SigV4 signature computed by `vidhost-auth`; the other backends take a
//! multipart POST keyed by an identifier from a resolver.
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use vidhost_upload::{UploadRequest, Uploader};
//!
//! let uploader = Uploader::from_env()?;
//! let request = UploadRequest::from_path("clip.mp4").await?;
//! let result = uploader.upload_streamable(request).await?;
//! println!("{}", result.url);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`error`] - `UploadError`, `UploadStage` and failure context
//! - [`request`] - Caller-supplied `UploadRequest`
//! - [`resolver`] - Credential, identifier and processing-state boundaries
//! - [`result`] - The `UploadResult` of a completed upload
//! - [`source`] - Seekable and one-shot content sources
//! - [`transport`] - `HttpTransport` trait and the `reqwest` implementation
//! - [`uploader`] - The orchestrator

pub mod error;
#[cfg(any(test, feature = "helpers"))]
pub mod helpers;
pub mod request;
pub mod resolver;
pub mod result;
pub mod source;
pub mod transport;
pub mod uploader;

pub use error::{StageFailure, UploadError, UploadStage};
pub use request::UploadRequest;
pub use resolver::{
    CredentialResolver, IdentifierResolver, ProcessingProbe, ResolveError, StreamableResolver,
    StreamffLinkResolver, StreamjaShortIdResolver, UploadCredentials,
};
pub use result::UploadResult;
pub use source::{ByteStream, ContentSource, SeekableSource};
pub use transport::{
    HttpTransport, MultipartForm, ReqwestTransport, TransportError, TransportRequest,
    TransportResponse,
};
pub use uploader::Uploader;
