//! HTTP transport boundary.
//!
//! The orchestrator never owns a global client. It is handed an
//! [`HttpTransport`] and describes each call as a [`TransportRequest`]; the
//! transport is responsible for pooling, TLS and proxies. [`ReqwestTransport`]
//! is the production implementation.

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::source::ByteStream;

/// Errors raised by a transport before a response status is available.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A header name or value is not valid HTTP.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// The header name as given.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The JSON body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    Body(#[from] io::Error),

    /// The HTTP client failed to send the request or read the response.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport could not produce a response.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A request body.
pub enum RequestBody {
    /// No body.
    Empty,
    /// A fully buffered body.
    Bytes(Bytes),
    /// A streamed body with a known length, sent as `Content-Length`.
    Stream {
        /// The body chunks.
        stream: ByteStream,
        /// The declared length.
        length: u64,
    },
    /// A `multipart/form-data` body.
    Multipart(MultipartForm),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream { length, .. } => f.debug_struct("Stream").field("length", length).finish(),
            Self::Multipart(form) => f.debug_tuple("Multipart").field(form).finish(),
        }
    }
}

/// One part of a multipart form.
pub enum FormPart {
    /// A plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// A streamed file field.
    File {
        /// Field name.
        name: String,
        /// Filename reported to the server.
        filename: String,
        /// Content type of the file.
        content_type: mime::Mime,
        /// Declared length of the file.
        length: u64,
        /// The file chunks.
        stream: ByteStream,
    },
}

impl fmt::Debug for FormPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { name, value } => f
                .debug_struct("Text")
                .field("name", name)
                .field("value", value)
                .finish(),
            Self::File {
                name,
                filename,
                content_type,
                length,
                ..
            } => f
                .debug_struct("File")
                .field("name", name)
                .field("filename", filename)
                .field("content_type", content_type)
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

/// An ordered `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a streamed file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: mime::Mime,
        length: u64,
        stream: ByteStream,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type,
            length,
            stream,
        });
        self
    }

    /// The parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Consume the form into its parts.
    #[must_use]
    pub fn into_parts(self) -> Vec<FormPart> {
        self.parts
    }

    fn into_reqwest(self) -> Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File {
                    name,
                    filename,
                    content_type,
                    length,
                    stream,
                } => {
                    let body = reqwest::Body::wrap_stream(stream);
                    let part = reqwest::multipart::Part::stream_with_length(body, length)
                        .file_name(filename)
                        .mime_str(content_type.as_ref())?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

/// A request handed to an [`HttpTransport`].
#[derive(Debug)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including any query string.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: RequestBody,
}

impl TransportRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Create a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a `POST` request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Create a `PUT` request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Append URL-encoded query parameters.
    #[must_use]
    pub fn query(mut self, params: &[(&str, &str)]) -> Self {
        if params.is_empty() {
            return self;
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        self.url.push(separator);
        self.url.push_str(&encoded);
        self
    }

    /// Set a header, replacing any previous value. Names are case-insensitive.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, TransportError> {
        let invalid = |reason: String| TransportError::InvalidHeader {
            name: name.to_owned(),
            reason,
        };
        let header_name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Set a JSON body and its content type.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(value)?;
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = RequestBody::Bytes(Bytes::from(body));
        Ok(self)
    }

    /// Set a URL-encoded form body and its content type.
    #[must_use]
    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.body = RequestBody::Bytes(Bytes::from(body));
        self
    }

    /// Set a multipart body.
    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Set a streamed body of known length.
    #[must_use]
    pub fn stream(mut self, stream: ByteStream, length: u64) -> Self {
        self.body = RequestBody::Stream { stream, length };
        self
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The body as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests on behalf of the orchestrator and resolvers.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Send one request and read the whole response body.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client that sends the given user agent.
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Use an existing client, e.g. one with custom TLS or proxy settings.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let builder = self.client.request(method, url.as_str()).headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::Stream { stream, length } => builder
                .header(CONTENT_LENGTH, length)
                .body(reqwest::Body::wrap_stream(stream)),
            RequestBody::Multipart(form) => builder.multipart(form.into_reqwest()?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}
