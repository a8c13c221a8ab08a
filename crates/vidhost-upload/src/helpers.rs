//! In-memory [`HttpTransport`] for tests.
//!
//! [`MockTransport`] records every request it is handed, draining streamed
//! bodies so assertions can look at the exact bytes, and answers from a
//! scripted queue in order.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;

use crate::source::ByteStream;
use crate::transport::{
    FormPart, HttpTransport, RequestBody, TransportError, TransportRequest, TransportResponse,
};

/// A file part seen in a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    /// Form field name.
    pub field: String,
    /// Reported filename.
    pub filename: String,
    /// Reported content type.
    pub content_type: String,
}

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Full URL including the query string.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Buffered or streamed body bytes; for multipart requests, the file part.
    pub body: Bytes,
    /// Declared length of a streamed body or file part.
    pub declared_length: Option<u64>,
    /// Multipart text fields in order.
    pub fields: Vec<(String, String)>,
    /// Multipart file part, if any.
    pub file: Option<RecordedFile>,
}

impl RecordedRequest {
    /// A header value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// A multipart text field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// The body decoded as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug)]
enum Scripted {
    Respond(TransportResponse),
    Fail(String),
    Hang,
}

/// Scripted, recording transport.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn respond(&self, status: StatusCode, body: impl Into<Bytes>) -> &Self {
        self.script
            .lock()
            .push_back(Scripted::Respond(TransportResponse::new(status, body)));
        self
    }

    /// Queue a `200 OK` with a JSON body.
    pub fn respond_json(&self, value: &serde_json::Value) -> &Self {
        self.respond(StatusCode::OK, value.to_string())
    }

    /// Queue a transport-level failure.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.script.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    /// Queue a call that never completes.
    pub fn hang(&self) -> &Self {
        self.script.lock().push_back(Scripted::Hang);
        self
    }

    /// All requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests seen so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests with the given method whose URL contains `fragment`.
    #[must_use]
    pub fn count_matching(&self, method: &Method, fragment: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == *method && request.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let recorded = record(request).await?;
        self.requests.lock().push(recorded);

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(TransportError::Unavailable(message)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(TransportError::Unavailable(
                "no scripted response left".to_owned(),
            )),
        }
    }
}

async fn record(request: TransportRequest) -> Result<RecordedRequest, TransportError> {
    let TransportRequest {
        method,
        url,
        headers,
        body,
    } = request;

    let mut recorded = RecordedRequest {
        method,
        url,
        headers,
        body: Bytes::new(),
        declared_length: None,
        fields: Vec::new(),
        file: None,
    };

    match body {
        RequestBody::Empty => {}
        RequestBody::Bytes(bytes) => recorded.body = bytes,
        RequestBody::Stream { stream, length } => {
            recorded.body = drain(stream).await?;
            recorded.declared_length = Some(length);
        }
        RequestBody::Multipart(form) => {
            for part in form.into_parts() {
                match part {
                    FormPart::Text { name, value } => recorded.fields.push((name, value)),
                    FormPart::File {
                        name,
                        filename,
                        content_type,
                        length,
                        stream,
                    } => {
                        recorded.body = drain(stream).await?;
                        recorded.declared_length = Some(length);
                        recorded.file = Some(RecordedFile {
                            field: name,
                            filename,
                            content_type: content_type.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(recorded)
}

async fn drain(stream: ByteStream) -> Result<Bytes, TransportError> {
    let chunks: Vec<Bytes> = stream.try_collect().await?;
    Ok(Bytes::from(chunks.concat()))
}
