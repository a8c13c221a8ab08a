//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! where `CanonicalHeaders` is one `name:value\n` line per header. Each
//! component is normalized so the same logical request always produces the
//! same bytes, regardless of the order headers or query parameters were
//! supplied in.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::error::SigningError;

/// Header carrying the payload hash; it must be part of every signed request.
pub const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";

/// HTTP methods accepted by [`normalize_method`].
pub const STANDARD_METHODS: [&str; 9] = [
    "CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT", "TRACE",
];

/// The set of characters that must be percent-encoded in URI path segments
/// and query components.
///
/// Per AWS SigV4 spec, all characters except unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) must be encoded.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A fully normalized canonical request, ready to be hashed and signed.
///
/// # Examples
///
/// ```
/// use vidhost_auth::canonical::CanonicalRequest;
///
/// let canonical = CanonicalRequest::new(
///     "put",
///     "/upload/abc123",
///     &[],
///     &[
///         ("X-Amz-Date", "20210601T120000Z"),
///         ("Host", "bucket.s3.amazonaws.com"),
///         ("X-Amz-Content-SHA256", "UNSIGNED-PAYLOAD"),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(canonical.signed_headers(), "host;x-amz-content-sha256;x-amz-date");
/// assert!(canonical.to_string().starts_with("PUT\n/upload/abc123\n\nhost:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    uri: String,
    query: String,
    headers: String,
    signed_headers: String,
    payload_hash: String,
}

impl CanonicalRequest {
    /// Build a canonical request.
    ///
    /// The payload hash is taken from the `x-amz-content-sha256` header so the
    /// signed value and the transmitted value cannot diverge.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidMethod`] for a non-standard method and
    /// [`SigningError::MissingContentSha256`] when the payload hash header is
    /// absent.
    pub fn new(
        method: &str,
        uri: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Self, SigningError> {
        let method = normalize_method(method)?;
        let header_map = canonicalize_headers(headers);
        let payload_hash = header_map
            .get(CONTENT_SHA256_HEADER)
            .cloned()
            .ok_or(SigningError::MissingContentSha256)?;

        Ok(Self {
            method,
            uri: build_canonical_uri(uri),
            query: build_canonical_query_string(query),
            headers: build_canonical_headers(&header_map),
            signed_headers: build_signed_headers_string(&header_map),
            payload_hash,
        })
    }

    /// The upper-cased HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Semicolon-separated lowercase header names, in canonical order.
    #[must_use]
    pub fn signed_headers(&self) -> &str {
        &self.signed_headers
    }

    /// The payload hash (hex digest or `UNSIGNED-PAYLOAD`).
    #[must_use]
    pub fn payload_hash(&self) -> &str {
        &self.payload_hash
    }

    /// Hex-encoded SHA-256 of the canonical request string.
    #[must_use]
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.to_string().as_bytes()))
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.uri,
            self.query,
            self.headers,
            self.signed_headers,
            self.payload_hash
        )
    }
}

/// Upper-case an HTTP method and check it is a standard verb.
///
/// # Errors
///
/// Returns [`SigningError::InvalidMethod`] for anything outside
/// [`STANDARD_METHODS`].
///
/// # Examples
///
/// ```
/// use vidhost_auth::canonical::normalize_method;
///
/// assert_eq!(normalize_method("put").unwrap(), "PUT");
/// assert!(normalize_method("FETCH").is_err());
/// ```
pub fn normalize_method(method: &str) -> Result<String, SigningError> {
    let upper = method.to_ascii_uppercase();
    if STANDARD_METHODS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(SigningError::InvalidMethod(method.to_owned()))
    }
}

/// Build the canonical URI by URI-encoding each path segment individually.
///
/// Forward slashes (`/`) are preserved. Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use vidhost_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/upload/abc123"), "/upload/abc123");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            // Decode first so an already-encoded path is not encoded twice.
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the canonical query string from decoded parameters.
///
/// Keys and values are percent-encoded independently, then the pairs are
/// sorted by encoded key (and by encoded value for duplicate keys).
///
/// # Examples
///
/// ```
/// use vidhost_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(&[]), "");
/// assert_eq!(
///     build_canonical_query_string(&[("b", "2"), ("a", "x y")]),
///     "a=x%20y&b=2"
/// );
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();

    encoded.sort_unstable();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lower-case header names and normalize values into a sorted map.
///
/// Values are trimmed and runs of inner whitespace collapse to one space.
/// Repeated names have their values joined with commas.
fn canonicalize_headers(headers: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.trim().to_ascii_lowercase();
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }
    header_map
}

/// Render canonical headers as `name:value\n` lines in sorted order.
fn build_canonical_headers(header_map: &BTreeMap<String, String>) -> String {
    header_map
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect()
}

/// Join the sorted header names with `;`.
fn build_signed_headers_string(header_map: &BTreeMap<String, String>) -> String {
    header_map
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";")
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
