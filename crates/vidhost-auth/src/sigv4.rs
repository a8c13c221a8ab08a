//! AWS Signature Version 4 signing.
//!
//! This module implements the signing half of SigV4:
//!
//! 1. Fix the request instant in a [`SigningContext`] (date stamp, region, service).
//! 2. Build the string to sign from the timestamp, credential scope, and canonical
//!    request hash.
//! 3. Derive the signing key using an HMAC-SHA256 chain over the secret key and
//!    credential scope components.
//! 4. Compute the signature and assemble the `Authorization` header value.
//!
//! The main entry point is [`SigV4Signer::authorization`].

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::CanonicalRequest;
use crate::credentials::AwsCredentials;
use crate::error::SigningError;

/// The only algorithm supported by this implementation.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// `chrono` format of the ISO 8601 basic timestamp (`X-Amz-Date`).
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// `chrono` format of the credential scope date stamp.
pub const DATE_STAMP_FORMAT: &str = "%Y%m%d";

/// Service name of object storage in the credential scope.
pub const S3_SERVICE: &str = "s3";

/// Final component of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

type HmacSha256 = Hmac<Sha256>;

/// The fixed instant, region and service a request is signed for.
///
/// The same context must produce both the `X-Amz-Date` header and the
/// signature, otherwise verification fails on the remote side.
///
/// # Examples
///
/// ```
/// use vidhost_auth::sigv4::SigningContext;
///
/// let context = SigningContext::from_amz_date("20150830T123600Z", "us-east-1").unwrap();
/// assert_eq!(context.date_stamp(), "20150830");
/// assert_eq!(context.amz_date(), "20150830T123600Z");
/// assert_eq!(context.credential_scope(), "20150830/us-east-1/s3/aws4_request");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    timestamp: DateTime<Utc>,
    region: String,
    service: String,
}

impl SigningContext {
    /// Create an S3 signing context for the given instant and region.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, region: impl Into<String>) -> Self {
        Self {
            timestamp,
            region: region.into(),
            service: S3_SERVICE.to_owned(),
        }
    }

    /// Parse an `X-Amz-Date` value (`YYYYMMDDTHHMMSSZ`) into an S3 signing context.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidTimestamp`] if the value is malformed.
    pub fn from_amz_date(amz_date: &str, region: impl Into<String>) -> Result<Self, SigningError> {
        let naive = NaiveDateTime::parse_from_str(amz_date, AMZ_DATE_FORMAT)
            .map_err(|_| SigningError::InvalidTimestamp(amz_date.to_owned()))?;
        Ok(Self::new(naive.and_utc(), region))
    }

    /// Replace the service component of the credential scope.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// The signing instant.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The region component of the credential scope.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The service component of the credential scope.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The ISO 8601 basic timestamp, as sent in `X-Amz-Date`.
    #[must_use]
    pub fn amz_date(&self) -> String {
        self.timestamp.format(AMZ_DATE_FORMAT).to_string()
    }

    /// The `YYYYMMDD` date stamp.
    #[must_use]
    pub fn date_stamp(&self) -> String {
        self.timestamp.format(DATE_STAMP_FORMAT).to_string()
    }

    /// `date/region/service/aws4_request`.
    #[must_use]
    pub fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.date_stamp(),
            self.region,
            self.service
        )
    }
}

/// Signs canonical requests with one credential set.
///
/// The signing key is derived again for every signature and never cached.
#[derive(Debug, Clone, Copy)]
pub struct SigV4Signer<'a> {
    credentials: &'a AwsCredentials,
}

impl<'a> SigV4Signer<'a> {
    /// Create a signer.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::EmptyAccessKey`] or [`SigningError::EmptySecret`]
    /// if the credential set is incomplete.
    pub fn new(credentials: &'a AwsCredentials) -> Result<Self, SigningError> {
        if credentials.access_key_id.is_empty() {
            return Err(SigningError::EmptyAccessKey);
        }
        if credentials.secret_access_key.is_empty() {
            return Err(SigningError::EmptySecret);
        }
        Ok(Self { credentials })
    }

    /// Compute the hex signature of a canonical request string.
    #[must_use]
    pub fn signature(&self, canonical_request: &str, context: &SigningContext) -> String {
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = build_string_to_sign(
            &context.amz_date(),
            &context.credential_scope(),
            &canonical_hash,
        );

        debug!(string_to_sign, "Built string to sign");

        let signing_key = derive_signing_key(
            &self.credentials.secret_access_key,
            &context.date_stamp(),
            context.region(),
            context.service(),
        );
        compute_signature(&signing_key, &string_to_sign)
    }

    /// Assemble the `Authorization` header value for a canonical request.
    ///
    /// Format:
    /// ```text
    /// AWS4-HMAC-SHA256 Credential=<AKID>/<scope>, SignedHeaders=<names>, Signature=<hex>
    /// ```
    #[must_use]
    pub fn authorization(&self, canonical: &CanonicalRequest, context: &SigningContext) -> String {
        let canonical_request = canonical.to_string();

        debug!(canonical_request, "Built canonical request");

        let signature = self.signature(&canonical_request, context);
        format!(
            "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={signature}",
            self.credentials.access_key_id,
            context.credential_scope(),
            canonical.signed_headers(),
        )
    }
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use vidhost_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Examples
///
/// ```
/// use vidhost_auth::sigv4::derive_signing_key;
///
/// let key = derive_signing_key(
///     "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
///     "20150830",
///     "us-east-1",
///     "s3",
/// );
/// assert_eq!(key.len(), 32);
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the hex-encoded signature.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
