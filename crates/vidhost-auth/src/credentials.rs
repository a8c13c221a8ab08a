//! Temporary AWS credential set issued for a single upload.

use std::fmt;

use serde::Deserialize;

/// Temporary AWS credentials scoped to one object key.
///
/// The hosting service mints a fresh set for every upload attempt; they are
/// never persisted or reused. `Debug` redacts the secret and the session token.
///
/// # Examples
///
/// ```
/// use vidhost_auth::credentials::AwsCredentials;
///
/// let creds: AwsCredentials = serde_json::from_str(
///     r#"{"accessKeyId":"ASIA","secretAccessKey":"s3cr3t","sessionToken":"tok"}"#,
/// )
/// .unwrap();
/// assert_eq!(creds.access_key_id, "ASIA");
/// assert!(!format!("{creds:?}").contains("s3cr3t"));
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    /// Access key ID, sent in the clear inside the credential scope.
    pub access_key_id: String,
    /// Secret access key, used only to derive the signing key.
    pub secret_access_key: String,
    /// Session token, sent as `X-Amz-Security-Token`.
    pub session_token: String,
}

impl AwsCredentials {
    /// Create a credential set.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
        }
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}
