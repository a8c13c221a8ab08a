//! Integration tests for vidhost uploads.
//!
//! Most tests drive complete uploads through the in-memory `MockTransport`
//! and run with a plain `cargo test`. Tests that talk to the real hosting
//! services are marked `#[ignore]`.
//!
//! Run those with:
//! ```text
//! VIDHOST_LIVE_SAMPLE=/path/to/clip.mp4 cargo test -p vidhost-integration -- --ignored
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use chrono::{TimeZone, Utc};
use serde_json::json;
use vidhost_core::ClientConfig;
use vidhost_upload::Uploader;
use vidhost_upload::helpers::MockTransport;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Create an uploader over a fresh mock transport with a fixed signing clock.
#[must_use]
pub fn mock_uploader() -> (Arc<MockTransport>, Uploader) {
    mock_uploader_with(ClientConfig::default())
}

/// Like [`mock_uploader`], with a custom configuration.
#[must_use]
pub fn mock_uploader_with(config: ClientConfig) -> (Arc<MockTransport>, Uploader) {
    init_tracing();

    let mock = Arc::new(MockTransport::new());
    let uploader = Uploader::new(mock.clone(), config)
        .with_clock(|| Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap());
    (mock, uploader)
}

/// Create an uploader for the real services, configured from the environment.
#[must_use]
pub fn live_uploader() -> Uploader {
    init_tracing();
    Uploader::from_env().expect("failed to build HTTP client")
}

/// Path of the sample video used by live tests.
#[must_use]
pub fn live_sample() -> PathBuf {
    std::env::var("VIDHOST_LIVE_SAMPLE")
        .map(PathBuf::from)
        .expect("VIDHOST_LIVE_SAMPLE must point at a small mp4 file")
}

/// Deterministic payload of `len` bytes.
#[must_use]
pub fn sample_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
}

/// Write a sample payload into `dir` and return its path.
pub fn write_sample_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, sample_payload(len))
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

/// Script a successful Streamable credential response for `shortcode`.
pub fn script_streamable_credentials(mock: &MockTransport, shortcode: &str) {
    mock.respond_json(&json!({
        "shortcode": shortcode,
        "credentials": {
            "accessKeyId": "ASIATESTACCESSKEY",
            "secretAccessKey": "test/secret/KEY",
            "sessionToken": "FQoGZXIvYXdzEXAMPLE"
        },
        "transcoder_options": { "token": "transcode-token" }
    }));
}

mod test_form_upload;
mod test_live;
mod test_signed_upload;
mod test_validation;
