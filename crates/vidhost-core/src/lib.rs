//! Core types, backend profiles, validation and configuration for vidhost.
//!
//! This crate provides the building blocks shared by the signing and upload
//! crates: the set of supported hosting [`Backend`]s, the per-backend
//! [`BackendProfile`] (accepted extensions, size ceiling, public URL
//! templates), pre-flight validation of upload requests, and the
//! environment-driven [`ClientConfig`].

pub mod config;
mod error;
pub mod profile;
mod types;

pub use config::{BackendEndpoint, ClientConfig, StreamableConfig};
pub use error::{CoreError, ValidationError};
pub use profile::BackendProfile;
pub use types::{AwsRegion, Backend};

/// One mebibyte, the unit the hosting services publish their limits in.
pub const MIB: u64 = 1024 * 1024;
