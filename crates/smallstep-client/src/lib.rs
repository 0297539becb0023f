//! Smallstep Client - Date-versioned client for the Smallstep API
//!
//! This crate provides:
//! - Typed request/response models per API version (`v20231208`, `v20250101`)
//! - A pluggable async [`Transport`], with an HTTPS implementation
//! - Cancellation of in-flight requests through a `CancellationToken`
//! - [`mock::MockServer`], an in-memory fake of the API for tests

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod transport;
pub mod union;
pub mod v20231208;
pub mod v20250101;
pub mod version;
pub mod wire_enum;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use mock::{Failure, MockServer};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
pub use union::Union;
pub use version::ApiVersion;
pub use wire_enum::UnknownVariant;
