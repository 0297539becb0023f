//! Error types for API calls

use thiserror::Error;

/// Client errors
///
/// Non-success HTTP statuses are not errors at this layer; they come back as
/// an [`crate::ApiResponse`] for the caller to interpret.
#[derive(Debug, Error)]
pub enum ClientError {
    // ============ Transport Errors ============
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Request cancelled")]
    Cancelled,

    // ============ Payload Errors ============
    #[error("Failed to encode request body: {message}")]
    Encode { message: String },

    #[error("Failed to decode response body: {message}")]
    Decode { message: String },

    #[error("Payload is not a valid {variant}: {message}")]
    Union { variant: String, message: String },

    // ============ Configuration Errors ============
    #[error("Invalid server URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid client configuration: {message}")]
    Config { message: String },
}

/// Result type for API calls
pub type Result<T> = std::result::Result<T, ClientError>;

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
