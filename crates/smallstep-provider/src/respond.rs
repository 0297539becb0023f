//! Turning API outcomes into diagnostics
//!
//! Every lifecycle step reports failures the same way: transport failures
//! and undecodable bodies are `client_error`, unexpected statuses are
//! `response_error` carrying the status, the `X-Request-Id` header and the
//! server's message.

use serde::de::DeserializeOwned;

use smallstep_client::{ApiResponse, ClientError};
use smallstep_core::{Diagnostic, ErrorKind};

/// HTTP statuses the controllers branch on
pub mod status {
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const NO_CONTENT: u16 = 204;
    pub const NOT_FOUND: u16 = 404;
}

/// Transport failure while `operation` was running on `resource`
pub fn client_error(operation: &str, resource: &str, err: &ClientError) -> Diagnostic {
    Diagnostic::error(
        "Smallstep API Client Error",
        format!("Failed to {} {}: {}", operation, resource, err),
    )
    .with_kind(ErrorKind::ClientError)
}

/// Unexpected status answering `operation` on `resource`
pub fn response_error(operation: &str, resource: &str, response: &ApiResponse) -> Diagnostic {
    let request_id = response.request_id.as_deref().unwrap_or("unknown");
    let message = match response.api_error() {
        Some(body) => body.message,
        None => {
            let text = response.text();
            if text.is_empty() {
                "(empty response body)".to_string()
            } else {
                text
            }
        }
    };
    Diagnostic::error(
        "Smallstep API Response Error",
        format!(
            "Request {} to {} {} received status {}: {}",
            request_id, operation, resource, response.status, message
        ),
    )
    .with_kind(ErrorKind::ResponseError)
}

/// Require exactly `expected`
pub fn expect_status(
    operation: &str,
    resource: &str,
    response: &ApiResponse,
    expected: u16,
) -> Result<(), Diagnostic> {
    if response.status == expected {
        Ok(())
    } else {
        Err(response_error(operation, resource, response))
    }
}

/// Decode a success body
pub fn decode_body<T: DeserializeOwned>(
    operation: &str,
    resource: &str,
    response: &ApiResponse,
) -> Result<T, Diagnostic> {
    response
        .json()
        .map_err(|e| client_error(operation, resource, &e))
}

/// Outcome of a GET in a read step
pub enum Fetched<T> {
    Found(T),
    Gone,
}

/// Interpret a GET answered for a read: 200 decodes, 404 is drift
pub fn fetched<T: DeserializeOwned>(
    operation: &str,
    resource: &str,
    response: &ApiResponse,
) -> Result<Fetched<T>, Diagnostic> {
    match response.status {
        status::OK => decode_body(operation, resource, response).map(Fetched::Found),
        status::NOT_FOUND => Ok(Fetched::Gone),
        _ => Err(response_error(operation, resource, response)),
    }
}

/// Interpret a DELETE: 204 and 404 both succeed
pub fn deleted(operation: &str, resource: &str, response: &ApiResponse) -> Result<(), Diagnostic> {
    match response.status {
        status::NO_CONTENT | status::NOT_FOUND => Ok(()),
        _ => Err(response_error(operation, resource, response)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_error_carries_request_id_and_message() {
        let response = ApiResponse::new(409, br#"{"message":"name already in use"}"#.to_vec())
            .with_request_id("req-7");
        let diagnostic = response_error("create", "provisioner tfprovider-jwk", &response);
        assert_eq!(diagnostic.kind, Some(ErrorKind::ResponseError));
        insta::assert_snapshot!(diagnostic.to_string(), @"[response_error] Smallstep API Response Error: Request req-7 to create provisioner tfprovider-jwk received status 409: name already in use");
    }

    #[test]
    fn test_response_error_without_json_body() {
        let response = ApiResponse::new(502, b"bad gateway".to_vec());
        let diagnostic = response_error("read", "authority a1", &response);
        assert!(diagnostic.detail.contains("Request unknown"));
        assert!(diagnostic.detail.ends_with("502: bad gateway"));
    }

    #[test]
    fn test_deleted_is_idempotent() {
        assert!(deleted("delete", "x", &ApiResponse::new(204, Vec::new())).is_ok());
        assert!(deleted("delete", "x", &ApiResponse::new(404, Vec::new())).is_ok());
        assert!(deleted("delete", "x", &ApiResponse::new(500, Vec::new())).is_err());
    }

    #[test]
    fn test_undecodable_body_is_client_error() {
        let response = ApiResponse::new(200, b"{\"id\": ".to_vec());
        let err = decode_body::<serde_json::Value>("read", "authority a1", &response).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::ClientError));
        assert!(err.detail.starts_with("Failed to read authority a1: Failed to decode response body"));
    }
}
