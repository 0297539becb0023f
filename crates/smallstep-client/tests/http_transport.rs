//! HttpTransport against a wiremock server
//!
//! Covers headers sent with every request, status passthrough, request ids,
//! path encoding and the timeout mapping.

use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smallstep_client::v20231208::models::{Authority, NewCollection};
use smallstep_client::{Client, ClientConfig, ClientError};

// =============================================================================
// Helpers
// =============================================================================

fn client_for(server: &MockServer) -> Client {
    let config = ClientConfig {
        server_url: format!("{}/api", server.uri()),
        token: Some("test-token".to_string()),
        timeout: Duration::from_secs(5),
    };
    Client::from_config(&config).unwrap()
}

// =============================================================================
// Requests
// =============================================================================

#[tokio::test]
async fn test_sends_version_and_auth_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/authorities/a1"))
        .and(header("X-Smallstep-Api-Version", "2023-12-08"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "name": "X Authority",
            "type": "devops",
            "domain": "tfp-abc123.ca.smallstep.com",
            "createdAt": "2024-05-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .v20231208()
        .get_authority(&CancellationToken::new(), "a1")
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    let authority: Authority = response.json().unwrap();
    assert_eq!(authority.domain, "tfp-abc123.ca.smallstep.com");
    assert_eq!(authority.fingerprint, None);
}

#[tokio::test]
async fn test_put_sends_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/collections/tfprovider-devices"))
        .and(body_json(json!({"displayName": "Devices"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "tfprovider-devices",
            "displayName": "Devices",
            "instanceCount": 0,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let body = NewCollection {
        display_name: Some("Devices".to_string()),
        schema_uri: None,
    };
    let response = client
        .v20231208()
        .put_collection(&CancellationToken::new(), "tfprovider-devices", &body)
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_path_segments_are_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/authorities/a1/provisioners/my%20jwk"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .v20231208()
        .delete_provisioner(&CancellationToken::new(), "a1", "my jwk")
        .await
        .unwrap();
    assert_eq!(response.status, 204);
}

// =============================================================================
// Responses
// =============================================================================

#[tokio::test]
async fn test_error_status_is_returned_with_request_id() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/collections/busy"))
        .respond_with(
            ResponseTemplate::new(409)
                .insert_header("X-Request-Id", "01HZX7")
                .set_body_json(json!({"message": "collection is not empty"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .v20231208()
        .delete_collection(&CancellationToken::new(), "busy")
        .await
        .unwrap();

    assert_eq!(response.status, 409);
    assert_eq!(response.request_id.as_deref(), Some("01HZX7"));
    assert_eq!(response.api_error().unwrap().message, "collection is not empty");
}

#[tokio::test]
async fn test_v20250101_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/strategies"))
        .and(header("X-Smallstep-Api-Version", "2025-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .v20250101()
        .list_strategies(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.text(), "[]");
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/collections"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = ClientConfig {
        server_url: format!("{}/api", server.uri()),
        token: None,
        timeout: Duration::from_millis(200),
    };
    let client = Client::from_config(&config).unwrap();
    let result = client
        .v20231208()
        .list_collections(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ClientError::Timeout { .. })));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let config = ClientConfig {
        server_url: "http://127.0.0.1:9/api".to_string(),
        token: None,
        timeout: Duration::from_secs(2),
    };
    let client = Client::from_config(&config).unwrap();
    let result = client
        .v20231208()
        .list_authorities(&CancellationToken::new())
        .await;

    assert!(matches!(result, Err(ClientError::Network { .. })));
}
