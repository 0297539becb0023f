//! In-memory fake of the Smallstep API
//!
//! [`MockServer`] implements [`Transport`] and behaves like the gateway for
//! the operations the controller uses: it assigns ids and timestamps,
//! canonicalises durations to Go form, inserts server defaults, keeps
//! `instanceCount` up to date and answers with `X-Request-Id` headers.
//! Tests can inject failures, delete objects behind the controller's back
//! and inspect how many operations of each kind were issued.

pub mod canon;
mod routes;

use async_trait::async_trait;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Number of operations received, by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub lists: usize,
    pub gets: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

/// A failure to answer the next matching request with
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// Answer with this status and an error body
    Status { status: u16, message: String },
    /// Fail at the transport level
    Transport { message: String },
    /// Answer with a success status and an undecodable body
    Body,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    method: Method,
    path_prefix: String,
    failure: Failure,
}

#[derive(Debug, Default)]
pub(crate) struct MockState {
    /// Stored objects keyed by their API path, e.g. `/authorities/<id>`
    pub(crate) objects: BTreeMap<String, Json>,
    pub(crate) counts: OperationCounts,
    pub(crate) decorations: serde_json::Map<String, Json>,
    log: Vec<String>,
    failures: Vec<InjectedFailure>,
    requests: u64,
}

impl MockState {
    fn take_failure(&mut self, request: &ApiRequest) -> Option<Failure> {
        let path = request.path();
        let index = self
            .failures
            .iter()
            .position(|f| f.method == request.method && path.starts_with(&f.path_prefix))?;
        Some(self.failures.remove(index).failure)
    }
}

/// Fake API server shared by every clone
#[derive(Debug, Clone, Default)]
pub struct MockServer {
    state: Arc<Mutex<MockState>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose requests are answered by this server
    pub fn client(&self) -> Client {
        Client::new(Arc::new(self.clone()))
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn counts(&self) -> OperationCounts {
        self.lock().counts
    }

    /// Every request received, as `METHOD /path`
    pub fn requests(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Answer the next `method` request under `path_prefix` with `failure`
    pub fn fail_next(&self, method: Method, path_prefix: impl Into<String>, failure: Failure) {
        self.lock().failures.push(InjectedFailure {
            method,
            path_prefix: path_prefix.into(),
            failure,
        });
    }

    /// Stored object at `path`, as the server keeps it
    pub fn object(&self, path: &str) -> Option<Json> {
        self.lock().objects.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().objects.contains_key(path)
    }

    /// Paths of the stored objects directly under `collection`
    pub fn paths_under(&self, collection: &str) -> Vec<String> {
        let state = self.lock();
        routes::children(&state.objects, collection)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Delete an object (and its children) without going through the API
    pub fn remove(&self, path: &str) -> bool {
        let mut state = self.lock();
        routes::remove_tree(&mut state.objects, path)
    }

    /// Store an object as-is, bypassing defaults and validation
    pub fn seed(&self, path: impl Into<String>, object: Json) {
        self.lock().objects.insert(path.into(), object);
    }

    /// Make collection instances come back with an extra `out_data` field
    pub fn decorate_instances(&self, key: impl Into<String>, value: Json) {
        self.lock().decorations.insert(key.into(), value);
    }
}

#[async_trait]
impl Transport for MockServer {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut state = self.lock();
        state.requests += 1;
        let request_id = format!("req-{}", state.requests);
        state.log.push(request.to_string());

        if let Some(failure) = state.take_failure(&request) {
            tracing::debug!(request = %request, ?failure, "injected failure");
            return match failure {
                Failure::Transport { message } => Err(ClientError::Network { message }),
                Failure::Status { status, message } => {
                    Ok(routes::error(status, message).with_request_id(request_id))
                }
                Failure::Body => Ok(ApiResponse::new(
                    routes::success_status(request.method),
                    b"{\"id\": ".to_vec(),
                )
                .with_request_id(request_id)),
            };
        }

        let response = routes::handle(&mut state, &request);
        Ok(response.with_request_id(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v20231208::models::{Authority, Collection, NewAuthority, NewCollection};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_authority_defaults() {
        let server = MockServer::new();
        let client = server.client();
        let cancel = CancellationToken::new();

        let response = client
            .v20231208()
            .post_authorities(
                &cancel,
                &NewAuthority {
                    name: "X Authority".to_string(),
                    kind: "devops".to_string(),
                    subdomain: "tfp-abc123".to_string(),
                    admin_emails: vec!["a@x".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.request_id.as_deref(), Some("req-1"));
        let authority: Authority = response.json().unwrap();
        assert_eq!(authority.domain, "tfp-abc123.ca.smallstep.com");
        assert_eq!(authority.active_revocation, Some(false));
        let fingerprint = authority.fingerprint.unwrap();
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(authority.root.unwrap().starts_with("-----BEGIN CERTIFICATE-----"));

        let by_domain = client
            .v20231208()
            .get_authority(&cancel, "tfp-abc123.ca.smallstep.com")
            .await
            .unwrap();
        assert_eq!(by_domain.json::<Authority>().unwrap().id, authority.id);
        assert_eq!(server.counts().creates, 1);
        assert_eq!(server.counts().gets, 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let server = MockServer::new();
        let client = server.client();
        let cancel = CancellationToken::new();
        server.fail_next(
            Method::Put,
            "/collections",
            Failure::Status {
                status: 503,
                message: "maintenance".to_string(),
            },
        );

        let body = NewCollection::default();
        let first = client
            .v20231208()
            .put_collection(&cancel, "tfprovider-c", &body)
            .await
            .unwrap();
        assert_eq!(first.status, 503);
        assert_eq!(first.api_error().unwrap().message, "maintenance");

        let second = client
            .v20231208()
            .put_collection(&cancel, "tfprovider-c", &body)
            .await
            .unwrap();
        assert_eq!(second.status, 200);
        let collection: Collection = second.json().unwrap();
        assert_eq!(collection.display_name.as_deref(), Some(""));
        assert_eq!(collection.instance_count, 0);
    }

    #[tokio::test]
    async fn test_removed_object_is_not_found() {
        let server = MockServer::new();
        let client = server.client();
        let cancel = CancellationToken::new();
        client
            .v20231208()
            .put_collection(&cancel, "c1", &NewCollection::default())
            .await
            .unwrap();

        assert!(server.remove("/collections/c1"));
        let response = client.v20231208().get_collection(&cancel, "c1").await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(
            server.requests(),
            vec!["PUT /collections/c1", "GET /collections/c1"]
        );
    }
}
