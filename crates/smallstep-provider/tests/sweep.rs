//! Sweeping leftover acceptance objects

use chrono::Utc;
use serde_json::json;
use smallstep_client::{Failure, Method, MockServer};
use smallstep_provider::harness::Config;
use smallstep_provider::{Harness, ProviderError, SweepConfig, SweepKind, Sweeper};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const OLD: &str = "2024-01-01T00:00:00Z";

fn collection(server: &MockServer, slug: &str, created_at: &str) {
    server.seed(
        format!("/collections/{}", slug),
        json!({"slug": slug, "createdAt": created_at, "updatedAt": created_at}),
    );
}

fn instance(server: &MockServer, slug: &str, id: &str) {
    server.seed(
        format!("/collections/{}/instances/{}", slug, id),
        json!({"id": id, "data": {}, "createdAt": OLD, "updatedAt": OLD}),
    );
}

fn agent_configuration(server: &MockServer, id: &str, name: &str) {
    server.seed(
        format!("/agent-configurations/{}", id),
        json!({
            "id": id,
            "authorityID": "authority",
            "provisioner": "agents",
            "name": name,
            "attestationSlug": "fleet"
        }),
    );
}

fn sweeper(server: &MockServer, age: Duration) -> Sweeper {
    Sweeper::new(
        server.client(),
        SweepConfig {
            prefix: "tfprovider".to_string(),
            age,
            include_undated: false,
        },
    )
}

#[tokio::test]
async fn test_sweeps_prefixed_objects_older_than_age() {
    let server = MockServer::new();
    let fresh = Utc::now().to_rfc3339();
    collection(&server, "tfprovider-old", OLD);
    collection(&server, "tfprovider-fresh", &fresh);
    collection(&server, "production", OLD);

    let report = sweeper(&server, Duration::from_secs(3600))
        .sweep(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.deleted,
        vec![(SweepKind::Collection, "tfprovider-old".to_string())]
    );
    assert!(!server.contains("/collections/tfprovider-old"));
    assert!(server.contains("/collections/tfprovider-fresh"));
    assert!(server.contains("/collections/production"));
}

#[tokio::test]
async fn test_collections_are_emptied_first() {
    let server = MockServer::new();
    collection(&server, "tfprovider-full", OLD);
    instance(&server, "tfprovider-full", "a");
    instance(&server, "tfprovider-full", "b");

    let swept = sweeper(&server, Duration::from_secs(60))
        .sweep_kind(&CancellationToken::new(), SweepKind::Collection)
        .await
        .unwrap();

    assert_eq!(swept, vec!["tfprovider-full".to_string()]);
    assert!(server.paths_under("/collections").is_empty());
    assert_eq!(server.counts().deletes, 3);
}

#[tokio::test]
async fn test_kinds_without_creation_time_are_kept_by_default() {
    let server = MockServer::new();
    agent_configuration(&server, "ac-1", "tfprovider-agents");

    let report = sweeper(&server, Duration::ZERO)
        .sweep(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.count(SweepKind::AgentConfiguration), 0);
    assert!(server.contains("/agent-configurations/ac-1"));
}

#[tokio::test]
async fn test_undated_kinds_match_on_prefix_when_included() {
    let server = MockServer::new();
    agent_configuration(&server, "ac-1", "tfprovider-agents");
    agent_configuration(&server, "ac-2", "laptops");

    let config = SweepConfig {
        prefix: "tfprovider".to_string(),
        age: Duration::from_secs(24 * 3600),
        include_undated: true,
    };
    let report = Sweeper::new(server.client(), config)
        .sweep(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.count(SweepKind::AgentConfiguration), 1);
    assert!(!server.contains("/agent-configurations/ac-1"));
    assert!(server.contains("/agent-configurations/ac-2"));
}

#[tokio::test]
async fn test_sweeps_objects_created_through_the_provider() {
    let mut harness = Harness::new();
    harness
        .apply(
            &Config::new()
                .resource(
                    "smallstep_collection",
                    "hosts",
                    json!({"slug": "tfprovider-hosts"}),
                )
                .resource(
                    "smallstep_strategy",
                    "ssh",
                    json!({
                        "name": "tfprovider-ssh",
                        "kind": "ssh",
                        "credential": {"certificate_info": {"type": "SSH_USER"}},
                        "ssh": {"principals": ["ops"]}
                    }),
                ),
        )
        .await
        .unwrap();
    let server = harness.server().unwrap();

    let report = sweeper(server, Duration::ZERO)
        .sweep(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.count(SweepKind::Collection), 1);
    assert_eq!(report.count(SweepKind::Strategy), 1);
    assert!(server.paths_under("/collections").is_empty());
    assert!(server.paths_under("/strategies").is_empty());
}

#[tokio::test]
async fn test_failed_delete_stops_the_sweep() {
    let server = MockServer::new();
    collection(&server, "tfprovider-stuck", OLD);
    server.fail_next(
        Method::Delete,
        "/collections/tfprovider-stuck",
        Failure::Status {
            status: 500,
            message: "internal error".to_string(),
        },
    );

    let err = sweeper(&server, Duration::from_secs(60))
        .sweep(&CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ProviderError::Sweep { kind, id, message } => {
            assert_eq!(kind, "collection");
            assert_eq!(id, "tfprovider-stuck");
            assert!(message.contains("internal error"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(server.contains("/collections/tfprovider-stuck"));
}

#[tokio::test]
async fn test_missing_objects_are_not_an_error() {
    let server = MockServer::new();
    collection(&server, "tfprovider-racing", OLD);
    server.fail_next(
        Method::Delete,
        "/collections/tfprovider-racing",
        Failure::Status {
            status: 404,
            message: "not found".to_string(),
        },
    );

    let report = sweeper(&server, Duration::from_secs(60))
        .sweep(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.count(SweepKind::Collection), 1);
}
