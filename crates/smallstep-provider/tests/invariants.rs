//! Properties every resource kind must hold

use serde_json::json;
use smallstep_client::MockServer;
use smallstep_core::{ErrorKind, PlanAction, Value};
use smallstep_provider::harness::{Config, Step};
use smallstep_provider::{Context, Harness, HarnessError, SmallstepProvider};

mod round_trip {
    use super::*;

    #[tokio::test]
    async fn test_canonicalised_values_do_not_drift() {
        let mut harness = Harness::new();
        let config = Config::new()
            .resource(
                "smallstep_collection",
                "hosts",
                json!({"slug": "tfprovider-hosts"}),
            )
            .resource(
                "smallstep_collection_instance",
                "web",
                json!({
                    "collection_slug": "${smallstep_collection.hosts.slug}",
                    "id": "web",
                    "data": "{\n  \"port\": 443,\n  \"hostname\": \"web\"\n}"
                }),
            )
            .resource(
                "smallstep_strategy",
                "wifi",
                json!({
                    "name": "tfprovider-wifi",
                    "kind": "wifi",
                    "credential": {"certificate_info": {"type": "X509", "duration": "1h"}},
                    "wifi": {"ssid": "corp"}
                }),
            );

        // apply fails if the plan after refresh is not empty
        harness.apply(&config).await.unwrap();

        let server = harness.server().unwrap();
        let strategy_id = harness.attribute("smallstep_strategy.wifi", "id").unwrap();
        let stored = server
            .object(&format!("/strategies/{}", strategy_id.as_str().unwrap()))
            .unwrap();
        assert_eq!(stored["credential"]["certificateInfo"]["duration"], "1h0m0s");
        assert_eq!(
            harness
                .attribute("smallstep_strategy.wifi", "credential.certificate_info.duration")
                .unwrap(),
            Value::string("1h")
        );
        assert!(harness.plan(&config).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_defaults_are_not_drift() {
        let mut harness = Harness::new();
        let config = Config::new().resource(
            "smallstep_device_collection",
            "dc",
            json!({
                "slug": "tfprovider-dc",
                "display_name": "Fleet",
                "device_type": "tpm",
                "tpm": {}
            }),
        );
        harness.apply(&config).await.unwrap();

        // the server answers with adminEmails: []
        let state = harness.state("smallstep_device_collection.dc").unwrap();
        assert!(state.get("admin_emails").is_null());
        assert!(state.get("tpm").get("force_cn").is_null());
    }
}

mod polymorphism {
    use super::*;

    fn strategy(branches: serde_json::Value) -> Config {
        let mut config = json!({
            "name": "tfprovider-strategy",
            "kind": "ssh",
            "credential": {"certificate_info": {"type": "SSH_USER"}}
        });
        if let (Some(config), Some(branches)) = (config.as_object_mut(), branches.as_object()) {
            config.extend(branches.clone());
        }
        Config::new().resource("smallstep_strategy", "s", config)
    }

    #[tokio::test]
    async fn test_no_branch_is_a_parse_error() {
        let mut harness = Harness::new();
        let err = harness.apply(&strategy(json!({}))).await.unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::ParseError));
        assert_eq!(harness.server().unwrap().counts().creates, 0);
    }

    #[tokio::test]
    async fn test_two_branches_are_a_parse_error() {
        let mut harness = Harness::new();
        let err = harness
            .apply(&strategy(json!({
                "ssh": {"principals": ["ops"]},
                "browser": {"match_addresses": ["*.example.com"]}
            })))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::ParseError));
        assert!(err.to_string().contains("found 2"));
    }

    #[tokio::test]
    async fn test_one_branch_succeeds() {
        let mut harness = Harness::new();
        harness
            .apply(&strategy(json!({"ssh": {"principals": ["ops"]}})))
            .await
            .unwrap();
        assert_eq!(harness.server().unwrap().counts().creates, 1);
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let server = MockServer::new();
        let provider = SmallstepProvider::with_client(server.client());
        let mut harness = Harness::with_client(server.client());
        harness
            .apply(&Config::new().resource(
                "smallstep_attestation_authority",
                "fleet",
                json!({
                    "name": "tfprovider-fleet",
                    "catalog": "devices",
                    "attestor_roots": "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n"
                }),
            ))
            .await
            .unwrap();
        let state = harness
            .state("smallstep_attestation_authority.fleet")
            .unwrap()
            .clone();

        let resource = provider.resource("smallstep_attestation_authority").unwrap();
        resource.delete(&Context::new(), &state).await.unwrap();
        resource.delete(&Context::new(), &state).await.unwrap();
        assert_eq!(server.counts().deletes, 2);
    }

    #[tokio::test]
    async fn test_read_of_missing_object_heals_state() {
        let mut harness = Harness::new();
        let config = Config::new().resource(
            "smallstep_collection",
            "hosts",
            json!({"slug": "tfprovider-gone"}),
        );
        harness.apply(&config).await.unwrap();

        assert!(harness.server().unwrap().remove("/collections/tfprovider-gone"));
        harness.refresh().await.unwrap();
        assert!(harness.state("smallstep_collection.hosts").is_none());

        // the next apply recreates it
        harness.apply(&config).await.unwrap();
        assert!(harness.server().unwrap().contains("/collections/tfprovider-gone"));
    }

    #[tokio::test]
    async fn test_apply_recreates_object_deleted_remotely() {
        let mut harness = Harness::new();
        let config = Config::new().resource(
            "smallstep_collection",
            "hosts",
            json!({"slug": "tfprovider-deleted"}),
        );
        harness.apply(&config).await.unwrap();
        assert!(harness.server().unwrap().remove("/collections/tfprovider-deleted"));

        let applied = harness.apply(&config).await.unwrap();
        assert_eq!(
            applied.action("smallstep_collection.hosts"),
            Some(PlanAction::Create)
        );
        assert!(harness.server().unwrap().contains("/collections/tfprovider-deleted"));
        assert_eq!(harness.server().unwrap().counts().creates, 2);
    }

    #[tokio::test]
    async fn test_apply_reverts_remote_drift() {
        let mut harness = Harness::new();
        let config = Config::new().resource(
            "smallstep_collection",
            "hosts",
            json!({"slug": "tfprovider-drift", "display_name": "Hosts"}),
        );
        harness.apply(&config).await.unwrap();

        let server = harness.server().unwrap();
        let mut stored = server.object("/collections/tfprovider-drift").unwrap();
        stored["displayName"] = json!("Renamed by hand");
        server.seed("/collections/tfprovider-drift", stored);

        let applied = harness.apply(&config).await.unwrap();
        assert_eq!(
            applied.action("smallstep_collection.hosts"),
            Some(PlanAction::Update)
        );
        let stored = harness
            .server()
            .unwrap()
            .object("/collections/tfprovider-drift")
            .unwrap();
        assert_eq!(stored["displayName"], "Hosts");
    }

    #[tokio::test]
    async fn test_plan_step_sees_remote_deletion() {
        let mut harness = Harness::new();
        let config = Config::new().resource(
            "smallstep_collection",
            "hosts",
            json!({"slug": "tfprovider-planned"}),
        );
        harness.apply(&config).await.unwrap();
        assert!(harness.server().unwrap().remove("/collections/tfprovider-planned"));

        let err = harness.run([Step::Plan(config)]).await.unwrap_err();
        assert!(matches!(err, HarnessError::NonEmptyPlan { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_non_empty_collection_guard_skips_delete() {
        let server = MockServer::new();
        let provider = SmallstepProvider::with_client(server.client());
        server.seed(
            "/collections/tfprovider-full",
            json!({
                "slug": "tfprovider-full",
                "createdAt": "2024-05-01T10:00:00Z",
                "updatedAt": "2024-05-01T10:00:00Z"
            }),
        );
        server.seed(
            "/collections/tfprovider-full/instances/one",
            json!({
                "id": "one",
                "data": {},
                "createdAt": "2024-05-01T10:00:00Z",
                "updatedAt": "2024-05-01T10:00:00Z"
            }),
        );

        let resource = provider.resource("smallstep_collection").unwrap();
        let state = Value::from_json(&json!({"slug": "tfprovider-full"}));
        let diags = resource.delete(&Context::new(), &state).await.unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::DeletePrecondition));
        assert_eq!(server.counts().deletes, 0);
    }
}

mod import {
    use super::*;

    #[tokio::test]
    async fn test_composite_id_shape() {
        let mut harness = Harness::new();
        let err = harness
            .import("smallstep_collection_instance", "smallstep_collection_instance.x", "only-one")
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), Some(ErrorKind::ImportShape));
    }

    #[tokio::test]
    async fn test_strategy_import_matches_created_state() {
        let config = Config::new().resource(
            "smallstep_strategy",
            "vpn",
            json!({
                "name": "tfprovider-vpn",
                "kind": "vpn",
                "credential": {"certificate_info": {"type": "X509"}},
                "vpn": {"connection_type": "IKEv2", "remote_address": "vpn.example.com"}
            }),
        );
        let mut created = Harness::new();
        created.apply(&config).await.unwrap();
        let id = created.attribute("smallstep_strategy.vpn", "id").unwrap();

        let server = created.server().unwrap().clone();
        let mut imported = Harness::with_client(server.client());
        imported
            .import("smallstep_strategy", "smallstep_strategy.vpn", id.as_str().unwrap())
            .await
            .unwrap();
        assert_eq!(
            imported.state("smallstep_strategy.vpn"),
            created.state("smallstep_strategy.vpn")
        );
    }

    #[tokio::test]
    async fn test_address_already_managed() {
        let mut harness = Harness::new();
        harness
            .apply(&Config::new().resource(
                "smallstep_collection",
                "hosts",
                json!({"slug": "tfprovider-hosts"}),
            ))
            .await
            .unwrap();
        let err = harness
            .import("smallstep_collection", "smallstep_collection.hosts", "tfprovider-hosts")
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateAddress { .. }));
    }
}
