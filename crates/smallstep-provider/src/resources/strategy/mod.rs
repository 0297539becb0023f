//! `smallstep_strategy`

mod model;

pub use model::{BRANCHES, StrategyModel};

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20250101::models::{Strategy, StrategyKind};
use smallstep_core::{Attribute, Diagnostic, ElementKind, ErrorKind, Schema, SchemaBuilder, Value};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::common::{CertificateFieldsModel, CertificateInfoModel, KeyInfoModel};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_strategy";

const ASSURANCE: [&str; 2] = ["normal", "high"];
const OPERATING_SYSTEMS: [&str; 9] = [
    "Linux", "Windows", "macOS", "iOS", "tvOS", "watchOS", "visionOS", "iPadOS", "ChromeOS",
];
const OWNERSHIP: [&str; 2] = ["company", "user"];
const VPN_CONNECTION_TYPES: [&str; 3] = ["IPSec", "IKEv2", "SSL"];

fn branch(component: &str, name: &str, attributes: BTreeMap<String, Attribute>) -> Result<Attribute> {
    let description = SchemaBuilder::for_component(component)?
        .description()
        .to_string();
    let siblings: Vec<&str> = BRANCHES.iter().copied().filter(|b| *b != name).collect();
    Ok(Attribute::object(attributes)
        .optional()
        .exactly_one_of(siblings)
        .describe(description))
}

fn credential_schema() -> Result<Attribute> {
    let builder = SchemaBuilder::for_component("strategyCredential")?;
    let description = builder.description().to_string();
    let attributes = builder
        .attr(
            "certificate_info",
            Attribute::object(CertificateInfoModel::schema()?).required(),
        )
        .attr("key_info", KeyInfoModel::attribute()?)
        .attr(
            "certificate_data",
            Attribute::object(CertificateFieldsModel::schema()?).optional(),
        )
        .attributes();
    Ok(Attribute::object(attributes).required().describe(description))
}

fn policy_schema() -> Result<Attribute> {
    let set = || Attribute::set(ElementKind::String).optional();
    let builder = SchemaBuilder::for_component("strategyPolicy")?;
    let description = builder.description().to_string();
    let attributes = builder
        .attr("assurance", set())
        .attr("os", set())
        .attr("ownership", set())
        .attr("source", set())
        .attr("tags", set())
        .attributes();
    Ok(Attribute::object(attributes).optional().describe(description))
}

pub fn schema() -> Result<Schema> {
    let flag = || Attribute::bool().optional();
    let string = || Attribute::string().optional();
    let list = || Attribute::list(ElementKind::String).optional();

    let browser = SchemaBuilder::for_component("browserStrategy")?
        .attr("match_addresses", Attribute::list(ElementKind::String).required())
        .attributes();
    let ethernet = SchemaBuilder::for_component("ethernetStrategy")?
        .attr("autojoin", flag())
        .attr("ca_chain", string())
        .attr_as("network_access_server_ip", "networkAccessServerIP", string())
        .attributes();
    let relay = SchemaBuilder::for_component("relayStrategy")?
        .attr("match_domains", Attribute::list(ElementKind::String).required())
        .attr("regions", list())
        .attributes();
    let ssh = SchemaBuilder::for_component("sshStrategy")?
        .attr("principals", list())
        .attr("host_patterns", list())
        .attributes();
    let sso = SchemaBuilder::for_component("ssoStrategy")?
        .attr("trusted_roots", string())
        .attr_as("redirect_uri", "redirectURI", Attribute::string().required())
        .attributes();
    let vpn = SchemaBuilder::for_component("vpnStrategy")?
        .attr(
            "connection_type",
            Attribute::string().required().one_of(VPN_CONNECTION_TYPES),
        )
        .attr("remote_address", Attribute::string().required())
        .attr("autojoin", flag())
        .attr("vendor", string())
        .attributes();
    let wifi = SchemaBuilder::for_component("wifiStrategy")?
        .attr("ssid", Attribute::string().required())
        .attr("autojoin", flag())
        .attr("hidden", flag())
        .attr("ca_chain", string())
        .attr_as("network_access_server_ip", "networkAccessServerIP", string())
        .attributes();

    Ok(SchemaBuilder::for_component("strategy")?
        .attr("id", Attribute::string().computed().use_state_for_unknown())
        .attr("name", Attribute::string().required())
        .attr(
            "kind",
            Attribute::string()
                .required()
                .requires_replace()
                .one_of(StrategyKind::ALL.iter().copied()),
        )
        .attr("created_at", Attribute::string().computed().use_state_for_unknown())
        .attr("credential", credential_schema()?)
        .attr("policy", policy_schema()?)
        .attr("browser", branch("browserStrategy", "browser", browser)?)
        .attr("ethernet", branch("ethernetStrategy", "ethernet", ethernet)?)
        .attr("relay", branch("relayStrategy", "relay", relay)?)
        .attr("ssh", branch("sshStrategy", "ssh", ssh)?)
        .attr("sso", branch("ssoStrategy", "sso", sso)?)
        .attr("vpn", branch("vpnStrategy", "vpn", vpn)?)
        .attr("wifi", branch("wifiStrategy", "wifi", wifi)?)
        .build())
}

/// Policy criteria drawn from fixed vocabularies
pub fn check_policy(model: &StrategyModel) -> std::result::Result<(), Diagnostic> {
    let Some(policy) = model.policy.as_known() else {
        return Ok(());
    };
    let checks: [(&str, _, &[&str]); 3] = [
        ("policy.assurance", &policy.assurance, &ASSURANCE),
        ("policy.os", &policy.os, &OPERATING_SYSTEMS),
        ("policy.ownership", &policy.ownership, &OWNERSHIP),
    ];
    for (attribute, values, allowed) in checks {
        for value in values.as_known().into_iter().flatten() {
            if !allowed.contains(&value.as_str()) {
                return Err(Diagnostic::error(
                    "Invalid attribute value",
                    format!(
                        "{} value \"{}\" must be one of [{}]",
                        attribute,
                        value,
                        allowed.join(", ")
                    ),
                )
                .with_kind(ErrorKind::ParseError));
            }
        }
    }
    Ok(())
}

pub struct StrategyResource {
    client: Client,
}

impl StrategyResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn request(planned: &Value) -> StepResult<Strategy> {
        let model: StrategyModel = decode_model(planned)?;
        check_policy(&model)?;
        model.to_api()
    }
}

#[async_trait]
impl Resource for StrategyResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let request = Self::request(planned)?;
        let resource = format!("strategy {}", request.name);
        debug!(resource = TYPE_NAME, name = %request.name, kind = %request.kind, "creating");

        let response = self
            .client
            .v20250101()
            .post_strategies(&ctx.cancel, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let created: Strategy = decode_body("create", &resource, &response)?;

        info!(resource = TYPE_NAME, id = created.id.as_deref().unwrap_or_default(), "created");
        encode_model(&StrategyModel::from_api(&created, planned)?)
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let id = identity(state, "id")?;
        let resource = format!("strategy {}", id);
        debug!(resource = TYPE_NAME, id, "reading");
        let response = self
            .client
            .v20250101()
            .get_strategy(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<Strategy>("read", &resource, &response)? {
            Fetched::Found(strategy) => {
                encode_model(&StrategyModel::from_api(&strategy, state)?).map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, id, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, planned: &Value, prior: &Value) -> StepResult<Value> {
        let request = Self::request(planned)?;
        let id = identity(prior, "id")?;
        let resource = format!("strategy {}", id);
        debug!(resource = TYPE_NAME, id, "updating");

        let response = self
            .client
            .v20250101()
            .put_strategy(&ctx.cancel, id, &request)
            .await
            .map_err(|e| client_error("update", &resource, &e))?;
        expect_status("update", &resource, &response, status::OK)?;
        let updated: Strategy = decode_body("update", &resource, &response)?;

        info!(resource = TYPE_NAME, id, "updated");
        encode_model(&StrategyModel::from_api(&updated, planned)?)
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let id = identity(state, "id")?;
        let resource = format!("strategy {}", id);
        debug!(resource = TYPE_NAME, id, "deleting");
        let response = self
            .client
            .v20250101()
            .delete_strategy(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("delete", &resource, &e))?;
        deleted("delete", &resource, &response)?;
        info!(resource = TYPE_NAME, id, "deleted");
        Ok(())
    }

    fn import_state(&self, id: &str) -> StepResult<Value> {
        import_single("id", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallstep_client::MockServer;
    use smallstep_core::PlanModifier;

    fn planned() -> Value {
        Value::from_json(&json!({
            "name": "tfprovider-vpn",
            "kind": "vpn",
            "credential": {"certificate_info": {"type": "X509", "duration": "8h"}},
            "policy": {"os": ["macOS"], "ownership": ["company"]},
            "vpn": {"connection_type": "IKEv2", "remote_address": "vpn.example.com"}
        }))
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let server = MockServer::new();
        let resource = StrategyResource::new(server.client());
        let created = resource.create(&Context::new(), &planned()).await.unwrap();
        let credential = created.get("credential");
        assert_eq!(credential.get("certificate_info").get("duration").as_str(), Some("8h"));
        assert_eq!(credential.get("key_info").get("type").as_str(), Some("DEFAULT"));

        let mut next = created.clone();
        next.set(
            &smallstep_core::AttrPath::root("vpn").child("vendor"),
            Value::string("strongSwan"),
        )
        .unwrap();
        let updated = resource.update(&Context::new(), &next, &created).await.unwrap();

        assert_eq!(updated.get("id"), created.get("id"));
        assert_eq!(updated.get("created_at"), created.get("created_at"));
        assert_eq!(updated.get("vpn").get("vendor").as_str(), Some("strongSwan"));
        assert_eq!(server.counts().updates, 1);
    }

    #[test]
    fn test_unknown_operating_system_is_rejected() {
        let mut value = planned();
        value
            .set(
                &smallstep_core::AttrPath::root("policy").child("os"),
                Value::from_json(&json!(["BeOS"])),
            )
            .unwrap();
        let diags = StrategyResource::request(&value).unwrap_err();
        assert!(diags.to_string().contains("policy.os value \"BeOS\""));
    }

    #[test]
    fn test_only_kind_forces_replacement() {
        let schema = schema().unwrap();
        let replacing: Vec<&str> = schema
            .attributes
            .iter()
            .filter(|(_, a)| a.has_modifier(PlanModifier::RequiresReplace))
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(replacing, vec!["kind"]);
    }
}
