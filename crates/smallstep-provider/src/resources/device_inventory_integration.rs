//! `smallstep_device_inventory_integration`
//!
//! The API never returns `clientSecret`; state keeps the value last written.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::v20250101::models::{
    DeviceInventoryIntegration, IntegrationKind, IntuneIntegration, JamfIntegration,
};
use smallstep_client::{Client, ClientError, Union, UnknownVariant};
use smallstep_core::bridge::to_duration_string;
use smallstep_core::{
    Attr, AttrPath, Attribute, Diagnostic, ErrorKind, Schema, SchemaBuilder, Value,
};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::common::{encode_variant, select_branch, timestamp, union_error};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_device_inventory_integration";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInventoryIntegrationModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub kind: Attr<String>,
    pub created_at: Attr<String>,
    pub jamf: Attr<JamfModel>,
    pub intune: Attr<IntuneModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JamfModel {
    pub tenant_url: Attr<String>,
    pub client_id: Attr<String>,
    pub client_secret: Attr<String>,
    pub sync_interval: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntuneModel {
    pub tenant_id: Attr<String>,
    pub client_id: Attr<String>,
    pub client_secret: Attr<String>,
    pub sync_interval: Attr<String>,
}

/// Write-only value carried over from prior state
fn prior_secret(prior: &Value, path: &AttrPath) -> Attr<String> {
    Attr::from_option(prior.at(path).as_str().map(str::to_string))
}

impl DeviceInventoryIntegrationModel {
    pub fn from_api(api: &DeviceInventoryIntegration, prior: &Value) -> std::result::Result<Self, Diagnostic> {
        let kind = api.kind.as_str();
        let project = |e: ClientError| union_error("kind", kind, &e);
        let mut model = Self {
            id: Attr::from_option(api.id.clone()),
            name: Attr::Known(api.name.clone()),
            kind: Attr::Known(kind.to_string()),
            created_at: Attr::from_option(api.created_at.as_ref().map(timestamp)),
            ..Default::default()
        };

        match api.kind {
            IntegrationKind::Jamf => {
                let jamf = api.as_jamf().map_err(project)?;
                let path = AttrPath::root("jamf");
                model.jamf = Attr::Known(JamfModel {
                    tenant_url: Attr::Known(jamf.tenant_url),
                    client_id: Attr::Known(jamf.client_id),
                    client_secret: prior_secret(prior, &path.child("client_secret")),
                    sync_interval: to_duration_string(
                        jamf.sync_interval,
                        prior,
                        &path.child("sync_interval"),
                    ),
                });
            }
            IntegrationKind::Intune => {
                let intune = api.as_intune().map_err(project)?;
                let path = AttrPath::root("intune");
                model.intune = Attr::Known(IntuneModel {
                    tenant_id: Attr::Known(intune.tenant_id),
                    client_id: Attr::Known(intune.client_id),
                    client_secret: prior_secret(prior, &path.child("client_secret")),
                    sync_interval: to_duration_string(
                        intune.sync_interval,
                        prior,
                        &path.child("sync_interval"),
                    ),
                });
            }
        }
        Ok(model)
    }

    pub fn to_api(&self) -> StepResult<DeviceInventoryIntegration> {
        let discriminator = self.kind.as_deref().unwrap_or_default();
        let kind: IntegrationKind = discriminator.parse().map_err(|e: UnknownVariant| {
            Diagnostic::error("Invalid integration kind", e.to_string())
                .with_kind(ErrorKind::ParseError)
                .at(&AttrPath::root("kind"))
        })?;
        select_branch(
            "kind",
            discriminator,
            kind.as_str(),
            &[("jamf", self.jamf.is_known()), ("intune", self.intune.is_known())],
        )?;

        let configuration: Union = match kind {
            IntegrationKind::Jamf => {
                let jamf = self.jamf.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &JamfIntegration {
                        tenant_url: jamf.tenant_url.to_option().unwrap_or_default(),
                        client_id: jamf.client_id.to_option().unwrap_or_default(),
                        client_secret: jamf.client_secret.to_option(),
                        sync_interval: jamf.sync_interval.to_option(),
                    },
                    &AttrPath::root("jamf"),
                )?
            }
            IntegrationKind::Intune => {
                let intune = self.intune.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &IntuneIntegration {
                        tenant_id: intune.tenant_id.to_option().unwrap_or_default(),
                        client_id: intune.client_id.to_option().unwrap_or_default(),
                        client_secret: intune.client_secret.to_option(),
                        sync_interval: intune.sync_interval.to_option(),
                    },
                    &AttrPath::root("intune"),
                )?
            }
        };

        Ok(DeviceInventoryIntegration {
            id: None,
            name: self.name.to_option().unwrap_or_default(),
            kind,
            configuration,
            created_at: None,
        })
    }
}

pub fn schema() -> Result<Schema> {
    let secret = || Attribute::string().required().sensitive();
    let interval = || Attribute::string().optional_computed().use_state_for_unknown();

    let jamf = SchemaBuilder::for_component("jamfIntegration")?;
    let jamf_description = jamf.description().to_string();
    let jamf = jamf
        .attr_as("tenant_url", "tenantURL", Attribute::string().required())
        .attr_as("client_id", "clientID", Attribute::string().required())
        .attr("client_secret", secret())
        .attr("sync_interval", interval())
        .attributes();

    let intune = SchemaBuilder::for_component("intuneIntegration")?;
    let intune_description = intune.description().to_string();
    let intune = intune
        .attr_as("tenant_id", "tenantID", Attribute::string().required())
        .attr_as("client_id", "clientID", Attribute::string().required())
        .attr("client_secret", secret())
        .attr("sync_interval", interval())
        .attributes();

    Ok(SchemaBuilder::for_component("deviceInventoryIntegration")?
        .attr("id", Attribute::string().computed().use_state_for_unknown())
        .attr("name", Attribute::string().required())
        .attr(
            "kind",
            Attribute::string()
                .required()
                .requires_replace()
                .one_of(IntegrationKind::ALL.iter().copied()),
        )
        .attr("created_at", Attribute::string().computed().use_state_for_unknown())
        .attr(
            "jamf",
            Attribute::object(jamf)
                .optional()
                .exactly_one_of(["intune"])
                .describe(jamf_description),
        )
        .attr(
            "intune",
            Attribute::object(intune)
                .optional()
                .exactly_one_of(["jamf"])
                .describe(intune_description),
        )
        .build())
}

pub struct DeviceInventoryIntegrationResource {
    client: Client,
}

impl DeviceInventoryIntegrationResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for DeviceInventoryIntegrationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: DeviceInventoryIntegrationModel = decode_model(planned)?;
        let request = model.to_api()?;
        let resource = format!("device inventory integration {}", request.name);
        debug!(resource = TYPE_NAME, name = %request.name, kind = %request.kind, "creating");

        let response = self
            .client
            .v20250101()
            .post_device_inventory_integrations(&ctx.cancel, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let created: DeviceInventoryIntegration = decode_body("create", &resource, &response)?;

        info!(resource = TYPE_NAME, id = created.id.as_deref().unwrap_or_default(), "created");
        encode_model(&DeviceInventoryIntegrationModel::from_api(&created, planned)?)
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let id = identity(state, "id")?;
        let resource = format!("device inventory integration {}", id);
        debug!(resource = TYPE_NAME, id, "reading");
        let response = self
            .client
            .v20250101()
            .get_device_inventory_integration(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<DeviceInventoryIntegration>("read", &resource, &response)? {
            Fetched::Found(integration) => {
                encode_model(&DeviceInventoryIntegrationModel::from_api(&integration, state)?)
                    .map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, id, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, planned: &Value, prior: &Value) -> StepResult<Value> {
        let model: DeviceInventoryIntegrationModel = decode_model(planned)?;
        let request = model.to_api()?;
        let id = identity(prior, "id")?;
        let resource = format!("device inventory integration {}", id);
        debug!(resource = TYPE_NAME, id, "updating");

        let response = self
            .client
            .v20250101()
            .put_device_inventory_integration(&ctx.cancel, id, &request)
            .await
            .map_err(|e| client_error("update", &resource, &e))?;
        expect_status("update", &resource, &response, status::OK)?;
        let updated: DeviceInventoryIntegration = decode_body("update", &resource, &response)?;

        info!(resource = TYPE_NAME, id, "updated");
        encode_model(&DeviceInventoryIntegrationModel::from_api(&updated, planned)?)
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let id = identity(state, "id")?;
        let resource = format!("device inventory integration {}", id);
        debug!(resource = TYPE_NAME, id, "deleting");
        let response = self
            .client
            .v20250101()
            .delete_device_inventory_integration(&ctx.cancel, id)
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

    fn planned() -> Value {
        Value::from_json(&json!({
            "name": "tfprovider-jamf",
            "kind": "jamf",
            "jamf": {
                "tenant_url": "https://acme.jamfcloud.com",
                "client_id": "c1",
                "client_secret": "s3cret",
                "sync_interval": "4h"
            }
        }))
    }

    #[tokio::test]
    async fn test_secret_survives_create_and_read() {
        let server = MockServer::new();
        let resource = DeviceInventoryIntegrationResource::new(server.client());
        let state = resource.create(&Context::new(), &planned()).await.unwrap();
        assert_eq!(state.get("jamf").get("client_secret").as_str(), Some("s3cret"));

        let id = state.get("id").as_str().unwrap().to_string();
        let stored = server
            .object(&format!("/device-inventory-integrations/{}", id))
            .unwrap();
        assert_eq!(stored["configuration"]["clientSecret"], "s3cret");

        let refreshed = resource.read(&Context::new(), &state).await.unwrap().unwrap();
        assert_eq!(refreshed, state);
    }

    #[test]
    fn test_projection_failure_is_keyed_to_kind() {
        // A jamf integration whose configuration lacks the jamf fields
        let api: DeviceInventoryIntegration = serde_json::from_value(json!({
            "id": "i1",
            "name": "broken",
            "kind": "jamf",
            "configuration": {}
        }))
        .unwrap();
        let err = DeviceInventoryIntegrationModel::from_api(&api, &Value::Null).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::ParseError));
        assert_eq!(err.attribute.as_deref(), Some("kind"));
    }

    #[test]
    fn test_kind_must_match_branch() {
        let mut model: DeviceInventoryIntegrationModel = planned().decode().unwrap();
        model.kind = Attr::Known("intune".to_string());
        let diags = model.to_api().unwrap_err();
        assert!(diags.to_string().contains("requires the intune block, but jamf is set"));
    }

    #[test]
    fn test_secrets_are_sensitive() {
        let schema = schema().unwrap();
        assert!(schema.attributes["name"].is_configurable());
        for branch in ["jamf", "intune"] {
            let smallstep_core::AttributeKind::Object(attributes) = &schema.attributes[branch].kind
            else {
                panic!("{} is not an object", branch);
            };
            assert!(attributes["client_secret"].sensitive);
        }
    }
}
