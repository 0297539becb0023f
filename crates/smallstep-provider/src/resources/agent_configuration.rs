//! `smallstep_agent_configuration`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::AgentConfiguration;
use smallstep_core::{Attr, Attribute, Schema, SchemaBuilder, Value};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_agent_configuration";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfigurationModel {
    pub id: Attr<String>,
    pub authority_id: Attr<String>,
    pub provisioner: Attr<String>,
    pub name: Attr<String>,
    pub attestation_slug: Attr<String>,
}

impl AgentConfigurationModel {
    pub fn from_api(api: &AgentConfiguration) -> Self {
        Self {
            id: Attr::from_option(api.id.clone()),
            authority_id: Attr::Known(api.authority_id.clone()),
            provisioner: Attr::Known(api.provisioner.clone()),
            name: Attr::Known(api.name.clone()),
            attestation_slug: Attr::Known(api.attestation_slug.clone()),
        }
    }

    pub fn to_api(&self) -> AgentConfiguration {
        AgentConfiguration {
            id: None,
            authority_id: self.authority_id.to_option().unwrap_or_default(),
            provisioner: self.provisioner.to_option().unwrap_or_default(),
            name: self.name.to_option().unwrap_or_default(),
            attestation_slug: self.attestation_slug.to_option().unwrap_or_default(),
        }
    }
}

pub fn schema() -> Result<Schema> {
    Ok(SchemaBuilder::for_component("agentConfiguration")?
        .attr("id", Attribute::string().computed().use_state_for_unknown())
        .attr_as("authority_id", "authorityID", Attribute::string().required())
        .attr("provisioner", Attribute::string().required())
        .attr("name", Attribute::string().required())
        .attr("attestation_slug", Attribute::string().required())
        .build())
}

pub struct AgentConfigurationResource {
    client: Client,
}

impl AgentConfigurationResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for AgentConfigurationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: AgentConfigurationModel = decode_model(planned)?;
        let request = model.to_api();
        let resource = format!("agent configuration {}", request.name);
        debug!(resource = TYPE_NAME, name = %request.name, "creating");

        let response = self
            .client
            .v20231208()
            .post_agent_configurations(&ctx.cancel, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let created: AgentConfiguration = decode_body("create", &resource, &response)?;

        info!(resource = TYPE_NAME, id = created.id.as_deref().unwrap_or_default(), "created");
        encode_model(&AgentConfigurationModel::from_api(&created))
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let id = identity(state, "id")?;
        let resource = format!("agent configuration {}", id);
        debug!(resource = TYPE_NAME, id, "reading");
        let response = self
            .client
            .v20231208()
            .get_agent_configuration(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<AgentConfiguration>("read", &resource, &response)? {
            Fetched::Found(config) => {
                encode_model(&AgentConfigurationModel::from_api(&config)).map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, id, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, planned: &Value, prior: &Value) -> StepResult<Value> {
        let id = identity(prior, "id")?;
        let model: AgentConfigurationModel = decode_model(planned)?;
        let mut request = model.to_api();
        request.id = Some(id.to_string());
        let resource = format!("agent configuration {}", id);
        debug!(resource = TYPE_NAME, id, "updating");

        let response = self
            .client
            .v20231208()
            .put_agent_configuration(&ctx.cancel, id, &request)
            .await
            .map_err(|e| client_error("update", &resource, &e))?;
        expect_status("update", &resource, &response, status::OK)?;
        let updated: AgentConfiguration = decode_body("update", &resource, &response)?;

        info!(resource = TYPE_NAME, id, "updated");
        encode_model(&AgentConfigurationModel::from_api(&updated))
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let id = identity(state, "id")?;
        let resource = format!("agent configuration {}", id);
        debug!(resource = TYPE_NAME, id, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_agent_configuration(&ctx.cancel, id)
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
