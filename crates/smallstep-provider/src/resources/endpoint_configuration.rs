//! `smallstep_endpoint_configuration`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::EndpointConfiguration;
use smallstep_core::{Attr, AttrPath, Attribute, Diagnostics, Schema, SchemaBuilder, Value};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::common::{CertificateInfoModel, HooksModel, KeyInfoModel, ReloadInfoModel};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_endpoint_configuration";

pub const ENDPOINT_KINDS: [&str; 2] = ["WORKLOAD", "PEOPLE"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfigurationModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub kind: Attr<String>,
    pub authority_id: Attr<String>,
    pub provisioner: Attr<String>,
    pub certificate_info: Attr<CertificateInfoModel>,
    pub key_info: Attr<KeyInfoModel>,
    pub reload_info: Attr<ReloadInfoModel>,
    pub hooks: Attr<HooksModel>,
}

impl EndpointConfigurationModel {
    pub fn from_api(api: &EndpointConfiguration, prior: &Value) -> Self {
        let path = AttrPath::root;
        Self {
            id: Attr::from_option(api.id.clone()),
            name: Attr::Known(api.name.clone()),
            kind: Attr::Known(api.kind.clone()),
            authority_id: Attr::Known(api.authority_id.clone()),
            provisioner: Attr::Known(api.provisioner.clone()),
            certificate_info: Attr::Known(CertificateInfoModel::from_api(
                &api.certificate_info,
                prior,
                &path("certificate_info"),
            )),
            key_info: KeyInfoModel::from_api(api.key_info.as_ref(), prior, &path("key_info")),
            reload_info: ReloadInfoModel::from_api(
                api.reload_info.as_ref(),
                prior,
                &path("reload_info"),
            ),
            hooks: HooksModel::from_api(api.hooks.as_ref(), prior, &path("hooks")),
        }
    }

    pub fn to_api(&self) -> StepResult<EndpointConfiguration> {
        let mut diags = Diagnostics::new();
        let certificate_info = self
            .certificate_info
            .as_known()
            .cloned()
            .unwrap_or_default()
            .to_api(&AttrPath::root("certificate_info"))
            .unwrap_or_else(|d| {
                diags.extend(d);
                Default::default()
            });
        let reload_info = self.reload_info.as_known().and_then(|reload| {
            reload
                .to_api(&AttrPath::root("reload_info"))
                .map_err(|d| diags.push(d))
                .ok()
        });

        diags.into_result(EndpointConfiguration {
            id: None,
            name: self.name.to_option().unwrap_or_default(),
            kind: self.kind.to_option().unwrap_or_default(),
            authority_id: self.authority_id.to_option().unwrap_or_default(),
            provisioner: self.provisioner.to_option().unwrap_or_default(),
            certificate_info,
            key_info: self.key_info.as_known().map(KeyInfoModel::to_api),
            reload_info,
            hooks: self.hooks.as_known().map(HooksModel::to_api),
        })
    }
}

pub fn schema() -> Result<Schema> {
    Ok(SchemaBuilder::for_component("endpointConfiguration")?
        .attr("id", Attribute::string().computed().use_state_for_unknown())
        .attr("name", Attribute::string().required().requires_replace())
        .attr(
            "kind",
            Attribute::string()
                .required()
                .requires_replace()
                .one_of(ENDPOINT_KINDS),
        )
        .attr_as(
            "authority_id",
            "authorityID",
            Attribute::string().required().requires_replace(),
        )
        .attr("provisioner", Attribute::string().required().requires_replace())
        .attr(
            "certificate_info",
            Attribute::object(CertificateInfoModel::schema()?)
                .required()
                .requires_replace(),
        )
        .attr("key_info", KeyInfoModel::attribute()?.requires_replace())
        .attr(
            "reload_info",
            Attribute::object(ReloadInfoModel::schema()?)
                .optional()
                .requires_replace(),
        )
        .attr(
            "hooks",
            Attribute::object(HooksModel::schema()?)
                .optional()
                .requires_replace(),
        )
        .build())
}

/// Endpoint configurations cannot be changed once created
pub struct EndpointConfigurationResource {
    client: Client,
}

impl EndpointConfigurationResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for EndpointConfigurationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: EndpointConfigurationModel = decode_model(planned)?;
        let request = model.to_api()?;
        let resource = format!("endpoint configuration {}", request.name);
        debug!(resource = TYPE_NAME, name = %request.name, "creating");

        let response = self
            .client
            .v20231208()
            .post_endpoint_configurations(&ctx.cancel, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let created: EndpointConfiguration = decode_body("create", &resource, &response)?;

        info!(resource = TYPE_NAME, id = created.id.as_deref().unwrap_or_default(), "created");
        encode_model(&EndpointConfigurationModel::from_api(&created, planned))
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let id = identity(state, "id")?;
        let resource = format!("endpoint configuration {}", id);
        debug!(resource = TYPE_NAME, id, "reading");
        let response = self
            .client
            .v20231208()
            .get_endpoint_configuration(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<EndpointConfiguration>("read", &resource, &response)? {
            Fetched::Found(config) => {
                encode_model(&EndpointConfigurationModel::from_api(&config, state)).map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, id, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, _ctx: &Context, planned: &Value, _prior: &Value) -> StepResult<Value> {
        Ok(planned.clone())
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let id = identity(state, "id")?;
        let resource = format!("endpoint configuration {}", id);
        debug!(resource = TYPE_NAME, id, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_endpoint_configuration(&ctx.cancel, id)
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
