//! `smallstep_managed_configuration`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::{
    ManagedConfiguration, ManagedEndpoint, SshFields, X509Fields,
};
use smallstep_core::bridge::{to_optional_list, to_optional_string};
use smallstep_core::{
    Attr, AttrPath, Attribute, Diagnostic, Diagnostics, ElementKind, ErrorKind, Schema, SchemaBuilder,
    Value,
};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_managed_configuration";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedConfigurationModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub agent_configuration_id: Attr<String>,
    pub host_id: Attr<String>,
    pub managed_endpoints: Attr<Vec<ManagedEndpointModel>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedEndpointModel {
    pub id: Attr<String>,
    pub endpoint_configuration_id: Attr<String>,
    pub x509_certificate_data: Attr<X509FieldsModel>,
    pub ssh_certificate_data: Attr<SshFieldsModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct X509FieldsModel {
    pub common_name: Attr<String>,
    pub sans: Attr<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshFieldsModel {
    pub key_id: Attr<String>,
    pub principals: Attr<Vec<String>>,
}

/// Index of the prior element managing the same endpoint configuration
fn prior_index(prior: &Value, endpoint_configuration_id: &str) -> Option<usize> {
    prior
        .get("managed_endpoints")
        .as_list()?
        .iter()
        .position(|e| e.get("endpoint_configuration_id").as_str() == Some(endpoint_configuration_id))
}

impl ManagedEndpointModel {
    fn from_api(api: &ManagedEndpoint, prior: &Value, path: &AttrPath) -> Self {
        Self {
            id: Attr::from_option(api.id.clone()),
            endpoint_configuration_id: Attr::Known(api.endpoint_configuration_id.clone()),
            x509_certificate_data: api.x509_certificate_data.as_ref().map_or(Attr::Null, |x509| {
                let path = path.child("x509_certificate_data");
                Attr::Known(X509FieldsModel {
                    common_name: Attr::Known(x509.common_name.clone()),
                    sans: to_optional_list(x509.sans.clone(), prior, &path.child("sans")),
                })
            }),
            ssh_certificate_data: api.ssh_certificate_data.as_ref().map_or(Attr::Null, |ssh| {
                Attr::Known(SshFieldsModel {
                    key_id: Attr::Known(ssh.key_id.clone()),
                    principals: Attr::Known(ssh.principals.clone()),
                })
            }),
        }
    }

    /// Certificate data for exactly one of x509 or ssh
    fn to_api(&self, path: &AttrPath) -> StepResult<ManagedEndpoint> {
        let set = [
            self.x509_certificate_data.is_known(),
            self.ssh_certificate_data.is_known(),
        ]
        .iter()
        .filter(|present| **present)
        .count();
        if set != 1 {
            return Err(Diagnostic::error(
                "Invalid attribute combination",
                format!(
                    "{}: exactly one of x509_certificate_data or ssh_certificate_data must be set, found {}",
                    path, set
                ),
            )
            .with_kind(ErrorKind::ParseError)
            .at(path)
            .into());
        }

        Ok(ManagedEndpoint {
            id: None,
            endpoint_configuration_id: self.endpoint_configuration_id.to_option().unwrap_or_default(),
            x509_certificate_data: self.x509_certificate_data.as_known().map(|x509| X509Fields {
                common_name: x509.common_name.to_option().unwrap_or_default(),
                sans: x509.sans.to_option(),
            }),
            ssh_certificate_data: self.ssh_certificate_data.as_known().map(|ssh| SshFields {
                key_id: ssh.key_id.to_option().unwrap_or_default(),
                principals: ssh.principals.to_option().unwrap_or_default(),
            }),
        })
    }
}

impl ManagedConfigurationModel {
    pub fn from_api(api: &ManagedConfiguration, prior: &Value) -> Self {
        let root = AttrPath::root("managed_endpoints");
        let mut endpoints: Vec<(Option<usize>, ManagedEndpointModel)> = api
            .managed_endpoints
            .iter()
            .map(|endpoint| {
                let index = prior_index(prior, &endpoint.endpoint_configuration_id);
                let model = match index {
                    Some(i) => ManagedEndpointModel::from_api(endpoint, prior, &root.element(i)),
                    None => ManagedEndpointModel::from_api(endpoint, &Value::Null, &root.element(0)),
                };
                (index, model)
            })
            .collect();
        // Keep the order the user wrote; new endpoints go last
        endpoints.sort_by_key(|(index, _)| index.unwrap_or(usize::MAX));
        let endpoints = endpoints.into_iter().map(|(_, model)| model).collect();

        Self {
            id: Attr::from_option(api.id.clone()),
            name: Attr::Known(api.name.clone()),
            agent_configuration_id: Attr::Known(api.agent_configuration_id.clone()),
            host_id: to_optional_string(api.host_id.clone(), prior, &AttrPath::root("host_id")),
            managed_endpoints: Attr::Known(endpoints),
        }
    }

    pub fn to_api(&self) -> StepResult<ManagedConfiguration> {
        let root = AttrPath::root("managed_endpoints");
        let mut diags = Diagnostics::new();
        let mut endpoints = Vec::new();
        for (i, endpoint) in self.managed_endpoints.as_known().into_iter().flatten().enumerate() {
            match endpoint.to_api(&root.element(i)) {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(errors) => diags.extend(errors),
            }
        }

        diags.into_result(ManagedConfiguration {
            id: None,
            name: self.name.to_option().unwrap_or_default(),
            agent_configuration_id: self.agent_configuration_id.to_option().unwrap_or_default(),
            host_id: self.host_id.to_option(),
            managed_endpoints: endpoints,
        })
    }
}

pub fn schema() -> Result<Schema> {
    let x509 = SchemaBuilder::for_component("x509Fields")?
        .attr("common_name", Attribute::string().required())
        .attr("sans", Attribute::list(ElementKind::String).optional())
        .attributes();
    let ssh = SchemaBuilder::for_component("sshFields")?
        .attr_as("key_id", "keyID", Attribute::string().required())
        .attr("principals", Attribute::list(ElementKind::String).required())
        .attributes();
    let endpoint = SchemaBuilder::for_component("managedEndpoint")?
        .attr("id", Attribute::string().computed())
        .attr_as(
            "endpoint_configuration_id",
            "endpointConfigurationID",
            Attribute::string().required(),
        )
        .attr_as(
            "x509_certificate_data",
            "x509CertificateData",
            Attribute::object(x509)
                .optional()
                .exactly_one_of(["ssh_certificate_data"]),
        )
        .attr(
            "ssh_certificate_data",
            Attribute::object(ssh)
                .optional()
                .exactly_one_of(["x509_certificate_data"]),
        )
        .attributes();

    Ok(SchemaBuilder::for_component("managedConfiguration")?
        .attr("id", Attribute::string().computed().use_state_for_unknown())
        .attr("name", Attribute::string().required().requires_replace())
        .attr_as(
            "agent_configuration_id",
            "agentConfigurationID",
            Attribute::string().required().requires_replace(),
        )
        .attr_as("host_id", "hostID", Attribute::string().optional().requires_replace())
        .attr(
            "managed_endpoints",
            Attribute::list_nested(endpoint).required().requires_replace(),
        )
        .build())
}

/// Managed configurations cannot be changed once created
pub struct ManagedConfigurationResource {
    client: Client,
}

impl ManagedConfigurationResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for ManagedConfigurationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: ManagedConfigurationModel = decode_model(planned)?;
        let request = model.to_api()?;
        let resource = format!("managed configuration {}", request.name);
        debug!(
            resource = TYPE_NAME,
            name = %request.name,
            endpoints = request.managed_endpoints.len(),
            "creating"
        );

        let response = self
            .client
            .v20231208()
            .post_managed_configurations(&ctx.cancel, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let created: ManagedConfiguration = decode_body("create", &resource, &response)?;

        info!(resource = TYPE_NAME, id = created.id.as_deref().unwrap_or_default(), "created");
        encode_model(&ManagedConfigurationModel::from_api(&created, planned))
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let id = identity(state, "id")?;
        let resource = format!("managed configuration {}", id);
        debug!(resource = TYPE_NAME, id, "reading");
        let response = self
            .client
            .v20231208()
            .get_managed_configuration(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<ManagedConfiguration>("read", &resource, &response)? {
            Fetched::Found(config) => {
                encode_model(&ManagedConfigurationModel::from_api(&config, state)).map(Some)
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
        let resource = format!("managed configuration {}", id);
        debug!(resource = TYPE_NAME, id, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_managed_configuration(&ctx.cancel, id)
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

    #[test]
    fn test_endpoints_match_prior_by_configuration() {
        let api: ManagedConfiguration = serde_json::from_value(json!({
            "id": "m1",
            "name": "tfprovider-host",
            "agentConfigurationID": "ag1",
            "managedEndpoints": [
                {"id": "me2", "endpointConfigurationID": "ec2", "sshCertificateData": {"keyID": "k", "principals": ["ops"]}},
                {"id": "me1", "endpointConfigurationID": "ec1", "x509CertificateData": {"commonName": "web", "sans": []}}
            ]
        }))
        .unwrap();
        // The user wrote an empty `sans` list on the endpoint now returned second
        let prior = Value::from_json(&json!({
            "managed_endpoints": [
                {"endpoint_configuration_id": "ec1", "x509_certificate_data": {"common_name": "web", "sans": []}},
                {"endpoint_configuration_id": "ec2"}
            ]
        }));
        let model = ManagedConfigurationModel::from_api(&api, &prior);
        let endpoints = model.managed_endpoints.as_known().unwrap();
        let web = &endpoints[0];
        assert_eq!(web.endpoint_configuration_id.as_deref(), Some("ec1"));
        assert_eq!(
            web.x509_certificate_data.as_known().unwrap().sans,
            Attr::Known(Vec::new())
        );
        assert_eq!(web.id.as_deref(), Some("me1"));
    }

    #[test]
    fn test_request_needs_one_certificate_kind() {
        let endpoint = |x509: bool, ssh: bool| ManagedEndpointModel {
            id: Attr::Unknown,
            endpoint_configuration_id: Attr::Known("ec1".to_string()),
            x509_certificate_data: if x509 {
                Attr::Known(X509FieldsModel {
                    common_name: Attr::Known("web".to_string()),
                    sans: Attr::Null,
                })
            } else {
                Attr::Null
            },
            ssh_certificate_data: if ssh {
                Attr::Known(SshFieldsModel {
                    key_id: Attr::Known("web".to_string()),
                    principals: Attr::Known(vec!["ops".to_string()]),
                })
            } else {
                Attr::Null
            },
        };
        let model = |endpoints| ManagedConfigurationModel {
            name: Attr::Known("tfprovider-host".to_string()),
            agent_configuration_id: Attr::Known("ag1".to_string()),
            managed_endpoints: Attr::Known(endpoints),
            ..Default::default()
        };

        let request = model(vec![endpoint(true, false), endpoint(false, true)])
            .to_api()
            .unwrap();
        assert!(request.managed_endpoints[0].x509_certificate_data.is_some());
        assert!(request.managed_endpoints[1].ssh_certificate_data.is_some());

        let diags = model(vec![endpoint(true, false), endpoint(false, false), endpoint(true, true)])
            .to_api()
            .unwrap_err();
        let messages: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].contains("managed_endpoints[1]") && messages[0].contains("found 0"));
        assert!(messages[1].contains("managed_endpoints[2]") && messages[1].contains("found 2"));
        assert_eq!(diags.error_kind(), Some(ErrorKind::ParseError));
    }

    #[test]
    fn test_schema_rejects_both_certificate_kinds() {
        let schema = schema().unwrap();
        let config = Value::from_json(&json!({
            "name": "tfprovider-host",
            "agent_configuration_id": "ag1",
            "managed_endpoints": [{
                "endpoint_configuration_id": "ec1",
                "x509_certificate_data": {"common_name": "web"},
                "ssh_certificate_data": {"key_id": "web", "principals": ["ops"]}
            }]
        }));
        let diags = schema.validate(&schema.conform(&config).unwrap());
        assert_eq!(diags.error_kind(), Some(ErrorKind::ParseError));
    }

    #[test]
    fn test_unset_sans_stays_null() {
        let api: ManagedConfiguration = serde_json::from_value(json!({
            "name": "n",
            "agentConfigurationID": "ag1",
            "managedEndpoints": [
                {"endpointConfigurationID": "ec1", "x509CertificateData": {"commonName": "web", "sans": []}}
            ]
        }))
        .unwrap();
        let model = ManagedConfigurationModel::from_api(&api, &Value::Null);
        let endpoint = &model.managed_endpoints.as_known().unwrap()[0];
        assert!(endpoint.x509_certificate_data.as_known().unwrap().sans.is_null());
        assert!(model.host_id.is_null());
    }
}
