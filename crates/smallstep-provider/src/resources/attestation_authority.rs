//! `smallstep_attestation_authority`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::AttestationAuthority;
use smallstep_core::bridge::to_optional_string;
use smallstep_core::{Attr, AttrPath, Attribute, Schema, SchemaBuilder, Value};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::common::timestamp;
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_attestation_authority";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationAuthorityModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub catalog: Attr<String>,
    pub attestor_roots: Attr<String>,
    pub attestor_intermediates: Attr<String>,
    pub root: Attr<String>,
    pub slug: Attr<String>,
    pub created_at: Attr<String>,
}

impl AttestationAuthorityModel {
    pub fn from_api(api: &AttestationAuthority, prior: &Value) -> Self {
        Self {
            id: Attr::from_option(api.id.clone()),
            name: Attr::Known(api.name.clone()),
            catalog: Attr::Known(api.catalog.clone()),
            attestor_roots: Attr::Known(api.attestor_roots.clone()),
            attestor_intermediates: to_optional_string(
                api.attestor_intermediates.clone(),
                prior,
                &AttrPath::root("attestor_intermediates"),
            ),
            root: Attr::from_option(api.root.clone()),
            slug: Attr::from_option(api.slug.clone()),
            created_at: Attr::from_option(api.created_at.as_ref().map(timestamp)),
        }
    }

    pub fn to_api(&self) -> AttestationAuthority {
        AttestationAuthority {
            name: self.name.to_option().unwrap_or_default(),
            catalog: self.catalog.to_option().unwrap_or_default(),
            attestor_roots: self.attestor_roots.to_option().unwrap_or_default(),
            attestor_intermediates: self.attestor_intermediates.to_option(),
            ..Default::default()
        }
    }
}

pub fn schema() -> Result<Schema> {
    let computed = || Attribute::string().computed().use_state_for_unknown();
    Ok(SchemaBuilder::for_component("attestationAuthority")?
        .attr("id", computed())
        .attr("name", Attribute::string().required().requires_replace())
        .attr("catalog", Attribute::string().required().requires_replace())
        .attr("attestor_roots", Attribute::string().required().requires_replace())
        .attr(
            "attestor_intermediates",
            Attribute::string().optional().requires_replace(),
        )
        .attr("root", computed())
        .attr("slug", computed())
        .attr("created_at", computed())
        .build())
}

/// Attestation authorities cannot be changed once created
pub struct AttestationAuthorityResource {
    client: Client,
}

impl AttestationAuthorityResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub(crate) async fn fetch(
        &self,
        ctx: &Context,
        id: &str,
    ) -> StepResult<Fetched<AttestationAuthority>> {
        let resource = format!("attestation authority {}", id);
        let response = self
            .client
            .v20231208()
            .get_attestation_authority(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        Ok(fetched("read", &resource, &response)?)
    }
}

#[async_trait]
impl Resource for AttestationAuthorityResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: AttestationAuthorityModel = decode_model(planned)?;
        let request = model.to_api();
        let resource = format!("attestation authority {}", request.name);
        debug!(resource = TYPE_NAME, name = %request.name, catalog = %request.catalog, "creating");

        let response = self
            .client
            .v20231208()
            .post_attestation_authorities(&ctx.cancel, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let created: AttestationAuthority = decode_body("create", &resource, &response)?;

        info!(
            resource = TYPE_NAME,
            id = created.id.as_deref().unwrap_or_default(),
            slug = created.slug.as_deref().unwrap_or_default(),
            "created"
        );
        encode_model(&AttestationAuthorityModel::from_api(&created, planned))
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let id = identity(state, "id")?;
        debug!(resource = TYPE_NAME, id, "reading");
        match self.fetch(ctx, id).await? {
            Fetched::Found(authority) => {
                encode_model(&AttestationAuthorityModel::from_api(&authority, state)).map(Some)
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
        let resource = format!("attestation authority {}", id);
        debug!(resource = TYPE_NAME, id, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_attestation_authority(&ctx.cancel, id)
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

    const ROOTS: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    #[tokio::test]
    async fn test_create_fills_server_computed_attributes() {
        let server = MockServer::new();
        let resource = AttestationAuthorityResource::new(server.client());
        let planned = Value::from_json(&json!({
            "name": "tfprovider Fleet",
            "catalog": "devices",
            "attestor_roots": ROOTS
        }));
        let state = resource.create(&Context::new(), &planned).await.unwrap();
        let model: AttestationAuthorityModel = state.decode().unwrap();

        let id = model.id.as_deref().unwrap();
        let slug = model.slug.as_deref().unwrap();
        assert!(slug.starts_with("tfprovider-fleet-"));
        assert!(slug.ends_with(&id[..8]));
        assert!(model.root.is_known());
        assert!(model.created_at.is_known());
        assert!(model.attestor_intermediates.is_null());

        let refreshed = resource.read(&Context::new(), &state).await.unwrap().unwrap();
        assert_eq!(refreshed, state);
    }

    #[test]
    fn test_request_omits_read_only_fields() {
        let model = AttestationAuthorityModel {
            id: Attr::Known("a1".to_string()),
            name: Attr::Known("fleet".to_string()),
            catalog: Attr::Known("devices".to_string()),
            attestor_roots: Attr::Known(ROOTS.to_string()),
            slug: Attr::Known("fleet-a1".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(model.to_api()).unwrap();
        assert_eq!(
            body,
            json!({"name": "fleet", "catalog": "devices", "attestorRoots": ROOTS})
        );
    }
}
