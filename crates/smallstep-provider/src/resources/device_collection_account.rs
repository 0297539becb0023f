//! `smallstep_device_collection_account`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::DeviceCollectionAccount;
use smallstep_core::{Attr, AttrPath, Attribute, Diagnostic, Diagnostics, Schema, SchemaBuilder, Value};

use crate::error::Result;
use crate::resource::{
    Context, Resource, StepResult, decode_model, encode_model, import_composite,
};
use crate::resources::common::{
    CertificateFieldsModel, CertificateInfoModel, KeyInfoModel, ReloadInfoModel,
};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_device_collection_account";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCollectionAccountModel {
    pub device_collection_slug: Attr<String>,
    pub slug: Attr<String>,
    pub account_id: Attr<String>,
    pub authority_id: Attr<String>,
    pub display_name: Attr<String>,
    pub certificate_info: Attr<CertificateInfoModel>,
    pub key_info: Attr<KeyInfoModel>,
    pub reload_info: Attr<ReloadInfoModel>,
    pub certificate_data: Attr<CertificateFieldsModel>,
}

impl DeviceCollectionAccountModel {
    pub fn from_api(
        api: &DeviceCollectionAccount,
        device_collection_slug: &str,
        prior: &Value,
    ) -> std::result::Result<Self, Diagnostic> {
        let path = AttrPath::root;
        Ok(Self {
            device_collection_slug: Attr::Known(device_collection_slug.to_string()),
            slug: Attr::Known(api.slug.clone()),
            account_id: Attr::Known(api.account_id.clone()),
            authority_id: Attr::Known(api.authority_id.clone()),
            display_name: Attr::Known(api.display_name.clone()),
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
            certificate_data: CertificateFieldsModel::from_api(
                api.certificate_data.as_ref(),
                prior,
                &path("certificate_data"),
            )?,
        })
    }

    pub fn to_api(&self) -> StepResult<DeviceCollectionAccount> {
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
        let certificate_data = self.certificate_data.as_known().and_then(|fields| {
            fields
                .to_api(&AttrPath::root("certificate_data"))
                .map_err(|d| diags.extend(d))
                .ok()
        });

        diags.into_result(DeviceCollectionAccount {
            slug: self.slug.to_option().unwrap_or_default(),
            account_id: self.account_id.to_option().unwrap_or_default(),
            authority_id: self.authority_id.to_option().unwrap_or_default(),
            display_name: self.display_name.to_option().unwrap_or_default(),
            certificate_info,
            key_info: self.key_info.as_known().map(KeyInfoModel::to_api),
            reload_info,
            certificate_data,
        })
    }
}

pub fn schema() -> Result<Schema> {
    Ok(SchemaBuilder::for_component("deviceCollectionAccount")?
        .attr(
            "device_collection_slug",
            Attribute::string()
                .required()
                .requires_replace()
                .describe("The slug of the device collection the account belongs to."),
        )
        .attr("slug", Attribute::string().required().requires_replace())
        .attr_as("account_id", "accountID", Attribute::string().required())
        .attr_as("authority_id", "authorityID", Attribute::string().required())
        .attr("display_name", Attribute::string().required())
        .attr(
            "certificate_info",
            Attribute::object(CertificateInfoModel::schema()?).required(),
        )
        .attr("key_info", KeyInfoModel::attribute()?)
        .attr("reload_info", Attribute::object(ReloadInfoModel::schema()?).optional())
        .attr(
            "certificate_data",
            Attribute::object(CertificateFieldsModel::schema()?).optional(),
        )
        .build())
}

pub struct DeviceCollectionAccountResource {
    client: Client,
}

impl DeviceCollectionAccountResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn put(&self, ctx: &Context, operation: &str, planned: &Value) -> StepResult<Value> {
        let model: DeviceCollectionAccountModel = decode_model(planned)?;
        let request = model.to_api()?;
        let collection_slug = identity(planned, "device_collection_slug")?;
        let slug = identity(planned, "slug")?;
        let resource = format!("device collection account {}/{}", collection_slug, slug);
        debug!(resource = TYPE_NAME, collection_slug, slug, operation, "writing");

        let response = self
            .client
            .v20231208()
            .put_device_collection_account(&ctx.cancel, collection_slug, slug, &request)
            .await
            .map_err(|e| client_error(operation, &resource, &e))?;
        expect_status(operation, &resource, &response, status::OK)?;
        let account: DeviceCollectionAccount = decode_body(operation, &resource, &response)?;

        info!(resource = TYPE_NAME, collection_slug, slug, operation, "done");
        encode_model(&DeviceCollectionAccountModel::from_api(
            &account,
            collection_slug,
            planned,
        )?)
    }
}

#[async_trait]
impl Resource for DeviceCollectionAccountResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        self.put(ctx, "create", planned).await
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let collection_slug = identity(state, "device_collection_slug")?;
        let slug = identity(state, "slug")?;
        let resource = format!("device collection account {}/{}", collection_slug, slug);
        debug!(resource = TYPE_NAME, collection_slug, slug, "reading");
        let response = self
            .client
            .v20231208()
            .get_device_collection_account(&ctx.cancel, collection_slug, slug)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<DeviceCollectionAccount>("read", &resource, &response)? {
            Fetched::Found(account) => encode_model(&DeviceCollectionAccountModel::from_api(
                &account,
                collection_slug,
                state,
            )?)
            .map(Some),
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, collection_slug, slug, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, planned: &Value, _prior: &Value) -> StepResult<Value> {
        self.put(ctx, "update", planned).await
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let collection_slug = identity(state, "device_collection_slug")?;
        let slug = identity(state, "slug")?;
        let resource = format!("device collection account {}/{}", collection_slug, slug);
        debug!(resource = TYPE_NAME, collection_slug, slug, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_device_collection_account(&ctx.cancel, collection_slug, slug)
            .await
            .map_err(|e| client_error("delete", &resource, &e))?;
        deleted("delete", &resource, &response)?;
        info!(resource = TYPE_NAME, collection_slug, slug, "deleted");
        Ok(())
    }

    fn import_state(&self, id: &str) -> StepResult<Value> {
        import_composite(&["device_collection_slug", "slug"], id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallstep_core::ErrorKind;

    #[test]
    fn test_certificate_data_round_trips_through_branches() {
        let api: DeviceCollectionAccount = serde_json::from_value(json!({
            "slug": "wifi",
            "accountID": "6f4a",
            "authorityID": "a1",
            "displayName": "Wi-Fi",
            "certificateInfo": {"type": "X509", "duration": "168h0m0s"},
            "keyInfo": {"type": "DEFAULT", "format": "DEFAULT"},
            "certificateData": {
                "commonName": {"deviceMetadata": "hostname"},
                "organization": {"static": ["ACME"]}
            }
        }))
        .unwrap();
        let prior = Value::from_json(&json!({"certificate_info": {"duration": "168h"}}));
        let model = DeviceCollectionAccountModel::from_api(&api, "laptops", &prior).unwrap();

        assert_eq!(model.device_collection_slug.as_deref(), Some("laptops"));
        let info = model.certificate_info.as_known().unwrap();
        assert_eq!(info.duration.as_deref(), Some("168h"));

        let data = model.certificate_data.as_known().unwrap();
        let common_name = data.common_name.as_known().unwrap();
        assert_eq!(common_name.device_metadata.as_deref(), Some("hostname"));
        assert!(common_name.value.is_null());
        assert!(data.sans.is_null());

        let request = model.to_api().unwrap();
        assert_eq!(request.certificate_data, api.certificate_data);
    }

    #[test]
    fn test_both_field_branches_are_rejected() {
        let model: DeviceCollectionAccountModel = Value::from_json(&json!({
            "slug": "wifi",
            "certificate_info": {"type": "X509"},
            "certificate_data": {
                "common_name": {"static": "host", "device_metadata": "hostname"}
            }
        }))
        .decode()
        .unwrap();
        let diags = model.to_api().unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::ParseError));
        assert!(diags.to_string().contains("certificate_data.common_name"));
    }

    #[test]
    fn test_identity_requires_replacement() {
        let schema = schema().unwrap();
        let replaces = |name: &str| {
            schema.attributes[name].has_modifier(smallstep_core::PlanModifier::RequiresReplace)
        };
        assert!(replaces("device_collection_slug"));
        assert!(replaces("slug"));
        assert!(!replaces("display_name"));
        assert!(schema.attributes["key_info"].is_computed());
    }
}
