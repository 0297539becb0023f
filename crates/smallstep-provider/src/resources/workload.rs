//! `smallstep_workload`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::Workload;
use smallstep_core::bridge::to_optional_set;
use smallstep_core::{
    Attr, AttrPath, Attribute, Diagnostic, Diagnostics, ElementKind, Schema, SchemaBuilder, Value,
};

use crate::error::Result;
use crate::resource::{
    Context, Resource, StepResult, decode_model, encode_model, import_composite,
};
use crate::resources::common::{
    CertificateFieldsModel, CertificateInfoModel, HooksModel, KeyInfoModel, ReloadInfoModel,
    set_to_vec,
};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_workload";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadModel {
    pub device_collection_slug: Attr<String>,
    pub slug: Attr<String>,
    pub display_name: Attr<String>,
    pub workload_type: Attr<String>,
    pub admin_emails: Attr<BTreeSet<String>>,
    pub certificate_info: Attr<CertificateInfoModel>,
    pub key_info: Attr<KeyInfoModel>,
    pub reload_info: Attr<ReloadInfoModel>,
    pub hooks: Attr<HooksModel>,
    pub certificate_data: Attr<CertificateFieldsModel>,
}

impl WorkloadModel {
    pub fn from_api(
        api: &Workload,
        device_collection_slug: &str,
        prior: &Value,
    ) -> std::result::Result<Self, Diagnostic> {
        let path = AttrPath::root;
        Ok(Self {
            device_collection_slug: Attr::Known(device_collection_slug.to_string()),
            slug: Attr::Known(api.slug.clone()),
            display_name: Attr::Known(api.display_name.clone()),
            workload_type: Attr::Known(api.workload_type.clone()),
            admin_emails: to_optional_set(api.admin_emails.clone(), prior, &path("admin_emails")),
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
            certificate_data: CertificateFieldsModel::from_api(
                api.certificate_data.as_ref(),
                prior,
                &path("certificate_data"),
            )?,
        })
    }

    pub fn to_api(&self) -> StepResult<Workload> {
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

        diags.into_result(Workload {
            slug: self.slug.to_option().unwrap_or_default(),
            display_name: self.display_name.to_option().unwrap_or_default(),
            workload_type: self.workload_type.to_option().unwrap_or_default(),
            admin_emails: set_to_vec(&self.admin_emails),
            certificate_info,
            key_info: self.key_info.as_known().map(KeyInfoModel::to_api),
            reload_info,
            hooks: self.hooks.as_known().map(HooksModel::to_api),
            certificate_data,
        })
    }
}

pub fn schema() -> Result<Schema> {
    let replace = |attribute: Attribute| attribute.requires_replace();
    Ok(SchemaBuilder::for_component("workload")?
        .attr(
            "device_collection_slug",
            Attribute::string()
                .required()
                .requires_replace()
                .describe("The slug of the device collection the workload belongs to."),
        )
        .attr("slug", replace(Attribute::string().required()))
        .attr("display_name", replace(Attribute::string().required()))
        .attr("workload_type", replace(Attribute::string().required()))
        .attr("admin_emails", replace(Attribute::set(ElementKind::String).optional()))
        .attr(
            "certificate_info",
            replace(Attribute::object(CertificateInfoModel::schema()?).required()),
        )
        .attr("key_info", replace(KeyInfoModel::attribute()?))
        .attr(
            "reload_info",
            replace(Attribute::object(ReloadInfoModel::schema()?).optional()),
        )
        .attr("hooks", replace(Attribute::object(HooksModel::schema()?).optional()))
        .attr(
            "certificate_data",
            replace(Attribute::object(CertificateFieldsModel::schema()?).optional()),
        )
        .build())
}

/// Workloads cannot be changed once created
pub struct WorkloadResource {
    client: Client,
}

impl WorkloadResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for WorkloadResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: WorkloadModel = decode_model(planned)?;
        let request = model.to_api()?;
        let collection_slug = identity(planned, "device_collection_slug")?;
        let slug = identity(planned, "slug")?;
        let resource = format!("workload {}/{}", collection_slug, slug);
        debug!(
            resource = TYPE_NAME,
            collection_slug,
            slug,
            workload_type = %request.workload_type,
            "creating"
        );

        let response = self
            .client
            .v20231208()
            .put_workload(&ctx.cancel, collection_slug, slug, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::OK)?;
        let workload: Workload = decode_body("create", &resource, &response)?;

        info!(resource = TYPE_NAME, collection_slug, slug, "created");
        encode_model(&WorkloadModel::from_api(&workload, collection_slug, planned)?)
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let collection_slug = identity(state, "device_collection_slug")?;
        let slug = identity(state, "slug")?;
        let resource = format!("workload {}/{}", collection_slug, slug);
        debug!(resource = TYPE_NAME, collection_slug, slug, "reading");
        let response = self
            .client
            .v20231208()
            .get_workload(&ctx.cancel, collection_slug, slug)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<Workload>("read", &resource, &response)? {
            Fetched::Found(workload) => {
                encode_model(&WorkloadModel::from_api(&workload, collection_slug, state)?).map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, collection_slug, slug, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, _ctx: &Context, planned: &Value, _prior: &Value) -> StepResult<Value> {
        Ok(planned.clone())
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let collection_slug = identity(state, "device_collection_slug")?;
        let slug = identity(state, "slug")?;
        let resource = format!("workload {}/{}", collection_slug, slug);
        debug!(resource = TYPE_NAME, collection_slug, slug, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_workload(&ctx.cancel, collection_slug, slug)
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
    use smallstep_client::MockServer;
    use smallstep_core::{ErrorKind, PlanModifier};

    fn planned() -> Value {
        Value::from_json(&json!({
            "device_collection_slug": "tfprovider-servers",
            "slug": "nginx",
            "display_name": "Nginx",
            "workload_type": "nginx",
            "certificate_info": {"type": "X509", "crt_file": "/etc/nginx/tls.crt"},
            "hooks": {"renew": {"after": ["systemctl reload nginx"]}}
        }))
    }

    #[tokio::test]
    async fn test_create_puts_under_device_collection() {
        let server = MockServer::new();
        server.seed(
            "/device-collections/tfprovider-servers",
            json!({
                "slug": "tfprovider-servers",
                "displayName": "Servers",
                "deviceType": "aws-vm",
                "deviceTypeConfiguration": {"accounts": ["0123456789"]}
            }),
        );
        let resource = WorkloadResource::new(server.client());
        let state = resource.create(&Context::new(), &planned()).await.unwrap();

        assert!(server.contains("/device-collections/tfprovider-servers/workloads/nginx"));
        assert_eq!(server.counts().creates, 1);
        let model: WorkloadModel = state.decode().unwrap();
        assert!(model.admin_emails.is_null());
        assert_eq!(
            model.key_info.as_known().unwrap().kind.as_deref(),
            Some("DEFAULT")
        );
        let renew = model.hooks.as_known().unwrap().renew.as_known().unwrap().clone();
        assert_eq!(renew.after.to_option(), Some(vec!["systemctl reload nginx".to_string()]));
    }

    #[tokio::test]
    async fn test_create_under_missing_collection_fails() {
        let server = MockServer::new();
        let resource = WorkloadResource::new(server.client());
        let diags = resource.create(&Context::new(), &planned()).await.unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::ResponseError));
    }

    #[test]
    fn test_import_requires_both_slugs() {
        let resource = WorkloadResource::new(MockServer::new().client());
        let diags = resource.import_state("nginx").unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::ImportShape));
        assert!(diags.to_string().contains("<device_collection_slug>/<slug>"));
    }

    #[test]
    fn test_configurable_attributes_force_replacement() {
        let schema = schema().unwrap();
        for (name, attribute) in &schema.attributes {
            if attribute.is_configurable() {
                assert!(attribute.has_modifier(PlanModifier::RequiresReplace), "{}", name);
            }
        }
    }
}
