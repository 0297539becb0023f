//! `smallstep_device_collection`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use smallstep_client::v20231208::models::{
    AwsVm, AzureVm, DeviceCollection, DeviceType, GcpVm, NewDeviceCollection, Tpm,
};
use smallstep_client::{Client, ClientError, Union, UnknownVariant};
use smallstep_core::bridge::{to_optional_bool, to_optional_set, to_optional_string};
use smallstep_core::{
    Attr, AttrPath, Attribute, Diagnostic, ElementKind, ErrorKind, Schema, SchemaBuilder, Value,
};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::common::{encode_variant, select_branch, set_to_vec, timestamp, union_error};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_device_collection";

const BRANCHES: [&str; 4] = ["aws_vm", "gcp_vm", "azure_vm", "tpm"];

fn branch_of(kind: DeviceType) -> &'static str {
    match kind {
        DeviceType::AwsVm => "aws_vm",
        DeviceType::GcpVm => "gcp_vm",
        DeviceType::AzureVm => "azure_vm",
        DeviceType::Tpm => "tpm",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceCollectionModel {
    pub slug: Attr<String>,
    pub display_name: Attr<String>,
    pub admin_emails: Attr<BTreeSet<String>>,
    pub device_type: Attr<String>,
    pub created_at: Attr<String>,
    pub aws_vm: Attr<AwsVmModel>,
    pub gcp_vm: Attr<GcpVmModel>,
    pub azure_vm: Attr<AzureVmModel>,
    pub tpm: Attr<TpmModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsVmModel {
    pub accounts: Attr<BTreeSet<String>>,
    pub disable_custom_sans: Attr<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpVmModel {
    pub service_accounts: Attr<BTreeSet<String>>,
    pub project_ids: Attr<BTreeSet<String>>,
    pub disable_custom_sans: Attr<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureVmModel {
    pub tenant_id: Attr<String>,
    pub resource_groups: Attr<BTreeSet<String>>,
    pub audience: Attr<String>,
    pub disable_custom_sans: Attr<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpmModel {
    pub attestor_roots: Attr<String>,
    pub attestor_intermediates: Attr<String>,
    pub force_cn: Attr<bool>,
    pub require_eab: Attr<bool>,
}

impl DeviceCollectionModel {
    pub fn from_api(api: &DeviceCollection, prior: &Value) -> std::result::Result<Self, Diagnostic> {
        let kind = api.device_type.as_str();
        let project = |e: ClientError| union_error("device_type", kind, &e);
        let mut model = Self {
            slug: Attr::Known(api.slug.clone()),
            display_name: Attr::Known(api.display_name.clone()),
            admin_emails: to_optional_set(api.admin_emails.clone(), prior, &AttrPath::root("admin_emails")),
            device_type: Attr::Known(kind.to_string()),
            created_at: Attr::from_option(api.created_at.as_ref().map(timestamp)),
            ..Default::default()
        };

        let path = AttrPath::root(branch_of(api.device_type));
        let flag = |value: Option<bool>, name: &str| to_optional_bool(value, prior, &path.child(name));
        match api.device_type {
            DeviceType::AwsVm => {
                let aws = api.as_aws_vm().map_err(project)?;
                model.aws_vm = Attr::Known(AwsVmModel {
                    accounts: Attr::Known(aws.accounts.into_iter().collect()),
                    disable_custom_sans: flag(aws.disable_custom_sans, "disable_custom_sans"),
                });
            }
            DeviceType::GcpVm => {
                let gcp = api.as_gcp_vm().map_err(project)?;
                model.gcp_vm = Attr::Known(GcpVmModel {
                    service_accounts: to_optional_set(
                        gcp.service_accounts,
                        prior,
                        &path.child("service_accounts"),
                    ),
                    project_ids: to_optional_set(gcp.project_ids, prior, &path.child("project_ids")),
                    disable_custom_sans: flag(gcp.disable_custom_sans, "disable_custom_sans"),
                });
            }
            DeviceType::AzureVm => {
                let azure = api.as_azure_vm().map_err(project)?;
                model.azure_vm = Attr::Known(AzureVmModel {
                    tenant_id: Attr::Known(azure.tenant_id),
                    resource_groups: Attr::Known(azure.resource_groups.into_iter().collect()),
                    audience: to_optional_string(azure.audience, prior, &path.child("audience")),
                    disable_custom_sans: flag(azure.disable_custom_sans, "disable_custom_sans"),
                });
            }
            DeviceType::Tpm => {
                let tpm = api.as_tpm().map_err(project)?;
                model.tpm = Attr::Known(TpmModel {
                    attestor_roots: to_optional_string(
                        tpm.attestor_roots,
                        prior,
                        &path.child("attestor_roots"),
                    ),
                    attestor_intermediates: to_optional_string(
                        tpm.attestor_intermediates,
                        prior,
                        &path.child("attestor_intermediates"),
                    ),
                    force_cn: flag(tpm.force_cn, "force_cn"),
                    require_eab: flag(tpm.require_eab, "require_eab"),
                });
            }
        }
        Ok(model)
    }

    pub fn to_api(&self) -> StepResult<NewDeviceCollection> {
        let discriminator = self.device_type.as_deref().unwrap_or_default();
        let kind: DeviceType = discriminator.parse().map_err(|e: UnknownVariant| {
            Diagnostic::error("Invalid device type", e.to_string())
                .with_kind(ErrorKind::ParseError)
                .at(&AttrPath::root("device_type"))
        })?;
        let branches = [
            ("aws_vm", self.aws_vm.is_known()),
            ("gcp_vm", self.gcp_vm.is_known()),
            ("azure_vm", self.azure_vm.is_known()),
            ("tpm", self.tpm.is_known()),
        ];
        select_branch("device_type", discriminator, branch_of(kind), &branches)?;

        let path = AttrPath::root(branch_of(kind));
        let configuration: Union = match kind {
            DeviceType::AwsVm => {
                let aws = self.aws_vm.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &AwsVm {
                        accounts: set_to_vec(&aws.accounts).unwrap_or_default(),
                        disable_custom_sans: aws.disable_custom_sans.to_option(),
                    },
                    &path,
                )?
            }
            DeviceType::GcpVm => {
                let gcp = self.gcp_vm.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &GcpVm {
                        service_accounts: set_to_vec(&gcp.service_accounts),
                        project_ids: set_to_vec(&gcp.project_ids),
                        disable_custom_sans: gcp.disable_custom_sans.to_option(),
                    },
                    &path,
                )?
            }
            DeviceType::AzureVm => {
                let azure = self.azure_vm.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &AzureVm {
                        tenant_id: azure.tenant_id.to_option().unwrap_or_default(),
                        resource_groups: set_to_vec(&azure.resource_groups).unwrap_or_default(),
                        audience: azure.audience.to_option(),
                        disable_custom_sans: azure.disable_custom_sans.to_option(),
                    },
                    &path,
                )?
            }
            DeviceType::Tpm => {
                let tpm = self.tpm.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &Tpm {
                        attestor_roots: tpm.attestor_roots.to_option(),
                        attestor_intermediates: tpm.attestor_intermediates.to_option(),
                        force_cn: tpm.force_cn.to_option(),
                        require_eab: tpm.require_eab.to_option(),
                    },
                    &path,
                )?
            }
        };

        Ok(NewDeviceCollection {
            display_name: self.display_name.to_option().unwrap_or_default(),
            admin_emails: set_to_vec(&self.admin_emails),
            device_type: kind,
            device_type_configuration: configuration,
        })
    }
}

fn branch(
    component: &str,
    name: &str,
    attributes: BTreeMap<String, Attribute>,
) -> Result<Attribute> {
    let description = SchemaBuilder::for_component(component)?
        .description()
        .to_string();
    let siblings: Vec<&str> = BRANCHES.iter().copied().filter(|b| *b != name).collect();
    Ok(Attribute::object(attributes)
        .optional()
        .exactly_one_of(siblings)
        .describe(description))
}

pub fn schema() -> Result<Schema> {
    let flag = || Attribute::bool().optional();
    let set = || Attribute::set(ElementKind::String).optional();

    let aws = SchemaBuilder::for_component("awsVM")?
        .attr("accounts", Attribute::set(ElementKind::String).required())
        .attr_as("disable_custom_sans", "disableCustomSANs", flag())
        .attributes();
    let gcp = SchemaBuilder::for_component("gcpVM")?
        .attr("service_accounts", set())
        .attr_as("project_ids", "projectIDs", set())
        .attr_as("disable_custom_sans", "disableCustomSANs", flag())
        .attributes();
    let azure = SchemaBuilder::for_component("azureVM")?
        .attr_as("tenant_id", "tenantID", Attribute::string().required())
        .attr("resource_groups", Attribute::set(ElementKind::String).required())
        .attr("audience", Attribute::string().optional())
        .attr_as("disable_custom_sans", "disableCustomSANs", flag())
        .attributes();
    let tpm = SchemaBuilder::for_component("tpm")?
        .attr("attestor_roots", Attribute::string().optional())
        .attr("attestor_intermediates", Attribute::string().optional())
        .attr_as("force_cn", "forceCN", flag())
        .attr_as("require_eab", "requireEAB", flag())
        .attributes();

    Ok(SchemaBuilder::for_component("deviceCollection")?
        .attr("slug", Attribute::string().required().requires_replace())
        .attr("display_name", Attribute::string().required())
        .attr("admin_emails", set())
        .attr(
            "device_type",
            Attribute::string()
                .required()
                .requires_replace()
                .one_of(DeviceType::ALL.iter().copied()),
        )
        .attr("created_at", Attribute::string().computed().use_state_for_unknown())
        .attr("aws_vm", branch("awsVM", "aws_vm", aws)?)
        .attr("gcp_vm", branch("gcpVM", "gcp_vm", gcp)?)
        .attr("azure_vm", branch("azureVM", "azure_vm", azure)?)
        .attr("tpm", branch("tpm", "tpm", tpm)?)
        .build())
}

/// Device collections are created and updated with PUT on their slug
pub struct DeviceCollectionResource {
    client: Client,
}

impl DeviceCollectionResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn put(&self, ctx: &Context, operation: &str, planned: &Value) -> StepResult<Value> {
        let model: DeviceCollectionModel = decode_model(planned)?;
        let request = model.to_api()?;
        let slug = identity(planned, "slug")?;
        let resource = format!("device collection {}", slug);
        debug!(resource = TYPE_NAME, slug, device_type = %request.device_type, operation, "writing");

        let response = self
            .client
            .v20231208()
            .put_device_collection(&ctx.cancel, slug, &request)
            .await
            .map_err(|e| client_error(operation, &resource, &e))?;
        expect_status(operation, &resource, &response, status::OK)?;
        let collection: DeviceCollection = decode_body(operation, &resource, &response)?;

        info!(resource = TYPE_NAME, slug, operation, "done");
        encode_model(&DeviceCollectionModel::from_api(&collection, planned)?)
    }
}

#[async_trait]
impl Resource for DeviceCollectionResource {
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
        let slug = identity(state, "slug")?;
        let resource = format!("device collection {}", slug);
        debug!(resource = TYPE_NAME, slug, "reading");
        let response = self
            .client
            .v20231208()
            .get_device_collection(&ctx.cancel, slug)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        match fetched::<DeviceCollection>("read", &resource, &response)? {
            Fetched::Found(collection) => {
                encode_model(&DeviceCollectionModel::from_api(&collection, state)?).map(Some)
            }
            Fetched::Gone => {
                warn!(resource = TYPE_NAME, slug, "not found, removing from state");
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, planned: &Value, _prior: &Value) -> StepResult<Value> {
        self.put(ctx, "update", planned).await
    }

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()> {
        let slug = identity(state, "slug")?;
        let resource = format!("device collection {}", slug);
        debug!(resource = TYPE_NAME, slug, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_device_collection(&ctx.cancel, slug)
            .await
            .map_err(|e| client_error("delete", &resource, &e))?;
        deleted("delete", &resource, &response)?;
        info!(resource = TYPE_NAME, slug, "deleted");
        Ok(())
    }

    fn import_state(&self, id: &str) -> StepResult<Value> {
        import_single("slug", id)
    }
}
