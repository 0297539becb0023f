//! `smallstep_provisioner`

mod model;

pub use model::{BRANCHES, ProvisionerModel, branch_of};

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::{Provisioner, ProvisionerType};
use smallstep_core::{Attr, Attribute, Diagnostic, ElementKind, Schema, SchemaBuilder, Value};

use crate::error::Result;
use crate::resource::{
    Context, Resource, StepResult, decode_model, encode_model, import_composite,
};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_provisioner";

const CHALLENGES: [&str; 4] = ["http-01", "dns-01", "tls-alpn-01", "device-attest-01"];
const ATTESTATION_FORMATS: [&str; 3] = ["apple", "step", "tpm"];

/// Siblings of `branch`, for the exactly-one-of group
fn others(branch: &str) -> Vec<&'static str> {
    BRANCHES.iter().copied().filter(|b| *b != branch).collect()
}

fn branch(component: &str, name: &str, attributes: BTreeMap<String, Attribute>) -> Result<Attribute> {
    let description = SchemaBuilder::for_component(component)?
        .description()
        .to_string();
    Ok(Attribute::object(attributes)
        .optional()
        .requires_replace()
        .exactly_one_of(others(name))
        .describe(description))
}

fn claims_schema() -> Result<Attribute> {
    let flag = || Attribute::bool().optional_computed().use_state_for_unknown();
    let duration = || Attribute::string().optional_computed().use_state_for_unknown();
    let builder = SchemaBuilder::for_component("provisionerClaims")?;
    let description = builder.description().to_string();
    let attributes = builder
        .attr("disable_renewal", flag())
        .attr("allow_renewal_after_expiry", flag())
        .attr_as("enable_ssh_ca", "enableSSHCA", flag())
        .attr_as("min_tls_cert_duration", "minTLSCertDuration", duration())
        .attr_as("max_tls_cert_duration", "maxTLSCertDuration", duration())
        .attr_as("default_tls_cert_duration", "defaultTLSCertDuration", duration())
        .attr_as("min_user_ssh_cert_duration", "minUserSSHCertDuration", duration())
        .attr_as("max_user_ssh_cert_duration", "maxUserSSHCertDuration", duration())
        .attr_as("default_user_ssh_cert_duration", "defaultUserSSHCertDuration", duration())
        .attr_as("min_host_ssh_cert_duration", "minHostSSHCertDuration", duration())
        .attr_as("max_host_ssh_cert_duration", "maxHostSSHCertDuration", duration())
        .attr_as("default_host_ssh_cert_duration", "defaultHostSSHCertDuration", duration())
        .attributes();

    Ok(Attribute::object(attributes)
        .optional_computed()
        .use_state_for_unknown()
        .requires_replace()
        .describe(description))
}

fn options_schema() -> Result<Attribute> {
    let template = |component: &str| -> Result<Attribute> {
        let builder = SchemaBuilder::for_component(component)?;
        let description = builder.description().to_string();
        let attributes = builder
            .attr("template", Attribute::string().optional())
            .attr(
                "template_data",
                Attribute::string()
                    .optional()
                    .describe("A JSON object of data that can be used by the certificate template."),
            )
            .attributes();
        Ok(Attribute::object(attributes).optional().describe(description))
    };

    let builder = SchemaBuilder::for_component("provisionerOptions")?;
    let description = builder.description().to_string();
    let attributes = builder
        .attr("x509", template("x509Options")?)
        .attr("ssh", template("sshOptions")?)
        .attributes();
    Ok(Attribute::object(attributes)
        .optional()
        .requires_replace()
        .describe(description))
}

pub fn schema() -> Result<Schema> {
    let string = || Attribute::string().optional();
    let flag = || Attribute::bool().optional();
    let set = || Attribute::set(ElementKind::String).optional();
    let computed = || Attribute::string().computed().use_state_for_unknown();

    let jwk = SchemaBuilder::for_component("jwkProvisioner")?
        .attr(
            "key",
            Attribute::string()
                .required()
                .describe("The public JSON web key, as a JSON document."),
        )
        .attr("encrypted_key", string().sensitive())
        .attributes();

    let oidc = SchemaBuilder::for_component("oidcProvisioner")?
        .attr_as("client_id", "clientID", Attribute::string().required())
        .attr("client_secret", Attribute::string().required().sensitive())
        .attr("configuration_endpoint", Attribute::string().required())
        .attr("admins", set())
        .attr("domains", set())
        .attr("groups", set())
        .attr("listen_address", string())
        .attr_as("tenant_id", "tenantID", string())
        .attributes();

    let acme = SchemaBuilder::for_component("acmeProvisioner")?
        .attr("challenges", Attribute::list(ElementKind::String).required())
        .attr_as("require_eab", "requireEAB", flag())
        .attr_as("force_cn", "forceCN", flag())
        .attributes();

    let acme_attestation = SchemaBuilder::for_component("acmeAttestationProvisioner")?
        .attr("attestation_formats", Attribute::set(ElementKind::String).required())
        .attr("attestation_roots", Attribute::list(ElementKind::String).optional())
        .attr_as("require_eab", "requireEAB", flag())
        .attr_as("force_cn", "forceCN", flag())
        .attributes();

    let x5c = SchemaBuilder::for_component("x5cProvisioner")?
        .attr("roots", Attribute::list(ElementKind::String).required())
        .attributes();

    let aws = SchemaBuilder::for_component("awsProvisioner")?
        .attr("accounts", Attribute::set(ElementKind::String).required())
        .attr_as("disable_custom_sans", "disableCustomSANs", flag())
        .attr("disable_trust_on_first_use", flag())
        .attr("instance_age", string())
        .attributes();

    let gcp = SchemaBuilder::for_component("gcpProvisioner")?
        .attr("service_accounts", set())
        .attr_as("project_ids", "projectIDs", set())
        .attr_as("disable_custom_sans", "disableCustomSANs", flag())
        .attr("disable_trust_on_first_use", flag())
        .attr("instance_age", string())
        .attributes();

    let azure = SchemaBuilder::for_component("azureProvisioner")?
        .attr_as("tenant_id", "tenantID", Attribute::string().required())
        .attr("resource_groups", Attribute::set(ElementKind::String).required())
        .attr("audience", string())
        .attr_as("disable_custom_sans", "disableCustomSANs", flag())
        .attr("disable_trust_on_first_use", flag())
        .attributes();

    Ok(SchemaBuilder::for_component("provisioner")?
        .attr("id", computed())
        .attr_as(
            "authority_id",
            "authorityID",
            Attribute::string().required().requires_replace(),
        )
        .attr("name", Attribute::string().required().requires_replace())
        .attr(
            "type",
            Attribute::string()
                .required()
                .requires_replace()
                .one_of(ProvisionerType::ALL.iter().copied()),
        )
        .attr("created_at", computed())
        .attr("claims", claims_schema()?)
        .attr("options", options_schema()?)
        .attr("jwk", branch("jwkProvisioner", "jwk", jwk)?)
        .attr("oidc", branch("oidcProvisioner", "oidc", oidc)?)
        .attr("acme", branch("acmeProvisioner", "acme", acme)?)
        .attr(
            "acme_attestation",
            branch("acmeAttestationProvisioner", "acme_attestation", acme_attestation)?,
        )
        .attr("x5c", branch("x5cProvisioner", "x5c", x5c)?)
        .attr("aws", branch("awsProvisioner", "aws", aws)?)
        .attr("gcp", branch("gcpProvisioner", "gcp", gcp)?)
        .attr("azure", branch("azureProvisioner", "azure", azure)?)
        .build())
}

/// Values of the `challenges` and `attestation_formats` lists the API accepts
pub fn check_enumerations(model: &ProvisionerModel) -> std::result::Result<(), Diagnostic> {
    let invalid = |attribute: &str, value: &str, allowed: &[&str]| {
        Diagnostic::error(
            "Invalid attribute value",
            format!(
                "{} value \"{}\" must be one of [{}]",
                attribute,
                value,
                allowed.join(", ")
            ),
        )
        .with_kind(smallstep_core::ErrorKind::ParseError)
    };
    if let Some(acme) = model.acme.as_known() {
        for challenge in acme.challenges.as_known().into_iter().flatten() {
            if !CHALLENGES.contains(&challenge.as_str()) {
                return Err(invalid("acme.challenges", challenge, &CHALLENGES));
            }
        }
    }
    if let Some(acme) = model.acme_attestation.as_known() {
        for format in acme.attestation_formats.as_known().into_iter().flatten() {
            if !ATTESTATION_FORMATS.contains(&format.as_str()) {
                return Err(invalid(
                    "acme_attestation.attestation_formats",
                    format,
                    &ATTESTATION_FORMATS,
                ));
            }
        }
    }
    Ok(())
}

/// Controller for provisioners, scoped to an authority
pub struct ProvisionerResource {
    client: Client,
}

impl ProvisionerResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GET by id or name
    pub(crate) async fn fetch(
        &self,
        ctx: &Context,
        authority_id: &str,
        name_or_id: &str,
    ) -> StepResult<Fetched<Provisioner>> {
        let resource = format!("provisioner {}", name_or_id);
        let response = self
            .client
            .v20231208()
            .get_provisioner(&ctx.cancel, authority_id, name_or_id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        Ok(fetched("read", &resource, &response)?)
    }

    pub(crate) fn state(&self, api: &Provisioner, authority_id: &str, prior: &Value) -> StepResult<Value> {
        let mut model = ProvisionerModel::from_api(api, prior)?;
        if model.authority_id.is_null() {
            model.authority_id = Attr::Known(authority_id.to_string());
        }
        encode_model(&model)
    }
}

#[async_trait]
impl Resource for ProvisionerResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: ProvisionerModel = decode_model(planned)?;
        check_enumerations(&model)?;
        let request = model.to_api()?;
        let authority_id = identity(planned, "authority_id")?;
        let resource = format!("provisioner {}", request.name);
        debug!(resource = TYPE_NAME, authority_id, name = %request.name, kind = %request.kind, "creating");

        let response = self
            .client
            .v20231208()
            .post_provisioners(&ctx.cancel, authority_id, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let provisioner: Provisioner = decode_body("create", &resource, &response)?;

        info!(
            resource = TYPE_NAME,
            id = provisioner.id.as_deref().unwrap_or_default(),
            name = %provisioner.name,
            "created"
        );
        self.state(&provisioner, authority_id, planned)
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let authority_id = identity(state, "authority_id")?;
        let id = identity(state, "id")?;
        debug!(resource = TYPE_NAME, authority_id, id, "reading");
        match self.fetch(ctx, authority_id, id).await? {
            Fetched::Found(provisioner) => self.state(&provisioner, authority_id, state).map(Some),
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
        let authority_id = identity(state, "authority_id")?;
        let id = identity(state, "id")?;
        let resource = format!("provisioner {}", id);
        debug!(resource = TYPE_NAME, authority_id, id, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_provisioner(&ctx.cancel, authority_id, id)
            .await
            .map_err(|e| client_error("delete", &resource, &e))?;
        deleted("delete", &resource, &response)?;
        info!(resource = TYPE_NAME, id, "deleted");
        Ok(())
    }

    fn import_state(&self, id: &str) -> StepResult<Value> {
        import_composite(&["authority_id", "id"], id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallstep_core::PlanModifier;

    #[test]
    fn test_every_branch_excludes_the_others() {
        let schema = schema().unwrap();
        for name in BRANCHES {
            let attribute = &schema.attributes[name];
            assert!(attribute.has_modifier(PlanModifier::RequiresReplace), "{}", name);
            assert!(!attribute.description.is_empty(), "{}", name);
        }
        assert_eq!(others("x5c").len(), BRANCHES.len() - 1);
        assert!(!others("x5c").contains(&"x5c"));
    }

    #[test]
    fn test_branches_follow_discriminator_order() {
        let kinds: Vec<&str> = ProvisionerType::ALL
            .iter()
            .map(|k| branch_of(k.parse().unwrap()))
            .collect();
        assert_eq!(kinds, BRANCHES);
    }

    #[test]
    fn test_claims_are_computed_and_kept() {
        let schema = schema().unwrap();
        let claims = &schema.attributes["claims"];
        assert!(claims.is_computed());
        assert!(claims.has_modifier(PlanModifier::UseStateForUnknown));
    }

    #[test]
    fn test_unknown_challenge_is_rejected() {
        let model: ProvisionerModel = Value::from_json(&serde_json::json!({
            "name": "acme",
            "type": "ACME",
            "acme": {"challenges": ["http-01", "smtp-01"]}
        }))
        .decode()
        .unwrap();
        let err = check_enumerations(&model).unwrap_err();
        assert!(err.detail.contains("smtp-01"));
    }
}
