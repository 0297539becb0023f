//! `smallstep_authority`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use smallstep_client::Client;
use smallstep_client::v20231208::models::{
    Authority, DistinguishedName, NameConstraints, NewAuthority, X509Issuer,
};
use smallstep_core::bridge::{
    to_int_ptr, to_optional_bool, to_optional_set, to_optional_string,
};
use smallstep_core::{
    Attr, AttrPath, Attribute, Diagnostic, Diagnostics, ElementKind, Schema, SchemaBuilder, Value,
};

use crate::error::Result;
use crate::resource::{Context, Resource, StepResult, decode_model, encode_model, import_single};
use crate::resources::common::{set_to_vec, timestamp};
use crate::resources::identity;
use crate::respond::{
    Fetched, client_error, decode_body, deleted, expect_status, fetched, status,
};

pub const TYPE_NAME: &str = "smallstep_authority";

pub const AUTHORITY_TYPES: [&str; 2] = ["devops", "advanced"];

const KEY_VERSIONS: [&str; 8] = [
    "EC_SIGN_P256_SHA256",
    "EC_SIGN_P384_SHA384",
    "RSA_SIGN_PKCS1_2048_SHA256",
    "RSA_SIGN_PKCS1_3072_SHA256",
    "RSA_SIGN_PKCS1_4096_SHA256",
    "RSA_SIGN_PSS_2048_SHA256",
    "RSA_SIGN_PSS_3072_SHA256",
    "RSA_SIGN_PSS_4096_SHA256",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub subdomain: Attr<String>,
    pub domain: Attr<String>,
    pub fingerprint: Attr<String>,
    pub root: Attr<String>,
    pub admin_emails: Attr<BTreeSet<String>>,
    pub active_revocation: Attr<bool>,
    pub created_at: Attr<String>,
    pub intermediate_issuer: Attr<IssuerModel>,
    pub root_issuer: Attr<IssuerModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerModel {
    pub name: Attr<String>,
    pub key_version: Attr<String>,
    pub duration: Attr<String>,
    pub max_path_length: Attr<i64>,
    pub name_constraints: Attr<NameConstraintsModel>,
    pub subject: Attr<SubjectModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameConstraintsModel {
    pub critical: Attr<bool>,
    pub permitted_dns_domains: Attr<Vec<String>>,
    pub excluded_dns_domains: Attr<Vec<String>>,
    pub permitted_ip_ranges: Attr<Vec<String>>,
    pub excluded_ip_ranges: Attr<Vec<String>>,
    pub permitted_email_addresses: Attr<Vec<String>>,
    pub excluded_email_addresses: Attr<Vec<String>>,
    pub permitted_uri_domains: Attr<Vec<String>>,
    pub excluded_uri_domains: Attr<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectModel {
    pub common_name: Attr<String>,
    pub country: Attr<String>,
    pub email_address: Attr<String>,
    pub locality: Attr<String>,
    pub organization: Attr<String>,
    pub organizational_unit: Attr<String>,
    pub postal_code: Attr<String>,
    pub province: Attr<String>,
    pub serial_number: Attr<String>,
    pub street_address: Attr<String>,
}

/// First label of the authority's domain
fn subdomain_of(domain: &str) -> Option<String> {
    domain
        .split('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

/// Issuers are write-only: keep whatever the prior value holds
fn prior_issuer(prior: &Value, attribute: &str) -> StepResult<Attr<IssuerModel>> {
    match prior.get(attribute) {
        value if value.is_known() => value.decode().map_err(|e| {
            Diagnostic::error("Invalid prior state", e.to_string())
                .at(&AttrPath::root(attribute))
                .into()
        }),
        _ => Ok(Attr::Null),
    }
}

impl AuthorityModel {
    pub fn from_api(api: &Authority, prior: &Value) -> StepResult<Self> {
        let path = AttrPath::root;
        Ok(Self {
            id: Attr::Known(api.id.clone()),
            name: Attr::Known(api.name.clone()),
            kind: Attr::Known(api.kind.clone()),
            subdomain: to_optional_string(subdomain_of(&api.domain), prior, &path("subdomain")),
            domain: Attr::Known(api.domain.clone()),
            fingerprint: to_optional_string(api.fingerprint.clone(), prior, &path("fingerprint")),
            root: to_optional_string(api.root.clone(), prior, &path("root")),
            admin_emails: to_optional_set(api.admin_emails.clone(), prior, &path("admin_emails")),
            active_revocation: to_optional_bool(
                api.active_revocation,
                prior,
                &path("active_revocation"),
            ),
            created_at: Attr::Known(timestamp(&api.created_at)),
            intermediate_issuer: prior_issuer(prior, "intermediate_issuer")?,
            root_issuer: prior_issuer(prior, "root_issuer")?,
        })
    }

    pub fn to_api(&self) -> StepResult<NewAuthority> {
        let mut diags = Diagnostics::new();
        let mut issuer = |issuer: &Attr<IssuerModel>, name: &str| {
            issuer.as_known().and_then(|model| {
                model
                    .to_api(&AttrPath::root(name))
                    .map_err(|d| diags.extend(d))
                    .ok()
            })
        };
        let intermediate_issuer = issuer(&self.intermediate_issuer, "intermediate_issuer");
        let root_issuer = issuer(&self.root_issuer, "root_issuer");

        diags.into_result(NewAuthority {
            name: self.name.to_option().unwrap_or_default(),
            kind: self.kind.to_option().unwrap_or_default(),
            subdomain: self.subdomain.to_option().unwrap_or_default(),
            admin_emails: set_to_vec(&self.admin_emails).unwrap_or_default(),
            active_revocation: self.active_revocation.to_option(),
            intermediate_issuer,
            root_issuer,
        })
    }
}

impl IssuerModel {
    fn to_api(&self, path: &AttrPath) -> StepResult<X509Issuer> {
        let max_path_length = to_int_ptr(self.max_path_length.to_option(), &path.child("max_path_length"))?;
        Ok(X509Issuer {
            name: self.name.to_option().unwrap_or_default(),
            key_version: self.key_version.to_option().unwrap_or_default(),
            duration: self.duration.to_option(),
            max_path_length,
            name_constraints: self.name_constraints.as_known().map(|nc| NameConstraints {
                critical: nc.critical.to_option(),
                permitted_dns_domains: nc.permitted_dns_domains.to_option(),
                excluded_dns_domains: nc.excluded_dns_domains.to_option(),
                permitted_ip_ranges: nc.permitted_ip_ranges.to_option(),
                excluded_ip_ranges: nc.excluded_ip_ranges.to_option(),
                permitted_email_addresses: nc.permitted_email_addresses.to_option(),
                excluded_email_addresses: nc.excluded_email_addresses.to_option(),
                permitted_uri_domains: nc.permitted_uri_domains.to_option(),
                excluded_uri_domains: nc.excluded_uri_domains.to_option(),
            }),
            subject: self.subject.as_known().map(|s| DistinguishedName {
                common_name: s.common_name.to_option(),
                country: s.country.to_option(),
                email_address: s.email_address.to_option(),
                locality: s.locality.to_option(),
                organization: s.organization.to_option(),
                organizational_unit: s.organizational_unit.to_option(),
                postal_code: s.postal_code.to_option(),
                province: s.province.to_option(),
                serial_number: s.serial_number.to_option(),
                street_address: s.street_address.to_option(),
            }),
        })
    }
}

fn issuer_schema() -> Result<Attribute> {
    let list = || Attribute::list(ElementKind::String).optional();
    let name_constraints = SchemaBuilder::for_component("nameConstraints")?
        .attr("critical", Attribute::bool().optional())
        .attr_as("permitted_dns_domains", "permittedDNSDomains", list())
        .attr_as("excluded_dns_domains", "excludedDNSDomains", list())
        .attr_as("permitted_ip_ranges", "permittedIPRanges", list())
        .attr_as("excluded_ip_ranges", "excludedIPRanges", list())
        .attr("permitted_email_addresses", list())
        .attr("excluded_email_addresses", list())
        .attr_as("permitted_uri_domains", "permittedURIDomains", list())
        .attr_as("excluded_uri_domains", "excludedURIDomains", list())
        .attributes();

    let mut subject = SchemaBuilder::for_component("distinguishedName")?;
    for name in [
        "common_name",
        "country",
        "email_address",
        "locality",
        "organization",
        "organizational_unit",
        "postal_code",
        "province",
        "serial_number",
        "street_address",
    ] {
        subject = subject.attr(name, Attribute::string().optional());
    }

    let issuer = SchemaBuilder::for_component("x509Issuer")?;
    let description = issuer.description().to_string();
    let attributes = issuer
        .attr("name", Attribute::string().required())
        .attr("key_version", Attribute::string().required().one_of(KEY_VERSIONS))
        .attr("duration", Attribute::string().optional())
        .attr("max_path_length", Attribute::int().optional())
        .attr("name_constraints", Attribute::object(name_constraints).optional())
        .attr("subject", Attribute::object(subject.attributes()).optional())
        .attributes();

    Ok(Attribute::object(attributes)
        .optional()
        .requires_replace()
        .describe(description))
}

pub fn schema() -> Result<Schema> {
    let issuer = issuer_schema()?;
    let computed = || Attribute::string().computed().use_state_for_unknown();
    Ok(SchemaBuilder::for_component("authority")?
        .attr("id", computed())
        .attr("name", Attribute::string().required().requires_replace())
        .attr(
            "type",
            Attribute::string()
                .required()
                .requires_replace()
                .one_of(AUTHORITY_TYPES),
        )
        .attr("subdomain", Attribute::string().required().requires_replace())
        .attr("domain", computed())
        .attr("fingerprint", computed())
        .attr("root", computed())
        .attr(
            "admin_emails",
            Attribute::set(ElementKind::String).required().requires_replace(),
        )
        .attr(
            "active_revocation",
            Attribute::bool()
                .optional_computed()
                .use_state_for_unknown()
                .requires_replace(),
        )
        .attr("created_at", computed())
        .attr(
            "intermediate_issuer",
            issuer.clone().describe(
                "The issuer of the authority's intermediate certificate. Not returned by the API; \
                 ignored on import.",
            ),
        )
        .attr(
            "root_issuer",
            issuer.describe(
                "The issuer of the authority's root certificate. Not returned by the API; \
                 ignored on import.",
            ),
        )
        .build())
}

/// Controller for certificate authorities
pub struct AuthorityResource {
    client: Client,
}

impl AuthorityResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GET by id or domain
    pub(crate) async fn fetch(&self, ctx: &Context, id: &str) -> StepResult<Fetched<Authority>> {
        let resource = format!("authority {}", id);
        let response = self
            .client
            .v20231208()
            .get_authority(&ctx.cancel, id)
            .await
            .map_err(|e| client_error("read", &resource, &e))?;
        Ok(fetched("read", &resource, &response)?)
    }
}

#[async_trait]
impl Resource for AuthorityResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Result<Schema> {
        schema()
    }

    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value> {
        let model: AuthorityModel = decode_model(planned)?;
        let request = model.to_api()?;
        let resource = format!("authority {}", request.subdomain);
        debug!(resource = TYPE_NAME, subdomain = %request.subdomain, "creating");

        let response = self
            .client
            .v20231208()
            .post_authorities(&ctx.cancel, &request)
            .await
            .map_err(|e| client_error("create", &resource, &e))?;
        expect_status("create", &resource, &response, status::CREATED)?;
        let authority: Authority = decode_body("create", &resource, &response)?;

        info!(resource = TYPE_NAME, id = %authority.id, domain = %authority.domain, "created");
        encode_model(&AuthorityModel::from_api(&authority, planned)?)
    }

    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>> {
        let id = identity(state, "id")?;
        debug!(resource = TYPE_NAME, id, "reading");
        match self.fetch(ctx, id).await? {
            Fetched::Found(authority) => {
                encode_model(&AuthorityModel::from_api(&authority, state)?).map(Some)
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
        let resource = format!("authority {}", id);
        debug!(resource = TYPE_NAME, id, "deleting");
        let response = self
            .client
            .v20231208()
            .delete_authority(&ctx.cancel, id)
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
    use chrono::Utc;
    use serde_json::json;

    fn api() -> Authority {
        Authority {
            id: "0b8f6f5e-8a4c-4a53-9f3f-1a8a1f0c2d11".to_string(),
            name: "X Authority".to_string(),
            domain: "tfp-abc123.ca.smallstep.com".to_string(),
            kind: "devops".to_string(),
            fingerprint: Some("ab".repeat(32)),
            root: Some("-----BEGIN CERTIFICATE-----\n...".to_string()),
            admin_emails: Some(vec!["a@x".to_string()]),
            active_revocation: Some(false),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_subdomain_is_derived_from_domain() {
        let model = AuthorityModel::from_api(&api(), &Value::Null).unwrap();
        assert_eq!(model.subdomain.as_deref(), Some("tfp-abc123"));
        assert!(model.intermediate_issuer.is_null());
    }

    #[test]
    fn test_issuers_persist_from_prior() {
        let prior = Value::from_json(&json!({
            "root_issuer": {"name": "Root", "key_version": "EC_SIGN_P256_SHA256", "duration": "87600h"}
        }));
        let model = AuthorityModel::from_api(&api(), &prior).unwrap();
        let issuer = model.root_issuer.as_known().unwrap();
        assert_eq!(issuer.duration.as_deref(), Some("87600h"));
    }

    #[test]
    fn test_corrupt_prior_issuer_is_reported() {
        let prior = Value::from_json(&json!({"root_issuer": {"name": ["not", "a", "string"]}}));
        let diags = AuthorityModel::from_api(&api(), &prior).unwrap_err();
        let message = diags.to_string();
        assert!(message.contains("root_issuer"), "{message}");
        assert!(message.contains("Invalid prior state"), "{message}");
    }

    #[test]
    fn test_unset_active_revocation_reads_as_null() {
        let mut authority = api();
        authority.active_revocation = Some(false);
        let prior = Value::from_json(&json!({"active_revocation": null}));
        let model = AuthorityModel::from_api(&authority, &prior).unwrap();
        assert!(model.active_revocation.is_null());
    }

    #[test]
    fn test_schema_requires_replacement_everywhere() {
        let schema = schema().unwrap();
        for (name, attribute) in &schema.attributes {
            if attribute.is_configurable() {
                assert!(
                    attribute.has_modifier(smallstep_core::PlanModifier::RequiresReplace),
                    "{} should force replacement",
                    name
                );
            }
        }
        assert!(!schema.description.is_empty());
    }
}
