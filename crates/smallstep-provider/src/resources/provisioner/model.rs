//! Provisioner model and its API codec

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use smallstep_client::{ClientError, Union, UnknownVariant};
use smallstep_client::v20231208::models::{
    AcmeAttestationProvisioner, AcmeProvisioner, AwsProvisioner, AzureProvisioner,
    GcpProvisioner, JwkProvisioner, OidcProvisioner, Provisioner, ProvisionerClaims,
    ProvisionerOptions, ProvisionerType, TemplateOptions, X5cProvisioner,
};
use smallstep_core::bridge::{
    parse_json_attr, to_duration_string, to_json_string, to_optional_bool, to_optional_list,
    to_optional_set, to_optional_string,
};
use smallstep_core::{Attr, AttrPath, Diagnostic, Diagnostics, ErrorKind, Value};

use crate::resource::StepResult;
use crate::resources::common::{encode_variant, select_branch, set_to_vec, timestamp, union_error};

/// Configuration branches, in the order of the discriminator's values
pub const BRANCHES: [&str; 8] = [
    "jwk",
    "oidc",
    "acme",
    "acme_attestation",
    "x5c",
    "aws",
    "gcp",
    "azure",
];

/// Branch selected by a discriminator value
pub fn branch_of(kind: ProvisionerType) -> &'static str {
    match kind {
        ProvisionerType::Jwk => "jwk",
        ProvisionerType::Oidc => "oidc",
        ProvisionerType::Acme => "acme",
        ProvisionerType::AcmeAttestation => "acme_attestation",
        ProvisionerType::X5c => "x5c",
        ProvisionerType::Aws => "aws",
        ProvisionerType::Gcp => "gcp",
        ProvisionerType::Azure => "azure",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerModel {
    pub id: Attr<String>,
    pub authority_id: Attr<String>,
    pub name: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub created_at: Attr<String>,
    pub claims: Attr<ClaimsModel>,
    pub options: Attr<OptionsModel>,
    pub jwk: Attr<JwkModel>,
    pub oidc: Attr<OidcModel>,
    pub acme: Attr<AcmeModel>,
    pub acme_attestation: Attr<AcmeAttestationModel>,
    pub x5c: Attr<X5cModel>,
    pub aws: Attr<AwsModel>,
    pub gcp: Attr<GcpModel>,
    pub azure: Attr<AzureModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsModel {
    pub disable_renewal: Attr<bool>,
    pub allow_renewal_after_expiry: Attr<bool>,
    pub enable_ssh_ca: Attr<bool>,
    pub min_tls_cert_duration: Attr<String>,
    pub max_tls_cert_duration: Attr<String>,
    pub default_tls_cert_duration: Attr<String>,
    pub min_user_ssh_cert_duration: Attr<String>,
    pub max_user_ssh_cert_duration: Attr<String>,
    pub default_user_ssh_cert_duration: Attr<String>,
    pub min_host_ssh_cert_duration: Attr<String>,
    pub max_host_ssh_cert_duration: Attr<String>,
    pub default_host_ssh_cert_duration: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsModel {
    pub x509: Attr<TemplateModel>,
    pub ssh: Attr<TemplateModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateModel {
    pub template: Attr<String>,
    /// JSON document
    pub template_data: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwkModel {
    /// Public JWK as a JSON document
    pub key: Attr<String>,
    pub encrypted_key: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcModel {
    pub client_id: Attr<String>,
    pub client_secret: Attr<String>,
    pub configuration_endpoint: Attr<String>,
    pub admins: Attr<BTreeSet<String>>,
    pub domains: Attr<BTreeSet<String>>,
    pub groups: Attr<BTreeSet<String>>,
    pub listen_address: Attr<String>,
    pub tenant_id: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcmeModel {
    pub challenges: Attr<Vec<String>>,
    pub require_eab: Attr<bool>,
    pub force_cn: Attr<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcmeAttestationModel {
    pub attestation_formats: Attr<BTreeSet<String>>,
    pub attestation_roots: Attr<Vec<String>>,
    pub require_eab: Attr<bool>,
    pub force_cn: Attr<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct X5cModel {
    pub roots: Attr<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsModel {
    pub accounts: Attr<BTreeSet<String>>,
    pub disable_custom_sans: Attr<bool>,
    pub disable_trust_on_first_use: Attr<bool>,
    pub instance_age: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpModel {
    pub service_accounts: Attr<BTreeSet<String>>,
    pub project_ids: Attr<BTreeSet<String>>,
    pub disable_custom_sans: Attr<bool>,
    pub disable_trust_on_first_use: Attr<bool>,
    pub instance_age: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureModel {
    pub tenant_id: Attr<String>,
    pub resource_groups: Attr<BTreeSet<String>>,
    pub audience: Attr<String>,
    pub disable_custom_sans: Attr<bool>,
    pub disable_trust_on_first_use: Attr<bool>,
}

fn required<T: Clone + Default>(value: &Attr<T>) -> T {
    value.to_option().unwrap_or_default()
}

impl ProvisionerModel {
    pub fn from_api(api: &Provisioner, prior: &Value) -> Result<Self, Diagnostic> {
        let kind = api.kind.as_str();
        let project = |e: ClientError| union_error("type", kind, &e);
        let at = |branch: &str| AttrPath::root(branch);

        let mut model = Self {
            id: Attr::from_option(api.id.clone()),
            authority_id: Attr::from_option(api.authority_id.clone()),
            name: Attr::Known(api.name.clone()),
            kind: Attr::Known(kind.to_string()),
            created_at: Attr::from_option(api.created_at.as_ref().map(timestamp)),
            claims: ClaimsModel::from_api(api.claims.as_ref(), prior),
            options: OptionsModel::from_api(api.options.as_ref(), prior),
            ..Default::default()
        };

        match api.kind {
            ProvisionerType::Jwk => {
                let jwk = api.as_jwk().map_err(project)?;
                let path = at("jwk");
                model.jwk = Attr::Known(JwkModel {
                    key: to_json_string(Some(&jwk.key), prior, &path.child("key")),
                    encrypted_key: to_optional_string(
                        jwk.encrypted_key,
                        prior,
                        &path.child("encrypted_key"),
                    ),
                });
            }
            ProvisionerType::Oidc => {
                let oidc = api.as_oidc().map_err(project)?;
                let path = at("oidc");
                model.oidc = Attr::Known(OidcModel {
                    client_id: Attr::Known(oidc.client_id),
                    client_secret: Attr::Known(oidc.client_secret),
                    configuration_endpoint: Attr::Known(oidc.configuration_endpoint),
                    admins: to_optional_set(oidc.admins, prior, &path.child("admins")),
                    domains: to_optional_set(oidc.domains, prior, &path.child("domains")),
                    groups: to_optional_set(oidc.groups, prior, &path.child("groups")),
                    listen_address: to_optional_string(
                        oidc.listen_address,
                        prior,
                        &path.child("listen_address"),
                    ),
                    tenant_id: to_optional_string(oidc.tenant_id, prior, &path.child("tenant_id")),
                });
            }
            ProvisionerType::Acme => {
                let acme = api.as_acme().map_err(project)?;
                let path = at("acme");
                model.acme = Attr::Known(AcmeModel {
                    challenges: Attr::Known(acme.challenges),
                    require_eab: to_optional_bool(
                        acme.require_eab,
                        prior,
                        &path.child("require_eab"),
                    ),
                    force_cn: to_optional_bool(acme.force_cn, prior, &path.child("force_cn")),
                });
            }
            ProvisionerType::AcmeAttestation => {
                let acme = api.as_acme_attestation().map_err(project)?;
                let path = at("acme_attestation");
                model.acme_attestation = Attr::Known(AcmeAttestationModel {
                    attestation_formats: Attr::Known(
                        acme.attestation_formats.into_iter().collect(),
                    ),
                    attestation_roots: to_optional_list(
                        acme.attestation_roots,
                        prior,
                        &path.child("attestation_roots"),
                    ),
                    require_eab: to_optional_bool(
                        acme.require_eab,
                        prior,
                        &path.child("require_eab"),
                    ),
                    force_cn: to_optional_bool(acme.force_cn, prior, &path.child("force_cn")),
                });
            }
            ProvisionerType::X5c => {
                let x5c = api.as_x5c().map_err(project)?;
                model.x5c = Attr::Known(X5cModel {
                    roots: Attr::Known(x5c.roots),
                });
            }
            ProvisionerType::Aws => {
                let aws = api.as_aws().map_err(project)?;
                let path = at("aws");
                model.aws = Attr::Known(AwsModel {
                    accounts: Attr::Known(aws.accounts.into_iter().collect()),
                    disable_custom_sans: to_optional_bool(
                        aws.disable_custom_sans,
                        prior,
                        &path.child("disable_custom_sans"),
                    ),
                    disable_trust_on_first_use: to_optional_bool(
                        aws.disable_trust_on_first_use,
                        prior,
                        &path.child("disable_trust_on_first_use"),
                    ),
                    instance_age: to_duration_string(
                        aws.instance_age,
                        prior,
                        &path.child("instance_age"),
                    ),
                });
            }
            ProvisionerType::Gcp => {
                let gcp = api.as_gcp().map_err(project)?;
                let path = at("gcp");
                model.gcp = Attr::Known(GcpModel {
                    service_accounts: to_optional_set(
                        gcp.service_accounts,
                        prior,
                        &path.child("service_accounts"),
                    ),
                    project_ids: to_optional_set(gcp.project_ids, prior, &path.child("project_ids")),
                    disable_custom_sans: to_optional_bool(
                        gcp.disable_custom_sans,
                        prior,
                        &path.child("disable_custom_sans"),
                    ),
                    disable_trust_on_first_use: to_optional_bool(
                        gcp.disable_trust_on_first_use,
                        prior,
                        &path.child("disable_trust_on_first_use"),
                    ),
                    instance_age: to_duration_string(
                        gcp.instance_age,
                        prior,
                        &path.child("instance_age"),
                    ),
                });
            }
            ProvisionerType::Azure => {
                let azure = api.as_azure().map_err(project)?;
                let path = at("azure");
                model.azure = Attr::Known(AzureModel {
                    tenant_id: Attr::Known(azure.tenant_id),
                    resource_groups: Attr::Known(azure.resource_groups.into_iter().collect()),
                    audience: to_optional_string(azure.audience, prior, &path.child("audience")),
                    disable_custom_sans: to_optional_bool(
                        azure.disable_custom_sans,
                        prior,
                        &path.child("disable_custom_sans"),
                    ),
                    disable_trust_on_first_use: to_optional_bool(
                        azure.disable_trust_on_first_use,
                        prior,
                        &path.child("disable_trust_on_first_use"),
                    ),
                });
            }
        }

        Ok(model)
    }

    fn branches(&self) -> [(&'static str, bool); 8] {
        [
            ("jwk", self.jwk.is_known()),
            ("oidc", self.oidc.is_known()),
            ("acme", self.acme.is_known()),
            ("acme_attestation", self.acme_attestation.is_known()),
            ("x5c", self.x5c.is_known()),
            ("aws", self.aws.is_known()),
            ("gcp", self.gcp.is_known()),
            ("azure", self.azure.is_known()),
        ]
    }

    pub fn to_api(&self) -> StepResult<Provisioner> {
        let discriminator = self.kind.as_deref().unwrap_or_default();
        let kind: ProvisionerType = discriminator.parse().map_err(|e: UnknownVariant| {
            Diagnostic::error("Invalid provisioner type", e.to_string())
                .with_kind(ErrorKind::ParseError)
                .at(&AttrPath::root("type"))
        })?;
        select_branch("type", discriminator, branch_of(kind), &self.branches())?;

        let configuration = self.configuration(kind)?;
        let options = self.options.as_known().map(OptionsModel::to_api).transpose()?;

        Ok(Provisioner {
            id: None,
            authority_id: None,
            name: required(&self.name),
            kind,
            created_at: None,
            claims: self.claims.as_known().map(ClaimsModel::to_api),
            options,
            configuration,
        })
    }

    fn configuration(&self, kind: ProvisionerType) -> StepResult<Union> {
        let path = AttrPath::root(branch_of(kind));
        let union = match kind {
            ProvisionerType::Jwk => {
                let jwk = self.jwk.as_known().cloned().unwrap_or_default();
                let key = parse_json_attr(&jwk.key, &path.child("key"))?.unwrap_or_default();
                encode_variant(
                    &JwkProvisioner {
                        key,
                        encrypted_key: jwk.encrypted_key.to_option(),
                    },
                    &path,
                )
            }
            ProvisionerType::Oidc => {
                let oidc = self.oidc.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &OidcProvisioner {
                        client_id: required(&oidc.client_id),
                        client_secret: required(&oidc.client_secret),
                        configuration_endpoint: required(&oidc.configuration_endpoint),
                        admins: set_to_vec(&oidc.admins),
                        domains: set_to_vec(&oidc.domains),
                        groups: set_to_vec(&oidc.groups),
                        listen_address: oidc.listen_address.to_option(),
                        tenant_id: oidc.tenant_id.to_option(),
                    },
                    &path,
                )
            }
            ProvisionerType::Acme => {
                let acme = self.acme.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &AcmeProvisioner {
                        challenges: required(&acme.challenges),
                        require_eab: acme.require_eab.to_option(),
                        force_cn: acme.force_cn.to_option(),
                    },
                    &path,
                )
            }
            ProvisionerType::AcmeAttestation => {
                let acme = self.acme_attestation.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &AcmeAttestationProvisioner {
                        attestation_formats: set_to_vec(&acme.attestation_formats).unwrap_or_default(),
                        attestation_roots: acme.attestation_roots.to_option(),
                        require_eab: acme.require_eab.to_option(),
                        force_cn: acme.force_cn.to_option(),
                    },
                    &path,
                )
            }
            ProvisionerType::X5c => {
                let x5c = self.x5c.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &X5cProvisioner {
                        roots: required(&x5c.roots),
                    },
                    &path,
                )
            }
            ProvisionerType::Aws => {
                let aws = self.aws.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &AwsProvisioner {
                        accounts: set_to_vec(&aws.accounts).unwrap_or_default(),
                        disable_custom_sans: aws.disable_custom_sans.to_option(),
                        disable_trust_on_first_use: aws.disable_trust_on_first_use.to_option(),
                        instance_age: aws.instance_age.to_option(),
                    },
                    &path,
                )
            }
            ProvisionerType::Gcp => {
                let gcp = self.gcp.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &GcpProvisioner {
                        service_accounts: set_to_vec(&gcp.service_accounts),
                        project_ids: set_to_vec(&gcp.project_ids),
                        disable_custom_sans: gcp.disable_custom_sans.to_option(),
                        disable_trust_on_first_use: gcp.disable_trust_on_first_use.to_option(),
                        instance_age: gcp.instance_age.to_option(),
                    },
                    &path,
                )
            }
            ProvisionerType::Azure => {
                let azure = self.azure.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &AzureProvisioner {
                        tenant_id: required(&azure.tenant_id),
                        resource_groups: set_to_vec(&azure.resource_groups).unwrap_or_default(),
                        audience: azure.audience.to_option(),
                        disable_custom_sans: azure.disable_custom_sans.to_option(),
                        disable_trust_on_first_use: azure.disable_trust_on_first_use.to_option(),
                    },
                    &path,
                )
            }
        };
        Ok(union?)
    }
}

impl ClaimsModel {
    fn from_api(api: Option<&ProvisionerClaims>, prior: &Value) -> Attr<Self> {
        let Some(api) = api else {
            return Attr::Null;
        };
        let path = AttrPath::root("claims");
        let flag = |value: Option<bool>, name: &str| to_optional_bool(value, prior, &path.child(name));
        let duration = |value: &Option<String>, name: &str| {
            to_duration_string(value.clone(), prior, &path.child(name))
        };

        Attr::Known(Self {
            disable_renewal: flag(api.disable_renewal, "disable_renewal"),
            allow_renewal_after_expiry: flag(
                api.allow_renewal_after_expiry,
                "allow_renewal_after_expiry",
            ),
            enable_ssh_ca: flag(api.enable_ssh_ca, "enable_ssh_ca"),
            min_tls_cert_duration: duration(&api.min_tls_cert_duration, "min_tls_cert_duration"),
            max_tls_cert_duration: duration(&api.max_tls_cert_duration, "max_tls_cert_duration"),
            default_tls_cert_duration: duration(
                &api.default_tls_cert_duration,
                "default_tls_cert_duration",
            ),
            min_user_ssh_cert_duration: duration(
                &api.min_user_ssh_cert_duration,
                "min_user_ssh_cert_duration",
            ),
            max_user_ssh_cert_duration: duration(
                &api.max_user_ssh_cert_duration,
                "max_user_ssh_cert_duration",
            ),
            default_user_ssh_cert_duration: duration(
                &api.default_user_ssh_cert_duration,
                "default_user_ssh_cert_duration",
            ),
            min_host_ssh_cert_duration: duration(
                &api.min_host_ssh_cert_duration,
                "min_host_ssh_cert_duration",
            ),
            max_host_ssh_cert_duration: duration(
                &api.max_host_ssh_cert_duration,
                "max_host_ssh_cert_duration",
            ),
            default_host_ssh_cert_duration: duration(
                &api.default_host_ssh_cert_duration,
                "default_host_ssh_cert_duration",
            ),
        })
    }

    fn to_api(&self) -> ProvisionerClaims {
        ProvisionerClaims {
            disable_renewal: self.disable_renewal.to_option(),
            allow_renewal_after_expiry: self.allow_renewal_after_expiry.to_option(),
            enable_ssh_ca: self.enable_ssh_ca.to_option(),
            min_tls_cert_duration: self.min_tls_cert_duration.to_option(),
            max_tls_cert_duration: self.max_tls_cert_duration.to_option(),
            default_tls_cert_duration: self.default_tls_cert_duration.to_option(),
            min_user_ssh_cert_duration: self.min_user_ssh_cert_duration.to_option(),
            max_user_ssh_cert_duration: self.max_user_ssh_cert_duration.to_option(),
            default_user_ssh_cert_duration: self.default_user_ssh_cert_duration.to_option(),
            min_host_ssh_cert_duration: self.min_host_ssh_cert_duration.to_option(),
            max_host_ssh_cert_duration: self.max_host_ssh_cert_duration.to_option(),
            default_host_ssh_cert_duration: self.default_host_ssh_cert_duration.to_option(),
        }
    }
}

impl OptionsModel {
    fn from_api(api: Option<&ProvisionerOptions>, prior: &Value) -> Attr<Self> {
        let Some(api) = api else {
            return Attr::Null;
        };
        let path = AttrPath::root("options");
        Attr::Known(Self {
            x509: TemplateModel::from_api(api.x509.as_ref(), prior, &path.child("x509")),
            ssh: TemplateModel::from_api(api.ssh.as_ref(), prior, &path.child("ssh")),
        })
    }

    fn to_api(&self) -> StepResult<ProvisionerOptions> {
        let path = AttrPath::root("options");
        let mut diags = Diagnostics::new();
        let mut template = |model: &Attr<TemplateModel>, name: &str| {
            model.as_known().and_then(|t| {
                t.to_api(&path.child(name)).map_err(|d| diags.push(d)).ok()
            })
        };
        let x509 = template(&self.x509, "x509");
        let ssh = template(&self.ssh, "ssh");
        diags.into_result(ProvisionerOptions { x509, ssh })
    }
}

impl TemplateModel {
    fn from_api(api: Option<&TemplateOptions>, prior: &Value, path: &AttrPath) -> Attr<Self> {
        api.map_or(Attr::Null, |api| {
            Attr::Known(Self {
                template: to_optional_string(api.template.clone(), prior, &path.child("template")),
                template_data: to_json_string(
                    api.template_data.as_ref(),
                    prior,
                    &path.child("template_data"),
                ),
            })
        })
    }

    fn to_api(&self, path: &AttrPath) -> Result<TemplateOptions, Diagnostic> {
        Ok(TemplateOptions {
            template: self.template.to_option(),
            template_data: parse_json_attr(&self.template_data, &path.child("template_data"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = r#"{"kty": "EC", "crv": "P-256", "x": "MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4", "y": "4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM"}"#;

    fn jwk_model() -> ProvisionerModel {
        ProvisionerModel {
            name: Attr::Known("tfprovider-jwk".to_string()),
            kind: Attr::Known("JWK".to_string()),
            jwk: Attr::Known(JwkModel {
                key: Attr::Known(KEY.to_string()),
                encrypted_key: Attr::Known("eyJhbGciOiJQQkVTMi1IUzI1NitBMTI4S1ciLCJlbmMiOiJBMjU2R0NNIn0".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_jwk_key_keeps_user_formatting() {
        let model = jwk_model();
        let mut api = model.to_api().unwrap();
        api.id = Some("p1".to_string());
        api.authority_id = Some("a1".to_string());

        let prior = Value::encode(&model).unwrap();
        let back = ProvisionerModel::from_api(&api, &prior).unwrap();
        assert_eq!(back.jwk.as_known().unwrap().key.as_deref(), Some(KEY));
        assert_eq!(back.id.as_deref(), Some("p1"));
        assert!(back.oidc.is_null());
    }

    #[test]
    fn test_branch_must_match_type() {
        let mut model = jwk_model();
        model.kind = Attr::Known("OIDC".to_string());
        let diags = model.to_api().unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::ParseError));
    }

    #[test]
    fn test_multiple_branches_are_rejected() {
        let mut model = jwk_model();
        model.x5c = Attr::Known(X5cModel {
            roots: Attr::Known(vec!["-----BEGIN CERTIFICATE-----".to_string()]),
        });
        let diags = model.to_api().unwrap_err();
        assert!(diags.to_string().contains("found 2"));
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        let mut model = jwk_model();
        model.kind = Attr::Known("SCEP".to_string());
        let diags = model.to_api().unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::ParseError));
    }

    #[test]
    fn test_projection_failure_is_keyed_to_type() {
        let api: Provisioner = serde_json::from_value(json!({
            "id": "p1",
            "name": "broken",
            "type": "OIDC",
            "key": {"kty": "EC"}
        }))
        .unwrap();
        let err = ProvisionerModel::from_api(&api, &Value::Null).unwrap_err();
        assert_eq!(err.attribute.as_deref(), Some("type"));
        assert_eq!(err.kind, Some(ErrorKind::ParseError));
    }

    #[test]
    fn test_claims_durations_keep_literal() {
        let claims = ProvisionerClaims {
            min_tls_cert_duration: Some("5m0s".to_string()),
            max_tls_cert_duration: Some("24h0m0s".to_string()),
            disable_renewal: Some(false),
            ..Default::default()
        };
        let prior = Value::from_json(&json!({"claims": {"min_tls_cert_duration": "5m"}}));
        let model = ClaimsModel::from_api(Some(&claims), &prior);
        let model = model.as_known().unwrap();
        assert_eq!(model.min_tls_cert_duration.as_deref(), Some("5m"));
        assert_eq!(model.max_tls_cert_duration.as_deref(), Some("24h0m0s"));
        assert!(model.disable_renewal.is_null());
    }

    #[test]
    fn test_template_data_is_parsed() {
        let mut model = jwk_model();
        model.options = Attr::Known(OptionsModel {
            x509: Attr::Known(TemplateModel {
                template: Attr::Null,
                template_data: Attr::Known(r#"{"org": "acme"}"#.to_string()),
            }),
            ssh: Attr::Null,
        });
        let api = model.to_api().unwrap();
        let x509 = api.options.unwrap().x509.unwrap();
        assert_eq!(x509.template_data, Some(json!({"org": "acme"})));
    }
}
