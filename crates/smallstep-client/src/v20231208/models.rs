//! Request and response bodies of API version 2023-12-08

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::union::Union;
use crate::wire_enum::wire_enum;

// ============ Authorities ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authority {
    pub id: String,
    pub name: String,
    pub domain: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_emails: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_revocation: Option<bool>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthority {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub subdomain: String,
    pub admin_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_revocation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_issuer: Option<X509Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_issuer: Option<X509Issuer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Issuer {
    pub name: String,
    pub key_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_path_length: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_constraints: Option<NameConstraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<DistinguishedName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    #[serde(rename = "permittedDNSDomains", default, skip_serializing_if = "Option::is_none")]
    pub permitted_dns_domains: Option<Vec<String>>,
    #[serde(rename = "excludedDNSDomains", default, skip_serializing_if = "Option::is_none")]
    pub excluded_dns_domains: Option<Vec<String>>,
    #[serde(rename = "permittedIPRanges", default, skip_serializing_if = "Option::is_none")]
    pub permitted_ip_ranges: Option<Vec<String>>,
    #[serde(rename = "excludedIPRanges", default, skip_serializing_if = "Option::is_none")]
    pub excluded_ip_ranges: Option<Vec<String>>,
    #[serde(rename = "permittedEmailAddresses", default, skip_serializing_if = "Option::is_none")]
    pub permitted_email_addresses: Option<Vec<String>>,
    #[serde(rename = "excludedEmailAddresses", default, skip_serializing_if = "Option::is_none")]
    pub excluded_email_addresses: Option<Vec<String>>,
    #[serde(rename = "permittedURIDomains", default, skip_serializing_if = "Option::is_none")]
    pub permitted_uri_domains: Option<Vec<String>>,
    #[serde(rename = "excludedURIDomains", default, skip_serializing_if = "Option::is_none")]
    pub excluded_uri_domains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinguishedName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
}

// ============ Provisioners ============

wire_enum! {
    /// Discriminator of [`Provisioner`]
    pub enum ProvisionerType as "provisioner type" {
        Jwk => "JWK",
        Oidc => "OIDC",
        Acme => "ACME",
        AcmeAttestation => "ACME_ATTESTATION",
        X5c => "X5C",
        Aws => "AWS",
        Gcp => "GCP",
        Azure => "AZURE",
    }
}

/// A provisioner; the type-specific fields are inlined next to the common ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "authorityID", default, skip_serializing_if = "Option::is_none")]
    pub authority_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProvisionerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<ProvisionerClaims>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ProvisionerOptions>,
    #[serde(flatten)]
    pub configuration: Union,
}

impl Provisioner {
    pub fn as_jwk(&self) -> Result<JwkProvisioner> {
        self.configuration.as_variant("JWK provisioner")
    }

    pub fn as_oidc(&self) -> Result<OidcProvisioner> {
        self.configuration.as_variant("OIDC provisioner")
    }

    pub fn as_acme(&self) -> Result<AcmeProvisioner> {
        self.configuration.as_variant("ACME provisioner")
    }

    pub fn as_acme_attestation(&self) -> Result<AcmeAttestationProvisioner> {
        self.configuration.as_variant("ACME_ATTESTATION provisioner")
    }

    pub fn as_x5c(&self) -> Result<X5cProvisioner> {
        self.configuration.as_variant("X5C provisioner")
    }

    pub fn as_aws(&self) -> Result<AwsProvisioner> {
        self.configuration.as_variant("AWS provisioner")
    }

    pub fn as_gcp(&self) -> Result<GcpProvisioner> {
        self.configuration.as_variant("GCP provisioner")
    }

    pub fn as_azure(&self) -> Result<AzureProvisioner> {
        self.configuration.as_variant("AZURE provisioner")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionerClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_renewal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_renewal_after_expiry: Option<bool>,
    #[serde(rename = "enableSSHCA", default, skip_serializing_if = "Option::is_none")]
    pub enable_ssh_ca: Option<bool>,
    #[serde(rename = "minTLSCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub min_tls_cert_duration: Option<String>,
    #[serde(rename = "maxTLSCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub max_tls_cert_duration: Option<String>,
    #[serde(rename = "defaultTLSCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub default_tls_cert_duration: Option<String>,
    #[serde(rename = "minUserSSHCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub min_user_ssh_cert_duration: Option<String>,
    #[serde(rename = "maxUserSSHCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub max_user_ssh_cert_duration: Option<String>,
    #[serde(rename = "defaultUserSSHCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub default_user_ssh_cert_duration: Option<String>,
    #[serde(rename = "minHostSSHCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub min_host_ssh_cert_duration: Option<String>,
    #[serde(rename = "maxHostSSHCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub max_host_ssh_cert_duration: Option<String>,
    #[serde(rename = "defaultHostSSHCertDuration", default, skip_serializing_if = "Option::is_none")]
    pub default_host_ssh_cert_duration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509: Option<TemplateOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<TemplateOptions>,
}

/// `x509Options` and `sshOptions` share one shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwkProvisioner {
    pub key: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcProvisioner {
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
    pub configuration_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
    #[serde(rename = "tenantID", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcmeProvisioner {
    pub challenges: Vec<String>,
    #[serde(rename = "requireEAB", default, skip_serializing_if = "Option::is_none")]
    pub require_eab: Option<bool>,
    #[serde(rename = "forceCN", default, skip_serializing_if = "Option::is_none")]
    pub force_cn: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcmeAttestationProvisioner {
    pub attestation_formats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation_roots: Option<Vec<String>>,
    #[serde(rename = "requireEAB", default, skip_serializing_if = "Option::is_none")]
    pub require_eab: Option<bool>,
    #[serde(rename = "forceCN", default, skip_serializing_if = "Option::is_none")]
    pub force_cn: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct X5cProvisioner {
    pub roots: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsProvisioner {
    pub accounts: Vec<String>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_trust_on_first_use: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_age: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpProvisioner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_accounts: Option<Vec<String>>,
    #[serde(rename = "projectIDs", default, skip_serializing_if = "Option::is_none")]
    pub project_ids: Option<Vec<String>>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_trust_on_first_use: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_age: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureProvisioner {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    pub resource_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_trust_on_first_use: Option<bool>,
}

// ============ Agent & Endpoint Configurations ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "authorityID")]
    pub authority_id: String,
    pub provisioner: String,
    pub name: String,
    pub attestation_slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub kind: String,
    #[serde(rename = "authorityID")]
    pub authority_id: String,
    pub provisioner: String,
    pub certificate_info: EndpointCertificateInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_info: Option<EndpointKeyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_info: Option<EndpointReloadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<EndpointHooks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCertificateInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crt_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointKeyInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointReloadInfo {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointHooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<EndpointHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew: Option<EndpointHook>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointHook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<Vec<String>>,
}

// ============ Managed Configurations ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "agentConfigurationID")]
    pub agent_configuration_id: String,
    #[serde(rename = "hostID", default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    pub managed_endpoints: Vec<ManagedEndpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "endpointConfigurationID")]
    pub endpoint_configuration_id: String,
    #[serde(rename = "x509CertificateData", default, skip_serializing_if = "Option::is_none")]
    pub x509_certificate_data: Option<X509Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_certificate_data: Option<SshFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Fields {
    pub common_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sans: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SshFields {
    #[serde(rename = "keyID")]
    pub key_id: String,
    pub principals: Vec<String>,
}

// ============ Collections ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "schemaURI", default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    pub instance_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of both `PutCollection` and `PatchCollection`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "schemaURI", default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInstance {
    pub id: String,
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCollectionInstance {
    pub data: serde_json::Value,
}

// ============ Device Collections ============

wire_enum! {
    /// Discriminator of [`DeviceCollection`]
    pub enum DeviceType as "device type" {
        AwsVm => "aws-vm",
        GcpVm => "gcp-vm",
        AzureVm => "azure-vm",
        Tpm => "tpm",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCollection {
    pub slug: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_emails: Option<Vec<String>>,
    pub device_type: DeviceType,
    pub device_type_configuration: Union,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DeviceCollection {
    pub fn as_aws_vm(&self) -> Result<AwsVm> {
        self.device_type_configuration.as_variant("aws-vm configuration")
    }

    pub fn as_gcp_vm(&self) -> Result<GcpVm> {
        self.device_type_configuration.as_variant("gcp-vm configuration")
    }

    pub fn as_azure_vm(&self) -> Result<AzureVm> {
        self.device_type_configuration.as_variant("azure-vm configuration")
    }

    pub fn as_tpm(&self) -> Result<Tpm> {
        self.device_type_configuration.as_variant("tpm configuration")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeviceCollection {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_emails: Option<Vec<String>>,
    pub device_type: DeviceType,
    pub device_type_configuration: Union,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsVm {
    pub accounts: Vec<String>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpVm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_accounts: Option<Vec<String>>,
    #[serde(rename = "projectIDs", default, skip_serializing_if = "Option::is_none")]
    pub project_ids: Option<Vec<String>>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureVm {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    pub resource_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(rename = "disableCustomSANs", default, skip_serializing_if = "Option::is_none")]
    pub disable_custom_sans: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tpm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestor_roots: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestor_intermediates: Option<String>,
    #[serde(rename = "forceCN", default, skip_serializing_if = "Option::is_none")]
    pub force_cn: Option<bool>,
    #[serde(rename = "requireEAB", default, skip_serializing_if = "Option::is_none")]
    pub require_eab: Option<bool>,
}

/// Request and response body of device collection accounts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCollectionAccount {
    pub slug: String,
    #[serde(rename = "accountID")]
    pub account_id: String,
    #[serde(rename = "authorityID")]
    pub authority_id: String,
    pub display_name: String,
    pub certificate_info: EndpointCertificateInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_info: Option<EndpointKeyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_info: Option<EndpointReloadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_data: Option<CertificateFields>,
}

/// Request and response body of workloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub slug: String,
    pub display_name: String,
    pub workload_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_emails: Option<Vec<String>>,
    pub certificate_info: EndpointCertificateInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_info: Option<EndpointKeyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_info: Option<EndpointReloadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<EndpointHooks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_data: Option<CertificateFields>,
}

// ============ Certificate Fields ============

/// Subject and SAN fields; each is a static value or a device metadata key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sans: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address: Option<Union>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<Union>,
}

/// Key selecting the static branch of a certificate field
pub const CERTIFICATE_FIELD_STATIC: &str = "static";

/// Key selecting the device metadata branch of a certificate field
pub const CERTIFICATE_FIELD_DEVICE_METADATA: &str = "deviceMetadata";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateFieldStatic {
    #[serde(rename = "static")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFieldDeviceMetadata {
    pub device_metadata: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateFieldListStatic {
    #[serde(rename = "static")]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFieldListDeviceMetadata {
    pub device_metadata: Vec<String>,
}

// ============ Attestation Authorities ============

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationAuthority {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub catalog: String,
    pub attestor_roots: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestor_intermediates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
