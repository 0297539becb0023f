//! Request and response bodies of API version 2025-01-01

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::union::Union;
use crate::wire_enum::wire_enum;

pub use crate::v20231208::models::{
    CertificateFieldDeviceMetadata, CertificateFieldListDeviceMetadata,
    CertificateFieldListStatic, CertificateFieldStatic, CertificateFields,
    EndpointCertificateInfo, EndpointKeyInfo,
};

// ============ Device Inventory Integrations ============

wire_enum! {
    /// Discriminator of [`DeviceInventoryIntegration`]
    pub enum IntegrationKind as "integration kind" {
        Jamf => "jamf",
        Intune => "intune",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInventoryIntegration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub kind: IntegrationKind,
    pub configuration: Union,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DeviceInventoryIntegration {
    pub fn as_jamf(&self) -> Result<JamfIntegration> {
        self.configuration.as_variant("jamf integration")
    }

    pub fn as_intune(&self) -> Result<IntuneIntegration> {
        self.configuration.as_variant("intune integration")
    }
}

/// Name of the secret field both integration kinds share; never returned
pub const CLIENT_SECRET: &str = "clientSecret";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JamfIntegration {
    #[serde(rename = "tenantURL")]
    pub tenant_url: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntuneIntegration {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval: Option<String>,
}

// ============ Protection Strategies ============

wire_enum! {
    /// Discriminator of [`Strategy`]
    pub enum StrategyKind as "strategy kind" {
        Browser => "browser",
        Ethernet => "ethernet",
        Relay => "relay",
        Ssh => "ssh",
        Sso => "sso",
        Vpn => "vpn",
        Wifi => "wifi",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub kind: StrategyKind,
    pub configuration: Union,
    pub credential: StrategyCredential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<StrategyPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Strategy {
    pub fn as_browser(&self) -> Result<BrowserStrategy> {
        self.configuration.as_variant("browser strategy")
    }

    pub fn as_ethernet(&self) -> Result<EthernetStrategy> {
        self.configuration.as_variant("ethernet strategy")
    }

    pub fn as_relay(&self) -> Result<RelayStrategy> {
        self.configuration.as_variant("relay strategy")
    }

    pub fn as_ssh(&self) -> Result<SshStrategy> {
        self.configuration.as_variant("ssh strategy")
    }

    pub fn as_sso(&self) -> Result<SsoStrategy> {
        self.configuration.as_variant("sso strategy")
    }

    pub fn as_vpn(&self) -> Result<VpnStrategy> {
        self.configuration.as_variant("vpn strategy")
    }

    pub fn as_wifi(&self) -> Result<WifiStrategy> {
        self.configuration.as_variant("wifi strategy")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyCredential {
    pub certificate_info: EndpointCertificateInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_info: Option<EndpointKeyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_data: Option<CertificateFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assurance: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserStrategy {
    pub match_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthernetStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_chain: Option<String>,
    #[serde(rename = "networkAccessServerIP", default, skip_serializing_if = "Option::is_none")]
    pub network_access_server_ip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStrategy {
    pub match_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoStrategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_roots: Option<String>,
    #[serde(rename = "redirectURI")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnStrategy {
    pub connection_type: String,
    pub remote_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiStrategy {
    pub ssid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_chain: Option<String>,
    #[serde(rename = "networkAccessServerIP", default, skip_serializing_if = "Option::is_none")]
    pub network_access_server_ip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integration_projection() {
        let body = json!({
            "id": "i1",
            "name": "tfprovider-jamf",
            "kind": "jamf",
            "configuration": {"tenantURL": "https://acme.jamfcloud.com", "clientID": "c1"}
        });
        let integration: DeviceInventoryIntegration = serde_json::from_value(body).unwrap();
        assert_eq!(integration.kind, IntegrationKind::Jamf);
        let jamf = integration.as_jamf().unwrap();
        assert_eq!(jamf.tenant_url, "https://acme.jamfcloud.com");
        assert!(jamf.client_secret.is_none());
        assert!(integration.as_intune().is_err());
    }

    #[test]
    fn test_strategy_kinds() {
        assert_eq!(StrategyKind::ALL.len(), 7);
        assert_eq!("wifi".parse::<StrategyKind>().unwrap(), StrategyKind::Wifi);
        let err = "bluetooth".parse::<StrategyKind>().unwrap_err();
        assert!(err.to_string().contains("browser, ethernet"));
    }
}
