use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use smallstep_client::v20250101::models::{
    BrowserStrategy, EthernetStrategy, RelayStrategy, SshStrategy, SsoStrategy, Strategy,
    StrategyCredential, StrategyKind, StrategyPolicy, VpnStrategy, WifiStrategy,
};
use smallstep_client::{ClientError, Union, UnknownVariant};
use smallstep_core::bridge::{to_optional_bool, to_optional_list, to_optional_set, to_optional_string};
use smallstep_core::{Attr, AttrPath, Diagnostic, Diagnostics, ErrorKind, Value};

use crate::resource::StepResult;
use crate::resources::common::{
    CertificateFieldsModel, CertificateInfoModel, KeyInfoModel, encode_variant, select_branch,
    set_to_vec, timestamp, union_error,
};

/// Configuration blocks, one per strategy kind
pub const BRANCHES: [&str; 7] = ["browser", "ethernet", "relay", "ssh", "sso", "vpn", "wifi"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub kind: Attr<String>,
    pub created_at: Attr<String>,
    pub credential: Attr<CredentialModel>,
    pub policy: Attr<PolicyModel>,
    pub browser: Attr<BrowserModel>,
    pub ethernet: Attr<EthernetModel>,
    pub relay: Attr<RelayModel>,
    pub ssh: Attr<SshModel>,
    pub sso: Attr<SsoModel>,
    pub vpn: Attr<VpnModel>,
    pub wifi: Attr<WifiModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialModel {
    pub certificate_info: Attr<CertificateInfoModel>,
    pub key_info: Attr<KeyInfoModel>,
    pub certificate_data: Attr<CertificateFieldsModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyModel {
    pub assurance: Attr<BTreeSet<String>>,
    pub os: Attr<BTreeSet<String>>,
    pub ownership: Attr<BTreeSet<String>>,
    pub source: Attr<BTreeSet<String>>,
    pub tags: Attr<BTreeSet<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserModel {
    pub match_addresses: Attr<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthernetModel {
    pub autojoin: Attr<bool>,
    pub ca_chain: Attr<String>,
    pub network_access_server_ip: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayModel {
    pub match_domains: Attr<Vec<String>>,
    pub regions: Attr<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshModel {
    pub principals: Attr<Vec<String>>,
    pub host_patterns: Attr<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoModel {
    pub trusted_roots: Attr<String>,
    pub redirect_uri: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpnModel {
    pub connection_type: Attr<String>,
    pub remote_address: Attr<String>,
    pub autojoin: Attr<bool>,
    pub vendor: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiModel {
    pub ssid: Attr<String>,
    pub autojoin: Attr<bool>,
    pub hidden: Attr<bool>,
    pub ca_chain: Attr<String>,
    pub network_access_server_ip: Attr<String>,
}

impl CredentialModel {
    fn from_api(
        api: &StrategyCredential,
        prior: &Value,
        path: &AttrPath,
    ) -> std::result::Result<Self, Diagnostic> {
        Ok(Self {
            certificate_info: Attr::Known(CertificateInfoModel::from_api(
                &api.certificate_info,
                prior,
                &path.child("certificate_info"),
            )),
            key_info: KeyInfoModel::from_api(api.key_info.as_ref(), prior, &path.child("key_info")),
            certificate_data: CertificateFieldsModel::from_api(
                api.certificate_data.as_ref(),
                prior,
                &path.child("certificate_data"),
            )?,
        })
    }

    fn to_api(&self, path: &AttrPath) -> std::result::Result<StrategyCredential, Diagnostics> {
        let mut diags = Diagnostics::new();
        let certificate_info = self
            .certificate_info
            .as_known()
            .cloned()
            .unwrap_or_default()
            .to_api(&path.child("certificate_info"))
            .unwrap_or_else(|d| {
                diags.extend(d);
                Default::default()
            });
        let certificate_data = self.certificate_data.as_known().and_then(|fields| {
            fields
                .to_api(&path.child("certificate_data"))
                .map_err(|d| diags.extend(d))
                .ok()
        });
        diags.into_result(StrategyCredential {
            certificate_info,
            key_info: self.key_info.as_known().map(KeyInfoModel::to_api),
            certificate_data,
        })
    }
}

impl PolicyModel {
    fn from_api(api: Option<&StrategyPolicy>, prior: &Value) -> Attr<Self> {
        let Some(api) = api else {
            return Attr::Null;
        };
        let path = AttrPath::root("policy");
        let set = |values: &Option<Vec<String>>, name: &str| {
            to_optional_set(values.clone(), prior, &path.child(name))
        };
        Attr::Known(Self {
            assurance: set(&api.assurance, "assurance"),
            os: set(&api.os, "os"),
            ownership: set(&api.ownership, "ownership"),
            source: set(&api.source, "source"),
            tags: set(&api.tags, "tags"),
        })
    }

    fn to_api(&self) -> StrategyPolicy {
        StrategyPolicy {
            assurance: set_to_vec(&self.assurance),
            os: set_to_vec(&self.os),
            ownership: set_to_vec(&self.ownership),
            source: set_to_vec(&self.source),
            tags: set_to_vec(&self.tags),
        }
    }
}

fn branch_name(kind: StrategyKind) -> &'static str {
    kind.as_str()
}

impl StrategyModel {
    pub fn from_api(api: &Strategy, prior: &Value) -> std::result::Result<Self, Diagnostic> {
        let kind = api.kind.as_str();
        let project = |e: ClientError| union_error("kind", kind, &e);
        let mut model = Self {
            id: Attr::from_option(api.id.clone()),
            name: Attr::Known(api.name.clone()),
            kind: Attr::Known(kind.to_string()),
            created_at: Attr::from_option(api.created_at.as_ref().map(timestamp)),
            credential: Attr::Known(CredentialModel::from_api(
                &api.credential,
                prior,
                &AttrPath::root("credential"),
            )?),
            policy: PolicyModel::from_api(api.policy.as_ref(), prior),
            ..Default::default()
        };

        let path = AttrPath::root(branch_name(api.kind));
        let string = |value: Option<String>, name: &str| to_optional_string(value, prior, &path.child(name));
        let list = |value: Option<Vec<String>>, name: &str| to_optional_list(value, prior, &path.child(name));
        let flag = |value: Option<bool>, name: &str| to_optional_bool(value, prior, &path.child(name));

        match api.kind {
            StrategyKind::Browser => {
                let browser = api.as_browser().map_err(project)?;
                model.browser = Attr::Known(BrowserModel {
                    match_addresses: Attr::Known(browser.match_addresses),
                });
            }
            StrategyKind::Ethernet => {
                let ethernet = api.as_ethernet().map_err(project)?;
                model.ethernet = Attr::Known(EthernetModel {
                    autojoin: flag(ethernet.autojoin, "autojoin"),
                    ca_chain: string(ethernet.ca_chain, "ca_chain"),
                    network_access_server_ip: string(
                        ethernet.network_access_server_ip,
                        "network_access_server_ip",
                    ),
                });
            }
            StrategyKind::Relay => {
                let relay = api.as_relay().map_err(project)?;
                model.relay = Attr::Known(RelayModel {
                    match_domains: Attr::Known(relay.match_domains),
                    regions: list(relay.regions, "regions"),
                });
            }
            StrategyKind::Ssh => {
                let ssh = api.as_ssh().map_err(project)?;
                model.ssh = Attr::Known(SshModel {
                    principals: list(ssh.principals, "principals"),
                    host_patterns: list(ssh.host_patterns, "host_patterns"),
                });
            }
            StrategyKind::Sso => {
                let sso = api.as_sso().map_err(project)?;
                model.sso = Attr::Known(SsoModel {
                    trusted_roots: string(sso.trusted_roots, "trusted_roots"),
                    redirect_uri: Attr::Known(sso.redirect_uri),
                });
            }
            StrategyKind::Vpn => {
                let vpn = api.as_vpn().map_err(project)?;
                model.vpn = Attr::Known(VpnModel {
                    connection_type: Attr::Known(vpn.connection_type),
                    remote_address: Attr::Known(vpn.remote_address),
                    autojoin: flag(vpn.autojoin, "autojoin"),
                    vendor: string(vpn.vendor, "vendor"),
                });
            }
            StrategyKind::Wifi => {
                let wifi = api.as_wifi().map_err(project)?;
                model.wifi = Attr::Known(WifiModel {
                    ssid: Attr::Known(wifi.ssid),
                    autojoin: flag(wifi.autojoin, "autojoin"),
                    hidden: flag(wifi.hidden, "hidden"),
                    ca_chain: string(wifi.ca_chain, "ca_chain"),
                    network_access_server_ip: string(
                        wifi.network_access_server_ip,
                        "network_access_server_ip",
                    ),
                });
            }
        }
        Ok(model)
    }

    fn configuration(&self, kind: StrategyKind) -> std::result::Result<Union, Diagnostic> {
        let path = AttrPath::root(branch_name(kind));
        match kind {
            StrategyKind::Browser => {
                let browser = self.browser.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &BrowserStrategy {
                        match_addresses: browser.match_addresses.to_option().unwrap_or_default(),
                    },
                    &path,
                )
            }
            StrategyKind::Ethernet => {
                let ethernet = self.ethernet.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &EthernetStrategy {
                        autojoin: ethernet.autojoin.to_option(),
                        ca_chain: ethernet.ca_chain.to_option(),
                        network_access_server_ip: ethernet.network_access_server_ip.to_option(),
                    },
                    &path,
                )
            }
            StrategyKind::Relay => {
                let relay = self.relay.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &RelayStrategy {
                        match_domains: relay.match_domains.to_option().unwrap_or_default(),
                        regions: relay.regions.to_option(),
                    },
                    &path,
                )
            }
            StrategyKind::Ssh => {
                let ssh = self.ssh.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &SshStrategy {
                        principals: ssh.principals.to_option(),
                        host_patterns: ssh.host_patterns.to_option(),
                    },
                    &path,
                )
            }
            StrategyKind::Sso => {
                let sso = self.sso.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &SsoStrategy {
                        trusted_roots: sso.trusted_roots.to_option(),
                        redirect_uri: sso.redirect_uri.to_option().unwrap_or_default(),
                    },
                    &path,
                )
            }
            StrategyKind::Vpn => {
                let vpn = self.vpn.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &VpnStrategy {
                        connection_type: vpn.connection_type.to_option().unwrap_or_default(),
                        remote_address: vpn.remote_address.to_option().unwrap_or_default(),
                        autojoin: vpn.autojoin.to_option(),
                        vendor: vpn.vendor.to_option(),
                    },
                    &path,
                )
            }
            StrategyKind::Wifi => {
                let wifi = self.wifi.as_known().cloned().unwrap_or_default();
                encode_variant(
                    &WifiStrategy {
                        ssid: wifi.ssid.to_option().unwrap_or_default(),
                        autojoin: wifi.autojoin.to_option(),
                        hidden: wifi.hidden.to_option(),
                        ca_chain: wifi.ca_chain.to_option(),
                        network_access_server_ip: wifi.network_access_server_ip.to_option(),
                    },
                    &path,
                )
            }
        }
    }

    pub fn to_api(&self) -> StepResult<Strategy> {
        let discriminator = self.kind.as_deref().unwrap_or_default();
        let kind: StrategyKind = discriminator.parse().map_err(|e: UnknownVariant| {
            Diagnostic::error("Invalid strategy kind", e.to_string())
                .with_kind(ErrorKind::ParseError)
                .at(&AttrPath::root("kind"))
        })?;
        let branches = [
            ("browser", self.browser.is_known()),
            ("ethernet", self.ethernet.is_known()),
            ("relay", self.relay.is_known()),
            ("ssh", self.ssh.is_known()),
            ("sso", self.sso.is_known()),
            ("vpn", self.vpn.is_known()),
            ("wifi", self.wifi.is_known()),
        ];
        select_branch("kind", discriminator, branch_name(kind), &branches)?;

        let configuration = self.configuration(kind)?;
        let credential = self
            .credential
            .as_known()
            .cloned()
            .unwrap_or_default()
            .to_api(&AttrPath::root("credential"))?;

        Ok(Strategy {
            id: None,
            name: self.name.to_option().unwrap_or_default(),
            kind,
            configuration,
            credential,
            policy: self.policy.as_known().map(PolicyModel::to_api),
            created_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wifi() -> Strategy {
        serde_json::from_value(json!({
            "id": "s1",
            "name": "tfprovider-office",
            "kind": "wifi",
            "configuration": {"ssid": "Office", "autojoin": false},
            "credential": {
                "certificateInfo": {"type": "X509", "duration": "24h0m0s"},
                "keyInfo": {"type": "DEFAULT", "format": "DEFAULT"}
            },
            "policy": {"os": ["macOS", "Windows"], "tags": []}
        }))
        .unwrap()
    }

    #[test]
    fn test_only_matching_branch_is_filled() {
        let model = StrategyModel::from_api(&wifi(), &Value::Null).unwrap();
        let wifi = model.wifi.as_known().unwrap();
        assert_eq!(wifi.ssid.as_deref(), Some("Office"));
        // false with no prior reads as unset
        assert!(wifi.autojoin.is_null());
        assert!(model.browser.is_null());
        assert!(model.vpn.is_null());

        let policy = model.policy.as_known().unwrap();
        assert_eq!(policy.os.as_known().unwrap().len(), 2);
        assert!(policy.tags.is_null());
    }

    #[test]
    fn test_written_false_is_kept() {
        let prior = Value::from_json(&json!({"wifi": {"ssid": "Office", "autojoin": false}}));
        let model = StrategyModel::from_api(&wifi(), &prior).unwrap();
        assert_eq!(model.wifi.as_known().unwrap().autojoin, Attr::Known(false));
    }

    #[test]
    fn test_request_inlines_configuration() {
        let model = StrategyModel::from_api(&wifi(), &Value::Null).unwrap();
        let body = serde_json::to_value(model.to_api().unwrap()).unwrap();
        assert_eq!(body["configuration"], json!({"ssid": "Office"}));
        assert_eq!(body["credential"]["certificateInfo"]["type"], "X509");
        assert!(body.get("id").is_none());
    }

    #[test]
    fn test_missing_branch_is_rejected() {
        let model = StrategyModel {
            name: Attr::Known("s".to_string()),
            kind: Attr::Known("vpn".to_string()),
            ..Default::default()
        };
        let diags = model.to_api().unwrap_err();
        assert_eq!(diags.error_kind(), Some(ErrorKind::ParseError));
        assert!(diags.to_string().contains("found 0"));
    }
}
