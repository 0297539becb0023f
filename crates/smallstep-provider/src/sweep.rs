//! Test artefact sweepers
//!
//! Acceptance runs create objects whose identifying field starts with a fixed
//! prefix. A sweep lists every listable kind, picks the objects carrying the
//! prefix that are older than the configured age and deletes them. Kinds the
//! API returns without a creation time are left alone unless the config opts
//! in with `include_undated`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use smallstep_client::{ApiResponse, Client, Result as ClientResult};
use smallstep_client::v20231208::models as v1;
use smallstep_client::v20250101::models as v2;
use smallstep_core::Diagnostic;

use crate::error::{ProviderError, Result};
use crate::respond::{client_error, decode_body, deleted, expect_status, status};

pub const DEFAULT_PREFIX: &str = "tfprovider";
pub const DEFAULT_AGE: Duration = Duration::from_secs(60);
pub const ENV_SWEEP_PREFIX: &str = "SWEEP_PREFIX";
pub const ENV_SWEEP_AGE: &str = "SWEEP_AGE";

/// Which objects a sweep removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub prefix: String,
    pub age: Duration,
    /// Sweep prefixed objects whose creation time the API does not report
    pub include_undated: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            age: DEFAULT_AGE,
            include_undated: false,
        }
    }
}

impl SweepConfig {
    pub fn from_env() -> Result<Self> {
        Self::resolve(None, None, |key| std::env::var(key).ok())
    }

    /// Explicit values, then `env`, then defaults
    pub fn resolve(
        prefix: Option<String>,
        age: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let prefix = non_empty(prefix)
            .or_else(|| non_empty(env(ENV_SWEEP_PREFIX)))
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let age = match non_empty(age).or_else(|| non_empty(env(ENV_SWEEP_AGE))) {
            Some(raw) => humantime::parse_duration(raw.trim()).map_err(|e| {
                ProviderError::InvalidConfig(format!("sweep age \"{}\": {}", raw, e))
            })?,
            None => DEFAULT_AGE,
        };
        Ok(Self {
            prefix,
            age,
            include_undated: false,
        })
    }

    pub fn with_undated(mut self, include_undated: bool) -> Self {
        self.include_undated = include_undated;
        self
    }

    /// Whether an object named `name` created at `created_at` is swept at `now`
    pub fn matches(&self, name: &str, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if !name.starts_with(&self.prefix) {
            return false;
        }
        match created_at {
            Some(created) => now
                .signed_duration_since(created)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= self.age),
            None => self.include_undated,
        }
    }
}

/// Listable kinds, in the order they are swept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepKind {
    ManagedConfiguration,
    EndpointConfiguration,
    AgentConfiguration,
    Authority,
    Collection,
    DeviceCollection,
    AttestationAuthority,
    DeviceInventoryIntegration,
    Strategy,
}

impl SweepKind {
    pub const ALL: [SweepKind; 9] = [
        SweepKind::ManagedConfiguration,
        SweepKind::EndpointConfiguration,
        SweepKind::AgentConfiguration,
        SweepKind::Authority,
        SweepKind::Collection,
        SweepKind::DeviceCollection,
        SweepKind::AttestationAuthority,
        SweepKind::DeviceInventoryIntegration,
        SweepKind::Strategy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SweepKind::ManagedConfiguration => "managed configuration",
            SweepKind::EndpointConfiguration => "endpoint configuration",
            SweepKind::AgentConfiguration => "agent configuration",
            SweepKind::Authority => "authority",
            SweepKind::Collection => "collection",
            SweepKind::DeviceCollection => "device collection",
            SweepKind::AttestationAuthority => "attestation authority",
            SweepKind::DeviceInventoryIntegration => "device inventory integration",
            SweepKind::Strategy => "strategy",
        }
    }
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One listed object
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Key used to delete the object
    pub id: String,
    /// Field matched against the prefix
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Candidate {
    fn new(id: impl Into<String>, name: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
        }
    }
}

/// What a sweep removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub deleted: Vec<(SweepKind, String)>,
}

impl SweepReport {
    pub fn count(&self, kind: SweepKind) -> usize {
        self.deleted.iter().filter(|(k, _)| *k == kind).count()
    }
}

fn failed(kind: SweepKind, id: &str, diagnostic: Diagnostic) -> ProviderError {
    ProviderError::Sweep {
        kind: kind.to_string(),
        id: id.to_string(),
        message: diagnostic.detail,
    }
}

pub struct Sweeper {
    client: Client,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(client: Client, config: SweepConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweep every kind, stopping at the first failure
    pub async fn sweep(&self, cancel: &CancellationToken) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        for kind in SweepKind::ALL {
            for id in self.sweep_kind(cancel, kind).await? {
                report.deleted.push((kind, id));
            }
        }
        info!(
            prefix = %self.config.prefix,
            deleted = report.deleted.len(),
            "sweep finished"
        );
        Ok(report)
    }

    /// Sweep one kind; returns the deleted ids
    pub async fn sweep_kind(&self, cancel: &CancellationToken, kind: SweepKind) -> Result<Vec<String>> {
        let now = Utc::now();
        let candidates = self.list(cancel, kind).await?;
        let mut swept = Vec::new();
        for candidate in candidates {
            if !self.config.matches(&candidate.name, candidate.created_at, now) {
                if candidate.created_at.is_none() && candidate.name.starts_with(&self.config.prefix) {
                    warn!(
                        kind = %kind,
                        name = %candidate.name,
                        "no creation time reported, age filter cannot apply; skipping"
                    );
                } else {
                    debug!(kind = %kind, name = %candidate.name, "skipping");
                }
                continue;
            }
            if kind == SweepKind::Collection {
                self.empty_collection(cancel, &candidate.id).await?;
            }
            self.delete(cancel, kind, &candidate.id).await?;
            info!(kind = %kind, id = %candidate.id, name = %candidate.name, "swept");
            swept.push(candidate.id);
        }
        Ok(swept)
    }

    fn fetch_list<T: DeserializeOwned>(
        &self,
        kind: SweepKind,
        response: ClientResult<ApiResponse>,
    ) -> Result<Vec<T>> {
        let resource = format!("{} list", kind);
        let response = response.map_err(|e| failed(kind, "*", client_error("list", &resource, &e)))?;
        expect_status("list", &resource, &response, status::OK).map_err(|d| failed(kind, "*", d))?;
        decode_body("list", &resource, &response).map_err(|d| failed(kind, "*", d))
    }

    async fn list(&self, cancel: &CancellationToken, kind: SweepKind) -> Result<Vec<Candidate>> {
        let old = self.client.v20231208();
        let new = self.client.v20250101();
        let candidates = match kind {
            SweepKind::Authority => self
                .fetch_list::<v1::Authority>(kind, old.list_authorities(cancel).await)?
                .into_iter()
                .map(|a| Candidate::new(a.id, a.domain, Some(a.created_at)))
                .collect(),
            SweepKind::AgentConfiguration => self
                .fetch_list::<v1::AgentConfiguration>(kind, old.list_agent_configurations(cancel).await)?
                .into_iter()
                .filter_map(|c| Some(Candidate::new(c.id?, c.name, None)))
                .collect(),
            SweepKind::EndpointConfiguration => self
                .fetch_list::<v1::EndpointConfiguration>(
                    kind,
                    old.list_endpoint_configurations(cancel).await,
                )?
                .into_iter()
                .filter_map(|c| Some(Candidate::new(c.id?, c.name, None)))
                .collect(),
            SweepKind::ManagedConfiguration => self
                .fetch_list::<v1::ManagedConfiguration>(
                    kind,
                    old.list_managed_configurations(cancel).await,
                )?
                .into_iter()
                .filter_map(|c| Some(Candidate::new(c.id?, c.name, None)))
                .collect(),
            SweepKind::Collection => self
                .fetch_list::<v1::Collection>(kind, old.list_collections(cancel).await)?
                .into_iter()
                .map(|c| Candidate::new(c.slug.clone(), c.slug, Some(c.created_at)))
                .collect(),
            SweepKind::DeviceCollection => self
                .fetch_list::<v1::DeviceCollection>(kind, old.list_device_collections(cancel).await)?
                .into_iter()
                .map(|c| Candidate::new(c.slug.clone(), c.slug, c.created_at))
                .collect(),
            SweepKind::AttestationAuthority => self
                .fetch_list::<v1::AttestationAuthority>(
                    kind,
                    old.list_attestation_authorities(cancel).await,
                )?
                .into_iter()
                .filter_map(|a| Some(Candidate::new(a.id?, a.name, a.created_at)))
                .collect(),
            SweepKind::DeviceInventoryIntegration => self
                .fetch_list::<v2::DeviceInventoryIntegration>(
                    kind,
                    new.list_device_inventory_integrations(cancel).await,
                )?
                .into_iter()
                .filter_map(|i| Some(Candidate::new(i.id?, i.name, i.created_at)))
                .collect(),
            SweepKind::Strategy => self
                .fetch_list::<v2::Strategy>(kind, new.list_strategies(cancel).await)?
                .into_iter()
                .filter_map(|s| Some(Candidate::new(s.id?, s.name, s.created_at)))
                .collect(),
        };
        Ok(candidates)
    }

    /// Instances go first; the API refuses to delete a non-empty collection
    async fn empty_collection(&self, cancel: &CancellationToken, slug: &str) -> Result<()> {
        let kind = SweepKind::Collection;
        let api = self.client.v20231208();
        let instances: Vec<v1::CollectionInstance> = self
            .fetch_list(kind, api.list_collection_instances(cancel, slug).await)?;
        for instance in instances {
            let resource = format!("collection instance {}/{}", slug, instance.id);
            let response = api
                .delete_collection_instance(cancel, slug, &instance.id)
                .await
                .map_err(|e| failed(kind, slug, client_error("delete", &resource, &e)))?;
            deleted("delete", &resource, &response).map_err(|d| failed(kind, slug, d))?;
            debug!(collection = slug, instance = %instance.id, "swept instance");
        }
        Ok(())
    }

    async fn delete(&self, cancel: &CancellationToken, kind: SweepKind, id: &str) -> Result<()> {
        let old = self.client.v20231208();
        let new = self.client.v20250101();
        let response = match kind {
            SweepKind::Authority => old.delete_authority(cancel, id).await,
            SweepKind::AgentConfiguration => old.delete_agent_configuration(cancel, id).await,
            SweepKind::EndpointConfiguration => old.delete_endpoint_configuration(cancel, id).await,
            SweepKind::ManagedConfiguration => old.delete_managed_configuration(cancel, id).await,
            SweepKind::Collection => old.delete_collection(cancel, id).await,
            SweepKind::DeviceCollection => old.delete_device_collection(cancel, id).await,
            SweepKind::AttestationAuthority => old.delete_attestation_authority(cancel, id).await,
            SweepKind::DeviceInventoryIntegration => {
                new.delete_device_inventory_integration(cancel, id).await
            }
            SweepKind::Strategy => new.delete_strategy(cancel, id).await,
        };
        let resource = format!("{} {}", kind, id);
        let response = response.map_err(|e| failed(kind, id, client_error("delete", &resource, &e)))?;
        deleted("delete", &resource, &response).map_err(|d| failed(kind, id, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_resolve_order() {
        let env = |key: &str| match key {
            "SWEEP_AGE" => Some("2h".to_string()),
            "SWEEP_PREFIX" => Some("ci".to_string()),
            _ => None,
        };
        let config = SweepConfig::resolve(None, None, env).unwrap();
        assert_eq!(config.prefix, "ci");
        assert_eq!(config.age, Duration::from_secs(7200));

        let config = SweepConfig::resolve(Some("tfp".to_string()), Some("30s".to_string()), env).unwrap();
        assert_eq!(config.prefix, "tfp");
        assert_eq!(config.age, Duration::from_secs(30));

        assert_eq!(SweepConfig::resolve(None, None, |_| None).unwrap(), SweepConfig::default());
    }

    #[test]
    fn test_bad_age_is_rejected() {
        let err = SweepConfig::resolve(None, Some("a while".to_string()), |_| None).unwrap_err();
        assert!(err.to_string().contains("sweep age \"a while\""));
    }

    #[test]
    fn test_matches_prefix_and_age() {
        let config = SweepConfig::default();
        let now = at("2024-05-01T10:05:00Z");
        assert!(config.matches("tfprovider-a", Some(at("2024-05-01T10:00:00Z")), now));
        assert!(!config.matches("tfprovider-a", Some(at("2024-05-01T10:04:30Z")), now));
        assert!(!config.matches("prod-a", Some(at("2024-05-01T09:00:00Z")), now));
        assert!(!config.matches("tfprovider-a", None, now));
        let undated = SweepConfig::default().with_undated(true);
        assert!(undated.matches("tfprovider-a", None, now));
        assert!(!undated.matches("prod-a", None, now));
        // created in the future
        assert!(!config.matches("tfprovider-a", Some(at("2024-05-01T11:00:00Z")), now));
    }

    #[test]
    fn test_configurations_go_before_authorities() {
        let position = |kind| SweepKind::ALL.iter().position(|k| *k == kind).unwrap();
        assert!(position(SweepKind::ManagedConfiguration) < position(SweepKind::AgentConfiguration));
        assert!(position(SweepKind::AgentConfiguration) < position(SweepKind::Authority));
        assert!(position(SweepKind::EndpointConfiguration) < position(SweepKind::Authority));
    }
}
