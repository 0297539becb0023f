//! In-process acceptance harness
//!
//! [`Harness`] plays the host runtime: it keeps state per resource address,
//! plans declared resources against it and drives the lifecycle handlers.
//! It is wired to a [`MockServer`] by default, so acceptance scenarios run
//! without network access.
//!
//! ```ignore
//! let mut harness = Harness::new();
//! let config = Config::new().resource(
//!     "smallstep_collection",
//!     "hosts",
//!     json!({"slug": "tfprovider-hosts"}),
//! );
//! harness.apply(&config).await?;
//! harness.destroy().await?;
//! ```

mod config;
pub mod render;

pub use config::{Config, Declaration, Lookup, references, resolve};

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use smallstep_client::{Client, MockServer};
use smallstep_core::{AttrPath, PlanAction, Value, plan};

use crate::error::HarnessError;
use crate::provider::SmallstepProvider;
use crate::resource::Context;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Planned outcome for one address
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChange {
    pub address: String,
    pub type_name: String,
    pub action: PlanAction,
    pub prior: Option<Value>,
    pub planned: Option<Value>,
    /// Attributes that forced a replacement
    pub replace_paths: Vec<AttrPath>,
}

/// A plan for a whole configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    pub changes: Vec<PlannedChange>,
}

impl PlanOutcome {
    /// No resource would change
    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| c.action == PlanAction::NoOp)
    }

    pub fn action(&self, address: &str) -> Option<PlanAction> {
        self.change(address).map(|c| c.action)
    }

    pub fn change(&self, address: &str) -> Option<&PlannedChange> {
        self.changes.iter().find(|c| c.address == address)
    }

    pub fn render(&self) -> String {
        render::changes(&self.changes)
    }
}

/// One step of an acceptance scenario
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Apply(Config),
    /// Plan only; fails if the plan is not empty
    Plan(Config),
    Import {
        type_name: String,
        address: String,
        id: String,
    },
    Refresh,
    Destroy,
}

/// References resolve against state; declared resources without state are unknown
struct Resolver<'a> {
    state: &'a IndexMap<String, (String, Value)>,
    declared: &'a [String],
}

impl Lookup for Resolver<'_> {
    fn state(&self, address: &str) -> Option<&Value> {
        self.state.state(address)
    }

    fn is_pending(&self, address: &str) -> bool {
        self.declared.iter().any(|a| a == address)
    }
}

pub struct Harness {
    provider: SmallstepProvider,
    server: Option<MockServer>,
    /// address -> (type name, state)
    state: IndexMap<String, (String, Value)>,
    ctx: Context,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Harness over a fresh mock server
    pub fn new() -> Self {
        let server = MockServer::new();
        let mut harness = Self::with_client(server.client());
        harness.server = Some(server);
        harness
    }

    /// Harness over any client, e.g. a live API
    pub fn with_client(client: Client) -> Self {
        Self {
            provider: SmallstepProvider::with_client(client),
            server: None,
            state: IndexMap::new(),
            ctx: Context::new(),
        }
    }

    /// Every lifecycle call made from now on observes `cancel`
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.ctx = Context::with_cancel(cancel);
        self
    }

    pub fn server(&self) -> Option<&MockServer> {
        self.server.as_ref()
    }

    pub fn provider(&self) -> &SmallstepProvider {
        &self.provider
    }

    pub fn state(&self, address: &str) -> Option<&Value> {
        self.state.get(address).map(|(_, value)| value)
    }

    /// Addresses with state, in the order they were created
    pub fn addresses(&self) -> Vec<&str> {
        self.state.keys().map(String::as_str).collect()
    }

    /// Attribute of a resource in state, e.g. `attribute("smallstep_authority.main", "id")`
    pub fn attribute(&self, address: &str, path: &str) -> Result<Value> {
        let state = self.state(address).ok_or_else(|| HarnessError::UnknownAddress {
            address: address.to_string(),
        })?;
        Ok(state.at(&AttrPath::parse(path)?).clone())
    }

    pub async fn run(&mut self, steps: impl IntoIterator<Item = Step>) -> Result<()> {
        for (index, step) in steps.into_iter().enumerate() {
            debug!(step = index + 1, "running step");
            match step {
                Step::Apply(config) => {
                    self.apply(&config).await?;
                }
                Step::Plan(config) => {
                    self.refresh().await?;
                    let outcome = self.plan(&config)?;
                    if !outcome.is_empty() {
                        return Err(HarnessError::NonEmptyPlan {
                            diff: outcome.render(),
                        });
                    }
                }
                Step::Import {
                    type_name,
                    address,
                    id,
                } => self.import(&type_name, &address, &id).await?,
                Step::Refresh => self.refresh().await?,
                Step::Destroy => self.destroy().await?,
            }
        }
        Ok(())
    }

    fn check_addresses(config: &Config) -> Result<Vec<String>> {
        let addresses = config.addresses();
        for (i, address) in addresses.iter().enumerate() {
            if addresses[..i].contains(address) {
                return Err(HarnessError::DuplicateAddress {
                    address: address.clone(),
                });
            }
        }
        Ok(addresses)
    }

    fn plan_one(&self, declaration: &Declaration, declared: &[String]) -> Result<PlannedChange> {
        let address = declaration.address();
        let resource = self.provider.resource(&declaration.type_name)?;
        let schema = resource.schema().map_err(HarnessError::Provider)?;
        let resolver = Resolver {
            state: &self.state,
            declared,
        };
        let resolved = resolve(&declaration.config, &resolver)?;
        let config = schema
            .conform(&resolved)
            .map_err(|diagnostics| HarnessError::Config {
                address: address.clone(),
                diagnostics,
            })?;

        let prior = self.state(&address).cloned();
        let plan = plan(&schema, prior.as_ref(), Some(&config));
        if plan.diagnostics.has_error() {
            return Err(HarnessError::Config {
                address,
                diagnostics: plan.diagnostics,
            });
        }
        Ok(PlannedChange {
            address,
            type_name: declaration.type_name.clone(),
            action: plan.action,
            prior,
            planned: plan.planned,
            replace_paths: plan.replace_paths,
        })
    }

    /// Resources in state that `declared` no longer mentions, newest first
    fn orphans(&self, declared: &[String]) -> Vec<PlannedChange> {
        self.state
            .iter()
            .rev()
            .filter(|(address, _)| !declared.contains(address))
            .map(|(address, (type_name, value))| PlannedChange {
                address: address.clone(),
                type_name: type_name.clone(),
                action: PlanAction::Delete,
                prior: Some(value.clone()),
                planned: None,
                replace_paths: Vec::new(),
            })
            .collect()
    }

    /// What applying `config` would do against the state as last read
    ///
    /// Call [`Harness::refresh`] first to plan against the remote.
    pub fn plan(&self, config: &Config) -> Result<PlanOutcome> {
        let declared = Self::check_addresses(config)?;
        let mut changes = Vec::new();
        for declaration in &config.declarations {
            changes.push(self.plan_one(declaration, &declared)?);
        }
        changes.extend(self.orphans(&declared));
        Ok(PlanOutcome { changes })
    }

    /// Refresh, apply `config`, refresh again, and require that a second plan is empty
    ///
    /// Returns the plan that was applied. Objects deleted remotely are
    /// created again and remote drift is planned as an update.
    pub async fn apply(&mut self, config: &Config) -> Result<PlanOutcome> {
        self.refresh().await?;
        let applied = self.plan(config)?;
        let declared = Self::check_addresses(config)?;

        // later declarations may reference what earlier ones just created
        for declaration in &config.declarations {
            let change = self.plan_one(declaration, &declared)?;
            self.execute(change).await?;
        }
        for orphan in self.orphans(&declared) {
            self.execute(orphan).await?;
        }

        self.refresh().await?;
        let second = self.plan(config)?;
        if !second.is_empty() {
            return Err(HarnessError::NonEmptyPlan {
                diff: second.render(),
            });
        }
        info!(resources = self.state.len(), "applied");
        Ok(applied)
    }

    async fn execute(&mut self, change: PlannedChange) -> Result<()> {
        let resource = self.provider.resource(&change.type_name)?;
        let address = change.address;
        let step = |operation: &'static str, address: &str| {
            let address = address.to_string();
            move |diagnostics| HarnessError::Step {
                operation,
                address,
                diagnostics,
            }
        };
        debug!(address = %address, action = %change.action, "executing");

        match (change.action, change.prior, change.planned) {
            (PlanAction::NoOp, _, _) => {}
            (PlanAction::Create, _, Some(planned)) => {
                let state = resource
                    .create(&self.ctx, &planned)
                    .await
                    .map_err(step("create", &address))?;
                self.state.insert(address, (change.type_name, state));
            }
            (PlanAction::Update, Some(prior), Some(planned)) => {
                let state = resource
                    .update(&self.ctx, &planned, &prior)
                    .await
                    .map_err(step("update", &address))?;
                self.state.insert(address, (change.type_name, state));
            }
            (PlanAction::Replace, Some(prior), Some(planned)) => {
                resource
                    .delete(&self.ctx, &prior)
                    .await
                    .map_err(step("delete", &address))?;
                self.state.shift_remove(&address);
                let state = resource
                    .create(&self.ctx, &planned)
                    .await
                    .map_err(step("create", &address))?;
                self.state.insert(address, (change.type_name, state));
            }
            (PlanAction::Delete, Some(prior), _) => {
                resource
                    .delete(&self.ctx, &prior)
                    .await
                    .map_err(step("delete", &address))?;
                self.state.shift_remove(&address);
            }
            (action, _, _) => debug!(address = %address, %action, "nothing to execute"),
        }
        Ok(())
    }

    /// Import an existing object under `address`
    pub async fn import(&mut self, type_name: &str, address: &str, id: &str) -> Result<()> {
        if self.state.contains_key(address) {
            return Err(HarnessError::DuplicateAddress {
                address: address.to_string(),
            });
        }
        let resource = self.provider.resource(type_name)?;
        let step = |operation: &'static str| {
            move |diagnostics| HarnessError::Step {
                operation,
                address: address.to_string(),
                diagnostics,
            }
        };
        let partial = resource.import_state(id).map_err(step("import"))?;
        let state = resource
            .read(&self.ctx, &partial)
            .await
            .map_err(step("import"))?
            .ok_or_else(|| HarnessError::ImportMissing {
                address: address.to_string(),
                id: id.to_string(),
            })?;
        info!(address, id, "imported");
        self.state
            .insert(address.to_string(), (type_name.to_string(), state));
        Ok(())
    }

    /// Re-read every resource; objects gone from the server leave state
    pub async fn refresh(&mut self) -> Result<()> {
        let addresses: Vec<String> = self.state.keys().cloned().collect();
        for address in addresses {
            let Some((type_name, prior)) = self.state.get(&address).cloned() else {
                continue;
            };
            let resource = self.provider.resource(&type_name)?;
            let refreshed = resource
                .read(&self.ctx, &prior)
                .await
                .map_err(|diagnostics| HarnessError::Step {
                    operation: "read",
                    address: address.clone(),
                    diagnostics,
                })?;
            match refreshed {
                Some(state) => {
                    self.state.insert(address, (type_name, state));
                }
                None => {
                    info!(address = %address, "removed from state");
                    self.state.shift_remove(&address);
                }
            }
        }
        Ok(())
    }

    /// Delete everything in state, newest first
    pub async fn destroy(&mut self) -> Result<()> {
        for change in self.orphans(&[]) {
            self.execute(change).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(slug: &str) -> Config {
        Config::new().resource(
            "smallstep_collection",
            "hosts",
            json!({"slug": slug, "display_name": "Hosts"}),
        )
    }

    #[tokio::test]
    async fn test_apply_then_destroy() {
        let mut harness = Harness::new();
        let applied = harness.apply(&collection("tfprovider-hosts")).await.unwrap();
        assert_eq!(
            applied.action("smallstep_collection.hosts"),
            Some(PlanAction::Create)
        );
        assert_eq!(
            harness
                .attribute("smallstep_collection.hosts", "instance_count")
                .unwrap(),
            Value::Number(0)
        );

        harness.destroy().await.unwrap();
        assert!(harness.addresses().is_empty());
        assert!(!harness.server().unwrap().contains("/collections/tfprovider-hosts"));
    }

    #[tokio::test]
    async fn test_removed_declaration_is_destroyed() {
        let mut harness = Harness::new();
        harness.apply(&collection("tfprovider-hosts")).await.unwrap();
        let outcome = harness.apply(&Config::new()).await.unwrap();
        assert_eq!(
            outcome.action("smallstep_collection.hosts"),
            Some(PlanAction::Delete)
        );
        assert!(harness.state("smallstep_collection.hosts").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_address() {
        let mut harness = Harness::new();
        let config = collection("a").resource("smallstep_collection", "hosts", json!({"slug": "b"}));
        let err = harness.apply(&config).await.unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateAddress { .. }));
    }

    #[tokio::test]
    async fn test_unknown_argument_is_a_config_error() {
        let mut harness = Harness::new();
        let config = Config::new().resource(
            "smallstep_collection",
            "hosts",
            json!({"slug": "tfprovider-hosts", "colour": "blue"}),
        );
        let err = harness.apply(&config).await.unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
        assert_eq!(harness.server().unwrap().counts().creates, 0);
    }
}
