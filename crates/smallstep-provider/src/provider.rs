//! Provider entry point
//!
//! Resolves connection settings, builds the shared [`Client`] and binds every
//! resource kind and data source to it.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use smallstep_client::{Client, ClientConfig};
use smallstep_core::{Attribute, Schema, Value};

use crate::data_sources;
use crate::error::{ProviderError, Result};
use crate::resource::{DataSource, Resource};
use crate::resources;

pub const PROVIDER_NAME: &str = "smallstep";

/// Settings from the provider block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    pub server_url: Option<String>,
    pub bearer_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    /// Read a provider block conforming to [`config_schema`]
    pub fn from_value(config: &Value) -> Result<Self> {
        let timeout = match config.get("timeout").as_str() {
            Some(raw) => Some(humantime::parse_duration(raw).map_err(|e| {
                ProviderError::InvalidConfig(format!("timeout \"{}\": {}", raw, e))
            })?),
            None => None,
        };
        Ok(Self {
            server_url: config.get("server_url").as_str().map(str::to_string),
            bearer_token: config.get("bearer_token").as_str().map(str::to_string),
            timeout,
        })
    }

    /// Explicit values, then `env`, then defaults
    pub fn client_config(&self, env: impl Fn(&str) -> Option<String>) -> ClientConfig {
        let config = ClientConfig::resolve(self.server_url.clone(), self.bearer_token.clone(), env);
        match self.timeout {
            Some(timeout) => config.with_timeout(timeout),
            None => config,
        }
    }
}

/// Schema of the provider block itself
pub fn config_schema() -> Schema {
    Schema::new("Manage a Smallstep private PKI.")
        .attribute(
            "server_url",
            Attribute::string().optional().describe(format!(
                "Base URL of the Smallstep API. Defaults to ${} or {}.",
                smallstep_client::config::ENV_API_URL,
                smallstep_client::config::DEFAULT_SERVER_URL
            )),
        )
        .attribute(
            "bearer_token",
            Attribute::string().optional().sensitive().describe(format!(
                "API token. Defaults to ${}.",
                smallstep_client::config::ENV_API_TOKEN
            )),
        )
        .attribute(
            "timeout",
            Attribute::string()
                .optional()
                .describe("Per-request timeout, e.g. \"30s\"."),
        )
}

/// Published schemas, keyed by type name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<String, Schema>,
    pub data_sources: BTreeMap<String, Schema>,
}

/// Every resource kind and data source bound to one client
pub struct SmallstepProvider {
    client: Client,
    resources: IndexMap<&'static str, Arc<dyn Resource>>,
    data_sources: IndexMap<&'static str, Arc<dyn DataSource>>,
}

impl SmallstepProvider {
    /// Build the client from `config` and the process environment
    pub fn configure(config: &ProviderConfig) -> Result<Self> {
        let client_config = config.client_config(|key| std::env::var(key).ok());
        if client_config.token.is_none() {
            debug!("no API token configured, requests will be unauthenticated");
        }
        let client = Client::from_config(&client_config)?;
        info!(server_url = %client_config.server_url, "configured provider");
        Ok(Self::with_client(client))
    }

    /// Bind to an existing client, e.g. one backed by a mock server
    pub fn with_client(client: Client) -> Self {
        let resources = resources::all(&client)
            .into_iter()
            .map(|r| (r.type_name(), r))
            .collect();
        let data_sources = data_sources::all(&client)
            .into_iter()
            .map(|d| (d.type_name(), d))
            .collect();
        Self {
            client,
            resources,
            data_sources,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn resource(&self, type_name: &str) -> Result<Arc<dyn Resource>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResourceType {
                name: type_name.to_string(),
            })
    }

    pub fn data_source(&self, type_name: &str) -> Result<Arc<dyn DataSource>> {
        self.data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownDataSource {
                name: type_name.to_string(),
            })
    }

    /// Resource type names in registration order
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn schemas(&self) -> Result<ProviderSchema> {
        let mut resources = BTreeMap::new();
        for (name, resource) in &self.resources {
            resources.insert(name.to_string(), resource.schema()?);
        }
        let mut data_sources = BTreeMap::new();
        for (name, data_source) in &self.data_sources {
            data_sources.insert(name.to_string(), data_source.schema()?);
        }
        Ok(ProviderSchema {
            provider: config_schema(),
            resources,
            data_sources,
        })
    }
}
