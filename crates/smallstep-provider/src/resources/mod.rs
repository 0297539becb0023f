//! Managed resource kinds
//!
//! Each module pairs a model codec (`from_api` / `to_api`) with the
//! [`Resource`] lifecycle handlers that drive the API.

pub mod agent_configuration;
pub mod attestation_authority;
pub mod authority;
pub mod collection;
pub mod collection_instance;
pub mod common;
pub mod device_collection;
pub mod device_collection_account;
pub mod device_inventory_integration;
pub mod endpoint_configuration;
pub mod managed_configuration;
pub mod provisioner;
pub mod strategy;
pub mod workload;

use std::sync::Arc;

use smallstep_client::Client;
use smallstep_core::{AttrPath, Diagnostic, ErrorKind, Value};

use crate::resource::{Resource, StepResult};

/// Every resource kind, bound to `client`
pub fn all(client: &Client) -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(authority::AuthorityResource::new(client.clone())),
        Arc::new(provisioner::ProvisionerResource::new(client.clone())),
        Arc::new(agent_configuration::AgentConfigurationResource::new(client.clone())),
        Arc::new(endpoint_configuration::EndpointConfigurationResource::new(client.clone())),
        Arc::new(managed_configuration::ManagedConfigurationResource::new(client.clone())),
        Arc::new(collection::CollectionResource::new(client.clone())),
        Arc::new(collection_instance::CollectionInstanceResource::new(client.clone())),
        Arc::new(device_collection::DeviceCollectionResource::new(client.clone())),
        Arc::new(device_collection_account::DeviceCollectionAccountResource::new(
            client.clone(),
        )),
        Arc::new(workload::WorkloadResource::new(client.clone())),
        Arc::new(attestation_authority::AttestationAuthorityResource::new(client.clone())),
        Arc::new(device_inventory_integration::DeviceInventoryIntegrationResource::new(
            client.clone(),
        )),
        Arc::new(strategy::StrategyResource::new(client.clone())),
    ]
}

/// Identity attribute of a state value; missing identity is a broken state
pub(crate) fn identity<'a>(state: &'a Value, attribute: &str) -> StepResult<&'a str> {
    match state.get(attribute).as_str() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(Diagnostic::error(
            "Missing identity",
            format!("state has no value for \"{}\"", attribute),
        )
        .with_kind(ErrorKind::ParseError)
        .at(&AttrPath::root(attribute))
        .into()),
    }
}
