//! Operations of API version 2023-12-08
//!
//! Every operation returns the raw [`ApiResponse`]; callers decide which
//! statuses are success for their lifecycle step.

pub mod models;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::error::Result;
use crate::transport::{ApiRequest, ApiResponse, Method};
use crate::version::ApiVersion;

use models::*;

pub const VERSION: ApiVersion = ApiVersion::V20231208;

/// Path roots of this version
pub mod paths {
    pub const AUTHORITIES: &str = "authorities";
    pub const PROVISIONERS: &str = "provisioners";
    pub const AGENT_CONFIGURATIONS: &str = "agent-configurations";
    pub const ENDPOINT_CONFIGURATIONS: &str = "endpoint-configurations";
    pub const MANAGED_CONFIGURATIONS: &str = "managed-configurations";
    pub const COLLECTIONS: &str = "collections";
    pub const INSTANCES: &str = "instances";
    pub const DEVICE_COLLECTIONS: &str = "device-collections";
    pub const ACCOUNTS: &str = "accounts";
    pub const WORKLOADS: &str = "workloads";
    pub const ATTESTATION_AUTHORITIES: &str = "attestation-authorities";
}

/// Operations bound to a client
#[derive(Debug, Clone, Copy)]
pub struct Api<'a> {
    client: &'a Client,
}

impl Client {
    pub fn v20231208(&self) -> Api<'_> {
        Api { client: self }
    }
}

impl<'a> Api<'a> {
    async fn send(
        &self,
        cancel: &CancellationToken,
        method: Method,
        segments: &[&str],
    ) -> Result<ApiResponse> {
        let request = ApiRequest::new(method, VERSION, segments.iter().copied());
        self.client.send(cancel, request).await
    }

    async fn send_json<T: Serialize>(
        &self,
        cancel: &CancellationToken,
        method: Method,
        segments: &[&str],
        body: &T,
    ) -> Result<ApiResponse> {
        let request = ApiRequest::new(method, VERSION, segments.iter().copied()).json(body)?;
        self.client.send(cancel, request).await
    }

    // Authorities

    pub async fn list_authorities(&self, cancel: &CancellationToken) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::AUTHORITIES]).await
    }

    pub async fn post_authorities(
        &self,
        cancel: &CancellationToken,
        body: &NewAuthority,
    ) -> Result<ApiResponse> {
        self.send_json(cancel, Method::Post, &[paths::AUTHORITIES], body)
            .await
    }

    /// `id` may also be the authority's domain
    pub async fn get_authority(&self, cancel: &CancellationToken, id: &str) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::AUTHORITIES, id]).await
    }

    pub async fn delete_authority(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Delete, &[paths::AUTHORITIES, id])
            .await
    }

    // Provisioners

    pub async fn list_provisioners(
        &self,
        cancel: &CancellationToken,
        authority_id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Get,
            &[paths::AUTHORITIES, authority_id, paths::PROVISIONERS],
        )
        .await
    }

    pub async fn post_provisioners(
        &self,
        cancel: &CancellationToken,
        authority_id: &str,
        body: &Provisioner,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Post,
            &[paths::AUTHORITIES, authority_id, paths::PROVISIONERS],
            body,
        )
        .await
    }

    pub async fn get_provisioner(
        &self,
        cancel: &CancellationToken,
        authority_id: &str,
        name_or_id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Get,
            &[paths::AUTHORITIES, authority_id, paths::PROVISIONERS, name_or_id],
        )
        .await
    }

    pub async fn delete_provisioner(
        &self,
        cancel: &CancellationToken,
        authority_id: &str,
        name_or_id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Delete,
            &[paths::AUTHORITIES, authority_id, paths::PROVISIONERS, name_or_id],
        )
        .await
    }

    // Agent configurations

    pub async fn list_agent_configurations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::AGENT_CONFIGURATIONS])
            .await
    }

    pub async fn post_agent_configurations(
        &self,
        cancel: &CancellationToken,
        body: &AgentConfiguration,
    ) -> Result<ApiResponse> {
        self.send_json(cancel, Method::Post, &[paths::AGENT_CONFIGURATIONS], body)
            .await
    }

    pub async fn get_agent_configuration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::AGENT_CONFIGURATIONS, id])
            .await
    }

    pub async fn put_agent_configuration(
        &self,
        cancel: &CancellationToken,
        id: &str,
        body: &AgentConfiguration,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Put,
            &[paths::AGENT_CONFIGURATIONS, id],
            body,
        )
        .await
    }

    pub async fn delete_agent_configuration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Delete, &[paths::AGENT_CONFIGURATIONS, id])
            .await
    }

    // Endpoint configurations

    pub async fn list_endpoint_configurations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::ENDPOINT_CONFIGURATIONS])
            .await
    }

    pub async fn post_endpoint_configurations(
        &self,
        cancel: &CancellationToken,
        body: &EndpointConfiguration,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Post,
            &[paths::ENDPOINT_CONFIGURATIONS],
            body,
        )
        .await
    }

    pub async fn get_endpoint_configuration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::ENDPOINT_CONFIGURATIONS, id])
            .await
    }

    pub async fn delete_endpoint_configuration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Delete,
            &[paths::ENDPOINT_CONFIGURATIONS, id],
        )
        .await
    }

    // Managed configurations

    pub async fn list_managed_configurations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::MANAGED_CONFIGURATIONS])
            .await
    }

    pub async fn post_managed_configurations(
        &self,
        cancel: &CancellationToken,
        body: &ManagedConfiguration,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Post,
            &[paths::MANAGED_CONFIGURATIONS],
            body,
        )
        .await
    }

    pub async fn get_managed_configuration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::MANAGED_CONFIGURATIONS, id])
            .await
    }

    pub async fn delete_managed_configuration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Delete, &[paths::MANAGED_CONFIGURATIONS, id])
            .await
    }

    // Collections

    pub async fn list_collections(&self, cancel: &CancellationToken) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::COLLECTIONS]).await
    }

    pub async fn get_collection(
        &self,
        cancel: &CancellationToken,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::COLLECTIONS, slug]).await
    }

    pub async fn put_collection(
        &self,
        cancel: &CancellationToken,
        slug: &str,
        body: &NewCollection,
    ) -> Result<ApiResponse> {
        self.send_json(cancel, Method::Put, &[paths::COLLECTIONS, slug], body)
            .await
    }

    pub async fn patch_collection(
        &self,
        cancel: &CancellationToken,
        slug: &str,
        body: &NewCollection,
    ) -> Result<ApiResponse> {
        self.send_json(cancel, Method::Patch, &[paths::COLLECTIONS, slug], body)
            .await
    }

    pub async fn delete_collection(
        &self,
        cancel: &CancellationToken,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Delete, &[paths::COLLECTIONS, slug])
            .await
    }

    // Collection instances

    pub async fn list_collection_instances(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Get,
            &[paths::COLLECTIONS, collection_slug, paths::INSTANCES],
        )
        .await
    }

    pub async fn get_collection_instance(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Get,
            &[paths::COLLECTIONS, collection_slug, paths::INSTANCES, id],
        )
        .await
    }

    pub async fn put_collection_instance(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        id: &str,
        body: &NewCollectionInstance,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Put,
            &[paths::COLLECTIONS, collection_slug, paths::INSTANCES, id],
            body,
        )
        .await
    }

    pub async fn delete_collection_instance(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Delete,
            &[paths::COLLECTIONS, collection_slug, paths::INSTANCES, id],
        )
        .await
    }

    // Device collections

    pub async fn list_device_collections(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::DEVICE_COLLECTIONS])
            .await
    }

    pub async fn get_device_collection(
        &self,
        cancel: &CancellationToken,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::DEVICE_COLLECTIONS, slug])
            .await
    }

    pub async fn put_device_collection(
        &self,
        cancel: &CancellationToken,
        slug: &str,
        body: &NewDeviceCollection,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Put,
            &[paths::DEVICE_COLLECTIONS, slug],
            body,
        )
        .await
    }

    pub async fn delete_device_collection(
        &self,
        cancel: &CancellationToken,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Delete, &[paths::DEVICE_COLLECTIONS, slug])
            .await
    }

    // Device collection accounts

    pub async fn get_device_collection_account(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Get,
            &[paths::DEVICE_COLLECTIONS, collection_slug, paths::ACCOUNTS, slug],
        )
        .await
    }

    pub async fn put_device_collection_account(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        slug: &str,
        body: &DeviceCollectionAccount,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Put,
            &[paths::DEVICE_COLLECTIONS, collection_slug, paths::ACCOUNTS, slug],
            body,
        )
        .await
    }

    pub async fn delete_device_collection_account(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Delete,
            &[paths::DEVICE_COLLECTIONS, collection_slug, paths::ACCOUNTS, slug],
        )
        .await
    }

    // Workloads

    pub async fn get_workload(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Get,
            &[paths::DEVICE_COLLECTIONS, collection_slug, paths::WORKLOADS, slug],
        )
        .await
    }

    pub async fn put_workload(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        slug: &str,
        body: &Workload,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Put,
            &[paths::DEVICE_COLLECTIONS, collection_slug, paths::WORKLOADS, slug],
            body,
        )
        .await
    }

    pub async fn delete_workload(
        &self,
        cancel: &CancellationToken,
        collection_slug: &str,
        slug: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Delete,
            &[paths::DEVICE_COLLECTIONS, collection_slug, paths::WORKLOADS, slug],
        )
        .await
    }

    // Attestation authorities

    pub async fn list_attestation_authorities(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::ATTESTATION_AUTHORITIES])
            .await
    }

    pub async fn post_attestation_authorities(
        &self,
        cancel: &CancellationToken,
        body: &AttestationAuthority,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Post,
            &[paths::ATTESTATION_AUTHORITIES],
            body,
        )
        .await
    }

    pub async fn get_attestation_authority(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::ATTESTATION_AUTHORITIES, id])
            .await
    }

    pub async fn delete_attestation_authority(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Delete,
            &[paths::ATTESTATION_AUTHORITIES, id],
        )
        .await
    }
}
