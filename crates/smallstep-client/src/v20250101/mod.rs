//! Operations of API version 2025-01-01

pub mod models;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::error::Result;
use crate::transport::{ApiRequest, ApiResponse, Method};
use crate::version::ApiVersion;

use models::*;

pub const VERSION: ApiVersion = ApiVersion::V20250101;

pub mod paths {
    pub const DEVICE_INVENTORY_INTEGRATIONS: &str = "device-inventory-integrations";
    pub const STRATEGIES: &str = "strategies";
}

/// Operations bound to a client
#[derive(Debug, Clone, Copy)]
pub struct Api<'a> {
    client: &'a Client,
}

impl Client {
    pub fn v20250101(&self) -> Api<'_> {
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

    // Device inventory integrations

    pub async fn list_device_inventory_integrations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::DEVICE_INVENTORY_INTEGRATIONS])
            .await
    }

    pub async fn post_device_inventory_integrations(
        &self,
        cancel: &CancellationToken,
        body: &DeviceInventoryIntegration,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Post,
            &[paths::DEVICE_INVENTORY_INTEGRATIONS],
            body,
        )
        .await
    }

    pub async fn get_device_inventory_integration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Get,
            &[paths::DEVICE_INVENTORY_INTEGRATIONS, id],
        )
        .await
    }

    pub async fn put_device_inventory_integration(
        &self,
        cancel: &CancellationToken,
        id: &str,
        body: &DeviceInventoryIntegration,
    ) -> Result<ApiResponse> {
        self.send_json(
            cancel,
            Method::Put,
            &[paths::DEVICE_INVENTORY_INTEGRATIONS, id],
            body,
        )
        .await
    }

    pub async fn delete_device_inventory_integration(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(
            cancel,
            Method::Delete,
            &[paths::DEVICE_INVENTORY_INTEGRATIONS, id],
        )
        .await
    }

    // Strategies

    pub async fn list_strategies(&self, cancel: &CancellationToken) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::STRATEGIES]).await
    }

    pub async fn post_strategies(
        &self,
        cancel: &CancellationToken,
        body: &Strategy,
    ) -> Result<ApiResponse> {
        self.send_json(cancel, Method::Post, &[paths::STRATEGIES], body)
            .await
    }

    pub async fn get_strategy(&self, cancel: &CancellationToken, id: &str) -> Result<ApiResponse> {
        self.send(cancel, Method::Get, &[paths::STRATEGIES, id]).await
    }

    pub async fn put_strategy(
        &self,
        cancel: &CancellationToken,
        id: &str,
        body: &Strategy,
    ) -> Result<ApiResponse> {
        self.send_json(cancel, Method::Put, &[paths::STRATEGIES, id], body)
            .await
    }

    pub async fn delete_strategy(
        &self,
        cancel: &CancellationToken,
        id: &str,
    ) -> Result<ApiResponse> {
        self.send(cancel, Method::Delete, &[paths::STRATEGIES, id])
            .await
    }
}
