//! Shared API client

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

/// Client shared by every resource
///
/// Cheap to clone; immutable after construction.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Client over HTTPS
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Send a request, aborting if `cancel` fires first
    pub async fn send(&self, cancel: &CancellationToken, request: ApiRequest) -> Result<ApiResponse> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let label = request.to_string();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(request = %label, "request cancelled");
                Err(ClientError::Cancelled)
            }
            result = self.transport.execute(request) => {
                if let Ok(response) = &result {
                    tracing::debug!(request = %label, status = response.status, "response received");
                }
                result
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
