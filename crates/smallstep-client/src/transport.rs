//! Request/response types and the transports that carry them

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::version::{API_VERSION_HEADER, ApiVersion, REQUEST_ID_HEADER};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request to the API
///
/// The path is kept as raw segments; transports encode them.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub version: ApiVersion,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(
        method: Method,
        version: ApiVersion,
        segments: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            version,
        }
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Encode {
            message: e.to_string(),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Path as sent on the wire (unencoded), e.g. `/authorities/123`
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path())
    }
}

/// Error body returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

/// A response from the API, whatever its status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `X-Request-Id` header, when present
    pub request_id: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            request_id: None,
            body,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode a JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode {
            message: e.to_string(),
        })
    }

    /// The `message` of an error body, if it has one
    pub fn api_error(&self) -> Option<ApiErrorBody> {
        serde_json::from_slice::<ApiErrorBody>(&self.body)
            .ok()
            .filter(|e| !e.message.is_empty())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Carries requests to the API
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Transport over HTTPS
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: url::Url,
    token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("smallstep-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
            timeout: config.timeout,
        })
    }

    fn url_for(&self, request: &ApiRequest) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?;
            path.pop_if_empty();
            path.extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    fn map_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            ClientError::Network {
                message: format!("Connection failed: {}", e),
            }
        } else {
            ClientError::Network {
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request)?;
        tracing::debug!(method = %request.method, %url, version = %request.version, "sending request");

        let mut builder = self
            .client
            .request(request.method.as_reqwest(), url)
            .header(API_VERSION_HEADER, request.version.as_str())
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| self.map_error(e))?.to_vec();

        Ok(ApiResponse {
            status,
            request_id,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path() {
        let request = ApiRequest::new(
            Method::Get,
            ApiVersion::V20231208,
            ["authorities", "a1", "provisioners", "my jwk"],
        );
        assert_eq!(request.to_string(), "GET /authorities/a1/provisioners/my jwk");
    }

    #[test]
    fn test_url_encodes_segments() {
        let transport = HttpTransport::new(&ClientConfig {
            server_url: "https://gateway.example.test/api/".to_string(),
            ..Default::default()
        })
        .unwrap();
        let request = ApiRequest::new(Method::Get, ApiVersion::V20231208, ["provisioners", "a b/c"])
            .query("pageSize", "100");
        let url = transport.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gateway.example.test/api/provisioners/a%20b%2Fc?pageSize=100"
        );
    }

    #[test]
    fn test_api_error_body() {
        let response = ApiResponse::new(409, br#"{"message":"collection is not empty"}"#.to_vec());
        assert_eq!(response.api_error().unwrap().message, "collection is not empty");
        assert!(!response.is_success());

        let opaque = ApiResponse::new(502, b"<html>bad gateway</html>".to_vec());
        assert!(opaque.api_error().is_none());
        assert_eq!(opaque.text(), "<html>bad gateway</html>");
    }
}
