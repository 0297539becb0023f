//! Client configuration
//!
//! Resolved from explicit values first, then the environment
//! (`SMALLSTEP_API_URL`, `SMALLSTEP_API_TOKEN`), then defaults.

use std::time::Duration;

use crate::error::{ClientError, Result};

/// Default API gateway
pub const DEFAULT_SERVER_URL: &str = "https://gateway.smallstep.com/api";

/// Environment variable overriding the server URL
pub const ENV_API_URL: &str = "SMALLSTEP_API_URL";

/// Environment variable holding the API token
pub const ENV_API_TOKEN: &str = "SMALLSTEP_API_TOKEN";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`crate::HttpTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://gateway.smallstep.com/api`
    pub server_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        Self::resolve(None, None, |key| std::env::var(key).ok())
    }

    /// Explicit values win over the environment
    pub fn resolve(
        server_url: Option<String>,
        token: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            server_url: non_empty(server_url)
                .or_else(|| non_empty(env(ENV_API_URL)))
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            token: non_empty(token).or_else(|| non_empty(env(ENV_API_TOKEN))),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse and check the server URL
    pub fn base_url(&self) -> Result<url::Url> {
        let url = url::Url::parse(&self.server_url).map_err(|e| ClientError::InvalidUrl {
            url: self.server_url.clone(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "https" | "http" => {}
            other => {
                return Err(ClientError::InvalidUrl {
                    url: self.server_url.clone(),
                    reason: format!("unsupported scheme '{}'", other),
                });
            }
        }
        if url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: self.server_url.clone(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::resolve(None, None, env(&[]));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_environment_fallback() {
        let config = ClientConfig::resolve(
            None,
            None,
            env(&[(ENV_API_URL, "http://localhost:8080/api"), (ENV_API_TOKEN, "tok")]),
        );
        assert_eq!(config.server_url, "http://localhost:8080/api");
        assert_eq!(config.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_explicit_values_win() {
        let config = ClientConfig::resolve(
            Some("https://example.test/api".to_string()),
            Some(String::new()),
            env(&[(ENV_API_URL, "http://ignored"), (ENV_API_TOKEN, "from-env")]),
        );
        assert_eq!(config.server_url, "https://example.test/api");
        assert_eq!(config.token.as_deref(), Some("from-env"), "empty explicit token falls through");
    }

    #[test]
    fn test_base_url_validation() {
        assert!(ClientConfig::default().base_url().is_ok());

        let bad_scheme = ClientConfig {
            server_url: "ftp://example.test".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad_scheme.base_url(), Err(ClientError::InvalidUrl { .. })));

        let garbage = ClientConfig {
            server_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(garbage.base_url().is_err());
    }
}
