//! API versions
//!
//! Every request names the dated API version it was written against. A
//! resource kind always uses one version for all of its operations.

use std::fmt;

/// Header carrying the API version
pub const API_VERSION_HEADER: &str = "X-Smallstep-Api-Version";

/// Header carrying the server-side request id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiVersion {
    V20231208,
    V20250101,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V20231208 => "2023-12-08",
            ApiVersion::V20250101 => "2025-01-01",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
