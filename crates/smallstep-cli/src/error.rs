//! CLI error types with exit code handling
//!
//! Every library error is folded into [`CliError`], which carries a
//! diagnostic code and maps to a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use smallstep_core::CoreError;
use smallstep_provider::ProviderError;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Resource or data source type that the provider does not register
    #[error("Unknown type '{name}'")]
    #[diagnostic(code(smallstep::cli::unknown_type))]
    UnknownType {
        name: String,
        #[help]
        help: Option<String>,
    },

    /// Component missing from the bundled OpenAPI document
    #[error("Unknown component '{name}'")]
    #[diagnostic(code(smallstep::cli::unknown_component))]
    UnknownComponent {
        name: String,
        #[help]
        help: Option<String>,
    },

    /// Bad flag or environment value
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(smallstep::cli::config),
        help("check SMALLSTEP_API_URL, SMALLSTEP_API_TOKEN, SWEEP_PREFIX and SWEEP_AGE")
    )]
    Config { message: String },

    /// The API failed a request
    #[error("API error: {message}")]
    #[diagnostic(code(smallstep::cli::api))]
    Api { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(smallstep::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(smallstep::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UnknownType { .. } | CliError::UnknownComponent { .. } => {
                exit_codes::USAGE_ERROR
            }
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Api { .. } => exit_codes::API_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidConfig(message) => CliError::Config { message },
            ProviderError::Client(e) => CliError::Config {
                message: e.to_string(),
            },
            ProviderError::Sweep { .. } => CliError::Api {
                message: err.to_string(),
            },
            other => CliError::internal(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
