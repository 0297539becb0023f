//! Error types for smallstep-provider

use smallstep_client::ClientError;
use smallstep_core::{CoreError, Diagnostics, ErrorKind};
use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors outside of a resource lifecycle step
///
/// Lifecycle steps report [`Diagnostics`] instead; these cover configuring
/// the provider, publishing schemas and sweeping.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{0}")]
    Diagnostics(Diagnostics),

    #[error("unknown resource type '{name}'")]
    UnknownResourceType { name: String },

    #[error("unknown data source '{name}'")]
    UnknownDataSource { name: String },

    #[error("failed to sweep {kind} '{id}': {message}")]
    Sweep {
        kind: String,
        id: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<Diagnostics> for ProviderError {
    fn from(diagnostics: Diagnostics) -> Self {
        ProviderError::Diagnostics(diagnostics)
    }
}

/// Errors raised while the harness drives a configuration
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HarnessError {
    #[error("{operation} {address} failed:\n{diagnostics}")]
    Step {
        operation: &'static str,
        address: String,
        diagnostics: Diagnostics,
    },

    #[error("invalid configuration for {address}:\n{diagnostics}")]
    Config {
        address: String,
        diagnostics: Diagnostics,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("cannot resolve reference '{reference}': {reason}")]
    UnresolvedReference { reference: String, reason: String },

    #[error("no resource at address '{address}'")]
    UnknownAddress { address: String },

    #[error("resource address '{address}' is declared twice")]
    DuplicateAddress { address: String },

    #[error("cannot import {address}: no object with id '{id}'")]
    ImportMissing { address: String, id: String },

    #[error("after applying, the plan was not empty:\n{diff}")]
    NonEmptyPlan { diff: String },
}

impl HarnessError {
    /// Diagnostics reported by a lifecycle step or plan, if any
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            HarnessError::Step { diagnostics, .. } | HarnessError::Config { diagnostics, .. } => {
                Some(diagnostics)
            }
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.diagnostics().and_then(Diagnostics::error_kind)
    }
}
