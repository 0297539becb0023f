//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown OpenAPI component: {name}")]
    UnknownComponent { name: String },

    #[error("Invalid OpenAPI document: {message}")]
    InvalidDocument { message: String },

    #[error("Invalid attribute path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Value conversion failed at {path}: {message}")]
    Conversion { path: String, message: String },

    #[error("{count} error diagnostic(s): {summary}")]
    Diagnostics { count: usize, summary: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
