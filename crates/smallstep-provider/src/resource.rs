//! Lifecycle contract between the host runtime and each resource kind

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use smallstep_core::{Diagnostic, Diagnostics, ErrorKind, Schema, Value};

use crate::error::Result;

/// Per-call context handed down by the host runtime
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Cancels every in-flight API call of the step
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

/// Outcome of one lifecycle step
pub type StepResult<T> = std::result::Result<T, Diagnostics>;

/// A managed resource kind
///
/// Values passed in and out are whole objects conforming to [`Resource::schema`].
/// The runtime calls these concurrently across instances and serially for a
/// given instance.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Host type name, e.g. `smallstep_authority`
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Result<Schema>;

    /// Create from the planned value; returns the new state
    async fn create(&self, ctx: &Context, planned: &Value) -> StepResult<Value>;

    /// Refresh state; `None` means the object is gone and must leave state
    async fn read(&self, ctx: &Context, state: &Value) -> StepResult<Option<Value>>;

    /// Update in place; returns the new state
    async fn update(&self, ctx: &Context, planned: &Value, prior: &Value) -> StepResult<Value>;

    async fn delete(&self, ctx: &Context, state: &Value) -> StepResult<()>;

    /// Partial state to [`Resource::read`] after an import
    fn import_state(&self, id: &str) -> StepResult<Value>;
}

/// A read-only lookup
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Result<Schema>;

    async fn read(&self, ctx: &Context, config: &Value) -> StepResult<Value>;
}

/// Decode a plan or state value into a resource model
pub fn decode_model<T: DeserializeOwned>(value: &Value) -> StepResult<T> {
    value.decode().map_err(|e| {
        Diagnostic::error("Invalid resource value", e.to_string()).into()
    })
}

/// Encode a resource model as state
pub fn encode_model<T: Serialize>(model: &T) -> StepResult<Value> {
    Value::encode(model).map_err(|e| Diagnostic::error("Invalid resource value", e.to_string()).into())
}

/// State for single-identity imports
pub fn import_single(attribute: &str, id: &str) -> StepResult<Value> {
    if id.is_empty() {
        return Err(Diagnostic::error(
            "Invalid import ID",
            format!("expected a non-empty {}", attribute),
        )
        .with_kind(ErrorKind::ImportShape)
        .into());
    }
    Ok(Value::object([(attribute, Value::string(id))]))
}

/// State for composite imports: `id` is split on `/` into `attributes`
pub fn import_composite(attributes: &[&str], id: &str) -> StepResult<Value> {
    let parts: Vec<&str> = id.split('/').collect();
    if parts.len() != attributes.len() || parts.iter().any(|p| p.is_empty()) {
        let expected = attributes
            .iter()
            .map(|a| format!("<{}>", a))
            .collect::<Vec<_>>()
            .join("/");
        return Err(Diagnostic::error(
            "Invalid import ID",
            format!("expected import identifier with format {}, got \"{}\"", expected, id),
        )
        .with_kind(ErrorKind::ImportShape)
        .into());
    }
    Ok(Value::object(
        attributes
            .iter()
            .zip(parts)
            .map(|(attribute, part)| (*attribute, Value::string(part))),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_composite() {
        let state = import_composite(&["device_collection_slug", "slug"], "dc-slug/account-slug").unwrap();
        assert_eq!(state.get("device_collection_slug").as_str(), Some("dc-slug"));
        assert_eq!(state.get("slug").as_str(), Some("account-slug"));
    }

    #[test]
    fn test_import_composite_shape() {
        for bad in ["dc-slug", "a/b/c", "/b", "a/"] {
            let err = import_composite(&["device_collection_slug", "slug"], bad).unwrap_err();
            assert_eq!(err.error_kind(), Some(ErrorKind::ImportShape), "{}", bad);
            assert!(err.to_string().contains("<device_collection_slug>/<slug>"));
        }
    }

    #[test]
    fn test_import_single() {
        assert_eq!(import_single("id", "a1").unwrap().get("id").as_str(), Some("a1"));
        assert!(import_single("id", "").is_err());
    }
}
