//! Conversions between API values and model attributes
//!
//! The API client models optionality with `Option<T>`; models use the
//! three-state [`Attr`]. Every optional value read back from the API goes
//! through [`to_equal`] together with the attribute path in the prior state
//! (the submitted plan on create, the stored state on read), so the literal
//! form the user wrote survives when the API hands back an equivalent one.
//!
//! Rules, in order:
//! 1. the API omitted the value: `Null`
//! 2. the API returned the type's zero value and prior is null: `Null`
//!    (the server filled in a default the user never wrote)
//! 3. the API value equals the prior value: the prior value
//! 4. otherwise: the API value

use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

use crate::attr::Attr;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CoreError, Result};
use crate::normalize::{canonical_json, duration_eq, json_eq};
use crate::path::AttrPath;
use crate::value::Value;

/// Types with a zero value the API may insert as a default
pub trait ZeroValue {
    fn is_zero(&self) -> bool;
}

impl ZeroValue for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl ZeroValue for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl ZeroValue for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl<T> ZeroValue for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> ZeroValue for BTreeSet<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Core conversion with a caller-supplied equality predicate
pub fn to_equal<T, F>(api: Option<T>, prior: &Value, path: &AttrPath, eq: F) -> Attr<T>
where
    T: DeserializeOwned + ZeroValue,
    F: Fn(&T, &T) -> bool,
{
    let Some(remote) = api else {
        return Attr::Null;
    };

    let previous = prior.at(path);
    if previous.is_null() && remote.is_zero() {
        return Attr::Null;
    }

    if previous.is_known() {
        if let Ok(Attr::Known(previous)) = previous.decode::<Attr<T>>() {
            if eq(&previous, &remote) {
                return Attr::Known(previous);
            }
        }
    }

    Attr::Known(remote)
}

/// [`to_equal`] with plain equality
pub fn to_optional<T>(api: Option<T>, prior: &Value, path: &AttrPath) -> Attr<T>
where
    T: DeserializeOwned + ZeroValue + PartialEq,
{
    to_equal(api, prior, path, |a, b| a == b)
}

pub fn to_optional_string(api: Option<String>, prior: &Value, path: &AttrPath) -> Attr<String> {
    to_optional(api, prior, path)
}

pub fn to_optional_int(api: Option<i64>, prior: &Value, path: &AttrPath) -> Attr<i64> {
    to_optional(api, prior, path)
}

pub fn to_optional_bool(api: Option<bool>, prior: &Value, path: &AttrPath) -> Attr<bool> {
    to_optional(api, prior, path)
}

/// Ordered list; order is significant
pub fn to_optional_list(api: Option<Vec<String>>, prior: &Value, path: &AttrPath) -> Attr<Vec<String>> {
    to_optional(api, prior, path)
}

/// Set of strings; an empty set from the API reads as null unless the user wrote one
pub fn to_optional_set(
    api: Option<Vec<String>>,
    prior: &Value,
    path: &AttrPath,
) -> Attr<BTreeSet<String>> {
    to_optional(api.map(|items| items.into_iter().collect()), prior, path)
}

/// String attribute compared with a normalising predicate
pub fn to_equal_string(
    api: Option<String>,
    prior: &Value,
    path: &AttrPath,
    eq: fn(&str, &str) -> bool,
) -> Attr<String> {
    to_equal(api, prior, path, |a: &String, b: &String| eq(a, b))
}

/// Duration string; `5m` in prior state survives `5m0s` from the API
pub fn to_duration_string(api: Option<String>, prior: &Value, path: &AttrPath) -> Attr<String> {
    to_equal_string(api, prior, path, duration_eq)
}

/// Opaque JSON payload rendered as a string attribute
///
/// The prior string is kept whenever it parses to the same document.
pub fn to_json_string(
    api: Option<&serde_json::Value>,
    prior: &Value,
    path: &AttrPath,
) -> Attr<String> {
    let rendered = api.filter(|v| !v.is_null()).map(canonical_json);
    to_equal_string(rendered, prior, path, json_eq)
}

/// Parse a JSON string attribute into the API's opaque payload type
pub fn parse_json_attr(
    value: &Attr<String>,
    path: &AttrPath,
) -> std::result::Result<Option<serde_json::Value>, Diagnostic> {
    match value.as_deref() {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| {
            Diagnostic::error("Invalid JSON", format!("{} is not valid JSON: {}", path, e)).at(path)
        }),
    }
}

/// Narrow a 64-bit host integer to the API's native int
pub fn to_int_ptr(value: Option<i64>, path: &AttrPath) -> std::result::Result<Option<i32>, Diagnostic> {
    value
        .map(|v| {
            i32::try_from(v).map_err(|_| {
                Diagnostic::error(
                    "Integer out of range",
                    format!("{} must fit in a 32-bit integer, got {}", path, v),
                )
                .at(path)
            })
        })
        .transpose()
}

/// Widen the API's native int to a host integer
pub fn to_int64_ptr(value: Option<i32>) -> Option<i64> {
    value.map(i64::from)
}

/// Flatten error diagnostics into one error (sweepers and tests)
pub fn diagnostics_to_error(diagnostics: &Diagnostics) -> Result<()> {
    let errors: Vec<String> = diagnostics.errors().map(ToString::to_string).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Diagnostics {
            count: errors.len(),
            summary: errors.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prior(json: serde_json::Value) -> Value {
        Value::from_json(&json)
    }

    #[test]
    fn test_absent_is_null() {
        let state = prior(json!({"name": "x"}));
        assert_eq!(to_optional_string(None, &state, &AttrPath::root("name")), Attr::Null);
    }

    #[test]
    fn test_zero_value_with_null_prior_is_null() {
        let state = prior(json!({"display_name": null, "active_revocation": null}));
        assert_eq!(
            to_optional_string(Some(String::new()), &state, &AttrPath::root("display_name")),
            Attr::Null
        );
        assert_eq!(
            to_optional_bool(Some(false), &state, &AttrPath::root("active_revocation")),
            Attr::Null
        );
        assert_eq!(
            to_optional_set(Some(vec![]), &state, &AttrPath::root("admin_emails")),
            Attr::Null
        );
    }

    #[test]
    fn test_zero_value_with_unknown_prior_is_known() {
        // create plan: optional+computed attribute the user did not write
        let plan = Value::object([("active_revocation", Value::Unknown)]);
        assert_eq!(
            to_optional_bool(Some(false), &plan, &AttrPath::root("active_revocation")),
            Attr::Known(false)
        );
    }

    #[test]
    fn test_zero_value_user_wrote_is_kept() {
        let state = prior(json!({"admin_emails": []}));
        assert_eq!(
            to_optional_set(Some(vec![]), &state, &AttrPath::root("admin_emails")),
            Attr::Known(BTreeSet::new())
        );
    }

    #[test]
    fn test_duration_keeps_prior_literal() {
        let path = AttrPath::root("claims").attr("min_tls_cert_duration");
        let state = prior(json!({"claims": {"min_tls_cert_duration": "5m"}}));
        assert_eq!(
            to_duration_string(Some("5m0s".to_string()), &state, &path),
            Attr::Known("5m".to_string())
        );
        assert_eq!(
            to_duration_string(Some("10m0s".to_string()), &state, &path),
            Attr::Known("10m0s".to_string())
        );
    }

    #[test]
    fn test_json_keeps_prior_literal() {
        let path = AttrPath::root("data");
        let written = "{\n  \"b\": 2,\n  \"a\": 1\n}";
        let state = prior(json!({"data": written}));
        let remote = json!({"a": 1, "b": 2});
        assert_eq!(
            to_json_string(Some(&remote), &state, &path),
            Attr::Known(written.to_string())
        );

        let changed = json!({"a": 1, "b": 3});
        assert_eq!(
            to_json_string(Some(&changed), &state, &path),
            Attr::Known(r#"{"a":1,"b":3}"#.to_string())
        );
    }

    #[test]
    fn test_set_ignores_order() {
        let path = AttrPath::root("admin_emails");
        let state = prior(json!({"admin_emails": ["b@x", "a@x"]}));
        let result = to_optional_set(Some(vec!["a@x".into(), "b@x".into()]), &state, &path);
        assert_eq!(result.as_known().map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_int_narrowing() {
        let path = AttrPath::root("uid");
        assert_eq!(to_int_ptr(Some(1000), &path).unwrap(), Some(1000));
        assert_eq!(to_int_ptr(None, &path).unwrap(), None);
        assert!(to_int_ptr(Some(i64::MAX), &path).is_err());
        assert_eq!(to_int64_ptr(Some(7)), Some(7));
    }

    #[test]
    fn test_diagnostics_to_error() {
        let mut diags = Diagnostics::new();
        assert!(diagnostics_to_error(&diags).is_ok());
        diags.add_error("boom", "detail");
        let err = diagnostics_to_error(&diags).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
