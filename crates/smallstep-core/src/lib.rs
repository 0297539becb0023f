//! Smallstep Core - Value model and schema machinery for the Smallstep resource controller
//!
//! This crate provides the pieces shared by every resource:
//! - `Value` / `Attr`: three-state (null, unknown, known) attribute values
//! - `bridge`: conversion from API values that preserves the user's literal form
//! - `Schema`: attribute trees with plan modifiers and validators
//! - `plan`: create / update / replace / no-op decisions
//! - `openapi`: descriptions from the bundled API document

pub mod attr;
pub mod bridge;
pub mod diagnostics;
pub mod error;
pub mod normalize;
pub mod openapi;
pub mod path;
pub mod plan;
pub mod schema;
pub mod value;

pub use attr::Attr;
pub use diagnostics::{Diagnostic, Diagnostics, ErrorKind, Severity};
pub use error::{CoreError, Result};
pub use openapi::{ComponentDescription, describe};
pub use path::{AttrPath, PathStep};
pub use plan::{Plan, PlanAction, plan};
pub use schema::{
    Attribute, AttributeKind, ElementKind, PlanModifier, Requiredness, Schema, SchemaBuilder,
    Validator,
};
pub use value::Value;
