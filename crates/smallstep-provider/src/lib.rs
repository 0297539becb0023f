//! Smallstep Provider - Declarative resource controllers for a Smallstep private PKI
//!
//! This crate provides:
//! - `resources`: one controller per managed object kind (authorities,
//!   provisioners, configurations, collections, device collections, strategies)
//! - `data_sources`: read-only lookups sharing the resource codecs
//! - `provider`: client configuration and the type registry
//! - `sweep`: removal of leftover test objects
//! - `harness`: an in-process host runtime for acceptance scenarios

pub mod data_sources;
pub mod error;
pub mod harness;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod respond;
pub mod sweep;

pub use error::{HarnessError, ProviderError, Result};
pub use harness::{Config, Harness, PlanOutcome, PlannedChange, Step};
pub use provider::{ProviderConfig, ProviderSchema, SmallstepProvider};
pub use resource::{Context, DataSource, Resource, StepResult};
pub use sweep::{SweepConfig, SweepKind, SweepReport, Sweeper};
