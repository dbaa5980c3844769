//! Policy engine: the capability contract, the read-only evaluation
//! context, and the registry that turns declared type names into typed
//! policy instances.
//!
//! The registry is built once at startup and never mutated afterwards.
//! Declarations carry an untyped spec value; [`PolicyRegistry::decode`]
//! resolves the declared name and deserialises the spec into a fresh
//! instance of the registered type. A null spec yields the policy's
//! prototype defaults; a mismatched shape is a hard decode error.

pub mod conventional;
pub mod worktree;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{Pipeline, Task};
use crate::error::{Result, ShipshapeError};
use crate::metadata::Metadata;

pub use conventional::ConventionalCommit;
pub use worktree::CleanWorktree;

/// Read-only views a policy checks against.
///
/// Policies observe, never mutate: everything here is a shared reference
/// into state owned by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// Captured repository facts.
    pub metadata: &'a Metadata,

    /// The declared pipeline, when one exists.
    pub pipeline: Option<&'a Pipeline>,

    /// The declared task map.
    pub tasks: &'a BTreeMap<String, Task>,
}

/// Outcome of one policy check.
///
/// Violations are ordered; a report with no errors is valid. A policy
/// collects every violation it finds before returning.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ComplianceReport {
    pub errors: Vec<String>,
}

impl ComplianceReport {
    /// Whether the check passed (i.e., there are no violations).
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a violation.
    pub fn add(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// A typed, executable compliance check.
///
/// Decoding is the other half of the capability: implementors also derive
/// `Debug`, `Deserialize`, and `Default` so the registry can produce
/// inspectable instances from declared spec values.
pub trait Policy: std::fmt::Debug {
    /// Check compliance against the captured metadata and declared pipeline.
    ///
    /// Pure: same context in, same report out.
    fn compliance(&self, ctx: &PolicyContext<'_>) -> ComplianceReport;
}

type PolicyFactory =
    fn(&serde_yaml::Value) -> std::result::Result<Box<dyn Policy>, serde_yaml::Error>;

fn decode_spec<P>(
    spec: &serde_yaml::Value,
) -> std::result::Result<Box<dyn Policy>, serde_yaml::Error>
where
    P: Policy + Default + DeserializeOwned + 'static,
{
    if spec.is_null() {
        return Ok(Box::new(P::default()));
    }
    let policy: P = serde_yaml::from_value(spec.clone())?;
    Ok(Box::new(policy))
}

/// Immutable mapping from policy-type names to decode factories.
pub struct PolicyRegistry {
    factories: BTreeMap<String, PolicyFactory>,
}

impl PolicyRegistry {
    /// An empty registry, for embedders and tests.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with every built-in policy registered.
    pub fn builtin() -> Self {
        Self::new()
            .with_policy::<ConventionalCommit>("conventionalCommit")
            .with_policy::<CleanWorktree>("cleanWorktree")
    }

    /// Register policy type `P` under `name`.
    pub fn with_policy<P>(mut self, name: &str) -> Self
    where
        P: Policy + Default + DeserializeOwned + 'static,
    {
        self.factories.insert(name.to_string(), decode_spec::<P>);
        self
    }

    /// Decode `spec` into a fresh instance of the policy registered as
    /// `name`.
    ///
    /// An unregistered name is [`ShipshapeError::UnknownPolicy`]; a spec
    /// that does not match the policy's shape is
    /// [`ShipshapeError::PolicyDecode`], never a silent default.
    pub fn decode(&self, name: &str, spec: &serde_yaml::Value) -> Result<Box<dyn Policy>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ShipshapeError::UnknownPolicy {
                name: name.to_string(),
            })?;

        factory(spec).map_err(|e| ShipshapeError::PolicyDecode {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Registered policy-type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
