//! shipshape core library
//!
//! The policy-enforcement half of shipshape: the configuration document
//! model, the immutable metadata snapshot, the policy registry and its
//! built-in policies, and the fail-fast enforcement loop.

pub mod config;
pub mod enforce;
pub mod error;
pub mod metadata;
pub mod policy;
pub mod telemetry;

// Re-export key types
pub use config::{
    Config, LoadedConfig, MetadataDecl, Pipeline, PolicyDeclaration, Script, Stage, Step, Task,
};
pub use enforce::enforce_policies;
pub use error::{RefKind, Result, ShipshapeError};
pub use metadata::{is_git_repo, GitFacts, Metadata};
pub use policy::{
    CleanWorktree, ComplianceReport, ConventionalCommit, Policy, PolicyContext, PolicyRegistry,
};
pub use telemetry::init_tracing;

/// shipshape version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
