//! Error taxonomy for shipshape.
//!
//! Every failure mode of the gate is a distinct [`ShipshapeError`] variant so
//! callers can match on what went wrong. Library code never terminates the
//! process; errors propagate up to the CLI, which owns the exit code.

use std::fmt;
use std::path::PathBuf;

/// The kind of name a pipeline reference failed to resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A stage name declared in the pipeline order.
    Stage,
    /// A task name declared inside a stage.
    Task,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Stage => write!(f, "stage"),
            RefKind::Task => write!(f, "task"),
        }
    }
}

/// shipshape domain errors.
#[derive(Debug, thiserror::Error)]
pub enum ShipshapeError {
    #[error("failed to load config {}: {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("unknown policy: {name}")]
    UnknownPolicy { name: String },

    #[error("invalid spec for policy {name}: {reason}")]
    PolicyDecode { name: String, reason: String },

    #[error("policy {policy} reported {} violation(s)", .violations.len())]
    PolicyViolation {
        policy: String,
        violations: Vec<String>,
    },

    #[error("unresolved {kind} reference: {name}")]
    UnresolvedReference { kind: RefKind, name: String },

    #[error("task {task} in stage {stage} failed: {detail}")]
    TaskFailed {
        stage: String,
        task: String,
        detail: String,
    },

    #[error("script step {index} ({name}) failed: {detail}")]
    ScriptStep {
        index: usize,
        name: String,
        detail: String,
    },

    #[error("git error: {0}")]
    Git(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for shipshape operations.
pub type Result<T> = std::result::Result<T, ShipshapeError>;
