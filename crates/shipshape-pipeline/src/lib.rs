//! shipshape pipeline library
//!
//! The execution half of shipshape: resolves the declared pipeline into an
//! executable form, runs tasks and script steps one process at a time, and
//! sequences the whole gate through the orchestrator.

pub mod build;
pub mod exec;
pub mod orchestrator;
pub mod runner;
pub mod script;

// Re-export key types
pub use build::{BuiltPipeline, BuiltStage, BuiltTask};
pub use exec::PipelineRunner;
pub use orchestrator::{Orchestrator, Resolution, RunSummary};
pub use runner::{CommandOutcome, ShellRunner};
pub use script::ScriptRunner;
