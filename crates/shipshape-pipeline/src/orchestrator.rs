//! Run orchestration.
//!
//! The orchestrator owns the gate sequence and nothing else may reorder
//! it: load the document, capture metadata, enforce policies, build the
//! pipeline, execute it, then execute the script. Each step gates the
//! next and the first error aborts the whole run. There is no rollback;
//! side effects produced by completed tasks stay.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use shipshape_core::{enforce_policies, Config, Metadata, PolicyContext, PolicyRegistry, Result};

use crate::build::BuiltPipeline;
use crate::exec::PipelineRunner;
use crate::script::ScriptRunner;

/// Summary of a completed (fully successful) run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub config_digest: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub policies_checked: usize,
    pub stages_run: usize,
    pub steps_run: usize,
}

/// Outcome of resolving a configuration without executing anything.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub config_digest: String,
    pub policies_declared: usize,
    pub metadata: Metadata,
    pub pipeline: Option<BuiltPipeline>,
    pub script_steps: usize,
}

/// Sequences the policy gate, the pipeline, and the script.
pub struct Orchestrator {
    registry: PolicyRegistry,
}

impl Orchestrator {
    /// An orchestrator gating with the given registry.
    pub fn new(registry: PolicyRegistry) -> Self {
        Self { registry }
    }

    /// An orchestrator gating with every built-in policy registered.
    pub fn with_builtin_policies() -> Self {
        Self::new(PolicyRegistry::builtin())
    }

    /// Run the full gate sequence against the repository at `repo_dir`
    /// using the document at `config_path`.
    pub async fn run(&self, repo_dir: &Path, config_path: &Path) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        info!(run_id = %run_id, config = %config_path.display(), "starting run");

        let loaded = Config::load(config_path)?;
        info!(run_id = %run_id, digest = %loaded.digest, "config loaded");

        let metadata = Metadata::capture(repo_dir, loaded.config.metadata.as_ref())?;
        info!(run_id = %run_id, sha = %metadata.git.sha, branch = %metadata.git.branch, "metadata captured");

        let ctx = PolicyContext {
            metadata: &metadata,
            pipeline: loaded.config.pipeline.as_ref(),
            tasks: &loaded.config.tasks,
        };
        enforce_policies(&self.registry, &loaded.config.policies, &ctx)?;
        info!(run_id = %run_id, policies = loaded.config.policies.len(), "all policies compliant");

        let built = match &loaded.config.pipeline {
            Some(pipeline) => Some(BuiltPipeline::build(
                pipeline,
                &metadata,
                &loaded.config.stages,
                &loaded.config.tasks,
            )?),
            None => None,
        };

        let mut stages_run = 0;
        if let Some(pipeline) = &built {
            info!(run_id = %run_id, stages = pipeline.stages.len(), tasks = pipeline.task_count(), "pipeline built");
            PipelineRunner::execute(pipeline, repo_dir).await?;
            stages_run = pipeline.stages.len();
        }

        let mut steps_run = 0;
        if let Some(script) = &loaded.config.script {
            ScriptRunner::execute(script, &metadata, repo_dir).await?;
            steps_run = script.steps.len();
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %run_id, duration_ms, "run completed");

        Ok(RunSummary {
            run_id,
            config_digest: loaded.digest,
            started_at,
            duration_ms,
            policies_checked: loaded.config.policies.len(),
            stages_run,
            steps_run,
        })
    }

    /// Load, capture, and build without executing anything.
    ///
    /// This is the pure half of the run: it proves every stage and task
    /// reference resolves before any side effect is possible.
    pub fn resolve(&self, repo_dir: &Path, config_path: &Path) -> Result<Resolution> {
        let loaded = Config::load(config_path)?;
        let metadata = Metadata::capture(repo_dir, loaded.config.metadata.as_ref())?;

        let pipeline = match &loaded.config.pipeline {
            Some(pipeline) => Some(BuiltPipeline::build(
                pipeline,
                &metadata,
                &loaded.config.stages,
                &loaded.config.tasks,
            )?),
            None => None,
        };

        Ok(Resolution {
            config_digest: loaded.digest,
            policies_declared: loaded.config.policies.len(),
            metadata,
            pipeline,
            script_steps: loaded.config.script.as_ref().map_or(0, |s| s.steps.len()),
        })
    }
}
