//! Built-pipeline execution.

use std::path::Path;

use tracing::{debug, info};

use shipshape_core::{Result, ShipshapeError};

use crate::build::BuiltPipeline;
use crate::runner::ShellRunner;

/// Executes a [`BuiltPipeline`] stage by stage.
pub struct PipelineRunner;

impl PipelineRunner {
    /// Run every stage and task strictly in built order, one process at a
    /// time, with `cwd` as the working directory.
    ///
    /// The first failing task aborts the run with
    /// [`ShipshapeError::TaskFailed`] naming its stage and task; nothing
    /// after it executes.
    pub async fn execute(pipeline: &BuiltPipeline, cwd: &Path) -> Result<()> {
        for stage in &pipeline.stages {
            info!(stage = %stage.name, tasks = stage.tasks.len(), "executing stage");

            for task in &stage.tasks {
                debug!(stage = %stage.name, task = %task.name, command = %task.command, "executing task");

                let outcome = ShellRunner::run(&task.command, cwd, &task.env, task.timeout_secs)
                    .await
                    .map_err(|e| ShipshapeError::TaskFailed {
                        stage: stage.name.clone(),
                        task: task.name.clone(),
                        detail: e.to_string(),
                    })?;

                if !outcome.passed() {
                    return Err(ShipshapeError::TaskFailed {
                        stage: stage.name.clone(),
                        task: task.name.clone(),
                        detail: outcome.failure_detail(),
                    });
                }

                debug!(
                    stage = %stage.name,
                    task = %task.name,
                    duration_ms = outcome.duration_ms,
                    "task passed"
                );
            }

            info!(stage = %stage.name, "stage passed");
        }

        Ok(())
    }
}
