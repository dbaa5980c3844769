//! Build-script execution.

use std::path::Path;

use tracing::{debug, info};

use shipshape_core::{Metadata, Result, Script, ShipshapeError};

use crate::runner::ShellRunner;

/// Executes the declared build script.
pub struct ScriptRunner;

impl ScriptRunner {
    /// Run every step strictly in declared order with the metadata binding
    /// in the environment and `cwd` as the working directory.
    ///
    /// The first failing step aborts with [`ShipshapeError::ScriptStep`]
    /// carrying the 0-based index of the step that failed; later steps
    /// never run.
    pub async fn execute(script: &Script, metadata: &Metadata, cwd: &Path) -> Result<()> {
        let binding = metadata.env();

        for (index, step) in script.steps.iter().enumerate() {
            let name = step.display_name(index);
            info!(step = %name, index, "executing script step");

            let outcome = ShellRunner::run(&step.run, cwd, &binding, step.timeout_secs)
                .await
                .map_err(|e| ShipshapeError::ScriptStep {
                    index,
                    name: name.clone(),
                    detail: e.to_string(),
                })?;

            if !outcome.passed() {
                return Err(ShipshapeError::ScriptStep {
                    index,
                    name,
                    detail: outcome.failure_detail(),
                });
            }

            debug!(step = %name, duration_ms = outcome.duration_ms, "step passed");
        }

        Ok(())
    }
}
