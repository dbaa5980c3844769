//! Shell command execution.
//!
//! One command at a time through `sh -c`, with the working directory and
//! environment supplied by the caller, captured output, and an optional
//! timeout. Both the pipeline executor and the script executor run their
//! commands through here.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

/// Outcome of a single command execution.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Exit code (0 = success, -1 = terminated by signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited successfully.
    pub success: bool,
}

impl CommandOutcome {
    /// Whether the command passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// One-line failure description for error details.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {stderr}", self.exit_code)
        }
    }
}

/// Executes shell commands for pipeline tasks and script steps.
pub struct ShellRunner;

impl ShellRunner {
    /// Run `command` via `sh -c` in `cwd` with `env` added to the inherited
    /// environment.
    ///
    /// `timeout_secs` of 0 means no timeout. A timeout or spawn failure is
    /// an error; a non-zero exit is a normal [`CommandOutcome`]. A child
    /// still running when the timeout fires is killed.
    pub async fn run(
        command: &str,
        cwd: &Path,
        env: &BTreeMap<String, String>,
        timeout_secs: u64,
    ) -> anyhow::Result<CommandOutcome> {
        let start = Instant::now();

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .envs(env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = if timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| anyhow::anyhow!("timed out after {timeout_secs} seconds"))??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();

        Ok(CommandOutcome {
            exit_code,
            stdout,
            stderr,
            duration_ms,
            success,
        })
    }
}
