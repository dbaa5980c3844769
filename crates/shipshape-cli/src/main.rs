//! shipshape - policy-gated pipeline runner
//!
//! The `shipshape` command enforces the policies declared in
//! `shipshape.yaml` against the current repository and, when every policy
//! passes, builds and runs the declared pipeline and script.
//!
//! ## Commands
//!
//! - `enforce`: run the full gate (policies, pipeline, script)
//! - `validate`: resolve the configuration without executing anything
//! - `policies`: list registered policy types
//!
//! This binary is the single point of process termination: library errors
//! propagate here and become the exit code.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use shipshape_core::{PolicyRegistry, ShipshapeError};
use shipshape_pipeline::Orchestrator;

#[derive(Parser)]
#[command(name = "shipshape")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Policy-gated pipeline runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output (log lines and command results)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enforce declared policies, then run the pipeline and script
    Enforce {
        /// Path to the configuration document
        #[arg(short, long, default_value = "shipshape.yaml")]
        config: PathBuf,

        /// Repository directory to gate
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Resolve the configuration without executing anything
    Validate {
        /// Path to the configuration document
        #[arg(short, long, default_value = "shipshape.yaml")]
        config: PathBuf,

        /// Repository directory to gate
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// List registered policy types
    Policies,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    shipshape_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Enforce { config, dir } => cmd_enforce(&config, &dir).await,
        Commands::Validate { config, dir } => cmd_validate(&config, &dir, cli.json),
        Commands::Policies => cmd_policies(),
    }
}

async fn cmd_enforce(config: &Path, dir: &Path) -> Result<()> {
    let orchestrator = Orchestrator::with_builtin_policies();

    match orchestrator.run(dir, config).await {
        Ok(summary) => {
            println!(
                "all checks passed ({} policies, {} stages, {} script steps)",
                summary.policies_checked, summary.stages_run, summary.steps_run
            );
            Ok(())
        }
        Err(ShipshapeError::PolicyViolation { policy, violations }) => {
            print!("{}", render_violations(&policy, &violations));
            anyhow::bail!("policy checks failed")
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_validate(config: &Path, dir: &Path, json: bool) -> Result<()> {
    let orchestrator = Orchestrator::with_builtin_policies();
    let resolution = orchestrator.resolve(dir, config)?;

    if json {
        let rendered = serde_json::to_string_pretty(&resolution)
            .context("failed to render resolution as JSON")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("config digest: {}", resolution.config_digest);
    println!("policies declared: {}", resolution.policies_declared);
    match &resolution.pipeline {
        Some(pipeline) => println!(
            "pipeline: {} stage(s), {} task(s)",
            pipeline.stages.len(),
            pipeline.task_count()
        ),
        None => println!("pipeline: none"),
    }
    println!("script steps: {}", resolution.script_steps);
    Ok(())
}

fn cmd_policies() -> Result<()> {
    let registry = PolicyRegistry::builtin();
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}

/// Render a policy violation block.
///
/// One header line naming the policy, then one tab-indented line per
/// violation, numbered from zero in report order.
fn render_violations(policy: &str, violations: &[String]) -> String {
    let mut out = format!("Violation of policy {policy:?}:\n");
    for (index, violation) in violations.iter().enumerate() {
        out.push_str(&format!("\tViolation {index}: {violation}\n"));
    }
    out
}
