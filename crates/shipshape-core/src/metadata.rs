//! Repository metadata capture.
//!
//! [`Metadata`] is the immutable read-model every policy checks against and
//! the environment bound into every pipeline task and script step. It is
//! captured exactly once at startup, before enforcement begins, and passed
//! by shared reference afterwards.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MetadataDecl;
use crate::error::{Result, ShipshapeError};

/// Facts captured from the git repository at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitFacts {
    /// Current branch name (`HEAD` when detached).
    pub branch: String,

    /// HEAD commit SHA.
    pub sha: String,

    /// Full HEAD commit message.
    pub message: String,

    /// Whether the work tree has no uncommitted or untracked changes.
    pub clean: bool,
}

/// Immutable snapshot of project and repository facts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// Declared repository name, if any.
    pub repository: Option<String>,

    /// Declared project version, if any.
    pub version: Option<String>,

    /// Facts captured from git.
    pub git: GitFacts,

    /// When this snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

impl Metadata {
    /// Capture metadata from the repository at `repo_dir`, merging in the
    /// declared facts from the configuration document.
    ///
    /// Returns an error if `repo_dir` is not inside a git work tree or if
    /// git is not available.
    pub fn capture(repo_dir: &Path, decl: Option<&MetadataDecl>) -> Result<Self> {
        if !is_git_repo(repo_dir) {
            return Err(ShipshapeError::Git(format!(
                "{} is not inside a git work tree",
                repo_dir.display()
            )));
        }

        let branch = run_git(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let sha = run_git(repo_dir, &["rev-parse", "HEAD"])?;
        let message = run_git(repo_dir, &["log", "-1", "--pretty=%B"])?;
        let status = run_git(repo_dir, &["status", "--porcelain"])?;

        Ok(Self {
            repository: decl.and_then(|d| d.repository.clone()),
            version: decl.and_then(|d| d.version.clone()),
            git: GitFacts {
                branch,
                sha,
                message,
                clean: status.is_empty(),
            },
            captured_at: Utc::now(),
        })
    }

    /// Render the snapshot as environment variables.
    ///
    /// This is the metadata binding injected into every pipeline task and
    /// script step. A `BTreeMap` keeps the rendering deterministic.
    pub fn env(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        if let Some(repository) = &self.repository {
            vars.insert("SHIPSHAPE_REPOSITORY".to_string(), repository.clone());
        }
        if let Some(version) = &self.version {
            vars.insert("SHIPSHAPE_VERSION".to_string(), version.clone());
        }
        vars.insert("SHIPSHAPE_BRANCH".to_string(), self.git.branch.clone());
        vars.insert("SHIPSHAPE_SHA".to_string(), self.git.sha.clone());
        vars.insert(
            "SHIPSHAPE_COMMIT_MESSAGE".to_string(),
            self.git.message.clone(),
        );
        vars.insert(
            "SHIPSHAPE_WORKTREE_CLEAN".to_string(),
            self.git.clean.to_string(),
        );
        vars.insert(
            "SHIPSHAPE_CAPTURED_AT".to_string(),
            self.captured_at.to_rfc3339(),
        );
        vars
    }
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a git subcommand in `repo_dir` and return its trimmed stdout.
fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| ShipshapeError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShipshapeError::Git(format!(
            "git {} failed: {stderr}",
            args.join(" ")
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command as StdCommand;

    fn run(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo(message: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["init"]);
        run(dir.path(), &["config", "user.name", "test-user"]);
        run(dir.path(), &["config", "user.email", "test@example.com"]);
        run(dir.path(), &["commit", "--allow-empty", "-m", message]);
        dir
    }

    #[test]
    fn test_capture_reads_head_facts() {
        let repo = make_git_repo("feat(core): initial layout");
        let metadata = Metadata::capture(repo.path(), None).unwrap();

        assert_eq!(metadata.git.sha.len(), 40);
        assert!(metadata.git.sha.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(metadata.git.message, "feat(core): initial layout");
        assert!(metadata.git.clean);
        assert!(metadata.repository.is_none());
    }

    #[test]
    fn test_capture_merges_declared_facts() {
        let repo = make_git_repo("chore: noop");
        let decl = MetadataDecl {
            repository: Some("shipshape".to_string()),
            version: Some("0.2.0".to_string()),
        };
        let metadata = Metadata::capture(repo.path(), Some(&decl)).unwrap();

        assert_eq!(metadata.repository.as_deref(), Some("shipshape"));
        assert_eq!(metadata.version.as_deref(), Some("0.2.0"));
    }

    #[test]
    fn test_capture_flags_dirty_worktree() {
        let repo = make_git_repo("chore: noop");
        std::fs::write(repo.path().join("scratch.txt"), "uncommitted").unwrap();

        let metadata = Metadata::capture(repo.path(), None).unwrap();
        assert!(!metadata.git.clean);
    }

    #[test]
    fn test_capture_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let result = Metadata::capture(dir.path(), None);
        assert!(matches!(result, Err(ShipshapeError::Git(_))));
    }

    #[test]
    fn test_env_contains_git_facts() {
        let repo = make_git_repo("fix: patch");
        let decl = MetadataDecl {
            repository: Some("shipshape".to_string()),
            version: None,
        };
        let metadata = Metadata::capture(repo.path(), Some(&decl)).unwrap();
        let env = metadata.env();

        assert_eq!(env.get("SHIPSHAPE_REPOSITORY").unwrap(), "shipshape");
        assert_eq!(env.get("SHIPSHAPE_SHA").unwrap(), &metadata.git.sha);
        assert_eq!(env.get("SHIPSHAPE_COMMIT_MESSAGE").unwrap(), "fix: patch");
        assert_eq!(env.get("SHIPSHAPE_WORKTREE_CLEAN").unwrap(), "true");
        assert!(!env.contains_key("SHIPSHAPE_VERSION"));
    }

    #[test]
    fn test_env_is_deterministic() {
        let repo = make_git_repo("chore: noop");
        let metadata = Metadata::capture(repo.path(), None).unwrap();
        assert_eq!(metadata.env(), metadata.env());
    }

    #[test]
    fn test_is_git_repo() {
        let repo = make_git_repo("chore: noop");
        assert!(is_git_repo(repo.path()));

        let dir = tempfile::tempdir().unwrap();
        assert!(!is_git_repo(dir.path()));
    }
}
