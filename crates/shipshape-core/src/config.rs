//! Configuration document model and loading.
//!
//! The `shipshape.yaml` document declares everything the gate needs: project
//! metadata, the policy set, the pipeline stage order, the stage and task
//! maps, and the build script. Every top-level key is optional; an absent
//! key means "nothing declared", never an error.
//!
//! [`Config::load`] couples the decoded document with the SHA-256 digest of
//! its raw bytes so logs can pin exactly which document gated a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, ShipshapeError};

/// Declared project facts, merged into [`crate::Metadata`] at capture time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataDecl {
    pub repository: Option<String>,
    pub version: Option<String>,
}

/// One policy declaration: a type name plus its untyped spec value.
///
/// The spec stays untyped here; the registry decodes it into the concrete
/// policy shape during enforcement. An absent spec is `Null` and decodes to
/// the policy's prototype defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PolicyDeclaration {
    /// Registered policy-type name, e.g. `conventionalCommit`.
    #[serde(rename = "type")]
    pub policy_type: String,

    /// Policy-specific configuration, decoded by the registry.
    #[serde(default)]
    pub spec: serde_yaml::Value,
}

/// Declared stage order of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Pipeline {
    /// Stage names, resolved against [`Config::stages`] in this order.
    pub stages: Vec<String>,
}

/// A named group of task references.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Stage {
    /// Task names, resolved against [`Config::tasks`] in this order.
    pub tasks: Vec<String>,
}

/// A runnable unit of work, looked up by name from a stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Shell command, run via `sh -c`.
    pub command: String,

    /// Extra environment for this task, merged over the metadata binding.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Timeout in seconds (0 = unlimited).
    #[serde(default)]
    pub timeout_secs: u64,
}

/// The ordered build script, executed exactly once after the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Script {
    pub steps: Vec<Step>,
}

/// One script step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Optional display name; step reporting falls back to the index.
    #[serde(default)]
    pub name: Option<String>,

    /// Shell command, run via `sh -c`.
    pub run: String,

    /// Timeout in seconds (0 = unlimited).
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Step {
    /// Display name for logs and errors: the declared name, or `step-<i>`.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("step-{index}"),
        }
    }
}

/// The full configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub metadata: Option<MetadataDecl>,
    pub policies: Vec<PolicyDeclaration>,
    pub pipeline: Option<Pipeline>,
    pub stages: BTreeMap<String, Stage>,
    pub tasks: BTreeMap<String, Task>,
    pub script: Option<Script>,
}

/// A decoded document plus the digest of its raw bytes and its source path.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// SHA-256 hex digest of the raw document.
    pub digest: String,
    pub path: PathBuf,
}

impl Config {
    /// Load and decode the configuration document at `path`.
    pub fn load(path: &Path) -> Result<LoadedConfig> {
        let raw = std::fs::read(path).map_err(|e| ShipshapeError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Config =
            serde_yaml::from_slice(&raw).map_err(|e| ShipshapeError::ConfigLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let digest = hex::encode(Sha256::digest(&raw));

        Ok(LoadedConfig {
            config,
            digest,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOC: &str = r#"
metadata:
  repository: shipshape
  version: 0.2.0
policies:
  - type: conventionalCommit
    spec:
      types: [chore, docs]
  - type: cleanWorktree
pipeline:
  stages: [lint, test]
stages:
  lint:
    tasks: [fmt-check]
  test:
    tasks: [unit]
tasks:
  fmt-check:
    command: cargo fmt --all -- --check
  unit:
    command: cargo test --workspace
    timeout_secs: 600
script:
  steps:
    - name: announce
      run: echo done
"#;

    fn write_doc(doc: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shipshape.yaml");
        std::fs::write(&path, doc).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_full_document() {
        let (_dir, path) = write_doc(FULL_DOC);
        let loaded = Config::load(&path).expect("load failed");
        let config = loaded.config;

        let decl = config.metadata.unwrap();
        assert_eq!(decl.repository.as_deref(), Some("shipshape"));
        assert_eq!(config.policies.len(), 2);
        assert_eq!(config.policies[0].policy_type, "conventionalCommit");
        assert!(config.policies[0].spec.is_mapping());
        assert!(config.policies[1].spec.is_null());
        assert_eq!(
            config.pipeline.unwrap().stages,
            vec!["lint".to_string(), "test".to_string()]
        );
        assert_eq!(config.stages["lint"].tasks, vec!["fmt-check".to_string()]);
        assert_eq!(config.tasks["unit"].timeout_secs, 600);
        assert_eq!(config.script.unwrap().steps.len(), 1);
    }

    #[test]
    fn test_load_minimal_document() {
        let (_dir, path) = write_doc("policies: []\n");
        let loaded = Config::load(&path).expect("load failed");
        assert!(loaded.config.policies.is_empty());
        assert!(loaded.config.pipeline.is_none());
        assert!(loaded.config.script.is_none());
    }

    #[test]
    fn test_digest_is_stable_for_same_bytes() {
        let (_dir, path) = write_doc(FULL_DOC);
        let first = Config::load(&path).unwrap();
        let second = Config::load(&path).unwrap();
        assert_eq!(first.digest, second.digest);
        assert_eq!(first.digest.len(), 64);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(ShipshapeError::ConfigLoad { .. })));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let (_dir, path) = write_doc("policies: [:::\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ShipshapeError::ConfigLoad { .. })));
    }

    #[test]
    fn test_load_rejects_unknown_top_level_key() {
        let (_dir, path) = write_doc("polices: []\n");
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("polices"));
    }

    #[test]
    fn test_step_display_name_falls_back_to_index() {
        let step = Step {
            name: None,
            run: "true".to_string(),
            timeout_secs: 0,
        };
        assert_eq!(step.display_name(3), "step-3");

        let named = Step {
            name: Some("announce".to_string()),
            run: "true".to_string(),
            timeout_secs: 0,
        };
        assert_eq!(named.display_name(0), "announce");
    }
}
