//! Pipeline resolution.
//!
//! [`BuiltPipeline::build`] turns the declared stage order and the name
//! maps into an executable pipeline. Resolution is eager and total: every
//! stage reference and every task reference must resolve, and the first
//! dangling name fails the build before anything runs. The metadata
//! environment is bound into each task here, so execution needs no access
//! to configuration or metadata.

use std::collections::BTreeMap;

use serde::Serialize;

use shipshape_core::{Metadata, Pipeline, RefKind, Result, ShipshapeError, Stage, Task};

/// A task with its command and fully merged environment, ready to run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuiltTask {
    pub name: String,
    pub command: String,
    /// Metadata binding merged with the task's declared environment; the
    /// task's own entries win on key collisions.
    pub env: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

/// A resolved stage: its name and its tasks in declared order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuiltStage {
    pub name: String,
    pub tasks: Vec<BuiltTask>,
}

/// The resolved, metadata-bound, executable form of a [`Pipeline`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuiltPipeline {
    pub stages: Vec<BuiltStage>,
}

impl BuiltPipeline {
    /// Resolve `pipeline` against the stage and task maps.
    ///
    /// Pure: nothing executes during the build. A stage name missing from
    /// `stages` or a task name missing from `tasks` fails with
    /// [`ShipshapeError::UnresolvedReference`] naming the dangling
    /// reference.
    pub fn build(
        pipeline: &Pipeline,
        metadata: &Metadata,
        stages: &BTreeMap<String, Stage>,
        tasks: &BTreeMap<String, Task>,
    ) -> Result<Self> {
        let binding = metadata.env();
        let mut built_stages = Vec::with_capacity(pipeline.stages.len());

        for stage_name in &pipeline.stages {
            let stage =
                stages
                    .get(stage_name)
                    .ok_or_else(|| ShipshapeError::UnresolvedReference {
                        kind: RefKind::Stage,
                        name: stage_name.clone(),
                    })?;

            let mut built_tasks = Vec::with_capacity(stage.tasks.len());
            for task_name in &stage.tasks {
                let task =
                    tasks
                        .get(task_name)
                        .ok_or_else(|| ShipshapeError::UnresolvedReference {
                            kind: RefKind::Task,
                            name: task_name.clone(),
                        })?;

                let mut env = binding.clone();
                env.extend(task.env.clone());

                built_tasks.push(BuiltTask {
                    name: task_name.clone(),
                    command: task.command.clone(),
                    env,
                    timeout_secs: task.timeout_secs,
                });
            }

            built_stages.push(BuiltStage {
                name: stage_name.clone(),
                tasks: built_tasks,
            });
        }

        Ok(Self {
            stages: built_stages,
        })
    }

    /// Total number of resolved tasks across all stages.
    pub fn task_count(&self) -> usize {
        self.stages.iter().map(|s| s.tasks.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipshape_core::GitFacts;

    fn test_metadata() -> Metadata {
        Metadata {
            repository: Some("shipshape".to_string()),
            version: None,
            git: GitFacts {
                branch: "main".to_string(),
                sha: "a".repeat(40),
                message: "feat: add builder".to_string(),
                clean: true,
            },
            captured_at: chrono::Utc::now(),
        }
    }

    fn task(command: &str) -> Task {
        Task {
            command: command.to_string(),
            env: BTreeMap::new(),
            timeout_secs: 0,
        }
    }

    fn stage(task_names: &[&str]) -> Stage {
        Stage {
            tasks: task_names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn test_build_resolves_in_declared_order() {
        let pipeline = Pipeline {
            stages: vec!["test".to_string(), "lint".to_string()],
        };
        let stages = BTreeMap::from([
            ("lint".to_string(), stage(&["fmt-check"])),
            ("test".to_string(), stage(&["unit", "integration"])),
        ]);
        let tasks = BTreeMap::from([
            ("fmt-check".to_string(), task("cargo fmt --check")),
            ("unit".to_string(), task("cargo test --lib")),
            ("integration".to_string(), task("cargo test --tests")),
        ]);

        let built = BuiltPipeline::build(&pipeline, &test_metadata(), &stages, &tasks)
            .expect("build failed");

        // Declared pipeline order wins over map order.
        let names: Vec<&str> = built.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["test", "lint"]);
        let test_tasks: Vec<&str> = built.stages[0]
            .tasks
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(test_tasks, vec!["unit", "integration"]);
        assert_eq!(built.task_count(), 3);
    }

    #[test]
    fn test_build_binds_metadata_env() {
        let pipeline = Pipeline {
            stages: vec!["lint".to_string()],
        };
        let stages = BTreeMap::from([("lint".to_string(), stage(&["fmt-check"]))]);
        let tasks = BTreeMap::from([("fmt-check".to_string(), task("cargo fmt --check"))]);

        let metadata = test_metadata();
        let built = BuiltPipeline::build(&pipeline, &metadata, &stages, &tasks).unwrap();

        let env = &built.stages[0].tasks[0].env;
        assert_eq!(env.get("SHIPSHAPE_REPOSITORY").unwrap(), "shipshape");
        assert_eq!(env.get("SHIPSHAPE_SHA").unwrap(), &metadata.git.sha);
    }

    #[test]
    fn test_task_env_wins_over_binding() {
        let pipeline = Pipeline {
            stages: vec!["lint".to_string()],
        };
        let stages = BTreeMap::from([("lint".to_string(), stage(&["fmt-check"]))]);
        let mut overriding = task("cargo fmt --check");
        overriding.env = BTreeMap::from([
            ("SHIPSHAPE_BRANCH".to_string(), "overridden".to_string()),
            ("EXTRA".to_string(), "1".to_string()),
        ]);
        let tasks = BTreeMap::from([("fmt-check".to_string(), overriding)]);

        let built = BuiltPipeline::build(&pipeline, &test_metadata(), &stages, &tasks).unwrap();
        let env = &built.stages[0].tasks[0].env;
        assert_eq!(env.get("SHIPSHAPE_BRANCH").unwrap(), "overridden");
        assert_eq!(env.get("EXTRA").unwrap(), "1");
    }

    #[test]
    fn test_build_fails_on_missing_stage() {
        let pipeline = Pipeline {
            stages: vec!["deploy".to_string()],
        };
        let err = BuiltPipeline::build(
            &pipeline,
            &test_metadata(),
            &BTreeMap::new(),
            &BTreeMap::new(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ShipshapeError::UnresolvedReference {
                kind: RefKind::Stage,
                ref name,
            } if name == "deploy"
        ));
    }

    #[test]
    fn test_build_fails_on_missing_task() {
        let pipeline = Pipeline {
            stages: vec!["lint".to_string()],
        };
        let stages = BTreeMap::from([("lint".to_string(), stage(&["fmt-check", "lint"]))]);
        let tasks = BTreeMap::from([("fmt-check".to_string(), task("cargo fmt --check"))]);

        let err = BuiltPipeline::build(&pipeline, &test_metadata(), &stages, &tasks).unwrap_err();
        assert!(matches!(
            err,
            ShipshapeError::UnresolvedReference {
                kind: RefKind::Task,
                ref name,
            } if name == "lint"
        ));
    }

    #[test]
    fn test_same_task_may_appear_in_two_stages() {
        let pipeline = Pipeline {
            stages: vec!["first".to_string(), "second".to_string()],
        };
        let stages = BTreeMap::from([
            ("first".to_string(), stage(&["shared"])),
            ("second".to_string(), stage(&["shared"])),
        ]);
        let tasks = BTreeMap::from([("shared".to_string(), task("true"))]);

        let built = BuiltPipeline::build(&pipeline, &test_metadata(), &stages, &tasks).unwrap();
        assert_eq!(built.task_count(), 2);
    }
}
