//! Clean-worktree policy.

use serde::{Deserialize, Serialize};

use crate::policy::{ComplianceReport, Policy, PolicyContext};

/// Policy spec for `cleanWorktree`.
///
/// Takes no configuration; the declaration gates on the work-tree state
/// captured into metadata at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CleanWorktree {}

impl Policy for CleanWorktree {
    fn compliance(&self, ctx: &PolicyContext<'_>) -> ComplianceReport {
        let mut report = ComplianceReport::default();
        if !ctx.metadata.git.clean {
            report.add("work tree has uncommitted or untracked changes");
        }
        report
    }
}
