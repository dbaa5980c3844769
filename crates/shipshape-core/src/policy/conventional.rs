//! Conventional-commit policy.
//!
//! Checks the HEAD commit message header against the
//! `<type>(<scope>)?: <description>` grammar. `feat` and `fix` are always
//! allowed; the spec adds extra types and, optionally, the set of scopes a
//! commit may use. All violations of one message are collected in header
//! order before the report is returned.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::policy::{ComplianceReport, Policy, PolicyContext};

/// Types every conventional commit may use regardless of configuration.
const BASE_TYPES: [&str; 2] = ["feat", "fix"];

fn header_pattern() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^()]*)\))?!?: (?P<description>.*)$")
            .expect("header pattern is valid")
    })
}

/// Policy spec for `conventionalCommit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConventionalCommit {
    /// Extra commit types allowed besides `feat` and `fix`.
    pub types: Vec<String>,

    /// Declared scopes. Empty means any scope is allowed.
    pub scopes: Vec<String>,
}

impl ConventionalCommit {
    fn type_allowed(&self, commit_type: &str) -> bool {
        BASE_TYPES.contains(&commit_type) || self.types.iter().any(|t| t == commit_type)
    }

    fn allowed_types(&self) -> Vec<&str> {
        BASE_TYPES
            .iter()
            .copied()
            .chain(self.types.iter().map(String::as_str))
            .collect()
    }
}

impl Policy for ConventionalCommit {
    fn compliance(&self, ctx: &PolicyContext<'_>) -> ComplianceReport {
        let mut report = ComplianceReport::default();
        let message = ctx.metadata.git.message.as_str();

        if message.trim().is_empty() {
            report.add("commit message is empty");
            return report;
        }

        // Only the header line is subject to the grammar; trailing
        // whitespace on it is significant (an empty description).
        let header = message.trim_start().lines().next().unwrap_or_default();
        let Some(caps) = header_pattern().captures(header) else {
            report.add(format!(
                "commit header {header:?} does not match <type>(<scope>)?: <description>"
            ));
            return report;
        };

        let commit_type = &caps["type"];
        if !self.type_allowed(commit_type) {
            report.add(format!(
                "commit type {commit_type:?} is not allowed (allowed: {})",
                self.allowed_types().join(", ")
            ));
        }

        if let Some(scope) = caps.name("scope") {
            let scope = scope.as_str();
            if !self.scopes.is_empty() && !self.scopes.iter().any(|s| s == scope) {
                report.add(format!(
                    "commit scope {scope:?} is not declared (declared: {})",
                    self.scopes.join(", ")
                ));
            }
        }

        if caps["description"].trim().is_empty() {
            report.add("commit description is empty");
        }

        report
    }
}
