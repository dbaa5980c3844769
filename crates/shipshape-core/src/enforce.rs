//! Policy enforcement loop.
//!
//! Walks the declarations in document order, resolves each against the
//! registry, decodes its spec, and evaluates compliance. The first failure
//! of any kind ends the run: an unknown type, a bad spec, or a
//! non-compliant report. Later declarations are never evaluated.
//!
//! The loop never terminates the process. Errors propagate to the caller;
//! the CLI owns the exit code.

use tracing::{debug, info};

use crate::config::PolicyDeclaration;
use crate::error::{Result, ShipshapeError};
use crate::policy::{PolicyContext, PolicyRegistry};

/// Enforce `declarations` in order against `ctx`.
///
/// Returns `Ok(())` only when every declared policy decodes and reports a
/// valid compliance check.
pub fn enforce_policies(
    registry: &PolicyRegistry,
    declarations: &[PolicyDeclaration],
    ctx: &PolicyContext<'_>,
) -> Result<()> {
    for decl in declarations {
        debug!(policy = %decl.policy_type, "checking policy");

        let policy = registry.decode(&decl.policy_type, &decl.spec)?;
        let report = policy.compliance(ctx);

        if !report.valid() {
            return Err(ShipshapeError::PolicyViolation {
                policy: decl.policy_type.clone(),
                violations: report.errors,
            });
        }

        info!(policy = %decl.policy_type, "policy compliant");
    }

    Ok(())
}
