//! Explain output for rewrite decisions.
//!
//! Produces deterministic, human-readable routing output: one step per
//! pipeline call, innermost first, telling whether the call was bound to
//! an index or kept as a scan and why.

use std::fmt;

use super::errors::RewriteError;
use super::rewriter::{Decision, Outcome};

/// One explain step.
#[derive(Debug, Clone)]
pub struct ExplainStep {
    /// Operation name
    pub op: String,
    /// `INDEX` or `SCAN`
    pub route: &'static str,
    /// Bound index slot and field, or the scan reason
    pub detail: String,
}

/// Explain output for one compiled query.
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether compilation succeeded
    pub accepted: bool,
    /// Routing steps, innermost call first
    pub steps: Vec<ExplainStep>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
}

impl ExplainPlan {
    /// Builds explain output from recorded routing decisions.
    pub fn from_decisions(decisions: &[Decision]) -> Self {
        let steps = decisions
            .iter()
            .map(|decision| match &decision.outcome {
                Outcome::IndexBound { slot, path } => ExplainStep {
                    op: decision.op.to_string(),
                    route: "INDEX",
                    detail: format!("slot {} on '{}'", slot, path),
                },
                Outcome::Scan { reason } => ExplainStep {
                    op: decision.op.to_string(),
                    route: "SCAN",
                    detail: reason.as_str().to_string(),
                },
            })
            .collect();
        Self {
            accepted: true,
            steps,
            rejection_reason: None,
        }
    }

    /// Builds explain output from a fatal compilation error.
    pub fn from_error(err: &RewriteError) -> Self {
        Self {
            accepted: false,
            steps: Vec::new(),
            rejection_reason: Some(err.to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== REWRITE PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            for step in &self.steps {
                writeln!(f, "  {} -> {} ({})", step.op, step.route, step.detail)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
