//! Structured observability hooks for evaluation lifecycle events.
//!
//! This module provides:
//! - An evaluation-scoped tracing span via the `EvaluationSpan` RAII guard
//! - Emission functions for evaluation start/finish, schema rejection,
//!   data-integrity warnings, gate verdicts and run comparisons
//!
//! Events carry an `event` field so they can be filtered in JSON log output
//! (`refcheck --json`).

use tracing::{info, warn};

/// RAII guard that enters an evaluation-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = EvaluationSpan::enter("platform", "1.5");
/// // tracing calls below carry program = "platform", schema = "1.5"
/// ```
pub struct EvaluationSpan {
    _span: tracing::span::EnteredSpan,
}

impl EvaluationSpan {
    pub fn enter(target: &str, schema: &str) -> Self {
        let span = tracing::info_span!("refcheck.evaluate", program = %target, schema = %schema);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: evaluation started with the number of resolved capabilities.
pub fn emit_evaluation_started(target: &str, schema: &str, capabilities: usize) {
    info!(
        event = "evaluation.started",
        program = %target,
        schema = %schema,
        capabilities = capabilities,
    );
}

/// Emit event: evaluation finished. `required_pass_percent` is absent when
/// no required tests apply.
pub fn emit_evaluation_finished(
    target: &str,
    capabilities: usize,
    required_pass_percent: Option<f64>,
) {
    info!(
        event = "evaluation.finished",
        program = %target,
        capabilities = capabilities,
        required_pass_percent = ?required_pass_percent,
    );
}

/// Emit event: guideline rejected because of its schema revision.
pub fn emit_schema_rejected(schema: &str) {
    warn!(event = "evaluation.schema_rejected", schema = %schema);
}

/// Emit event: a component lists a capability the guideline does not define.
pub fn emit_capability_missing(capability: &str, status: &str) {
    warn!(
        event = "guideline.capability_missing",
        capability = %capability,
        status = %status,
    );
}

/// Emit event: a target resolved to nothing.
pub fn emit_target_empty(target: &str, reason: &str) {
    warn!(event = "resolve.target_empty", program = %target, reason = %reason);
}

/// Emit event: compliance gate evaluated.
pub fn emit_gate_evaluated(target: &str, violations: usize, passed: bool) {
    info!(
        event = "gate.evaluated",
        program = %target,
        violations = violations,
        passed = passed,
    );
}

/// Emit event: two reports compared.
pub fn emit_diff_computed(target: &str, fixed: usize, broken: usize) {
    info!(
        event = "diff.computed",
        program = %target,
        fixed = fixed,
        broken = broken,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_span_create() {
        let _span = EvaluationSpan::enter("platform", "1.4");
        emit_evaluation_started("platform", "1.4", 0);
        emit_evaluation_finished("platform", 0, None);
    }
}
