//! Compliance gate rules engine.
//!
//! Evaluates a [`ComplianceReport`] against a [`GateRuleSet`] to produce a
//! [`GateVerdict`], the pass/fail decision a CI job or submission check can
//! act on. An undefined pass percentage (no applicable tests) always violates
//! a percentage rule and is reported as "no data", never as 0%.

use serde::{Deserialize, Serialize};

use crate::evaluate::ComplianceReport;
use crate::obs;

// ---------------------------------------------------------------------------
// Gate rules
// ---------------------------------------------------------------------------

/// A single rule a report must satisfy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateRule {
    /// `requiredPassPercent` must be at least `percent`.
    MinRequiredPassPercent { percent: f64 },
    /// `nonFlagRequiredPassPercent` must be at least `percent`.
    MinNonFlagRequiredPassPercent { percent: f64 },
    /// Every required, non-flagged test must pass.
    NoRequiredFailures,
}

/// A set of gate rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GateRuleSet {
    pub rules: Vec<GateRule>,
    /// Stop at the first violation.
    #[serde(default)]
    pub fail_fast: bool,
}

impl GateRuleSet {
    /// Full compliance: every required test passes once flagged tests are
    /// set aside.
    pub fn interop_compliant() -> Self {
        Self {
            rules: vec![GateRule::NoRequiredFailures],
            fail_fast: false,
        }
    }

    pub fn with_rule(mut self, rule: GateRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// A single rule violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub rule: GateRule,
    pub reason: String,
}

/// The outcome of checking a report against a rule set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GateVerdict {
    pub violations: Vec<Violation>,
}

impl GateVerdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluate `report` against `rule_set`.
pub fn evaluate_gate(rule_set: &GateRuleSet, report: &ComplianceReport) -> GateVerdict {
    let mut violations = Vec::new();

    for rule in &rule_set.rules {
        if let Some(v) = check_rule(rule, report) {
            violations.push(v);
            if rule_set.fail_fast {
                break;
            }
        }
    }

    let verdict = GateVerdict { violations };
    obs::emit_gate_evaluated(
        report.target.as_str(),
        verdict.violations.len(),
        verdict.passed(),
    );
    verdict
}

fn check_rule(rule: &GateRule, report: &ComplianceReport) -> Option<Violation> {
    let reason = match rule {
        GateRule::MinRequiredPassPercent { percent } => {
            check_percent("required pass rate", report.required_pass_percent, *percent)
        }
        GateRule::MinNonFlagRequiredPassPercent { percent } => check_percent(
            "non-flagged required pass rate",
            report.non_flag_required_pass_percent,
            *percent,
        ),
        GateRule::NoRequiredFailures => {
            let failed: Vec<&str> = report
                .required
                .capabilities
                .iter()
                .flat_map(|cap| {
                    cap.not_passed_tests
                        .iter()
                        .filter(move |t| !cap.not_passed_flagged.contains(*t))
                })
                .map(String::as_str)
                .collect();
            (!failed.is_empty()).then(|| {
                format!(
                    "{} required test(s) did not pass: [{}]",
                    failed.len(),
                    failed.join(", "),
                )
            })
        }
    }?;

    Some(Violation {
        rule: rule.clone(),
        reason,
    })
}

fn check_percent(label: &str, actual: Option<f64>, minimum: f64) -> Option<String> {
    match actual {
        None => Some(format!("{label}: no data (no applicable tests)")),
        Some(value) if value < minimum => Some(format!(
            "{label} {value:.2}% < required {minimum:.2}%"
        )),
        Some(_) => None,
    }
}
