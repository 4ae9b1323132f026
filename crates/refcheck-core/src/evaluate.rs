//! Compliance evaluation: resolve, classify, and roll up into a report.
//!
//! [`Evaluator::evaluate`] is a pure function of its inputs. The only fatal
//! condition is an unsupported guideline schema, which is rejected before
//! anything is resolved or classified.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::classifier::{classify, CapabilityResult};
use crate::domain::{
    CapabilityDetail, CapabilityTests, ComplianceError, GuidelineDocument, Result, ResultSet, SchemaVersion, Status, Target,
};
use crate::obs::{self, EvaluationSpan};
use crate::resolver::resolve_target;

/// What to do when a component lists a capability the document never defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCapabilityPolicy {
    /// Report the capability with no tests and keep going.
    #[default]
    Lenient,
    /// Fail the evaluation with [`ComplianceError::MissingCapability`].
    Strict,
}

/// Evaluation options. Passed explicitly; there is no ambient configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    pub missing_capability: MissingCapabilityPolicy,
}

impl EvaluatorConfig {
    pub fn strict() -> Self {
        Self {
            missing_capability: MissingCapabilityPolicy::Strict,
        }
    }
}

/// Capabilities of one status and their test counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBucket {
    pub capabilities: Vec<CapabilityResult>,
    /// Tests declared by the capabilities in this bucket.
    pub count: usize,
    pub passed_count: usize,
    /// Flagged tests that did not pass.
    pub flag_fail_count: usize,
    /// Flagged tests that passed.
    pub flag_pass_count: usize,
}

impl StatusBucket {
    fn push(&mut self, cap: CapabilityResult) {
        self.count += cap.total_tests();
        self.passed_count += cap.passed_tests.len();
        self.flag_pass_count += cap.passed_flagged.len();
        self.flag_fail_count += cap.not_passed_flagged.len();
        self.capabilities.push(cap);
    }

    /// Tests that are neither passed nor flagged.
    pub fn non_flag_fail_count(&self) -> usize {
        self.count - self.passed_count - self.flag_fail_count
    }
}

/// Output of an evaluation.
///
/// # Invariants
///
/// Percentages are `None` when their denominator is zero (no applicable
/// tests). Consumers must render that as "no data", never as 0%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub schema: String,
    pub target: Target,
    pub required: StatusBucket,
    pub advisory: StatusBucket,
    pub deprecated: StatusBucket,
    pub removed: StatusBucket,
    pub required_pass_percent: Option<f64>,
    pub non_flag_required_pass_percent: Option<f64>,
    /// Passed tests that no capability of the target declares, sorted.
    #[serde(default)]
    pub other_tests: Vec<String>,
}

impl ComplianceReport {
    fn empty(schema: SchemaVersion, target: &Target) -> Self {
        Self {
            schema: schema.to_string(),
            target: target.clone(),
            required: StatusBucket::default(),
            advisory: StatusBucket::default(),
            deprecated: StatusBucket::default(),
            removed: StatusBucket::default(),
            required_pass_percent: None,
            non_flag_required_pass_percent: None,
            other_tests: Vec::new(),
        }
    }

    pub fn bucket(&self, status: Status) -> &StatusBucket {
        match status {
            Status::Required => &self.required,
            Status::Advisory => &self.advisory,
            Status::Deprecated => &self.deprecated,
            Status::Removed => &self.removed,
        }
    }

    fn bucket_mut(&mut self, status: Status) -> &mut StatusBucket {
        match status {
            Status::Required => &mut self.required,
            Status::Advisory => &mut self.advisory,
            Status::Deprecated => &mut self.deprecated,
            Status::Removed => &mut self.removed,
        }
    }

    /// Number of capabilities across all buckets.
    pub fn capability_count(&self) -> usize {
        Status::ALL
            .iter()
            .map(|s| self.bucket(*s).capabilities.len())
            .sum()
    }

    fn compute_percentages(&mut self) {
        let required = &self.required;
        self.required_pass_percent = percent(required.passed_count, required.count);

        // Flagged tests leave both numerator and denominator.
        let total_flag = required.flag_fail_count + required.flag_pass_count;
        let total_non_flag = required.count - total_flag;
        let non_flag_pass = total_non_flag - required.non_flag_fail_count();
        self.non_flag_required_pass_percent = percent(non_flag_pass, total_non_flag);
    }
}

fn percent(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 * 100.0 / whole as f64)
}

/// Runs evaluations with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Evaluate `results` against `doc` for `target`.
    pub fn evaluate(
        &self,
        doc: &GuidelineDocument,
        results: &ResultSet,
        target: &Target,
    ) -> Result<ComplianceReport> {
        let _span = EvaluationSpan::enter(target.as_str(), &doc.schema);

        let schema = match doc.schema_version() {
            Ok(schema) => schema,
            Err(err) => {
                obs::emit_schema_rejected(&doc.schema);
                return Err(err);
            }
        };

        let resolved = resolve_target(doc, target);
        obs::emit_evaluation_started(target.as_str(), schema.as_str(), resolved.len());

        let passed = results.passed_set();
        let mut report = ComplianceReport::empty(schema, target);
        let mut declared = HashSet::new();

        for (cap_id, status) in &resolved {
            let detail = doc.capabilities.get(cap_id);
            if let Some(detail) = detail {
                declare_tests(detail, &mut declared);
            }
            if detail.is_none() {
                obs::emit_capability_missing(cap_id, status.as_str());
                if self.config.missing_capability == MissingCapabilityPolicy::Strict {
                    return Err(ComplianceError::MissingCapability {
                        capability: cap_id.clone(),
                    });
                }
            }
            let cap = classify(cap_id, detail, &passed, schema);
            report.bucket_mut(*status).push(cap);
        }

        report.compute_percentages();
        report.other_tests = passed
            .iter()
            .filter(|t| !declared.contains(*t))
            .map(|t| t.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        obs::emit_evaluation_finished(
            target.as_str(),
            report.capability_count(),
            report.required_pass_percent,
        );
        Ok(report)
    }
}

/// Collect every test ID and alias a capability declares.
fn declare_tests<'a>(detail: &'a CapabilityDetail, declared: &mut HashSet<&'a str>) {
    declared.extend(detail.tests.ids());
    if let CapabilityTests::Detailed(tests) = &detail.tests {
        for info in tests.values() {
            declared.extend(info.aliases.iter().map(String::as_str));
        }
    }
}

/// Evaluate with the default (lenient) configuration.
pub fn evaluate(
    doc: &GuidelineDocument,
    results: &ResultSet,
    target: &Target,
) -> Result<ComplianceReport> {
    Evaluator::default().evaluate(doc, results, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with_missing_cap() -> GuidelineDocument {
        GuidelineDocument::from_value(json!({
            "schema": "1.4",
            "platform": {"required": ["compute"]},
            "components": {"compute": {"required": ["cap-a", "cap-ghost"]}},
            "capabilities": {
                "cap-a": {"tests": {"t1": {"idempotent_id": "id-1"}}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn lenient_reports_missing_capability_with_no_tests() {
        let report = evaluate(
            &doc_with_missing_cap(),
            &ResultSet::from_tests(["t1"]),
            &Target::Platform,
        )
        .unwrap();

        assert_eq!(report.required.capabilities.len(), 2);
        let ghost = report
            .required
            .capabilities
            .iter()
            .find(|c| c.id == "cap-ghost")
            .expect("ghost capability present");
        assert_eq!(ghost.total_tests(), 0);
        assert_eq!(report.required.count, 1);
        assert_eq!(report.required_pass_percent, Some(100.0));
    }

    #[test]
    fn strict_rejects_missing_capability() {
        let err = Evaluator::new(EvaluatorConfig::strict())
            .evaluate(
                &doc_with_missing_cap(),
                &ResultSet::from_tests(["t1"]),
                &Target::Platform,
            )
            .unwrap_err();
        assert!(
            matches!(err, ComplianceError::MissingCapability { capability } if capability == "cap-ghost")
        );
    }

    #[test]
    fn non_flag_percent_excludes_flagged_tests() {
        let doc = GuidelineDocument::from_value(json!({
            "schema": "1.2",
            "platform": {"required": ["compute"]},
            "components": {"compute": {"required": ["cap"]}},
            "capabilities": {
                "cap": {"tests": ["t1", "t2", "t3", "t4"], "flagged": ["t3", "t4"]}
            }
        }))
        .unwrap();
        // t1 passes, t2 fails, flagged t3 passes, flagged t4 fails.
        let report = evaluate(&doc, &ResultSet::from_tests(["t1", "t3"]), &Target::Platform)
            .unwrap();

        assert_eq!(report.required.count, 4);
        assert_eq!(report.required.passed_count, 2);
        assert_eq!(report.required.flag_pass_count, 1);
        assert_eq!(report.required.flag_fail_count, 1);
        assert_eq!(report.required.non_flag_fail_count(), 1);
        assert_eq!(report.required_pass_percent, Some(50.0));
        assert_eq!(report.non_flag_required_pass_percent, Some(50.0));
    }

    #[test]
    fn all_flagged_leaves_non_flag_percent_undefined() {
        let doc = GuidelineDocument::from_value(json!({
            "schema": "1.2",
            "platform": {"required": ["compute"]},
            "components": {"compute": {"required": ["cap"]}},
            "capabilities": {"cap": {"tests": ["t1"], "flagged": ["t1"]}}
        }))
        .unwrap();
        let report = evaluate(&doc, &ResultSet::default(), &Target::Platform).unwrap();
        assert_eq!(report.required_pass_percent, Some(0.0));
        assert_eq!(report.non_flag_required_pass_percent, None);
    }

    #[test]
    fn undeclared_passes_are_reported_as_other_tests() {
        let doc = GuidelineDocument::from_value(json!({
            "schema": "1.5",
            "platform": {"required": ["compute"]},
            "components": {"compute": {"required": ["cap"]}},
            "capabilities": {
                "cap": {"tests": {"t1": {"idempotent_id": "id-1", "aliases": ["t1-old"]}}},
                "unlisted": {"tests": {"t9": {"idempotent_id": "id-9"}}},
            }
        }))
        .unwrap();
        let report = evaluate(
            &doc,
            &ResultSet::from_tests(["zz-extra", "t1-old", "t9", "a-extra", "zz-extra"]),
            &Target::Platform,
        )
        .unwrap();

        // `unlisted` is not part of the target, so t9 is "other" too.
        assert_eq!(report.other_tests, vec!["a-extra", "t9", "zz-extra"]);
        assert_eq!(report.required.passed_count, 1);
    }

    #[test]
    fn report_serializes_camel_case_with_null_percent() {
        let doc = GuidelineDocument::from_value(json!({"schema": "1.3"})).unwrap();
        let report = evaluate(&doc, &ResultSet::default(), &Target::Platform).unwrap();
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["target"], json!("platform"));
        assert_eq!(v["required"]["passedCount"], json!(0));
        assert!(v["required"].get("flagFailCount").is_some());
        assert!(v["requiredPassPercent"].is_null());
        assert!(v["nonFlagRequiredPassPercent"].is_null());
        assert_eq!(v["otherTests"], json!([]));
    }
}
