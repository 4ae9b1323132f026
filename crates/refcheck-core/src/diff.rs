//! Comparison of two evaluations of the same guideline and target.
//!
//! [`compare`] pairs capabilities by ID and reports which tests started
//! passing ("fixed") and which stopped ("broken") between a previous run and
//! the current one. [`ReportDiff::with_runs`] adds the run metadata the
//! reports themselves do not carry.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::classifier::CapabilityResult;
use crate::domain::{ResultSet, Status};
use crate::evaluate::ComplianceReport;
use crate::obs;

/// Changes within one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDiff {
    pub id: String,
    /// Status in the current report.
    pub status: Status,
    /// Passed now, did not pass before.
    pub fixed_tests: Vec<String>,
    /// Passed before, does not pass now.
    pub broken_tests: Vec<String>,
}

/// Differences between two compliance reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDiff {
    /// Capabilities with at least one fixed or broken test, in report order.
    pub capabilities: Vec<CapabilityDiff>,
    /// Every fixed test across capabilities, sorted and deduplicated.
    pub fixed_tests: Vec<String>,
    /// Every broken test across capabilities, sorted and deduplicated.
    pub broken_tests: Vec<String>,
    /// Change in `requiredPassPercent`; `None` unless both are defined.
    pub required_pass_percent_delta: Option<f64>,
    /// Whether both runs came from the same cloud; `None` if either `cpid`
    /// is unknown.
    #[serde(default)]
    pub same_cloud: Option<bool>,
    /// Current duration minus previous duration, in seconds.
    #[serde(default)]
    pub duration_delta_seconds: Option<f64>,
}

impl ReportDiff {
    /// Fill in the cloud and duration comparison from the two runs.
    pub fn with_runs(mut self, current: &ResultSet, previous: &ResultSet) -> Self {
        self.same_cloud = match (&current.cpid, &previous.cpid) {
            (Some(a), Some(b)) => Some(a == b),
            _ => None,
        };
        self.duration_delta_seconds = match (current.duration_seconds, previous.duration_seconds) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        self
    }

    /// No test changed outcome.
    pub fn is_empty(&self) -> bool {
        self.fixed_tests.is_empty() && self.broken_tests.is_empty()
    }
}

fn previous_outcomes(report: &ComplianceReport) -> BTreeMap<&str, &CapabilityResult> {
    Status::ALL
        .iter()
        .flat_map(|s| report.bucket(*s).capabilities.iter())
        .map(|cap| (cap.id.as_str(), cap))
        .collect()
}

/// Compare `current` against `previous`.
///
/// Tests a capability only declares in one of the two reports are neither
/// fixed nor broken.
pub fn compare(current: &ComplianceReport, previous: &ComplianceReport) -> ReportDiff {
    let before = previous_outcomes(previous);
    let mut capabilities = Vec::new();
    let mut fixed = BTreeSet::new();
    let mut broken = BTreeSet::new();

    for status in Status::ALL {
        for cap in &current.bucket(status).capabilities {
            let Some(prev) = before.get(cap.id.as_str()) else {
                continue;
            };
            let prev_passed: HashSet<&str> = prev.passed_tests.iter().map(String::as_str).collect();
            let prev_failed: HashSet<&str> =
                prev.not_passed_tests.iter().map(String::as_str).collect();

            let fixed_tests: Vec<String> = cap
                .passed_tests
                .iter()
                .filter(|t| prev_failed.contains(t.as_str()))
                .cloned()
                .collect();
            let broken_tests: Vec<String> = cap
                .not_passed_tests
                .iter()
                .filter(|t| prev_passed.contains(t.as_str()))
                .cloned()
                .collect();

            if fixed_tests.is_empty() && broken_tests.is_empty() {
                continue;
            }
            fixed.extend(fixed_tests.iter().cloned());
            broken.extend(broken_tests.iter().cloned());
            capabilities.push(CapabilityDiff {
                id: cap.id.clone(),
                status,
                fixed_tests,
                broken_tests,
            });
        }
    }

    let required_pass_percent_delta = match (
        current.required_pass_percent,
        previous.required_pass_percent,
    ) {
        (Some(a), Some(b)) => Some(a - b),
        _ => None,
    };

    obs::emit_diff_computed(current.target.as_str(), fixed.len(), broken.len());

    ReportDiff {
        capabilities,
        fixed_tests: fixed.into_iter().collect(),
        broken_tests: broken.into_iter().collect(),
        required_pass_percent_delta,
        same_cloud: None,
        duration_delta_seconds: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GuidelineDocument, Target};
    use crate::evaluate::evaluate;
    use serde_json::json;

    fn doc() -> GuidelineDocument {
        GuidelineDocument::from_value(json!({
            "schema": "1.2",
            "platform": {"required": ["compute"]},
            "components": {"compute": {
                "required": ["cap-a", "cap-b"],
                "advisory": ["cap-c"],
            }},
            "capabilities": {
                "cap-a": {"tests": ["t1", "t2"]},
                "cap-b": {"tests": ["t2", "t3"]},
                "cap-c": {"tests": ["t4"]},
            }
        }))
        .unwrap()
    }

    fn report(passed: &[&str]) -> ComplianceReport {
        evaluate(&doc(), &ResultSet::from_tests(passed.iter().copied()), &Target::Platform)
            .unwrap()
    }

    #[test]
    fn fixed_and_broken_tests_per_capability() {
        let previous = report(&["t1", "t4"]);
        let current = report(&["t2", "t3"]);

        let diff = compare(&current, &previous);

        assert_eq!(diff.fixed_tests, vec!["t2", "t3"]);
        assert_eq!(diff.broken_tests, vec!["t1", "t4"]);
        let ids: Vec<&str> = diff.capabilities.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["cap-a", "cap-b", "cap-c"]);
        assert_eq!(diff.capabilities[0].fixed_tests, vec!["t2"]);
        assert_eq!(diff.capabilities[0].broken_tests, vec!["t1"]);
        assert_eq!(diff.capabilities[2].status, Status::Advisory);
        assert_eq!(diff.required_pass_percent_delta, Some(75.0 - 25.0));
    }

    #[test]
    fn shared_test_listed_once_overall() {
        let diff = compare(&report(&["t2"]), &report(&[]));
        assert_eq!(diff.fixed_tests, vec!["t2"]);
        assert_eq!(diff.capabilities.len(), 2);
    }

    #[test]
    fn identical_runs_have_no_changes() {
        let diff = compare(&report(&["t1"]), &report(&["t1"]));
        assert!(diff.is_empty());
        assert!(diff.capabilities.is_empty());
        assert_eq!(diff.required_pass_percent_delta, Some(0.0));
    }

    #[test]
    fn run_metadata_compared_when_known() {
        let current: ResultSet = serde_json::from_value(json!({
            "cpid": "cloud-1", "duration_seconds": 700.0, "results": [],
        }))
        .unwrap();
        let previous: ResultSet = serde_json::from_value(json!({
            "cpid": "cloud-1", "duration_seconds": 640.0, "results": [],
        }))
        .unwrap();
        let diff = compare(&report(&[]), &report(&[])).with_runs(&current, &previous);
        assert_eq!(diff.same_cloud, Some(true));
        assert_eq!(diff.duration_delta_seconds, Some(60.0));

        let other_cloud = ResultSet {
            cpid: Some("cloud-2".to_string()),
            ..ResultSet::default()
        };
        let diff = compare(&report(&[]), &report(&[])).with_runs(&other_cloud, &previous);
        assert_eq!(diff.same_cloud, Some(false));
        assert_eq!(diff.duration_delta_seconds, None);
    }

    #[test]
    fn capabilities_missing_from_previous_are_skipped() {
        let previous = evaluate(&doc(), &ResultSet::default(), &Target::from("dns")).unwrap();
        let diff = compare(&report(&["t1"]), &previous);
        assert!(diff.is_empty());
        assert_eq!(diff.required_pass_percent_delta, None);
    }
}
