//! Per-capability pass/fail/flag classification.
//!
//! The guideline schema revision decides how tests are represented, so
//! [`classify`] matches on [`TestVariant`] and hands off to one of two pure
//! functions. Unsupported revisions never get here: [`SchemaVersion::parse`]
//! rejects them first.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::{CapabilityDetail, CapabilityTests, SchemaVersion, TestDetail, TestVariant};

/// Flag reason reported for schema 1.2, which records no reasons.
pub const LEGACY_FLAG_REASON: &str = "this test is flagged by the working group";

/// How well a result set covers one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySupport {
    /// No test of the capability failed.
    Full,
    /// Some tests passed and some did not.
    Partial,
    /// No test passed.
    Unsupported,
}

/// Classification of one capability's tests against a result set.
///
/// `passed_flagged` and `not_passed_flagged` are subsets of `passed_tests`
/// and `not_passed_tests` respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityResult {
    pub id: String,
    pub passed_tests: Vec<String>,
    pub not_passed_tests: Vec<String>,
    pub passed_flagged: Vec<String>,
    pub not_passed_flagged: Vec<String>,
    /// Flagged test ID -> reason given by the working group.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flag_reasons: BTreeMap<String, String>,
}

impl CapabilityResult {
    fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn total_tests(&self) -> usize {
        self.passed_tests.len() + self.not_passed_tests.len()
    }

    pub fn support(&self) -> CapabilitySupport {
        if self.not_passed_tests.is_empty() {
            CapabilitySupport::Full
        } else if self.passed_tests.is_empty() {
            CapabilitySupport::Unsupported
        } else {
            CapabilitySupport::Partial
        }
    }

    fn record(&mut self, test: &str, passed: bool, flag_reason: Option<String>) {
        let flagged = flag_reason.is_some();
        if let Some(reason) = flag_reason {
            self.flag_reasons.insert(test.to_string(), reason);
        }
        if passed {
            self.passed_tests.push(test.to_string());
            if flagged {
                self.passed_flagged.push(test.to_string());
            }
        } else {
            self.not_passed_tests.push(test.to_string());
            if flagged {
                self.not_passed_flagged.push(test.to_string());
            }
        }
    }
}

/// Classify one capability.
///
/// `detail` is `None` when the capability is referenced by a component but
/// not defined; that produces a result with no tests.
pub fn classify(
    id: &str,
    detail: Option<&CapabilityDetail>,
    passed: &HashSet<&str>,
    schema: SchemaVersion,
) -> CapabilityResult {
    let Some(detail) = detail else {
        return CapabilityResult::empty(id);
    };
    match schema.variant() {
        TestVariant::FlatList => classify_flat(id, detail, passed),
        TestVariant::Detailed => classify_detailed(id, detail, passed),
    }
}

fn classify_flat(id: &str, detail: &CapabilityDetail, passed: &HashSet<&str>) -> CapabilityResult {
    let flagged: HashSet<&str> = detail.flagged.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut result = CapabilityResult::empty(id);

    for test in detail.tests.ids() {
        if !seen.insert(test) {
            continue;
        }
        let reason = flagged
            .contains(test)
            .then(|| LEGACY_FLAG_REASON.to_string());
        result.record(test, passed.contains(test), reason);
    }
    result
}

fn classify_detailed(
    id: &str,
    detail: &CapabilityDetail,
    passed: &HashSet<&str>,
) -> CapabilityResult {
    let mut result = CapabilityResult::empty(id);

    match &detail.tests {
        CapabilityTests::Detailed(tests) => {
            for (test, info) in tests {
                classify_detailed_test(&mut result, test, info, passed);
            }
        }
        CapabilityTests::List(tests) => {
            // A bare list under a detailed schema carries no aliases or flags.
            let bare = TestDetail::default();
            let mut seen = HashSet::new();
            for test in tests {
                if seen.insert(test.as_str()) {
                    classify_detailed_test(&mut result, test, &bare, passed);
                }
            }
        }
    }
    result
}

fn classify_detailed_test(
    result: &mut CapabilityResult,
    test: &str,
    info: &TestDetail,
    passed: &HashSet<&str>,
) {
    let was_passed =
        passed.contains(test) || info.aliases.iter().any(|a| passed.contains(a.as_str()));
    let reason = info
        .flagged
        .as_ref()
        .map(|flag| flag.reason.clone().unwrap_or_default());
    result.record(test, was_passed, reason);
}
