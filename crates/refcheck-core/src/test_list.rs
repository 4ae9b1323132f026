//! Test lists for running a subset of tempest against a guideline target.
//!
//! For schema 1.2 the list holds plain test names. Later schemas append the
//! idempotent ID as `name[id]` so the list can be fed to a test runner's
//! whitelist, and may also include historical aliases of each test.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{
    CapabilityDetail, CapabilityTests, GuidelineDocument, Result, StatusSelection, Target,
    TestVariant,
};
use crate::resolver::target_capabilities;

/// Inclusion switches for [`build_test_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestListOptions {
    /// Add `alias[id]` entries for every included test (schema >= 1.3).
    pub include_aliases: bool,
    /// Keep tests the working group has flagged.
    pub include_flagged: bool,
}

impl Default for TestListOptions {
    fn default() -> Self {
        Self {
            include_aliases: true,
            include_flagged: true,
        }
    }
}

/// Build the sorted test list for capabilities of `target` with a selected status.
pub fn build_test_list(
    doc: &GuidelineDocument,
    target: &Target,
    statuses: &StatusSelection,
    options: TestListOptions,
) -> Result<Vec<String>> {
    let variant = doc.schema_version()?.variant();
    let mut tests = Vec::new();

    for cap_id in target_capabilities(doc, target, statuses) {
        let Some(detail) = doc.capabilities.get(&cap_id) else {
            continue;
        };
        match variant {
            TestVariant::FlatList => flat_tests(detail, options, &mut tests),
            TestVariant::Detailed => detailed_tests(detail, options, &mut tests),
        }
    }

    tests.sort();
    tests.dedup();
    Ok(tests)
}

fn flat_tests(detail: &CapabilityDetail, options: TestListOptions, out: &mut Vec<String>) {
    let flagged: BTreeSet<&str> = detail.flagged.iter().map(String::as_str).collect();
    out.extend(
        detail
            .tests
            .ids()
            .into_iter()
            .filter(|t| options.include_flagged || !flagged.contains(t))
            .map(str::to_string),
    );
}

fn detailed_tests(detail: &CapabilityDetail, options: TestListOptions, out: &mut Vec<String>) {
    match &detail.tests {
        CapabilityTests::Detailed(tests) => {
            for (test, info) in tests {
                if info.flagged.is_some() && !options.include_flagged {
                    continue;
                }
                let id = info.idempotent_id.as_deref().unwrap_or_default();
                out.push(format!("{test}[{id}]"));
                if options.include_aliases {
                    out.extend(info.aliases.iter().map(|alias| format!("{alias}[{id}]")));
                }
            }
        }
        CapabilityTests::List(tests) => {
            out.extend(tests.iter().map(|test| format!("{test}[]")));
        }
    }
}

/// Render a test list as newline-separated text, sorted.
pub fn render_test_list(tests: &[String]) -> String {
    let mut sorted = tests.to_vec();
    sorted.sort();
    sorted.join("\n")
}
