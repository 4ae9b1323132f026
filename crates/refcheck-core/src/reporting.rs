use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::classifier::CapabilitySupport;
use crate::diff::ReportDiff;
use crate::domain::{ResultSet, Status};
use crate::evaluate::ComplianceReport;
use crate::gate::GateVerdict;
use crate::test_list::render_test_list;

/// Version of the persisted artifact layout.
pub const ARTIFACT_SCHEMA_VERSION: &str = "1.0";

/// Canonical compliance artifact written for CI and submission review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the guideline file the report was evaluated against.
    pub guideline_digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_id: Option<String>,
    pub report: ComplianceReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateVerdict>,
    /// Comparison against a previous run, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<ReportDiff>,
}

impl ComplianceArtifact {
    /// `guideline` is the document as read, before it was decoded.
    pub fn new(
        guideline: &Value,
        results: &ResultSet,
        report: ComplianceReport,
        gate: Option<GateVerdict>,
    ) -> Result<Self> {
        Ok(Self {
            schema_version: ARTIFACT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            guideline_digest: guideline_digest(guideline)?,
            results_id: results.id.clone(),
            report,
            gate,
            diff: None,
        })
    }

    pub fn with_diff(mut self, diff: ReportDiff) -> Self {
        self.diff = Some(diff);
        self
    }
}

/// Recursively sort object keys so equal documents encode identically.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// SHA-256 hex digest of the guideline's compact, key-sorted JSON form.
///
/// Hashes the raw document, so fields the evaluator ignores still count.
pub fn guideline_digest(guideline: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(&sort_keys(guideline)).context("encode guideline")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Write the artifact as pretty JSON.
pub fn write_report_json(path: &Path, artifact: &ComplianceArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize compliance artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}%"),
        None => "n/a".to_string(),
    }
}

fn support_label(support: CapabilitySupport) -> &'static str {
    match support {
        CapabilitySupport::Full => "full",
        CapabilitySupport::Partial => "partial",
        CapabilitySupport::Unsupported => "unsupported",
    }
}

/// Render a markdown summary for PR comments and review pages.
pub fn render_report_md(report: &ComplianceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Compliance Report: {}\n\n",
        report.target.display_name()
    ));
    out.push_str(&format!(
        "- guideline schema: {}\n- required pass rate: {}\n- required pass rate (excluding flagged): {}\n",
        report.schema,
        format_percent(report.required_pass_percent),
        format_percent(report.non_flag_required_pass_percent),
    ));

    for status in Status::ALL {
        let bucket = report.bucket(status);
        if bucket.capabilities.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n", capitalize(status.as_str())));
        out.push_str(&format!(
            "- capabilities: {}\n- tests passed: {} / {}\n- flagged: {} passed, {} not passed\n",
            bucket.capabilities.len(),
            bucket.passed_count,
            bucket.count,
            bucket.flag_pass_count,
            bucket.flag_fail_count,
        ));
        for cap in &bucket.capabilities {
            out.push_str(&format!(
                "- `{}`: {} ({}/{})\n",
                cap.id,
                support_label(cap.support()),
                cap.passed_tests.len(),
                cap.total_tests(),
            ));
        }
    }
    if !report.other_tests.is_empty() {
        out.push_str(&format!(
            "\n- other passed tests (not in any capability): {}\n",
            report.other_tests.len()
        ));
    }
    out
}

/// Render the comparison with a previous run as a markdown section.
pub fn render_diff_md(diff: &ReportDiff) -> String {
    let mut out = String::from("\n## Compared with previous run\n");
    out.push_str(&format!(
        "- fixed tests: {}\n- broken tests: {}\n",
        diff.fixed_tests.len(),
        diff.broken_tests.len(),
    ));
    if let Some(delta) = diff.required_pass_percent_delta {
        out.push_str(&format!("- required pass rate change: {delta:+.2}%\n"));
    }
    match diff.same_cloud {
        Some(true) => out.push_str("- same cloud: yes\n"),
        Some(false) => out.push_str("- same cloud: no\n"),
        None => {}
    }
    if let Some(delta) = diff.duration_delta_seconds {
        out.push_str(&format!("- duration change: {delta:+.0}s\n"));
    }
    for cap in &diff.capabilities {
        out.push_str(&format!("- `{}` ({})\n", cap.id, cap.status));
        for test in &cap.fixed_tests {
            out.push_str(&format!("  - fixed: {test}\n"));
        }
        for test in &cap.broken_tests {
            out.push_str(&format!("  - broken: {test}\n"));
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Write the markdown summary.
pub fn write_report_md(path: &Path, report: &ComplianceReport) -> Result<()> {
    let md = render_report_md(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Write a test list as sorted newline-separated text.
pub fn write_test_list(path: &Path, tests: &[String]) -> Result<()> {
    std::fs::write(path, render_test_list(tests)).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
