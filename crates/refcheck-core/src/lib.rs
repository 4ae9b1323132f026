//! refcheck Core Library
//!
//! Evaluates a test run's passed tests against an OpenStack interop
//! guideline. The pipeline is:
//!
//! 1. [`resolver`] decides which capabilities apply to a target program and
//!    with what status.
//! 2. [`classifier`] splits each capability's tests into passed/not passed and
//!    flagged subsets, according to the guideline schema revision.
//! 3. [`mod@evaluate`] groups the results by status and computes pass rates.
//!
//! [`gate`], [`diff`], [`reporting`] and [`test_list`] build on the report.

pub mod catalog;
pub mod classifier;
pub mod diff;
pub mod domain;
pub mod evaluate;
pub mod gate;
pub mod obs;
pub mod reporting;
pub mod resolver;
pub mod telemetry;
pub mod test_list;

pub use domain::{
    CapabilityDetail, CapabilityTests, ComplianceError, FlagInfo, GuidelineDocument,
    PlatformSection, Result, ResultSet, SchemaVersion, Status, StatusSelection, Target,
    TestDetail, TestVariant,
};

pub use catalog::{is_guideline_file, sort_versions, version_label};
pub use classifier::{classify, CapabilityResult, CapabilitySupport, LEGACY_FLAG_REASON};
pub use diff::{compare, CapabilityDiff, ReportDiff};
pub use evaluate::{
    evaluate, ComplianceReport, Evaluator, EvaluatorConfig, MissingCapabilityPolicy, StatusBucket,
};
pub use gate::{evaluate_gate, GateRule, GateRuleSet, GateVerdict, Violation};
pub use reporting::{
    guideline_digest, render_diff_md, render_report_md, write_report_json, write_report_md,
    write_test_list, ComplianceArtifact,
};
pub use resolver::{resolve_target, target_capabilities, TargetCapabilityMap};
pub use test_list::{build_test_list, render_test_list, TestListOptions};

pub use telemetry::init_tracing;

/// refcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
