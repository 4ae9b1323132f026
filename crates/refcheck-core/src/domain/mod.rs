//! Domain models for refcheck.
//!
//! Canonical definitions for the evaluator inputs:
//! - `GuidelineDocument`: capabilities grouped by component and status
//! - `ResultSet`: passed tests reported by one test run
//! - `Target`: the marketing program being evaluated

pub mod error;
pub mod guideline;
pub mod results;

// Re-export main types and errors
pub use error::{ComplianceError, Result};
pub use guideline::{
    CapabilityDetail, CapabilityTests, FlagInfo, GuidelineDocument, PlatformSection,
    SchemaVersion, Status, StatusSelection, Target, TestDetail, TestVariant,
};
pub use results::ResultSet;
