//! Test-run result sets uploaded by cloud operators.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::error::Result;

/// Passed tests reported by a single test run.
///
/// Only `results` participates in evaluation; the remaining fields are carried
/// through so a report can identify the run it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default)]
    pub results: Vec<String>,
}

impl ResultSet {
    /// Build a result set from passed test IDs alone.
    pub fn from_tests<I, S>(tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            results: tests.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Set view used for membership checks during classification.
    pub fn passed_set(&self) -> HashSet<&str> {
        self.results.iter().map(String::as_str).collect()
    }
}
