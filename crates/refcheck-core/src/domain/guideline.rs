//! Guideline (capability) documents as published by the interop working group.
//!
//! A guideline groups capabilities under marketing-program components and a
//! status, and lists the tempest tests that demonstrate each capability. The
//! per-test representation changed between schema revisions, so
//! [`CapabilityTests`] accepts both the flat list used by schema 1.2 and the
//! detailed map used from 1.3 onwards.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::error::{ComplianceError, Result};

/// Capability status within a component.
///
/// Declaration order doubles as priority order: a lower value wins when the
/// same capability is listed under several components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Required,
    Advisory,
    Deprecated,
    Removed,
}

impl Status {
    /// All statuses in priority order.
    pub const ALL: [Status; 4] = [
        Status::Required,
        Status::Advisory,
        Status::Deprecated,
        Status::Removed,
    ];

    /// Priority value, where lower means higher priority.
    pub fn priority(self) -> u8 {
        match self {
            Status::Required => 1,
            Status::Advisory => 2,
            Status::Deprecated => 3,
            Status::Removed => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Required => "required",
            Status::Advisory => "advisory",
            Status::Deprecated => "deprecated",
            Status::Removed => "removed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Ok(Status::Required),
            "advisory" => Ok(Status::Advisory),
            "deprecated" => Ok(Status::Deprecated),
            "removed" => Ok(Status::Removed),
            other => Err(format!("unknown capability status: {other}")),
        }
    }
}

/// Which set of statuses a caller is interested in.
///
/// Replaces the page-level checkbox state of the guideline browser with an
/// explicit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSelection {
    pub required: bool,
    pub advisory: bool,
    pub deprecated: bool,
    pub removed: bool,
}

impl Default for StatusSelection {
    fn default() -> Self {
        Self::only(Status::Required)
    }
}

impl StatusSelection {
    /// Select every status.
    pub fn all() -> Self {
        Self {
            required: true,
            advisory: true,
            deprecated: true,
            removed: true,
        }
    }

    /// Select a single status.
    pub fn only(status: Status) -> Self {
        Self::none().with(status)
    }

    fn none() -> Self {
        Self {
            required: false,
            advisory: false,
            deprecated: false,
            removed: false,
        }
    }

    /// Add a status to the selection.
    pub fn with(mut self, status: Status) -> Self {
        match status {
            Status::Required => self.required = true,
            Status::Advisory => self.advisory = true,
            Status::Deprecated => self.deprecated = true,
            Status::Removed => self.removed = true,
        }
        self
    }

    pub fn contains(&self, status: Status) -> bool {
        match status {
            Status::Required => self.required,
            Status::Advisory => self.advisory,
            Status::Deprecated => self.deprecated,
            Status::Removed => self.removed,
        }
    }
}

impl FromStr for StatusSelection {
    type Err = String;

    /// Parse a comma-separated list such as `required,advisory`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut selection = Self::none();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            selection = selection.with(part.parse()?);
        }
        if selection == Self::none() {
            return Err("status selection must name at least one status".to_string());
        }
        Ok(selection)
    }
}

/// Supported guideline schema revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    V1_2,
    V1_3,
    V1_4,
    V1_5,
}

/// How per-test information is represented for a schema revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestVariant {
    /// `tests` is a list of IDs and `flagged` a sibling list.
    FlatList,
    /// `tests` maps each ID to aliases, idempotent ID and flag details.
    Detailed,
}

impl SchemaVersion {
    /// Parse a schema string, rejecting anything outside the supported set.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "1.2" => Ok(SchemaVersion::V1_2),
            "1.3" => Ok(SchemaVersion::V1_3),
            "1.4" => Ok(SchemaVersion::V1_4),
            "1.5" => Ok(SchemaVersion::V1_5),
            other => Err(ComplianceError::UnsupportedSchema {
                version: other.to_string(),
            }),
        }
    }

    pub fn variant(self) -> TestVariant {
        match self {
            SchemaVersion::V1_2 => TestVariant::FlatList,
            SchemaVersion::V1_3 | SchemaVersion::V1_4 | SchemaVersion::V1_5 => {
                TestVariant::Detailed
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVersion::V1_2 => "1.2",
            SchemaVersion::V1_3 => "1.3",
            SchemaVersion::V1_4 => "1.4",
            SchemaVersion::V1_5 => "1.5",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working-group flag attached to a test (schema >= 1.3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Per-test details (schema >= 1.3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_id: Option<String>,
    /// An explicit `null` decodes as no aliases.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<FlagInfo>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The `tests` member of a capability in either representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityTests {
    List(Vec<String>),
    Detailed(BTreeMap<String, TestDetail>),
}

impl Default for CapabilityTests {
    fn default() -> Self {
        CapabilityTests::List(Vec::new())
    }
}

impl CapabilityTests {
    /// Test IDs in declaration order (map order for the detailed form).
    pub fn ids(&self) -> Vec<&str> {
        match self {
            CapabilityTests::List(ids) => ids.iter().map(String::as_str).collect(),
            CapabilityTests::Detailed(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

/// A capability definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Informational only; evaluation takes status from `components`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub tests: CapabilityTests,
    /// Flat flag list used by schema 1.2 only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged: Vec<String>,
}

/// Components that make up the platform program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSection {
    #[serde(default)]
    pub required: Vec<String>,
}

/// A complete guideline document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineDocument {
    #[serde(alias = "schemaVersion")]
    pub schema: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformSection>,

    #[serde(default)]
    pub components: BTreeMap<String, BTreeMap<Status, Vec<String>>>,

    #[serde(default)]
    pub capabilities: BTreeMap<String, CapabilityDetail>,
}

impl GuidelineDocument {
    /// Decode a guideline, checking the schema revision before the body.
    ///
    /// Unsupported revisions may use a different layout altogether, so the
    /// schema check has to come first to report them accurately. Capabilities
    /// are decoded one at a time so a malformed entry is reported by ID.
    pub fn from_value(mut value: Value) -> Result<Self> {
        let schema = value
            .get("schema")
            .or_else(|| value.get("schemaVersion"))
            .and_then(Value::as_str)
            .ok_or(ComplianceError::MissingSchema)?;
        SchemaVersion::parse(schema)?;

        let capabilities = value
            .as_object_mut()
            .and_then(|body| body.remove("capabilities"));
        let mut doc: Self = serde_json::from_value(value)?;
        if let Some(raw) = capabilities {
            doc.capabilities = decode_capabilities(raw)?;
        }
        Ok(doc)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn schema_version(&self) -> Result<SchemaVersion> {
        SchemaVersion::parse(&self.schema)
    }

    /// Component names required by the platform program, deduplicated.
    pub fn platform_components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .platform
            .as_ref()
            .map(|p| p.required.iter().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names.dedup();
        names
    }
}

fn decode_capabilities(raw: Value) -> Result<BTreeMap<String, CapabilityDetail>> {
    match raw {
        Value::Object(entries) => entries
            .into_iter()
            .map(|(id, entry)| match serde_json::from_value(entry) {
                Ok(detail) => Ok((id, detail)),
                Err(source) => Err(ComplianceError::InvalidCapability {
                    capability: id,
                    source,
                }),
            })
            .collect(),
        Value::Null => Ok(BTreeMap::new()),
        other => Ok(serde_json::from_value(other)?),
    }
}

/// The marketing program a report is produced for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    /// The union of every component under `platform.required`.
    Platform,
    /// A single component such as `compute` or `object`.
    Component(String),
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Target::Platform => "platform",
            Target::Component(name) => name,
        }
    }

    /// Human-readable program name.
    pub fn display_name(&self) -> String {
        match self.as_str() {
            "platform" => "OpenStack Powered Platform".to_string(),
            "compute" => "OpenStack Powered Compute".to_string(),
            "object" => "OpenStack Powered Object Storage".to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::Platform
    }
}

impl From<String> for Target {
    fn from(raw: String) -> Self {
        if raw == "platform" {
            Target::Platform
        } else {
            Target::Component(raw)
        }
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Target::from(raw.to_string())
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.as_str().to_string()
    }
}

impl FromStr for Target {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Target::from(s.trim()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_priority_orders_required_first() {
        assert!(Status::Required.priority() < Status::Advisory.priority());
        assert!(Status::Advisory.priority() < Status::Deprecated.priority());
        assert!(Status::Deprecated.priority() < Status::Removed.priority());
        assert!(Status::Required < Status::Removed);
    }

    #[test]
    fn schema_parse_supported_and_variant() {
        assert_eq!(
            SchemaVersion::parse("1.2").unwrap().variant(),
            TestVariant::FlatList
        );
        for raw in ["1.3", "1.4", "1.5"] {
            assert_eq!(
                SchemaVersion::parse(raw).unwrap().variant(),
                TestVariant::Detailed
            );
        }
    }

    #[test]
    fn schema_parse_rejects_unknown() {
        let err = SchemaVersion::parse("2.0").unwrap_err();
        assert!(matches!(err, ComplianceError::UnsupportedSchema { version } if version == "2.0"));
    }

    #[test]
    fn from_value_rejects_unsupported_schema_before_body() {
        // 2.0 documents use a different layout; the decode must not be attempted.
        let doc = json!({
            "schema": "2.0",
            "components": {"compute": {"capabilities": {"required": []}}},
        });
        let err = GuidelineDocument::from_value(doc).unwrap_err();
        assert!(matches!(err, ComplianceError::UnsupportedSchema { .. }));
    }

    #[test]
    fn from_value_requires_schema() {
        let err = GuidelineDocument::from_value(json!({"components": {}})).unwrap_err();
        assert!(matches!(err, ComplianceError::MissingSchema));
    }

    #[test]
    fn decodes_both_test_representations() {
        let flat: CapabilityDetail =
            serde_json::from_value(json!({"tests": ["t1", "t2"], "flagged": ["t1"]})).unwrap();
        assert_eq!(flat.tests.ids(), vec!["t1", "t2"]);
        assert_eq!(flat.flagged, vec!["t1"]);

        let detailed: CapabilityDetail = serde_json::from_value(json!({
            "tests": {
                "t1": {"idempotent_id": "id-1", "aliases": ["t1-old"]},
                "t2": {"idempotent_id": "id-2", "flagged": {"reason": "bug 123"}},
            }
        }))
        .unwrap();
        match &detailed.tests {
            CapabilityTests::Detailed(map) => {
                assert_eq!(map["t1"].aliases, vec!["t1-old"]);
                assert_eq!(
                    map["t2"].flagged.as_ref().and_then(|f| f.reason.as_deref()),
                    Some("bug 123")
                );
            }
            other => panic!("expected detailed tests, got {other:?}"),
        }
    }

    #[test]
    fn null_aliases_decode_as_none() {
        let doc = GuidelineDocument::from_value(json!({
            "schema": "1.5",
            "capabilities": {"cap": {"tests": {
                "t1": {"idempotent_id": "id-1", "aliases": null},
            }}},
        }))
        .unwrap();
        match &doc.capabilities["cap"].tests {
            CapabilityTests::Detailed(map) => assert!(map["t1"].aliases.is_empty()),
            other => panic!("expected detailed tests, got {other:?}"),
        }
    }

    #[test]
    fn malformed_capability_error_names_it() {
        let err = GuidelineDocument::from_value(json!({
            "schema": "1.4",
            "capabilities": {
                "good": {"tests": ["t1"]},
                "broken-cap": {"tests": {"t1": {"aliases": "not-a-list"}}},
            },
        }))
        .unwrap_err();
        match err {
            ComplianceError::InvalidCapability { capability, .. } => {
                assert_eq!(capability, "broken-cap")
            }
            other => panic!("expected InvalidCapability, got {other:?}"),
        }
    }

    #[test]
    fn capability_status_round_trips() {
        let raw = json!({
            "name": "Create servers",
            "status": "required",
            "tests": {"t1": {"idempotent_id": "x"}},
        });
        let detail: CapabilityDetail = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(detail.status.as_deref(), Some("required"));
        assert_eq!(serde_json::to_value(&detail).unwrap(), raw);
    }

    #[test]
    fn schema_version_alias_accepted() {
        let doc = GuidelineDocument::from_value(json!({"schemaVersion": "1.4"})).unwrap();
        assert_eq!(doc.schema_version().unwrap(), SchemaVersion::V1_4);
    }

    #[test]
    fn platform_components_are_deduplicated() {
        let doc = GuidelineDocument::from_value(json!({
            "schema": "1.4",
            "platform": {"required": ["object", "compute", "object"]},
        }))
        .unwrap();
        assert_eq!(doc.platform_components(), vec!["compute", "object"]);
    }

    #[test]
    fn target_parse_and_display() {
        assert_eq!("platform".parse::<Target>().unwrap(), Target::Platform);
        assert_eq!(
            "compute".parse::<Target>().unwrap(),
            Target::Component("compute".to_string())
        );
        assert_eq!(Target::Platform.display_name(), "OpenStack Powered Platform");
        assert_eq!(
            Target::from("object").display_name(),
            "OpenStack Powered Object Storage"
        );
        assert_eq!(Target::from("dns").display_name(), "dns");
    }

    #[test]
    fn status_selection_parse() {
        let sel: StatusSelection = "required, advisory".parse().unwrap();
        assert!(sel.contains(Status::Required));
        assert!(sel.contains(Status::Advisory));
        assert!(!sel.contains(Status::Deprecated));
        assert!("".parse::<StatusSelection>().is_err());
        assert!("mandatory".parse::<StatusSelection>().is_err());
    }
}
