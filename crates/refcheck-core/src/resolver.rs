//! Status resolution: which capabilities apply to a target, and with what status.
//!
//! The platform program is the union of several components, and a capability
//! can be listed by more than one of them with different statuses. The
//! resolved status is the one with the highest priority (lowest
//! [`Status::priority`]), so a capability required anywhere is required for
//! the platform.

use std::collections::BTreeMap;

use crate::domain::{GuidelineDocument, Status, StatusSelection, Target};
use crate::obs;

/// Capability ID -> effective status for one target.
pub type TargetCapabilityMap = BTreeMap<String, Status>;

/// Resolve the capabilities that apply to `target`.
///
/// An unknown component, or a platform target on a document without a
/// platform section, yields an empty map rather than an error.
pub fn resolve_target(doc: &GuidelineDocument, target: &Target) -> TargetCapabilityMap {
    let mut resolved = TargetCapabilityMap::new();

    match target {
        Target::Platform => {
            let components = doc.platform_components();
            if components.is_empty() {
                obs::emit_target_empty(target.as_str(), "no platform components declared");
            }
            for component in components {
                let Some(statuses) = doc.components.get(component) else {
                    obs::emit_target_empty(component, "platform component not defined");
                    continue;
                };
                for (status, caps) in statuses {
                    for cap in caps {
                        merge_status(&mut resolved, cap, *status);
                    }
                }
            }
        }
        Target::Component(name) => match doc.components.get(name) {
            Some(statuses) => {
                for (status, caps) in statuses {
                    for cap in caps {
                        resolved.insert(cap.clone(), *status);
                    }
                }
            }
            None => obs::emit_target_empty(name, "component not defined"),
        },
    }

    resolved
}

fn merge_status(resolved: &mut TargetCapabilityMap, cap: &str, status: Status) {
    match resolved.get_mut(cap) {
        Some(existing) => {
            if status.priority() < existing.priority() {
                *existing = status;
            }
        }
        None => {
            resolved.insert(cap.to_string(), status);
        }
    }
}

/// Capability IDs for `target` whose resolved status is in `statuses`.
pub fn target_capabilities(
    doc: &GuidelineDocument,
    target: &Target,
    statuses: &StatusSelection,
) -> Vec<String> {
    resolve_target(doc, target)
        .into_iter()
        .filter(|(_, status)| statuses.contains(*status))
        .map(|(cap, _)| cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> GuidelineDocument {
        GuidelineDocument::from_value(json!({
            "schema": "1.4",
            "platform": {"required": ["compute", "object"]},
            "components": {
                "compute": {
                    "required": ["cap-shared", "cap-compute"],
                    "advisory": ["cap-compute-adv"],
                    "deprecated": [],
                    "removed": ["cap-old"],
                },
                "object": {
                    "required": ["cap-object"],
                    "advisory": ["cap-shared"],
                    "deprecated": ["cap-old"],
                    "removed": [],
                },
            },
            "capabilities": {},
        }))
        .unwrap()
    }

    #[test]
    fn platform_takes_highest_priority_status() {
        let map = resolve_target(&doc(), &Target::Platform);
        assert_eq!(map["cap-shared"], Status::Required);
        assert_eq!(map["cap-old"], Status::Deprecated);
        assert_eq!(map["cap-object"], Status::Required);
        assert_eq!(map["cap-compute-adv"], Status::Advisory);
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn single_component_copies_statuses() {
        let map = resolve_target(&doc(), &Target::from("object"));
        assert_eq!(map["cap-shared"], Status::Advisory);
        assert_eq!(map["cap-old"], Status::Deprecated);
        assert!(!map.contains_key("cap-compute"));
    }

    #[test]
    fn unknown_component_is_empty() {
        assert!(resolve_target(&doc(), &Target::from("dns")).is_empty());
    }

    #[test]
    fn missing_platform_section_is_empty() {
        let doc = GuidelineDocument::from_value(json!({
            "schema": "1.4",
            "components": {"compute": {"required": ["cap"]}},
        }))
        .unwrap();
        assert!(resolve_target(&doc, &Target::Platform).is_empty());
    }

    #[test]
    fn platform_skips_undefined_component() {
        let doc = GuidelineDocument::from_value(json!({
            "schema": "1.4",
            "platform": {"required": ["compute", "network"]},
            "components": {"compute": {"required": ["cap"]}},
        }))
        .unwrap();
        let map = resolve_target(&doc, &Target::Platform);
        assert_eq!(map.len(), 1);
        assert_eq!(map["cap"], Status::Required);
    }

    #[test]
    fn target_capabilities_filters_by_status() {
        let required =
            target_capabilities(&doc(), &Target::Platform, &StatusSelection::default());
        assert_eq!(required, vec!["cap-compute", "cap-object", "cap-shared"]);

        let removed = target_capabilities(
            &doc(),
            &Target::from("compute"),
            &StatusSelection::only(Status::Removed),
        );
        assert_eq!(removed, vec!["cap-old"]);
    }
}
