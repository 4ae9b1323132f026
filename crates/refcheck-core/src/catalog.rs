//! Guideline file catalog helpers.
//!
//! Guideline repositories hold dated files such as `2016.01.json` plus a
//! working draft `next.json`, alongside unrelated files (schemas, READMEs,
//! per-program add-ons). Only the former are guidelines.

use std::sync::OnceLock;

use regex::Regex;

fn guideline_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{4}\.[0-9]{2}|next)\.json$").expect("static regex is valid")
    })
}

/// Whether `name` is a guideline file name (`YYYY.MM.json` or `next.json`).
pub fn is_guideline_file(name: &str) -> bool {
    guideline_file_pattern().is_match(name)
}

/// Keep guideline files and order them newest first.
///
/// `next.json` sorts before every dated release.
pub fn sort_versions<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut versions: Vec<String> = names
        .into_iter()
        .filter(|n| is_guideline_file(n.as_ref()))
        .map(|n| n.as_ref().to_string())
        .collect();
    versions.sort();
    versions.reverse();
    versions
}

/// Strip the `.json` extension from a guideline file name.
pub fn version_label(file_name: &str) -> &str {
    file_name.strip_suffix(".json").unwrap_or(file_name)
}
