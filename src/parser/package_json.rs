//! `package.json` dependency extraction.

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::trace;

const DEPENDENCY_SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

/// Collect the keys of `dependencies` and `devDependencies`.
///
/// Returns an empty set if the body is not a JSON object or if either
/// section is present but not an object.
pub fn extract(body: &str) -> BTreeSet<String> {
    match section_keys(body) {
        Some(names) => names,
        None => {
            trace!("Body is not a usable package manifest");
            BTreeSet::new()
        }
    }
}

fn section_keys(body: &str) -> Option<BTreeSet<String>> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let manifest = parsed.as_object()?;

    let mut names = BTreeSet::new();
    for section in DEPENDENCY_SECTIONS {
        if let Some(value) = manifest.get(section) {
            names.extend(value.as_object()?.keys().cloned());
        }
    }

    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_of_sections() {
        let names = extract(
            r#"{
                "name": "internal-app",
                "dependencies": {"left-pad": "1.0.0", "@acme/auth": "^2.0.0"},
                "devDependencies": {"mocha": "9.0.0", "left-pad": "1.0.0"},
                "peerDependencies": {"react": "18"}
            }"#,
        );
        let expected: BTreeSet<String> = ["@acme/auth", "left-pad", "mocha"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_sections_are_optional() {
        assert!(extract(r#"{"name": "x"}"#).is_empty());
        assert_eq!(extract(r#"{"devDependencies": {"jest": "29"}}"#).len(), 1);
    }

    #[test]
    fn test_malformed_bodies_yield_nothing() {
        for body in [
            "",
            "not json",
            "{\"dependencies\": {\"a\": \"1\"",
            "[\"dependencies\"]",
            "\"dependencies\"",
            r#"{"dependencies": ["a", "b"]}"#,
            r#"{"dependencies": {"a": "1"}, "devDependencies": "oops"}"#,
        ] {
            assert!(extract(body).is_empty(), "expected nothing for {:?}", body);
        }
    }
}
