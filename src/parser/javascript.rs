//! `require()` and `import` extraction from JavaScript source.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// `require("name")` / `require('name')`.
static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\(['"]([\w\-./]+)['"]\)"#).expect("valid require regex")
});

/// `import binding from "name"`.
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+[\w*{}]+\s+from\s+['"]([\w\-./]+)['"]"#).expect("valid import regex")
});

/// Collect module names from require calls and import statements.
///
/// Captures are limited to word characters, hyphens, dots and slashes, so
/// surrounding quotes, parens and semicolons never leak into a name.
pub fn extract(body: &str) -> BTreeSet<String> {
    [&*REQUIRE_RE, &*IMPORT_RE]
        .into_iter()
        .flat_map(|re| re.captures_iter(body))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_require_and_import() {
        assert_eq!(
            extract(r#"const x = require("lodash"); import y from "react";"#),
            set(&["lodash", "react"])
        );
    }

    #[test]
    fn test_quote_styles_and_paths() {
        let body = r#"
            const a = require('internal-utils');
            const b = require("./local/helper.js");
            import * from 'lodash/fp';
            import {thing} from "corp.tools";
        "#;
        assert_eq!(
            extract(body),
            set(&["internal-utils", "./local/helper.js", "lodash/fp", "corp.tools"])
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let body = r#"require("a"); require('a'); import a from "a";"#;
        assert_eq!(extract(body), set(&["a"]));
    }

    #[test]
    fn test_out_of_charset_names_are_not_captured() {
        // Scoped names, spaced destructuring and template literals fall outside the patterns.
        let body = r#"
            require("@scope/pkg");
            import { a, b } from "multi";
            require(`templated`);
            require( "spaced" );
        "#;
        assert!(extract(body).is_empty());
    }

    #[test]
    fn test_garbage_body() {
        assert!(extract("").is_empty());
        assert!(extract("require(").is_empty());
        assert!(extract("\u{0}\u{1}import from").is_empty());
    }
}
