//! Dependency extraction.
//!
//! This module maps a classified body to the dependency names it references:
//! - `package.json` manifests (dependencies and devDependencies keys)
//! - JavaScript source (require calls and import statements)
//! - Markdown documents (links to npmjs.com)
//!
//! Extractors never fail; malformed input yields an empty set.

pub mod javascript;
pub mod markdown;
pub mod package_json;

pub use markdown::npm_link_package;

use crate::types::FormatTag;
use std::collections::BTreeSet;
use tracing::debug;

/// Extract the set of dependency names referenced by `body`.
pub fn extract(format: &FormatTag, body: &str) -> BTreeSet<String> {
    let names = match format {
        FormatTag::PackageJson => package_json::extract(body),
        FormatTag::JavaScript => javascript::extract(body),
        FormatTag::Markdown => markdown::extract(body),
        FormatTag::Other(_) => BTreeSet::new(),
    };

    debug!("Extracted {} names as {}", names.len(), format);
    names
}

/// Whether a name refers to a local path or a Node.js built-in rather than a registry package.
pub fn is_local_or_builtin(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.starts_with('/')
        || is_node_builtin(trimmed)
}

/// Check if a name is a Node.js built-in module.
fn is_node_builtin(name: &str) -> bool {
    const BUILTINS: &[&str] = &[
        "assert",
        "async_hooks",
        "buffer",
        "child_process",
        "cluster",
        "console",
        "constants",
        "crypto",
        "dgram",
        "dns",
        "domain",
        "events",
        "fs",
        "http",
        "http2",
        "https",
        "inspector",
        "module",
        "net",
        "os",
        "path",
        "perf_hooks",
        "process",
        "punycode",
        "querystring",
        "readline",
        "repl",
        "stream",
        "string_decoder",
        "sys",
        "timers",
        "tls",
        "trace_events",
        "tty",
        "url",
        "util",
        "v8",
        "vm",
        "wasi",
        "worker_threads",
        "zlib",
    ];

    let base = name.strip_prefix("node:").unwrap_or(name);
    // Subpath imports such as `fs/promises` resolve to the built-in too.
    let base = base.split('/').next().unwrap_or(base);
    BUILTINS.contains(&base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_extract_dispatches_by_format() {
        assert_eq!(
            extract(
                &FormatTag::PackageJson,
                r#"{"dependencies":{"left-pad":"1.0.0"},"devDependencies":{"mocha":"9.0.0"}}"#
            ),
            set(&["left-pad", "mocha"])
        );
        assert_eq!(
            extract(
                &FormatTag::JavaScript,
                r#"const x = require("lodash"); import y from "react";"#
            ),
            set(&["lodash", "react"])
        );
        assert_eq!(
            extract(
                &FormatTag::Markdown,
                "[pkg](https://npmjs.com/package/foo) [other](https://example.com)"
            ),
            set(&["https://npmjs.com/package/foo"])
        );
    }

    #[test]
    fn test_extract_is_idempotent() {
        let inputs = [
            (
                FormatTag::PackageJson,
                r#"{"dependencies":{"acme-auth":"1.0.0","left-pad":"1.0.0"},
                    "devDependencies":{"mocha":"9.0.0","acme-auth":"2.0.0"}}"#,
            ),
            (
                FormatTag::JavaScript,
                r#"require("lodash"); import y from "react"; require('lodash');"#,
            ),
            (
                FormatTag::Markdown,
                "[a](https://www.npmjs.com/package/a) [b](https://example.com) \
                 [a again](https://www.npmjs.com/package/a)",
            ),
        ];

        for (format, body) in &inputs {
            let first = extract(format, body);
            let second = extract(format, body);
            assert!(!first.is_empty(), "{} extracted nothing", format);
            assert_eq!(first, second, "{} extraction is not stable", format);
        }
    }

    #[test]
    fn test_unknown_format_extracts_nothing() {
        let tag = FormatTag::Other("yarn_lock".to_string());
        assert!(extract(&tag, "left-pad@^1.0.0:\n  version \"1.3.0\"").is_empty());
    }

    #[test]
    fn test_is_local_or_builtin() {
        assert!(is_local_or_builtin("./utils"));
        assert!(is_local_or_builtin("../lib/index.js"));
        assert!(is_local_or_builtin("/abs/path"));
        assert!(is_local_or_builtin("fs"));
        assert!(is_local_or_builtin("node:fs"));
        assert!(is_local_or_builtin("fs/promises"));
        assert!(is_local_or_builtin(""));
        assert!(!is_local_or_builtin("lodash"));
        assert!(!is_local_or_builtin("lodash/fp"));
        assert!(!is_local_or_builtin("@company/utils"));
    }
}
