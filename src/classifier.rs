//! Manifest format detection for URLs and response bodies.
//!
//! Rules are evaluated in a fixed priority order and the first match wins:
//!
//! 1. manifest signal: URL mentions `package.json` or body contains `"dependencies"`
//! 2. configured suffix rules, in configuration order
//! 3. `.js` URL or `script` MIME marker
//! 4. `.md` URL
//! 5. body contains `require(` or `import `
//! 6. configured patterns found anywhere in the URL
//!
//! Nothing here fails: input that matches no rule yields `None`.

use crate::config::Configuration;
use crate::types::{FormatTag, HttpItem};
use tracing::trace;

/// MIME marker identifying script responses.
pub const SCRIPT_MIME: &str = "script";

const SCRIPT_SUFFIX: &str = ".js";
const MARKDOWN_SUFFIX: &str = ".md";
const MANIFEST_URL_SIGNAL: &str = "package.json";
const MANIFEST_BODY_SIGNAL: &str = "\"dependencies\"";
const REQUIRE_SIGNAL: &str = "require(";
const IMPORT_SIGNAL: &str = "import ";

/// Decide which manifest format, if any, applies to a URL and body.
pub fn classify(
    url: &str,
    declared_mime_type: &str,
    body: &str,
    config: &Configuration,
) -> Option<FormatTag> {
    if url.contains(MANIFEST_URL_SIGNAL) || body.contains(MANIFEST_BODY_SIGNAL) {
        trace!("Manifest signal in {}", url);
        return Some(FormatTag::PackageJson);
    }

    if let Some(rule) = config
        .file_types
        .iter()
        .find(|rule| url.ends_with(&rule.pattern))
    {
        trace!("Suffix rule '{}' matched {}", rule.pattern, url);
        return Some(rule.format.clone());
    }

    if url.ends_with(SCRIPT_SUFFIX) || declared_mime_type == SCRIPT_MIME {
        return Some(FormatTag::JavaScript);
    }

    if url.ends_with(MARKDOWN_SUFFIX) {
        return Some(FormatTag::Markdown);
    }

    if body.contains(REQUIRE_SIGNAL) || body.contains(IMPORT_SIGNAL) {
        trace!("Inline script statements in {}", url);
        return Some(FormatTag::JavaScript);
    }

    config
        .file_types
        .iter()
        .find(|rule| url.contains(&rule.pattern))
        .map(|rule| rule.format.clone())
}

/// A classified item on its way to extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCandidate<'a> {
    pub url: &'a str,
    pub format: FormatTag,
    pub body: &'a str,
}

impl<'a> ManifestCandidate<'a> {
    /// Classify an item, returning `None` when it should be skipped.
    pub fn detect(item: &'a HttpItem, config: &Configuration) -> Option<Self> {
        let format = classify(&item.url, &item.mime_type, &item.body, config)?;
        Some(Self {
            url: &item.url,
            format,
            body: &item.body,
        })
    }
}
