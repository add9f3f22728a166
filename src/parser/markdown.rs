//! Markdown link extraction.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("valid markdown link regex"));

const REGISTRY_HOST_SIGNAL: &str = "npmjs.com";

/// Collect link targets that point at npmjs.com.
///
/// Targets are returned verbatim; see [`npm_link_package`] for recovering
/// the package name from a registry page URL.
pub fn extract(body: &str) -> BTreeSet<String> {
    LINK_RE
        .captures_iter(body)
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str())
        .filter(|target| target.contains(REGISTRY_HOST_SIGNAL))
        .map(str::to_string)
        .collect()
}

/// Package name referenced by an npmjs.com package page link.
///
/// Handles `https://www.npmjs.com/package/<name>` and
/// `https://npmjs.com/package/@scope/<name>` (including a `%2F`-encoded
/// scope separator). Anything else returns `None`.
pub fn npm_link_package(target: &str) -> Option<String> {
    let parsed = url::Url::parse(target).ok()?;
    let host = parsed.host_str()?;
    if host != REGISTRY_HOST_SIGNAL && !host.ends_with(".npmjs.com") {
        return None;
    }

    let decoded = urlencoding::decode(parsed.path()).ok()?;
    let mut segments = decoded.split('/').filter(|s| !s.is_empty());
    if segments.next()? != "package" {
        return None;
    }

    let first = segments.next()?;
    if first.starts_with('@') {
        let name = segments.next()?;
        return Some(format!("{}/{}", first, name));
    }

    Some(first.to_string())
}
