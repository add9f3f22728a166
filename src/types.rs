//! Core types and errors for the dependency confusion detector.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur outside the core pipeline (config, fetching, I/O).
#[derive(Error, Debug)]
pub enum DepsniffError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, DepsniffError>;

/// Manifest format chosen by the classifier.
///
/// Serialized as the plain tag string used in the configuration document.
/// Tags without an extractor survive as [`FormatTag::Other`] and extract to
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatTag {
    /// npm-style `package.json` manifest.
    PackageJson,
    /// JavaScript source with `require`/`import` statements.
    JavaScript,
    /// Markdown document linking to registry pages.
    Markdown,
    /// Any tag with no known extractor.
    Other(String),
}

impl FormatTag {
    pub fn as_str(&self) -> &str {
        match self {
            FormatTag::PackageJson => "package_json",
            FormatTag::JavaScript => "javascript",
            FormatTag::Markdown => "markdown",
            FormatTag::Other(tag) => tag,
        }
    }
}

impl From<&str> for FormatTag {
    fn from(tag: &str) -> Self {
        match tag {
            "package_json" => FormatTag::PackageJson,
            "javascript" => FormatTag::JavaScript,
            "markdown" => FormatTag::Markdown,
            other => FormatTag::Other(other.to_string()),
        }
    }
}

impl From<String> for FormatTag {
    fn from(tag: String) -> Self {
        FormatTag::from(tag.as_str())
    }
}

impl From<FormatTag> for String {
    fn from(tag: FormatTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public package registries the checker knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    Npm,
}

impl Registry {
    pub fn name(&self) -> &'static str {
        match self {
            Registry::Npm => "npm",
        }
    }
}

/// Outcome of checking one dependency name against the enabled registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryVerdict {
    /// Existence per registry that was queried.
    pub registries: BTreeMap<Registry, bool>,
    /// True iff the name exists in none of the queried registries.
    pub confusable: bool,
}

impl RegistryVerdict {
    /// Build a verdict from per-registry existence results.
    ///
    /// An empty map yields `confusable = true`: no verification is treated
    /// as maximal risk.
    pub fn from_existence(registries: BTreeMap<Registry, bool>) -> Self {
        let confusable = !registries.values().any(|exists| *exists);
        Self {
            registries,
            confusable,
        }
    }

    pub fn exists_in(&self, registry: Registry) -> Option<bool> {
        self.registries.get(&registry).copied()
    }
}

/// Risk attached to a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    /// Name resolves in a public registry.
    Low,
    /// Name is absent from every consulted registry.
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("Low"),
            RiskLevel::High => f.write_str("High"),
        }
    }
}

/// A dependency reference paired with its registry verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The extracted dependency name, as found in the manifest.
    pub dependency: String,
    /// Format the name was extracted from.
    pub format: FormatTag,
    /// URL (or path) of the inspected item.
    pub source_url: String,
    /// High when confusable, Low otherwise.
    pub risk_level: RiskLevel,
    /// Registry check details.
    pub verdict: RegistryVerdict,
}

/// Confidence attached to an issue reported to a host scanning tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Confidence {
    Certain,
    Firm,
    Tentative,
}

/// Plain issue record for host scanning tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanIssue {
    pub name: String,
    pub severity: RiskLevel,
    pub confidence: Confidence,
    pub description: String,
    pub remediation: String,
    /// The originating finding as JSON.
    pub evidence: String,
}

/// One unit of captured traffic or a file handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpItem {
    /// Request URL, or the file path for local inputs.
    pub url: String,
    /// Coarse MIME marker (`script`, `json`, `html`, `text`) or empty.
    pub mime_type: String,
    /// Response body or file contents.
    pub body: String,
}

impl HttpItem {
    pub fn new(
        url: impl Into<String>,
        mime_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
            body: body.into(),
        }
    }

    /// Build an item from raw body bytes. Invalid UTF-8 is replaced, never rejected.
    pub fn from_bytes(url: impl Into<String>, mime_type: impl Into<String>, body: &[u8]) -> Self {
        Self::new(url, mime_type, String::from_utf8_lossy(body).into_owned())
    }

    /// Read a local file as an item with no declared MIME type.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(path.display().to_string(), "", &bytes))
    }
}

/// Result of inspecting a single item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    /// URL or path of the inspected item.
    pub url: String,
    /// Detected format, if any.
    pub format: Option<FormatTag>,
    /// Number of distinct names checked.
    pub dependencies_found: usize,
    /// One finding per checked name, sorted by name.
    pub findings: Vec<Finding>,
    /// Inspection duration in seconds.
    pub duration_secs: f64,
}

impl ItemReport {
    pub fn high_risk_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.risk_level == RiskLevel::High)
            .count()
    }
}

/// Deduplication set for content hashes.
pub type ContentHashSet = HashSet<String>;

/// Configuration for HTTP fetching.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            user_agent: "Mozilla/5.0 (compatible; depsniff/0.1)".to_string(),
        }
    }
}
