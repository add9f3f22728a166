//! Configuration handling: the JSON configuration document and the CLI.

use crate::types::{DepsniffError, FormatTag, HttpConfig, Registry, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "confusion_config.json";

/// Default per-query registry timeout.
pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 3;

/// Longest accepted per-query registry timeout.
pub const MAX_REGISTRY_TIMEOUT_SECS: u64 = 30;

/// Default npm registry endpoint.
pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmjs.org";

/// A URL pattern mapped to the format it identifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeRule {
    /// Suffix (or substring, in the fallback pass) matched against the URL.
    pub pattern: String,
    pub format: FormatTag,
}

impl FileTypeRule {
    pub fn new(pattern: impl Into<String>, format: impl Into<FormatTag>) -> Self {
        Self {
            pattern: pattern.into(),
            format: format.into(),
        }
    }
}

/// Detector configuration, read-only for the duration of a pipeline run.
///
/// Serialized as:
///
/// ```json
/// {
///   "real_time_monitoring": true,
///   "file_types": { ".js": "javascript", ".json": "package_json", ".md": "markdown" },
///   "enable_npm": true
/// }
/// ```
///
/// `file_types` keeps document order; the classifier tries rules in that order.
/// Keys not modeled here are kept in `extra` and written back by [`save`](Self::save).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "default_true")]
    pub real_time_monitoring: bool,

    #[serde(default, with = "file_type_rules")]
    pub file_types: Vec<FileTypeRule>,

    #[serde(default = "default_true")]
    pub enable_npm: bool,

    /// Per-query timeout for registry lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_timeout_secs: Option<u64>,

    /// Alternate npm endpoint (mirror or test server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm_registry_url: Option<String>,

    /// Unrecognized keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            real_time_monitoring: true,
            file_types: vec![
                FileTypeRule::new(".js", FormatTag::JavaScript),
                FileTypeRule::new(".json", FormatTag::PackageJson),
                FileTypeRule::new(".md", FormatTag::Markdown),
            ],
            enable_npm: true,
            registry_timeout_secs: None,
            npm_registry_url: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl Configuration {
    /// Load the configuration document, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;

        for rule in &config.file_types {
            if let FormatTag::Other(tag) = &rule.format {
                warn!(
                    "File type rule '{}' maps to '{}', which has no extractor; \
                     matches will be skipped",
                    rule.pattern, tag
                );
            }
        }

        Ok(config)
    }

    /// Write the configuration back as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref registry_url) = self.npm_registry_url {
            let parsed = url::Url::parse(registry_url)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(DepsniffError::ConfigError(format!(
                    "npm_registry_url must be http(s), got '{}'",
                    registry_url
                )));
            }
        }

        match self.registry_timeout_secs {
            Some(0) => {
                return Err(DepsniffError::ConfigError(
                    "registry_timeout_secs must be greater than zero".to_string(),
                ));
            }
            Some(secs) if secs > MAX_REGISTRY_TIMEOUT_SECS => {
                return Err(DepsniffError::ConfigError(format!(
                    "registry_timeout_secs must be at most {}, got {}",
                    MAX_REGISTRY_TIMEOUT_SECS, secs
                )));
            }
            _ => {}
        }

        Ok(())
    }

    /// Enablement flag per known registry.
    pub fn registry_toggles(&self) -> BTreeMap<Registry, bool> {
        BTreeMap::from([(Registry::Npm, self.enable_npm)])
    }

    /// Registries that should be consulted, in a stable order.
    pub fn enabled_registries(&self) -> Vec<Registry> {
        self.registry_toggles()
            .into_iter()
            .filter_map(|(registry, enabled)| enabled.then_some(registry))
            .collect()
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(
            self.registry_timeout_secs
                .unwrap_or(DEFAULT_REGISTRY_TIMEOUT_SECS),
        )
    }

    pub fn npm_registry_url(&self) -> &str {
        self.npm_registry_url
            .as_deref()
            .unwrap_or(DEFAULT_NPM_REGISTRY)
    }
}

/// Order-preserving (de)serialization of `file_types` as a JSON object.
mod file_type_rules {
    use super::FileTypeRule;
    use crate::types::FormatTag;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(rules: &[FileTypeRule], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(rules.len()))?;
        for rule in rules {
            map.serialize_entry(&rule.pattern, &rule.format)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<FileTypeRule>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RulesVisitor)
    }

    struct RulesVisitor;

    impl<'de> Visitor<'de> for RulesVisitor {
        type Value = Vec<FileTypeRule>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object mapping URL patterns to format tags")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut rules: Vec<FileTypeRule> = Vec::with_capacity(access.size_hint().unwrap_or(0));

            while let Some((pattern, format)) = access.next_entry::<String, FormatTag>()? {
                // Repeated keys keep their first position and take the last value.
                match rules.iter_mut().find(|rule| rule.pattern == pattern) {
                    Some(existing) => existing.format = format,
                    None => rules.push(FileTypeRule { pattern, format }),
                }
            }

            Ok(rules)
        }
    }
}

/// Dependency confusion detector for captured traffic and manifest files.
#[derive(Parser, Debug, Clone)]
#[command(name = "depsniff")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the JSON configuration document
    #[arg(
        short,
        long,
        env = "DEPSNIFF_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Inspect URLs or files for confusable dependencies
    Scan(ScanConfig),
    /// Check dependency names directly against the registries
    Check(CheckConfig),
    /// Write the default configuration document
    InitConfig(InitConfig),
}

/// Configuration for the check command.
#[derive(Parser, Debug, Clone)]
pub struct CheckConfig {
    /// Dependency names to check
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Configuration for the init-config command.
#[derive(Parser, Debug, Clone)]
pub struct InitConfig {
    /// Overwrite an existing configuration document
    #[arg(long)]
    pub force: bool,
}

/// Configuration for the scan command.
#[derive(Parser, Debug, Clone)]
pub struct ScanConfig {
    /// URLs or file paths to inspect
    #[arg(required_unless_present = "file")]
    pub targets: Vec<String>,

    /// File containing targets to inspect (one per line)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit issue records instead of raw findings in JSON output
    #[arg(long)]
    pub issues: bool,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fetch timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Maximum retries for failed fetches
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Rate limit for fetches and registry lookups (requests per second)
    #[arg(long, default_value = "10")]
    pub rate_limit: u32,

    /// Number of targets to inspect in parallel
    #[arg(long, short = 'p', default_value = "4")]
    pub parallel: usize,

    /// Skip relative paths and Node.js built-ins before registry checks
    #[arg(long)]
    pub skip_local: bool,

    /// Check the package named by npmjs.com links instead of the raw link
    #[arg(long)]
    pub resolve_registry_links: bool,

    /// Quiet mode: only show output for targets with high-risk findings
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Custom User-Agent string
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            file: None,
            json: false,
            issues: false,
            output: None,
            timeout: 30,
            max_retries: 3,
            rate_limit: 10,
            parallel: 4,
            skip_local: false,
            resolve_registry_links: false,
            quiet: false,
            user_agent: None,
        }
    }
}

/// Where a scan target comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    Url(String),
    File(PathBuf),
}

impl ScanConfig {
    /// Get HTTP configuration from scan config.
    pub fn http_config(&self) -> HttpConfig {
        let defaults = HttpConfig::default();
        HttpConfig {
            timeout_secs: self.timeout,
            max_retries: self.max_retries,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }

    /// Collect targets from the command line and the target list file.
    ///
    /// Existing paths are read as files; anything else is fetched, with
    /// bare hosts upgraded to `https://`.
    pub fn load_targets(&self) -> Result<Vec<ScanTarget>> {
        let mut raw = self.targets.clone();

        if let Some(ref file_path) = self.file {
            let content = std::fs::read_to_string(file_path)?;
            for line in content.lines() {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    raw.push(trimmed.to_string());
                }
            }
        }

        Ok(raw.into_iter().map(|t| classify_target(&t)).collect())
    }
}

fn classify_target(target: &str) -> ScanTarget {
    if target.starts_with("http://") || target.starts_with("https://") {
        return ScanTarget::Url(target.to_string());
    }

    let path = Path::new(target);
    if path.exists() {
        return ScanTarget::File(path.to_path_buf());
    }

    ScanTarget::Url(format!("https://{}", target))
}
