//! depsniff - dependency confusion detector.
//!
//! This library inspects captured traffic or files for dependency references
//! and checks whether each name is missing from public registries:
//! - Classifying a URL/body pair as a manifest format
//! - Extracting dependency names per format (package.json, JavaScript, Markdown)
//! - Querying the npm registry for each name, with failures read as "absent"
//! - Assembling findings with a High/Low risk level
//!
//! # Example
//!
//! ```no_run
//! use depsniff::{classify, extract, assemble, Configuration, RegistryChecker};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Configuration::default();
//!     let checker = RegistryChecker::from_config(&config).unwrap();
//!
//!     let url = "https://example.com/package.json";
//!     let body = r#"{"dependencies": {"acme-internal-auth": "1.0.0"}}"#;
//!
//!     if let Some(format) = classify(url, "json", body, &config) {
//!         for name in extract(&format, body) {
//!             let verdict = checker.check(&name, &config).await;
//!             let finding = assemble(&name, &format, url, verdict);
//!             println!("{} -> {}", finding.dependency, finding.risk_level);
//!         }
//!     }
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod discovery;
pub mod finding;
pub mod notify;
pub mod parser;
pub mod registry;
pub mod scanner;
pub mod store;
pub mod types;

pub use classifier::{classify, ManifestCandidate};
pub use config::{Commands, Config, Configuration, FileTypeRule, ScanConfig};
pub use finding::assemble;
pub use parser::extract;
pub use registry::RegistryChecker;
pub use scanner::{ScanOptions, Scanner};
pub use store::FindingStore;
pub use types::{
    DepsniffError, Finding, FormatTag, HttpItem, ItemReport, Registry, RegistryVerdict, Result,
    RiskLevel, ScanIssue,
};
