//! Scanner running the classify → extract → check → assemble pipeline.

use crate::classifier::ManifestCandidate;
use crate::config::Configuration;
use crate::finding::assemble;
use crate::parser::{extract, is_local_or_builtin, npm_link_package};
use crate::registry::RegistryChecker;
use crate::types::{Finding, FormatTag, HttpItem, ItemReport};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Knobs for how the scanner drives the pipeline.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Registry checks in flight per item.
    pub concurrency: usize,
    /// Items inspected in parallel by [`Scanner::inspect_all`].
    pub parallel: usize,
    /// Drop relative paths and Node.js built-ins before checking.
    pub skip_local: bool,
    /// Check the package behind an npmjs.com link rather than the link itself.
    pub resolve_registry_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 50,
            parallel: 4,
            skip_local: false,
            resolve_registry_links: false,
        }
    }
}

/// Runs the detection pipeline over captured items.
///
/// Holds no per-item state: every inspection depends only on its input and
/// the shared configuration snapshot.
pub struct Scanner {
    config: Arc<Configuration>,
    checker: Arc<RegistryChecker>,
    options: ScanOptions,
}

impl Scanner {
    pub fn new(config: Arc<Configuration>, checker: RegistryChecker, options: ScanOptions) -> Self {
        Self {
            config,
            checker: Arc::new(checker),
            options,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Inspect an item from live traffic, honoring `real_time_monitoring`.
    ///
    /// Returns `None` when monitoring is switched off.
    pub async fn observe(&self, item: &HttpItem) -> Option<ItemReport> {
        if !self.config.real_time_monitoring {
            trace!("Monitoring disabled, ignoring {}", item.url);
            return None;
        }
        Some(self.inspect(item).await)
    }

    /// Inspect a single item.
    pub async fn inspect(&self, item: &HttpItem) -> ItemReport {
        let start_time = Instant::now();

        let Some(candidate) = ManifestCandidate::detect(item, &self.config) else {
            trace!("No manifest format for {}", item.url);
            return ItemReport {
                url: item.url.clone(),
                format: None,
                dependencies_found: 0,
                findings: Vec::new(),
                duration_secs: start_time.elapsed().as_secs_f64(),
            };
        };

        let names = self.candidate_names(&candidate);
        debug!(
            "{} classified as {}, {} names to check",
            candidate.url,
            candidate.format,
            names.len()
        );

        let config = self.config.as_ref();
        let checker = self.checker.as_ref();
        let format = &candidate.format;
        let url = candidate.url;

        let mut findings: Vec<Finding> = stream::iter(names.iter())
            .map(|name| async move {
                let verdict = checker.check(name, config).await;
                assemble(name, format, url, verdict)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        // Sort findings by name for consistent output
        findings.sort_by(|a, b| a.dependency.cmp(&b.dependency));

        ItemReport {
            url: item.url.clone(),
            format: Some(candidate.format.clone()),
            dependencies_found: names.len(),
            findings,
            duration_secs: start_time.elapsed().as_secs_f64(),
        }
    }

    /// Inspect many items concurrently, returning reports in input order.
    pub async fn inspect_all(&self, items: &[HttpItem]) -> Vec<ItemReport> {
        self.inspect_all_with(items, |_| {}).await
    }

    /// Like [`inspect_all`](Self::inspect_all), calling `on_report` as each report completes.
    pub async fn inspect_all_with<F>(
        &self,
        items: &[HttpItem],
        mut on_report: F,
    ) -> Vec<ItemReport>
    where
        F: FnMut(&ItemReport),
    {
        stream::iter(items)
            .map(|item| self.inspect(item))
            .buffered(self.options.parallel.max(1))
            .inspect(|report| on_report(report))
            .collect()
            .await
    }

    /// Extract names and apply the optional refinements.
    fn candidate_names(&self, candidate: &ManifestCandidate<'_>) -> BTreeSet<String> {
        extract(&candidate.format, candidate.body)
            .into_iter()
            .map(|name| {
                if self.options.resolve_registry_links && candidate.format == FormatTag::Markdown {
                    npm_link_package(&name).unwrap_or(name)
                } else {
                    name
                }
            })
            .filter(|name| {
                let skip = self.options.skip_local && is_local_or_builtin(name);
                if skip {
                    trace!("Skipping local or built-in module: {}", name);
                }
                !skip
            })
            .collect()
    }
}
