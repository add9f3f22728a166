//! Deduplicating store for findings gathered across many inspected items.

use crate::types::{Finding, RiskLevel};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Findings keyed by (dependency name, source URL).
///
/// Clones share the same underlying map, so concurrent inspections can
/// feed one store.
#[derive(Debug, Clone, Default)]
pub struct FindingStore {
    findings: Arc<DashMap<(String, String), Finding>>,
}

impl FindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finding unless one with the same key is already stored.
    ///
    /// Returns `true` when the finding was new.
    pub fn insert(&self, finding: Finding) -> bool {
        let key = (finding.dependency.clone(), finding.source_url.clone());
        match self.findings.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                trace!("Duplicate finding: {} @ {}", finding.dependency, finding.source_url);
                false
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(finding);
                true
            }
        }
    }

    /// Insert many findings, returning how many were new.
    pub fn extend(&self, findings: impl IntoIterator<Item = Finding>) -> usize {
        findings
            .into_iter()
            .map(|f| self.insert(f))
            .filter(|inserted| *inserted)
            .count()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Snapshot of all findings, sorted by dependency name then source URL.
    pub fn findings(&self) -> Vec<Finding> {
        let mut all: Vec<Finding> = self.findings.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| {
            a.dependency
                .cmp(&b.dependency)
                .then_with(|| a.source_url.cmp(&b.source_url))
        });
        all
    }

    pub fn high_risk_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|e| e.value().risk_level == RiskLevel::High)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::assemble;
    use crate::types::{FormatTag, Registry, RegistryVerdict};
    use std::collections::BTreeMap;

    fn finding(name: &str, url: &str, exists: bool) -> Finding {
        let verdict = RegistryVerdict::from_existence(BTreeMap::from([(Registry::Npm, exists)]));
        assemble(name, &FormatTag::JavaScript, url, verdict)
    }

    #[test]
    fn test_dedup_by_name_and_url() {
        let store = FindingStore::new();
        assert!(store.insert(finding("a", "https://x/1.js", false)));
        assert!(!store.insert(finding("a", "https://x/1.js", true)));
        assert!(store.insert(finding("a", "https://x/2.js", false)));
        assert!(store.insert(finding("b", "https://x/1.js", true)));

        assert_eq!(store.len(), 3);
        assert_eq!(store.high_risk_count(), 2);

        // First insert wins.
        let first = &store.findings()[0];
        assert_eq!(first.source_url, "https://x/1.js");
        assert_eq!(first.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_findings_sorted() {
        let store = FindingStore::new();
        store.extend(vec![
            finding("zeta", "u", true),
            finding("alpha", "v", true),
            finding("alpha", "u", true),
        ]);
        let order: Vec<(String, String)> = store
            .findings()
            .into_iter()
            .map(|f| (f.dependency, f.source_url))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha".to_string(), "u".to_string()),
                ("alpha".to_string(), "v".to_string()),
                ("zeta".to_string(), "u".to_string()),
            ]
        );
    }

    #[test]
    fn test_concurrent_inserts() {
        let store = FindingStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.insert(finding(&format!("pkg-{}", i), "https://x/app.js", false));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 50);
        assert!(!store.is_empty());
    }
}
