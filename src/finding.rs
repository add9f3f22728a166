//! Finding assembly and issue records.

use crate::types::{Confidence, Finding, FormatTag, RegistryVerdict, RiskLevel, ScanIssue};

const ISSUE_BACKGROUND: &str = "Dependency confusion occurs when private dependencies are \
    referenced by public names. This issue highlights a potential risk.";

const ISSUE_REMEDIATION: &str = "Consider using scoped/private registries, and verifying all \
    dependencies are published/private.";

/// Combine a dependency name, its provenance and its verdict into a finding.
pub fn assemble(
    dependency: &str,
    format: &FormatTag,
    source_url: &str,
    verdict: RegistryVerdict,
) -> Finding {
    let risk_level = if verdict.confusable {
        RiskLevel::High
    } else {
        RiskLevel::Low
    };

    Finding {
        dependency: dependency.to_string(),
        format: format.clone(),
        source_url: source_url.to_string(),
        risk_level,
        verdict,
    }
}

impl Finding {
    /// Whether the dependency was absent from every consulted registry.
    pub fn is_confusable(&self) -> bool {
        self.verdict.confusable
    }

    /// Issue record for reporting through a host scanning tool.
    pub fn to_issue(&self) -> ScanIssue {
        ScanIssue {
            name: format!("Potential Dependency Confusion: {}", self.dependency),
            severity: self.risk_level,
            confidence: Confidence::Firm,
            description: ISSUE_BACKGROUND.to_string(),
            remediation: ISSUE_REMEDIATION.to_string(),
            evidence: serde_json::to_string(self).unwrap_or_default(),
        }
    }
}
