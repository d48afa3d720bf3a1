//! Audit status codes and the verdict returned to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::VERDICT_SCHEMA_VERSION;

/// Terminal status of an audit call.
///
/// Every failure mode has its own code so a caller can tell manipulated or
/// malformed data apart from a network that is genuinely fragile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// Contingency test ran and resilience cleared the pass threshold.
    Passed,
    /// Contingency test ran and resilience did not clear the threshold.
    Failed,
    /// Contingency test was not requested.
    NotRun,
    /// Rejected by the complexity governor.
    FailedGovernanceCheck,
    /// No anchor could be resolved.
    FailedNoAnchor,
    /// Duplicate node identifiers.
    FailedDuplicateIds,
    /// Negative declared spend.
    FailedNegativeSpend,
    /// NaN/infinite numbers or dangling references.
    FailedInvalidData,
    /// Dependency cycle in adversarial mode.
    FailedCycles,
    /// Declared spend exceeds the inflation cap.
    FailedInflation,
    /// Tier label outside the legal set.
    FailedInvalidTier,
    /// Baseline flow is zero.
    FailedZeroFlow,
    /// Too many critical nodes for exhaustive pairing.
    FailedComplexityCap,
}

impl AuditStatus {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::NotRun => "NOT_RUN",
            Self::FailedGovernanceCheck => "FAILED_GOVERNANCE_CHECK",
            Self::FailedNoAnchor => "FAILED_NO_ANCHOR",
            Self::FailedDuplicateIds => "FAILED_DUPLICATE_IDS",
            Self::FailedNegativeSpend => "FAILED_NEGATIVE_SPEND",
            Self::FailedInvalidData => "FAILED_INVALID_DATA",
            Self::FailedCycles => "FAILED_CYCLES",
            Self::FailedInflation => "FAILED_INFLATION",
            Self::FailedInvalidTier => "FAILED_INVALID_TIER",
            Self::FailedZeroFlow => "FAILED_ZERO_FLOW",
            Self::FailedComplexityCap => "FAILED_COMPLEXITY_CAP",
        }
    }

    /// Input was rejected before any flow was computed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::FailedGovernanceCheck
                | Self::FailedNoAnchor
                | Self::FailedDuplicateIds
                | Self::FailedNegativeSpend
                | Self::FailedInvalidData
                | Self::FailedCycles
                | Self::FailedInflation
                | Self::FailedInvalidTier
        )
    }

    /// Outcomes that call for elevated provisioning.
    pub fn is_adverse(&self) -> bool {
        matches!(
            self,
            Self::Failed | Self::FailedZeroFlow | Self::FailedComplexityCap
        )
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which resilience strategy produced the contingency figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Exhaustive N-1 / N-2 max-flow contingency search.
    FlowContingency,
    /// Eigenvector concentration fallback for tiny graphs.
    SpectralFallback,
}

/// Structured result of one audit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Terminal status.
    pub status: AuditStatus,
    /// Flow retained under the worst contingency, in [0, 1].
    /// Present only when contingency testing completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resilience_score: Option<f64>,
    /// Maximum deliverable flow of the intact network (0 when not computed).
    pub baseline_flow: f64,
    /// Flow left after the worst single or pair removal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_case_flow: Option<f64>,
    /// Expected contagion loss under the active policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_contagion_loss: Option<f64>,
    /// Effective loss-given-default of the active policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_given_default: Option<f64>,
    /// Critical node ids, most damaging first.
    pub critical_nodes: Vec<String>,
    /// Most damaging node pair, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_pair: Option<(String, String)>,
    /// Strategy that produced the contingency figures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<AnalysisKind>,
    /// Ordered diagnostics; the first entry explains a rejection.
    pub reasons: Vec<String>,
    /// Policy tier actually applied.
    pub policy_tier: String,
    /// Fingerprint of the policy and thresholds in force.
    pub config_fingerprint: String,
    /// SHA-256 fingerprint of the canonical request.
    pub input_fingerprint: String,
    /// Verdict schema version.
    pub schema_version: String,
}

impl Verdict {
    /// Create an empty verdict with the given status.
    pub fn new(
        status: AuditStatus,
        policy_tier: impl Into<String>,
        config_fingerprint: impl Into<String>,
        input_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            status,
            resilience_score: None,
            baseline_flow: 0.0,
            worst_case_flow: None,
            expected_contagion_loss: None,
            loss_given_default: None,
            critical_nodes: Vec::new(),
            worst_pair: None,
            strategy: None,
            reasons: Vec::new(),
            policy_tier: policy_tier.into(),
            config_fingerprint: config_fingerprint.into(),
            input_fingerprint: input_fingerprint.into(),
            schema_version: VERDICT_SCHEMA_VERSION.to_string(),
        }
    }

    /// Set the baseline flow.
    pub fn with_baseline(mut self, baseline_flow: f64) -> Self {
        self.baseline_flow = baseline_flow;
        self
    }

    /// Set the contingency figures.
    pub fn with_contingency(
        mut self,
        strategy: AnalysisKind,
        resilience_score: Option<f64>,
        worst_case_flow: Option<f64>,
    ) -> Self {
        self.strategy = Some(strategy);
        self.resilience_score = resilience_score;
        self.worst_case_flow = worst_case_flow;
        self
    }

    /// Set the financial figures.
    pub fn with_financials(mut self, expected_loss: f64, loss_given_default: f64) -> Self {
        self.expected_contagion_loss = Some(expected_loss);
        self.loss_given_default = Some(loss_given_default);
        self
    }

    /// Set the critical nodes and worst pair.
    pub fn with_critical_nodes(
        mut self,
        critical_nodes: Vec<String>,
        worst_pair: Option<(String, String)>,
    ) -> Self {
        self.critical_nodes = critical_nodes;
        self.worst_pair = worst_pair;
        self
    }

    /// Append diagnostic reasons.
    pub fn with_reasons<I, S>(mut self, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reasons.extend(reasons.into_iter().map(Into::into));
        self
    }

    /// Whether the audit passed.
    pub fn is_passed(&self) -> bool {
        self.status == AuditStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&AuditStatus::FailedGovernanceCheck).unwrap();
        assert_eq!(json, "\"FAILED_GOVERNANCE_CHECK\"");

        let json = serde_json::to_string(&AuditStatus::NotRun).unwrap();
        assert_eq!(json, "\"NOT_RUN\"");
    }

    #[test]
    fn test_status_display_matches_serde() {
        for status in [
            AuditStatus::Passed,
            AuditStatus::FailedZeroFlow,
            AuditStatus::FailedComplexityCap,
            AuditStatus::FailedInvalidTier,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.to_string());
        }
    }

    #[test]
    fn test_rejections_are_not_adverse() {
        assert!(AuditStatus::FailedCycles.is_rejection());
        assert!(!AuditStatus::FailedCycles.is_adverse());
        assert!(AuditStatus::Failed.is_adverse());
        assert!(!AuditStatus::Passed.is_adverse());
        assert!(!AuditStatus::NotRun.is_adverse());
    }

    #[test]
    fn test_resilience_omitted_when_absent() {
        let verdict = Verdict::new(AuditStatus::NotRun, "standard", "cfg", "input");
        let json = serde_json::to_value(&verdict).unwrap();

        assert!(json.get("resilience_score").is_none());
        assert_eq!(json["status"], "NOT_RUN");
        assert_eq!(json["schema_version"], VERDICT_SCHEMA_VERSION);
    }
}
