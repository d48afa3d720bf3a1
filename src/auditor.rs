//! Auditor: the single entry point of the pipeline.
//!
//! ```text
//! AuditRequest → ComplexityGovernor → SupplyGraph → baseline max-flow
//!              → ResilienceStrategy (adversarial only) → finance → Verdict
//! ```
//!
//! Every stage failure becomes a fully-formed [`Verdict`]; nothing panics
//! or escapes for parseable input. The first reason of a rejected verdict
//! explains the rejection; advisories follow.

use std::borrow::Cow;
use std::iter;

use tracing::{debug, info, info_span, warn};

use crate::canonical::canonical_hash_hex;
use crate::canonical_input::compute_input_fingerprint;
use crate::finance;
use crate::flow::{FlowNetworkBuilder, FLOW_EPSILON};
use crate::governance::ComplexityGovernor;
use crate::graph::{scale_free_dependencies, AnchorResolution, GraphOptions, SupplyGraph};
use crate::policy::{AuditThresholds, PolicyBank, RiskPolicy};
use crate::sentinel::{select_strategy, ContingencyAbort};
use crate::types::{
    AnalysisKind, AuditRequest, AuditStatus, DependencyRecord, RequestError, SupplierRecord,
    Verdict,
};

/// Orchestrates one audit per call. Holds no per-call state.
#[derive(Debug, Clone)]
pub struct Auditor<'b> {
    bank: &'b PolicyBank,
    thresholds: AuditThresholds,
    governor: ComplexityGovernor,
}

impl Auditor<'static> {
    /// Auditor over the global policy bank with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(PolicyBank::global(), AuditThresholds::default())
    }
}

impl<'b> Auditor<'b> {
    /// Auditor over a policy bank.
    pub fn new(bank: &'b PolicyBank, thresholds: AuditThresholds) -> Self {
        Self {
            bank,
            governor: ComplexityGovernor::new(thresholds.clone()),
            thresholds,
        }
    }

    /// Thresholds in force.
    pub fn thresholds(&self) -> &AuditThresholds {
        &self.thresholds
    }

    /// Parse a JSON request and audit it.
    pub fn audit_json(&self, json: &str) -> Result<Verdict, RequestError> {
        Ok(self.audit(&AuditRequest::from_json(json)?))
    }

    /// Audit one request.
    pub fn audit(&self, request: &AuditRequest) -> Verdict {
        let input_fingerprint = compute_input_fingerprint(request);
        let span = info_span!(
            "audit",
            input = %&input_fingerprint[..16],
            adversarial = request.run_adversarial_test,
            nodes = request.suppliers.len(),
        );
        let _enter = span.enter();

        let mut advisories = Vec::new();
        let policy = self.resolve_policy(&request.policy_tier, &mut advisories);
        let config_fingerprint = canonical_hash_hex(&(
            self.bank.fingerprint(),
            policy.params_hash(),
            self.thresholds.fingerprint(),
        ));
        let verdict = |status: AuditStatus| {
            Verdict::new(
                status,
                policy.name.clone(),
                config_fingerprint.clone(),
                input_fingerprint.clone(),
            )
        };

        let exposure = request.effective_exposure();
        let caller_dependencies = request.dependencies.as_deref().unwrap_or(&[]);

        let check = self
            .governor
            .validate(&request.suppliers, caller_dependencies, exposure);
        if let Some(status) = check.status() {
            warn!(status = %status, "Audit rejected by governance");
            return verdict(status)
                .with_reasons(check.reasons())
                .with_reasons(advisories);
        }
        advisories.extend(check.advisories.iter().map(ToString::to_string));

        let dependencies: Cow<'_, [DependencyRecord]> = match &request.dependencies {
            Some(dependencies) => Cow::Borrowed(dependencies.as_slice()),
            None if request.run_adversarial_test => {
                let status = AuditStatus::FailedInvalidData;
                warn!(status = %status, "Adversarial audit without dependencies");
                return verdict(status)
                    .with_reasons(iter::once(format!(
                        "{}: Adversarial testing requires explicit dependencies",
                        status
                    )))
                    .with_reasons(advisories);
            }
            None => {
                advisories.push(
                    "INFO_FALLBACK_TOPOLOGY: No dependencies supplied; using an illustrative scale-free topology"
                        .to_string(),
                );
                Cow::Owned(scale_free_dependencies(&request.suppliers))
            }
        };

        let options = GraphOptions::new(self.thresholds.inflation_cap)
            .require_acyclic(request.run_adversarial_test);
        let graph = match SupplyGraph::build(&request.suppliers, &dependencies, exposure, &options) {
            Ok(graph) => graph,
            Err(err) => {
                let status = err.status();
                warn!(status = %status, error = %err, "Graph hygiene check failed");
                return verdict(status)
                    .with_reasons(iter::once(format!("{}: {}", status, err)))
                    .with_reasons(advisories);
            }
        };

        if graph.anchor_resolution() == AnchorResolution::FirstNode {
            warn!(anchor = graph.id(graph.anchor()), "No declared anchor; using the first node");
        }

        let baseline = FlowNetworkBuilder::new(&graph, exposure).build().max_flow();
        let lgd = policy.effective_lgd();
        debug!(baseline, edges = graph.edges().len(), "Baseline flow computed");

        if !request.run_adversarial_test {
            let status = AuditStatus::NotRun;
            let loss = finance::translate(exposure, &policy, 0.0, status);
            info!(status = %status, baseline, loss, "Audit complete");
            return verdict(status)
                .with_baseline(baseline)
                .with_financials(loss, lgd)
                .with_reasons(advisories);
        }

        // Spectral analysis reads topology only, so zero flow aborts the
        // flow search alone.
        let strategy = select_strategy(&graph, &self.thresholds);
        if baseline <= FLOW_EPSILON && strategy.kind() == AnalysisKind::FlowContingency {
            return aborted(
                verdict,
                &policy,
                exposure,
                baseline,
                ContingencyAbort::ZeroFlow,
                None,
                advisories,
            );
        }

        match strategy.assess(&graph, baseline) {
            Ok(assessment) => {
                let status = if policy.passes(assessment.resilience) {
                    AuditStatus::Passed
                } else {
                    AuditStatus::Failed
                };
                if let Some(advisory) = self
                    .governor
                    .analyze_criticality_ratio(graph.len(), assessment.critical_nodes.len())
                {
                    warn!(code = advisory.code(), "Dilution advisory");
                    advisories.push(advisory.to_string());
                }

                let loss = finance::translate(exposure, &policy, assessment.relative_drop, status);
                info!(
                    status = %status,
                    resilience = assessment.resilience,
                    critical = assessment.critical_nodes.len(),
                    loss,
                    "Audit complete"
                );

                verdict(status)
                    .with_baseline(baseline)
                    .with_contingency(
                        assessment.strategy,
                        Some(assessment.resilience),
                        assessment.worst_case_flow,
                    )
                    .with_critical_nodes(assessment.critical_nodes, assessment.worst_pair)
                    .with_financials(loss, lgd)
                    .with_reasons(advisories)
            }
            Err(abort) => {
                let kind = strategy.kind();
                aborted(verdict, &policy, exposure, baseline, abort, Some(kind), advisories)
            }
        }
    }

    fn resolve_policy(&self, tier: &str, advisories: &mut Vec<String>) -> RiskPolicy {
        match self.bank.resolve_or_default(tier) {
            Some((policy, false)) => policy.clone(),
            Some((policy, true)) => {
                warn!(requested = tier, applied = %policy.name, "Unknown policy tier");
                advisories.push(format!(
                    "WARN_POLICY_FALLBACK: Unknown policy tier '{}', applied '{}'",
                    tier, policy.name
                ));
                policy.clone()
            }
            None => {
                let policy = RiskPolicy::standard();
                warn!(requested = tier, "Policy bank has no default tier");
                advisories.push(format!(
                    "WARN_POLICY_FALLBACK: Unknown policy tier '{}', applied built-in '{}'",
                    tier, policy.name
                ));
                policy
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn aborted(
    verdict: impl Fn(AuditStatus) -> Verdict,
    policy: &RiskPolicy,
    exposure: f64,
    baseline: f64,
    abort: ContingencyAbort,
    strategy: Option<AnalysisKind>,
    advisories: Vec<String>,
) -> Verdict {
    let status = abort.status();
    let reason = format!("{}: {}", status, abort);
    let (relative_drop, critical_nodes) = match abort {
        ContingencyAbort::ZeroFlow => (1.0, Vec::new()),
        ContingencyAbort::ComplexityCap {
            critical_nodes,
            worst_single_drop,
            ..
        } => (worst_single_drop / baseline, critical_nodes),
    };
    let loss = finance::translate(exposure, policy, relative_drop, status);
    warn!(status = %status, loss, "Contingency analysis aborted");

    let mut verdict = verdict(status)
        .with_baseline(baseline)
        .with_critical_nodes(critical_nodes, None)
        .with_financials(loss, policy.effective_lgd())
        .with_reasons(iter::once(reason))
        .with_reasons(advisories);
    verdict.strategy = strategy;
    verdict
}

/// Audit with the global policy bank and default thresholds.
///
/// `dependencies: None` substitutes the illustrative topology for
/// exploratory calls; adversarial calls must supply dependencies.
///
/// # Example
///
/// ```rust
/// use contagion_sentinel::{audit, AuditStatus, DependencyRecord, SupplierRecord};
///
/// let suppliers = vec![
///     SupplierRecord::new("R", "4", 100.0),
///     SupplierRecord::new("M", "3", 100.0),
///     SupplierRecord::new("P", "2", 100.0),
///     SupplierRecord::new("A", "Anchor", 0.0),
/// ];
/// let dependencies = vec![
///     DependencyRecord::new("R", "M"),
///     DependencyRecord::new("M", "P"),
///     DependencyRecord::new("P", "A"),
/// ];
///
/// let verdict = audit(&suppliers, 300.0, "standard", Some(dependencies.as_slice()), true);
/// assert_eq!(verdict.status, AuditStatus::Failed);
/// assert_eq!(verdict.resilience_score, Some(0.0));
/// ```
pub fn audit(
    suppliers: &[SupplierRecord],
    total_exposure: f64,
    policy_tier: &str,
    dependencies: Option<&[DependencyRecord]>,
    run_adversarial_test: bool,
) -> Verdict {
    let request = AuditRequest {
        suppliers: suppliers.to_vec(),
        total_exposure: Some(total_exposure),
        policy_tier: policy_tier.to_string(),
        dependencies: dependencies.map(<[DependencyRecord]>::to_vec),
        run_adversarial_test,
    };
    Auditor::with_defaults().audit(&request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Vec<SupplierRecord>, Vec<DependencyRecord>) {
        (
            vec![
                SupplierRecord::new("R", "4", 100.0),
                SupplierRecord::new("M", "3", 100.0),
                SupplierRecord::new("P", "2", 100.0),
                SupplierRecord::new("A", "Anchor", 0.0),
            ],
            vec![
                DependencyRecord::new("R", "M"),
                DependencyRecord::new("M", "P"),
                DependencyRecord::new("P", "A"),
            ],
        )
    }

    #[test]
    fn test_exploratory_call_is_not_run() {
        let (suppliers, deps) = chain();
        let verdict = audit(&suppliers, 300.0, "standard", Some(deps.as_slice()), false);

        assert_eq!(verdict.status, AuditStatus::NotRun);
        assert_eq!(verdict.baseline_flow, 100.0);
        assert_eq!(verdict.resilience_score, None);
        // 300 × 0.03 × 1 × 1
        assert!((verdict.expected_contagion_loss.unwrap() - 9.0).abs() < 1e-9);
        assert!((verdict.loss_given_default.unwrap() - 0.60).abs() < 1e-12);
    }

    #[test]
    fn test_chain_fails_stress_test() {
        let (suppliers, deps) = chain();
        let verdict = audit(&suppliers, 300.0, "standard", Some(deps.as_slice()), true);

        assert_eq!(verdict.status, AuditStatus::Failed);
        assert_eq!(verdict.resilience_score, Some(0.0));
        assert_eq!(verdict.worst_case_flow, Some(0.0));
        assert_eq!(verdict.critical_nodes, vec!["M", "P"]);
        assert_eq!(verdict.strategy, Some(AnalysisKind::FlowContingency));
        // 300 × 0.03 × 2 × 1.5
        assert!((verdict.expected_contagion_loss.unwrap() - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_node_graph_uses_spectral_fallback() {
        let suppliers = vec![
            SupplierRecord::new("S", "2", 100.0),
            SupplierRecord::new("A", "Anchor", 0.0),
        ];
        let deps = vec![DependencyRecord::new("S", "A")];
        let verdict = audit(&suppliers, 100.0, "standard", Some(deps.as_slice()), true);

        // tier 2 is not a source, yet the graph is still assessed
        assert_eq!(verdict.baseline_flow, 0.0);
        assert_eq!(verdict.strategy, Some(AnalysisKind::SpectralFallback));
        assert_eq!(verdict.status, AuditStatus::Failed);
        assert!((verdict.resilience_score.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(verdict.worst_case_flow, None);
        assert_eq!(verdict.critical_nodes, vec!["S"]);
        // 100 × 0.03 × 1.5 × 1.5
        assert!((verdict.expected_contagion_loss.unwrap() - 6.75).abs() < 1e-6);
    }

    #[test]
    fn test_zero_flow_aborts_flow_contingency() {
        let suppliers = vec![
            SupplierRecord::new("S", "3", 100.0),
            SupplierRecord::new("P", "2", 100.0),
            SupplierRecord::new("A", "Anchor", 0.0),
        ];
        let deps = vec![DependencyRecord::new("S", "A")];
        let verdict = audit(&suppliers, 200.0, "standard", Some(deps.as_slice()), true);

        assert_eq!(verdict.status, AuditStatus::FailedZeroFlow);
        assert_eq!(verdict.strategy, None);
        assert_eq!(verdict.resilience_score, None);
    }

    #[test]
    fn test_unknown_policy_falls_back_with_reason() {
        let (suppliers, deps) = chain();
        let verdict = audit(&suppliers, 300.0, "platinum", Some(deps.as_slice()), false);

        assert_eq!(verdict.policy_tier, "standard");
        assert!(verdict.reasons[0].starts_with("WARN_POLICY_FALLBACK"));
    }

    #[test]
    fn test_adversarial_requires_dependencies() {
        let (suppliers, _) = chain();
        let verdict = audit(&suppliers, 300.0, "standard", None, true);

        assert_eq!(verdict.status, AuditStatus::FailedInvalidData);
    }

    #[test]
    fn test_exploratory_without_dependencies_uses_fallback() {
        let (suppliers, _) = chain();
        let verdict = audit(&suppliers, 300.0, "standard", None, false);

        assert_eq!(verdict.status, AuditStatus::NotRun);
        assert!(verdict
            .reasons
            .iter()
            .any(|r| r.starts_with("INFO_FALLBACK_TOPOLOGY")));
        assert_eq!(verdict.baseline_flow, 100.0);
    }

    #[test]
    fn test_graph_error_becomes_verdict() {
        let (suppliers, mut deps) = chain();
        deps.push(DependencyRecord::new("P", "R"));
        let verdict = audit(&suppliers, 300.0, "standard", Some(deps.as_slice()), true);

        assert_eq!(verdict.status, AuditStatus::FailedCycles);
        assert!(verdict.reasons[0].starts_with("FAILED_CYCLES"));
        assert_eq!(verdict.expected_contagion_loss, None);
    }

    #[test]
    fn test_custom_bank_and_fingerprints() {
        let mut bank = PolicyBank::with_defaults();
        bank.register(RiskPolicy::new("lenient", 0.01, 0.2, 0.9).with_pass_threshold(0.0));
        let auditor = Auditor::new(&bank, AuditThresholds::default());

        let (suppliers, deps) = chain();
        let request = AuditRequest::new(suppliers, 300.0)
            .with_dependencies(deps)
            .with_policy_tier("lenient")
            .adversarial();
        let verdict = auditor.audit(&request);

        // resilience 0.0 does not exceed a 0.0 threshold
        assert_eq!(verdict.status, AuditStatus::Failed);
        assert_eq!(verdict.policy_tier, "lenient");
        assert_ne!(verdict.config_fingerprint, Auditor::with_defaults().audit(&request).config_fingerprint);
        assert_eq!(verdict.input_fingerprint.len(), 64);
    }
}
