//! Complexity Governor: anti-gaming checks run before any flow computation.
//!
//! ## Purpose
//!
//! An audit is only as honest as its input. The governor rejects graphs
//! that show known manipulation patterns before the expensive stages run:
//!
//! | Check | Code | Vector |
//! |-------|------|--------|
//! | Node count | `FAIL_COMPLEXITY_CAP` | Dilution by flooding |
//! | Negative spend | `FAIL_NEGATIVE_SPEND` | Offsetting inflated spend |
//! | Non-finite numbers | `FAIL_INVALID_DATA` | Poisoned arithmetic |
//! | Spend vs exposure | `FAIL_INFLATION` | Capacity inflation |
//! | Duplicate ids | `FAIL_DUPLICATE_IDS` | Ghost suppliers |
//! | Non-ASCII ids | `FAIL_NON_CANONICAL_ID` | Homoglyph twins |
//! | Placeholder ids | `FAIL_DUMMY_DETECTED` | Test dummies |
//!
//! Every check runs and every violation is reported. Advisories
//! (`WARN_*`) never fail the check.

use regex_lite::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use crate::canonical_input::{is_canonical_identifier, normalize_id};
use crate::graph::resolve_anchor;
use crate::policy::AuditThresholds;
use crate::types::{AuditStatus, DependencyRecord, SupplierRecord, Tier};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(dummy|fake|placeholder|decoy)").expect("Placeholder pattern is valid")
    })
}

/// A governance rule violation.
#[derive(Debug, Clone, PartialEq)]
pub enum GovernanceViolation {
    /// Too many nodes to audit intelligibly.
    ComplexityCap {
        /// Nodes submitted.
        count: usize,
        /// Maximum allowed.
        limit: usize,
    },
    /// Finite negative spend.
    NegativeSpend {
        /// Offending ids, input order.
        ids: Vec<String>,
    },
    /// Non-finite spend or invalid exposure.
    InvalidData {
        /// What was wrong.
        detail: String,
    },
    /// Declared spend exceeds the inflation cap.
    Inflation {
        /// Total declared spend, anchor included.
        declared: f64,
        /// Maximum allowed spend.
        cap: f64,
    },
    /// Identifiers repeat after trimming.
    DuplicateIds {
        /// Repeated ids, first-repeat order.
        ids: Vec<String>,
    },
    /// Identifiers outside printable ASCII.
    NonCanonicalId {
        /// Number of offending ids.
        count: usize,
    },
    /// Placeholder identifiers.
    DummyDetected {
        /// Number of offending ids.
        count: usize,
    },
}

impl GovernanceViolation {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ComplexityCap { .. } => "FAIL_COMPLEXITY_CAP",
            Self::NegativeSpend { .. } => "FAIL_NEGATIVE_SPEND",
            Self::InvalidData { .. } => "FAIL_INVALID_DATA",
            Self::Inflation { .. } => "FAIL_INFLATION",
            Self::DuplicateIds { .. } => "FAIL_DUPLICATE_IDS",
            Self::NonCanonicalId { .. } => "FAIL_NON_CANONICAL_ID",
            Self::DummyDetected { .. } => "FAIL_DUMMY_DETECTED",
        }
    }

    /// Dedicated audit status, if the violation has one.
    pub fn status(&self) -> Option<AuditStatus> {
        match self {
            Self::NegativeSpend { .. } => Some(AuditStatus::FailedNegativeSpend),
            Self::InvalidData { .. } => Some(AuditStatus::FailedInvalidData),
            Self::Inflation { .. } => Some(AuditStatus::FailedInflation),
            Self::DuplicateIds { .. } => Some(AuditStatus::FailedDuplicateIds),
            Self::ComplexityCap { .. } | Self::NonCanonicalId { .. } | Self::DummyDetected { .. } => {
                None
            }
        }
    }
}

impl fmt::Display for GovernanceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.code())?;
        match self {
            Self::ComplexityCap { count, limit } => {
                write!(f, "Node count {} exceeds limit ({})", count, limit)
            }
            Self::NegativeSpend { ids } => {
                write!(f, "Negative spend declared by {}", ids.join(", "))
            }
            Self::InvalidData { detail } => f.write_str(detail),
            Self::Inflation { declared, cap } => {
                write!(f, "Declared spend {:.2} exceeds cap {:.2}", declared, cap)
            }
            Self::DuplicateIds { ids } => write!(f, "Duplicate node ids: {}", ids.join(", ")),
            Self::NonCanonicalId { count } => {
                write!(f, "{} ids contain characters outside printable ASCII", count)
            }
            Self::DummyDetected { count } => {
                write!(f, "{} nodes identified as placeholders", count)
            }
        }
    }
}

/// A non-blocking governance finding.
#[derive(Debug, Clone, PartialEq)]
pub enum GovernanceAdvisory {
    /// A deep-tier supplier claims to deliver to the anchor directly.
    TierShortcut {
        /// Delivering supplier.
        from: String,
        /// The anchor.
        to: String,
    },
    /// Large graph without a single chokepoint.
    Dilution {
        /// Nodes in the graph.
        node_count: usize,
    },
}

impl GovernanceAdvisory {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TierShortcut { .. } => "WARN_TIER_SHORTCUT",
            Self::Dilution { .. } => "WARN_DILUTION",
        }
    }
}

impl fmt::Display for GovernanceAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TierShortcut { from, to } => write!(
                f,
                "{}: Edge {} -> {} skips intermediate tiers and will be pruned",
                self.code(),
                from,
                to
            ),
            Self::Dilution { node_count } => write!(
                f,
                "{}: {} nodes with zero critical chokepoints suggests artificial dilution",
                self.code(),
                node_count
            ),
        }
    }
}

/// Result of a governance check.
#[derive(Debug, Clone, PartialEq)]
pub struct GovernanceCheck {
    /// Whether the graph passed every rule.
    pub passed: bool,
    /// Rule violations, in check order.
    pub violations: Vec<GovernanceViolation>,
    /// Advisories.
    pub advisories: Vec<GovernanceAdvisory>,
}

impl GovernanceCheck {
    /// Ordered reasons: violations first, then advisories.
    pub fn reasons(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(ToString::to_string)
            .chain(self.advisories.iter().map(ToString::to_string))
            .collect()
    }

    /// Audit status for a failed check; `None` when the check passed.
    ///
    /// Duplicate ids outrank everything; otherwise the first violation with
    /// a dedicated status wins, else `FAILED_GOVERNANCE_CHECK`.
    pub fn status(&self) -> Option<AuditStatus> {
        if self.passed {
            return None;
        }
        let duplicates = self
            .violations
            .iter()
            .any(|v| matches!(v, GovernanceViolation::DuplicateIds { .. }));
        if duplicates {
            return Some(AuditStatus::FailedDuplicateIds);
        }
        Some(
            self.violations
                .iter()
                .find_map(GovernanceViolation::status)
                .unwrap_or(AuditStatus::FailedGovernanceCheck),
        )
    }
}

/// Stateless anti-gaming validator.
#[derive(Debug, Clone, Default)]
pub struct ComplexityGovernor {
    thresholds: AuditThresholds,
}

impl ComplexityGovernor {
    /// Create a governor with the given thresholds.
    pub fn new(thresholds: AuditThresholds) -> Self {
        Self { thresholds }
    }

    /// Validate raw input.
    pub fn validate(
        &self,
        nodes: &[SupplierRecord],
        edges: &[DependencyRecord],
        total_exposure: f64,
    ) -> GovernanceCheck {
        let mut violations = Vec::new();

        if nodes.len() > self.thresholds.max_nodes {
            violations.push(GovernanceViolation::ComplexityCap {
                count: nodes.len(),
                limit: self.thresholds.max_nodes,
            });
        }

        let negative: Vec<String> = nodes
            .iter()
            .filter(|n| n.spend.is_finite() && n.spend < 0.0)
            .map(|n| normalize_id(&n.id))
            .collect();
        if !negative.is_empty() {
            violations.push(GovernanceViolation::NegativeSpend { ids: negative });
        }

        let non_finite = nodes.iter().filter(|n| !n.spend.is_finite()).count();
        let exposure_valid = total_exposure.is_finite() && total_exposure >= 0.0;
        if non_finite > 0 {
            violations.push(GovernanceViolation::InvalidData {
                detail: format!("{} nodes declare non-finite spend", non_finite),
            });
        } else if !exposure_valid {
            violations.push(GovernanceViolation::InvalidData {
                detail: format!("Total exposure {} is not a finite non-negative amount", total_exposure),
            });
        }

        let anchor = resolve_anchor(nodes).map(|(index, _)| index);
        if non_finite == 0 && exposure_valid {
            let declared: f64 = nodes.iter().map(|n| n.spend).sum();
            let cap = total_exposure * self.thresholds.inflation_cap;
            if declared > cap {
                violations.push(GovernanceViolation::Inflation { declared, cap });
            }
        }

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for node in nodes {
            let id = normalize_id(&node.id);
            if !seen.insert(id.clone()) && !duplicates.contains(&id) {
                duplicates.push(id);
            }
        }
        if !duplicates.is_empty() {
            violations.push(GovernanceViolation::DuplicateIds { ids: duplicates });
        }

        let non_canonical = nodes
            .iter()
            .filter(|n| !is_canonical_identifier(&normalize_id(&n.id)))
            .count();
        if non_canonical > 0 {
            violations.push(GovernanceViolation::NonCanonicalId {
                count: non_canonical,
            });
        }

        let dummies = nodes
            .iter()
            .filter(|n| placeholder_pattern().is_match(&n.id))
            .count();
        if dummies > 0 {
            violations.push(GovernanceViolation::DummyDetected { count: dummies });
        }

        let advisories = anchor
            .map(|index| tier_shortcuts(nodes, edges, index))
            .unwrap_or_default();

        if !violations.is_empty() {
            tracing::warn!(
                violations = violations.len(),
                first = violations[0].code(),
                "Governance check failed"
            );
        }

        GovernanceCheck {
            passed: violations.is_empty(),
            violations,
            advisories,
        }
    }

    /// Post-contingency dilution check: a large graph with no chokepoint at
    /// all is statistically implausible.
    pub fn analyze_criticality_ratio(
        &self,
        node_count: usize,
        critical_count: usize,
    ) -> Option<GovernanceAdvisory> {
        (node_count > self.thresholds.dilution_min_nodes && critical_count == 0)
            .then_some(GovernanceAdvisory::Dilution { node_count })
    }
}

fn tier_shortcuts(
    nodes: &[SupplierRecord],
    edges: &[DependencyRecord],
    anchor: usize,
) -> Vec<GovernanceAdvisory> {
    let anchor_id = normalize_id(&nodes[anchor].id);
    let mut tiers: HashMap<String, Option<Tier>> = HashMap::new();
    for node in nodes {
        tiers
            .entry(normalize_id(&node.id))
            .or_insert_with(|| Tier::parse(&node.tier));
    }

    let mut seen = HashSet::new();
    edges
        .iter()
        .map(|e| (normalize_id(&e.source), normalize_id(&e.target)))
        .filter(|(from, to)| {
            *to == anchor_id && matches!(tiers.get(from), Some(Some(tier)) if tier.is_deep())
        })
        .filter(|edge| seen.insert(edge.clone()))
        .map(|(from, to)| GovernanceAdvisory::TierShortcut { from, to })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supplier(id: &str, tier: &str, spend: f64) -> SupplierRecord {
        SupplierRecord::new(id, tier, spend)
    }

    fn governor() -> ComplexityGovernor {
        ComplexityGovernor::default()
    }

    #[test]
    fn test_clean_graph_passes() {
        let nodes = vec![supplier("S1", "3", 100.0), supplier("A", "Anchor", 0.0)];
        let check = governor().validate(&nodes, &[DependencyRecord::new("S1", "A")], 100.0);

        assert!(check.passed);
        assert_eq!(check.status(), None);
    }

    #[test]
    fn test_node_cap_reports_complexity_reason() {
        let nodes: Vec<_> = (0..201)
            .map(|i| supplier(&format!("S{}", i), "2", 1.0))
            .collect();
        let check = governor().validate(&nodes, &[], 1_000.0);

        assert!(!check.passed);
        assert_eq!(check.status(), Some(AuditStatus::FailedGovernanceCheck));
        assert!(check.reasons()[0].starts_with("FAIL_COMPLEXITY_CAP"));
    }

    #[test]
    fn test_negative_spend_outranks_node_cap() {
        let mut nodes: Vec<_> = (0..250)
            .map(|i| supplier(&format!("S{}", i), "2", 1.0))
            .collect();
        nodes[7].spend = -1.0;
        let check = governor().validate(&nodes, &[], 1_000.0);

        assert_eq!(check.status(), Some(AuditStatus::FailedNegativeSpend));
    }

    #[test]
    fn test_duplicates_outrank_everything() {
        let nodes = vec![
            supplier("S1", "3", -5.0),
            supplier(" S1", "3", 1.0),
            supplier("A", "Anchor", 0.0),
        ];
        let check = governor().validate(&nodes, &[], 10.0);

        assert_eq!(check.status(), Some(AuditStatus::FailedDuplicateIds));
    }

    #[test]
    fn test_inflation_is_strict() {
        let nodes = vec![supplier("S1", "3", 150.0), supplier("A", "Anchor", 0.0)];
        assert!(governor().validate(&nodes, &[], 100.0).passed);

        let nodes = vec![supplier("S1", "3", 150.01), supplier("A", "Anchor", 0.0)];
        let check = governor().validate(&nodes, &[], 100.0);
        assert_eq!(check.status(), Some(AuditStatus::FailedInflation));
    }

    #[test]
    fn test_anchor_spend_counts_toward_inflation() {
        let nodes = vec![supplier("S1", "3", 100.0), supplier("A", "Anchor", 1e9)];
        let check = governor().validate(&nodes, &[], 100.0);

        assert_eq!(check.status(), Some(AuditStatus::FailedInflation));
        assert!(check.violations.iter().any(|v| matches!(
            v,
            GovernanceViolation::Inflation { declared, .. } if *declared == 1e9 + 100.0
        )));

        // Same total whether or not a node declares the anchor tier.
        let undeclared = vec![supplier("S1", "3", 100.0), supplier("buyer", "1", 1e9)];
        let check = governor().validate(&undeclared, &[], 100.0);
        assert_eq!(check.status(), Some(AuditStatus::FailedInflation));
    }

    #[test]
    fn test_non_finite_spend_is_invalid_data() {
        let nodes = vec![supplier("S1", "3", f64::NAN), supplier("A", "Anchor", 0.0)];
        let check = governor().validate(&nodes, &[], 100.0);
        assert_eq!(check.status(), Some(AuditStatus::FailedInvalidData));

        let nodes = vec![supplier("S1", "3", 1.0), supplier("A", "Anchor", 0.0)];
        let check = governor().validate(&nodes, &[], f64::INFINITY);
        assert_eq!(check.status(), Some(AuditStatus::FailedInvalidData));
    }

    #[test]
    fn test_homoglyph_and_placeholder_ids() {
        let nodes = vec![
            supplier("\u{0421}1", "3", 1.0),
            supplier("DummyTier2_001", "2", 1.0),
            supplier("A", "Anchor", 0.0),
        ];
        let check = governor().validate(&nodes, &[], 100.0);
        let codes: Vec<_> = check.violations.iter().map(|v| v.code()).collect();

        assert_eq!(codes, vec!["FAIL_NON_CANONICAL_ID", "FAIL_DUMMY_DETECTED"]);
        assert_eq!(check.status(), Some(AuditStatus::FailedGovernanceCheck));
    }

    #[test]
    fn test_tier_shortcut_is_advisory() {
        let nodes = vec![supplier("S1", "T4", 10.0), supplier("A", "Anchor", 0.0)];
        let edges = vec![DependencyRecord::new("S1", "A"), DependencyRecord::new("S1", "A")];
        let check = governor().validate(&nodes, &edges, 100.0);

        assert!(check.passed);
        assert_eq!(check.advisories.len(), 1);
        assert!(check.reasons()[0].starts_with("WARN_TIER_SHORTCUT"));
    }

    #[test]
    fn test_dilution_advisory() {
        let gov = governor();
        assert!(gov.analyze_criticality_ratio(51, 0).is_some());
        assert!(gov.analyze_criticality_ratio(50, 0).is_none());
        assert!(gov.analyze_criticality_ratio(120, 1).is_none());
    }
}
