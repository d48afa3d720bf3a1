//! Resilience strategies.
//!
//! Two strategies sit behind [`ResilienceStrategy`]:
//!
//! - [`FlowContingency`]: exhaustive N-1 / N-2 max-flow search, the
//!   default
//! - [`SpectralAnalyzer`]: eigenvector concentration, for graphs too small
//!   for pair contingencies to mean anything
//!
//! [`select_strategy`] picks one by graph size.

pub mod contingency;
pub mod spectral;

pub use contingency::{ContingencyReport, FlowContingency, FlowSentinel};
pub use spectral::SpectralAnalyzer;

use crate::graph::SupplyGraph;
use crate::policy::AuditThresholds;
use crate::types::{AnalysisKind, AuditStatus};

/// Outcome of a completed resilience analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ResilienceAssessment {
    /// Strategy that produced it.
    pub strategy: AnalysisKind,
    /// Share of flow retained under the worst contingency, in [0, 1].
    pub resilience: f64,
    /// Relative loss under the worst contingency, `1 - resilience`.
    pub relative_drop: f64,
    /// Absolute flow left under the worst contingency, when measured.
    pub worst_case_flow: Option<f64>,
    /// Critical node ids, most damaging first.
    pub critical_nodes: Vec<String>,
    /// Most damaging pair, when pairs were tested.
    pub worst_pair: Option<(String, String)>,
}

/// Contingency analysis stopped before producing a score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContingencyAbort {
    /// The intact network delivers nothing.
    #[error("Baseline flow is zero: no deliverable path from eligible sources to the anchor")]
    ZeroFlow,

    /// Too many critical nodes for exhaustive pairing.
    #[error("{count} critical nodes exceed the complexity cap of {cap}")]
    ComplexityCap {
        /// Critical nodes found.
        count: usize,
        /// Cap in force.
        cap: usize,
        /// Critical node ids, most damaging first.
        critical_nodes: Vec<String>,
        /// Largest single-node flow drop.
        worst_single_drop: f64,
    },
}

impl ContingencyAbort {
    /// Audit status for this abort.
    pub fn status(&self) -> AuditStatus {
        match self {
            Self::ZeroFlow => AuditStatus::FailedZeroFlow,
            Self::ComplexityCap { .. } => AuditStatus::FailedComplexityCap,
        }
    }
}

/// A way of scoring how much of a graph survives its worst failure.
pub trait ResilienceStrategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> AnalysisKind;

    /// Assess a validated graph with a known baseline flow.
    fn assess(
        &self,
        graph: &SupplyGraph,
        baseline_flow: f64,
    ) -> Result<ResilienceAssessment, ContingencyAbort>;
}

/// Spectral fallback for graphs of at most `spectral_max_nodes` nodes,
/// flow contingency otherwise.
pub fn select_strategy(
    graph: &SupplyGraph,
    thresholds: &AuditThresholds,
) -> Box<dyn ResilienceStrategy> {
    if graph.len() <= thresholds.spectral_max_nodes {
        Box::new(SpectralAnalyzer::new(thresholds.spectral_top_fraction))
    } else {
        Box::new(FlowContingency::new(thresholds.clone()))
    }
}
