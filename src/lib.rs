//! # contagion-sentinel
//!
//! Structural resilience audits for multi-tier supplier networks.
//!
//! The sentinel answers one question:
//!
//! > If the most critical one or two suppliers fail, how much of the
//! > network's deliverable flow still reaches the anchor?
//!
//! ## Core Contract
//!
//! 1. Reject gamed or malformed input before any expensive computation
//! 2. Model vertex capacities exactly via node splitting and compute max flow
//! 3. Search every N-1 and N-2 contingency under a complexity cap
//! 4. Translate the worst flow loss into an expected contagion loss
//!
//! ## Architecture
//!
//! ```text
//! AuditRequest → ComplexityGovernor → SupplyGraph → FlowNetworkBuilder → max_flow
//!                                                          ↓
//!                 Verdict ← finance::translate ← ResilienceStrategy (N-1/N-2 or spectral)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same request + same policy bank + same thresholds → identical verdict
//! - Ties are broken by input order, never by thread scheduling
//! - Fingerprints hash quantized canonical JSON

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auditor;
pub mod canonical;
pub mod canonical_input;
pub mod finance;
pub mod flow;
pub mod governance;
pub mod graph;
pub mod policy;
pub mod sentinel;
pub mod types;

// Re-exports
pub use auditor::{audit, Auditor};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use canonical_input::{compute_input_fingerprint, CANONICAL_INPUT_VERSION};
pub use flow::{max_flow, FlowNetwork, FlowNetworkBuilder, SplitNetwork, Vertex, FLOW_EPSILON};
pub use governance::{ComplexityGovernor, GovernanceAdvisory, GovernanceCheck, GovernanceViolation};
pub use graph::{scale_free_dependencies, AnchorResolution, GraphError, GraphOptions, SupplyGraph};
pub use policy::{AuditThresholds, PolicyBank, RiskPolicy};
pub use sentinel::{
    select_strategy, ContingencyAbort, ContingencyReport, FlowContingency, FlowSentinel,
    ResilienceAssessment, ResilienceStrategy, SpectralAnalyzer,
};
pub use types::{
    AnalysisKind, AuditRequest, AuditStatus, DependencyRecord, RequestError, SupplierRecord, Tier,
    Verdict,
};

/// Schema version of [`Verdict`].
/// Increment on breaking changes to the verdict layout.
pub const VERDICT_SCHEMA_VERSION: &str = "1.0.0";

/// Policy tier applied when a request names none.
pub const DEFAULT_POLICY_TIER: &str = "standard";
