//! Typed supply graph with data hygiene checks.
//!
//! ## Invariants
//!
//! A built [`SupplyGraph`] guarantees:
//!
//! - Node ids are unique after trimming
//! - Every spend is finite and non-negative; exposure likewise
//! - Every dependency references existing nodes, duplicates collapsed
//! - Exactly one node is the anchor
//! - Total declared spend ≤ inflation cap × exposure
//! - No tier 3/4 → anchor edge survives
//! - Acyclic, when built with `require_acyclic`
//!
//! Node and edge order follow the input, so every downstream tie-break is
//! deterministic.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::canonical_input::normalize_id;
use crate::policy::thresholds::DEFAULT_INFLATION_CAP;
use crate::types::{AuditStatus, DependencyRecord, SupplierRecord, Tier};

/// Ids that identify the anchor when no node declares the anchor tier.
pub const ANCHOR_ID_WHITELIST: [&str; 5] = ["anchor", "buyer", "oem", "off_taker", "sink"];

/// How the anchor was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorResolution {
    /// First node declaring the `Anchor` tier.
    DeclaredTier,
    /// First node whose id is on the whitelist.
    IdWhitelist,
    /// First node in input order.
    FirstNode,
}

/// Resolve the anchor index of a supplier list.
///
/// Returns `None` only for an empty list.
pub fn resolve_anchor(suppliers: &[SupplierRecord]) -> Option<(usize, AnchorResolution)> {
    if let Some(index) = suppliers.iter().position(SupplierRecord::is_anchor_tier) {
        return Some((index, AnchorResolution::DeclaredTier));
    }

    let whitelisted = suppliers.iter().position(|s| {
        let id = normalize_id(&s.id).to_ascii_lowercase();
        ANCHOR_ID_WHITELIST.contains(&id.as_str())
    });
    if let Some(index) = whitelisted {
        return Some((index, AnchorResolution::IdWhitelist));
    }

    (!suppliers.is_empty()).then_some((0, AnchorResolution::FirstNode))
}

/// Graph construction failure. Each variant maps to one audit status.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// No nodes at all.
    #[error("No anchor: the supplier list is empty")]
    NoAnchor,

    /// Repeated identifiers.
    #[error("Duplicate node ids: {}", .ids.join(", "))]
    DuplicateIds {
        /// Repeated ids.
        ids: Vec<String>,
    },

    /// Negative declared spend.
    #[error("Node {id} declares negative spend {spend}")]
    NegativeSpend {
        /// Offending node.
        id: String,
        /// Declared spend.
        spend: f64,
    },

    /// NaN or infinite spend.
    #[error("Node {id} declares non-finite spend")]
    NonFiniteSpend {
        /// Offending node.
        id: String,
    },

    /// Exposure is NaN, infinite or negative.
    #[error("Total exposure {exposure} is not a finite non-negative amount")]
    InvalidExposure {
        /// Submitted exposure.
        exposure: f64,
    },

    /// Dependency names an unknown node.
    #[error("Dependency {from} -> {to} references an unknown node")]
    DanglingDependency {
        /// Delivering id.
        from: String,
        /// Receiving id.
        to: String,
    },

    /// Dependency cycle.
    #[error("Dependency cycle through: {}", .nodes.join(", "))]
    Cycle {
        /// Nodes on or behind a cycle, input order.
        nodes: Vec<String>,
    },

    /// Declared spend exceeds the inflation cap.
    #[error("Declared spend {declared:.2} exceeds cap {cap:.2}")]
    Inflation {
        /// Total declared spend, anchor included.
        declared: f64,
        /// Maximum allowed spend.
        cap: f64,
    },

    /// Illegal tier label.
    #[error("Node {id} has invalid tier '{tier}'")]
    InvalidTier {
        /// Offending node.
        id: String,
        /// Raw label.
        tier: String,
    },

    /// More than one node declares the anchor tier.
    #[error("Nodes {first} and {second} both declare the Anchor tier")]
    MultipleAnchors {
        /// Resolved anchor.
        first: String,
        /// Second claimant.
        second: String,
    },
}

impl GraphError {
    /// Audit status for this failure.
    pub fn status(&self) -> AuditStatus {
        match self {
            Self::NoAnchor => AuditStatus::FailedNoAnchor,
            Self::DuplicateIds { .. } => AuditStatus::FailedDuplicateIds,
            Self::NegativeSpend { .. } => AuditStatus::FailedNegativeSpend,
            Self::NonFiniteSpend { .. }
            | Self::InvalidExposure { .. }
            | Self::DanglingDependency { .. } => AuditStatus::FailedInvalidData,
            Self::Cycle { .. } => AuditStatus::FailedCycles,
            Self::Inflation { .. } => AuditStatus::FailedInflation,
            Self::InvalidTier { .. } | Self::MultipleAnchors { .. } => {
                AuditStatus::FailedInvalidTier
            }
        }
    }
}

/// Build options.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    /// Declared spend may not exceed this multiple of exposure.
    pub inflation_cap: f64,
    /// Reject cycles (adversarial mode).
    pub require_acyclic: bool,
}

impl GraphOptions {
    /// Options with the given inflation cap, cycles allowed.
    pub fn new(inflation_cap: f64) -> Self {
        Self {
            inflation_cap,
            require_acyclic: false,
        }
    }

    /// Reject cycles.
    pub fn require_acyclic(mut self, require_acyclic: bool) -> Self {
        self.require_acyclic = require_acyclic;
        self
    }
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self::new(DEFAULT_INFLATION_CAP)
    }
}

/// A validated supplier.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierNode {
    /// Trimmed id.
    pub id: String,
    /// Parsed tier.
    pub tier: Tier,
    /// Declared spend (node capacity).
    pub spend: f64,
}

/// Validated, typed supply graph.
#[derive(Debug, Clone)]
pub struct SupplyGraph {
    nodes: Vec<SupplierNode>,
    index: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    pruned: Vec<(usize, usize)>,
    anchor: usize,
    anchor_resolution: AnchorResolution,
    total_exposure: f64,
}

impl SupplyGraph {
    /// Build and validate a graph.
    ///
    /// Checks run in a fixed order and the first failure is returned.
    pub fn build(
        suppliers: &[SupplierRecord],
        dependencies: &[DependencyRecord],
        total_exposure: f64,
        options: &GraphOptions,
    ) -> Result<Self, GraphError> {
        let (anchor, anchor_resolution) = resolve_anchor(suppliers).ok_or(GraphError::NoAnchor)?;

        let ids: Vec<String> = suppliers.iter().map(|s| normalize_id(&s.id)).collect();
        let mut index = HashMap::with_capacity(ids.len());
        let mut duplicates = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() && !duplicates.contains(id) {
                duplicates.push(id.clone());
            }
        }
        if !duplicates.is_empty() {
            return Err(GraphError::DuplicateIds { ids: duplicates });
        }

        if let Some((i, s)) = suppliers
            .iter()
            .enumerate()
            .find(|(_, s)| s.spend.is_finite() && s.spend < 0.0)
        {
            return Err(GraphError::NegativeSpend {
                id: ids[i].clone(),
                spend: s.spend,
            });
        }

        if let Some(i) = suppliers.iter().position(|s| !s.spend.is_finite()) {
            return Err(GraphError::NonFiniteSpend { id: ids[i].clone() });
        }
        if !total_exposure.is_finite() || total_exposure < 0.0 {
            return Err(GraphError::InvalidExposure {
                exposure: total_exposure,
            });
        }

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for dependency in dependencies {
            let from = normalize_id(&dependency.source);
            let to = normalize_id(&dependency.target);
            let (Some(&u), Some(&v)) = (index.get(&from), index.get(&to)) else {
                return Err(GraphError::DanglingDependency { from, to });
            };
            if seen.insert((u, v)) {
                edges.push((u, v));
            }
        }

        if options.require_acyclic {
            let blocked = cyclic_nodes(ids.len(), &edges);
            if !blocked.is_empty() {
                return Err(GraphError::Cycle {
                    nodes: blocked.into_iter().map(|i| ids[i].clone()).collect(),
                });
            }
        }

        let declared: f64 = suppliers.iter().map(|s| s.spend).sum();
        let cap = total_exposure * options.inflation_cap;
        if declared > cap {
            return Err(GraphError::Inflation { declared, cap });
        }

        let mut nodes = Vec::with_capacity(suppliers.len());
        for (i, supplier) in suppliers.iter().enumerate() {
            let tier = Tier::parse(&supplier.tier).ok_or_else(|| GraphError::InvalidTier {
                id: ids[i].clone(),
                tier: supplier.tier.clone(),
            })?;
            if tier == Tier::Anchor && i != anchor {
                return Err(GraphError::MultipleAnchors {
                    first: ids[anchor].clone(),
                    second: ids[i].clone(),
                });
            }
            nodes.push(SupplierNode {
                id: ids[i].clone(),
                tier,
                spend: supplier.spend,
            });
        }

        let (pruned, edges): (Vec<_>, Vec<_>) = edges
            .into_iter()
            .partition(|&(u, v)| v == anchor && nodes[u].tier.is_deep());

        if !pruned.is_empty() {
            tracing::debug!(pruned = pruned.len(), "Pruned tier-shortcut edges");
        }

        Ok(Self {
            nodes,
            index,
            edges,
            pruned,
            anchor,
            anchor_resolution,
            total_exposure,
        })
    }

    /// Nodes in input order.
    pub fn nodes(&self) -> &[SupplierNode] {
        &self.nodes
    }

    /// Node by index.
    pub fn node(&self, index: usize) -> Option<&SupplierNode> {
        self.nodes.get(index)
    }

    /// Index of a node id (trimmed before lookup).
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id.trim()).copied()
    }

    /// Id of a node index.
    pub fn id(&self, index: usize) -> &str {
        &self.nodes[index].id
    }

    /// Surviving edges as index pairs, input order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Tier-shortcut edges removed during build.
    pub fn pruned_edges(&self) -> &[(usize, usize)] {
        &self.pruned
    }

    /// Anchor index.
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// How the anchor was found.
    pub fn anchor_resolution(&self) -> AnchorResolution {
        self.anchor_resolution
    }

    /// Total credit exposure.
    pub fn total_exposure(&self) -> f64 {
        self.total_exposure
    }

    /// Sum of every node's spend, anchor included.
    pub fn declared_spend(&self) -> f64 {
        self.nodes.iter().map(|n| n.spend).sum()
    }

    /// Indices of every node except the anchor, input order.
    pub fn non_anchor(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(move |&i| i != self.anchor)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes. Always false for a built graph.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Kahn's algorithm: nodes never reaching in-degree zero are on or
/// downstream of a cycle.
fn cyclic_nodes(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut in_degree = vec![0usize; node_count];
    let mut successors = vec![Vec::new(); node_count];
    for &(u, v) in edges {
        in_degree[v] += 1;
        successors[u].push(v);
    }

    let mut queue: VecDeque<usize> = (0..node_count).filter(|&i| in_degree[i] == 0).collect();
    while let Some(u) = queue.pop_front() {
        for &v in &successors[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    (0..node_count).filter(|&i| in_degree[i] > 0).collect()
}
