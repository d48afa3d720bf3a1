//! Node-split flow network.
//!
//! ## Node Splitting
//!
//! Max-flow bounds edges, but supplier capacity belongs to nodes. Each
//! supplier `n` becomes two vertices joined by its capacity:
//!
//! ```text
//! SuperSource ──∞──► In(s) ──spend(s)──► Out(s) ──spend(s)──► In(t) ─► ... ─► Out(anchor)
//! ```
//!
//! - `In(n) → Out(n)` carries `spend(n)`; the anchor gets an unbounded
//!   capacity instead
//! - Each dependency `u → v` becomes `Out(u) → In(v)` with `spend(u)`
//! - `SuperSource → In(s)` is unbounded for every tier 3/4 node, whatever
//!   its in-degree
//! - The sink is `Out(anchor)`; edges leaving the anchor are dropped
//!
//! A network is rebuilt for every contingency trial. Removed nodes keep no
//! vertices at all.

use crate::graph::SupplyGraph;

/// Vertex of a split network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vertex {
    /// Synthetic source feeding every eligible supplier.
    SuperSource,
    /// Entry side of node `n`.
    In(usize),
    /// Exit side of node `n`.
    Out(usize),
}

/// Directed edge with its capacity. Edges are stored in pairs: edge `e`
/// and its residual twin `e ^ 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowEdge {
    /// Head vertex index.
    pub to: usize,
    /// Capacity.
    pub capacity: f64,
}

/// Adjacency-list flow network over split vertices.
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    node_count: usize,
    present: Vec<bool>,
    adjacency: Vec<Vec<usize>>,
    edges: Vec<FlowEdge>,
}

impl FlowNetwork {
    /// Network for `node_count` suppliers with no edges yet.
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            present: vec![true; node_count],
            adjacency: vec![Vec::new(); 1 + 2 * node_count],
            edges: Vec::new(),
        }
    }

    /// Drop a node's split vertices from the network.
    pub fn remove_node(&mut self, node: usize) {
        if let Some(present) = self.present.get_mut(node) {
            *present = false;
        }
    }

    /// Whether a node is still in the network.
    pub fn contains_node(&self, node: usize) -> bool {
        self.present.get(node).copied().unwrap_or(false)
    }

    /// Dense index of a vertex, `None` if absent.
    pub fn vertex_index(&self, vertex: Vertex) -> Option<usize> {
        match vertex {
            Vertex::SuperSource => Some(0),
            Vertex::In(n) if self.contains_node(n) => Some(1 + 2 * n),
            Vertex::Out(n) if self.contains_node(n) => Some(2 + 2 * n),
            _ => None,
        }
    }

    /// Add `from → to` with the given capacity. Ignored when either end is
    /// absent or the capacity is not positive.
    pub fn add_edge(&mut self, from: Vertex, to: Vertex, capacity: f64) {
        let (Some(u), Some(v)) = (self.vertex_index(from), self.vertex_index(to)) else {
            return;
        };
        if capacity.is_nan() || capacity <= 0.0 {
            return;
        }
        self.adjacency[u].push(self.edges.len());
        self.edges.push(FlowEdge { to: v, capacity });
        self.adjacency[v].push(self.edges.len());
        self.edges.push(FlowEdge { to: u, capacity: 0.0 });
    }

    /// Number of dense vertex slots.
    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Suppliers the network was sized for.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Edge indices leaving a dense vertex.
    pub fn outgoing(&self, vertex: usize) -> &[usize] {
        &self.adjacency[vertex]
    }

    /// All edges, residual twins included.
    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }
}

/// A built network together with its terminals.
#[derive(Debug, Clone)]
pub struct SplitNetwork {
    /// The network.
    pub network: FlowNetwork,
    /// Always [`Vertex::SuperSource`].
    pub source: Vertex,
    /// `Out(anchor)`.
    pub sink: Vertex,
    /// Nodes connected to the super source.
    pub sources: Vec<usize>,
}

impl SplitNetwork {
    /// Maximum deliverable flow.
    pub fn max_flow(&self) -> f64 {
        super::max_flow(&self.network, self.source, self.sink)
    }
}

/// Builds split networks for one graph.
#[derive(Debug, Clone)]
pub struct FlowNetworkBuilder<'g> {
    graph: &'g SupplyGraph,
    unbounded: f64,
}

impl<'g> FlowNetworkBuilder<'g> {
    /// Builder for a validated graph.
    ///
    /// The unbounded capacity is `2 × (declared spend + exposure) + 1`,
    /// strictly above any flow the suppliers can deliver.
    pub fn new(graph: &'g SupplyGraph, total_exposure: f64) -> Self {
        Self {
            graph,
            unbounded: 2.0 * (graph.declared_spend() + total_exposure) + 1.0,
        }
    }

    /// Capacity standing in for infinity.
    pub fn unbounded_capacity(&self) -> f64 {
        self.unbounded
    }

    /// Intact network.
    pub fn build(&self) -> SplitNetwork {
        self.build_without(&[])
    }

    /// Network with the given nodes removed.
    pub fn build_without(&self, removed: &[usize]) -> SplitNetwork {
        let graph = self.graph;
        let anchor = graph.anchor();
        let mut network = FlowNetwork::new(graph.len());
        for &node in removed {
            network.remove_node(node);
        }

        for (i, node) in graph.nodes().iter().enumerate() {
            let capacity = if i == anchor { self.unbounded } else { node.spend };
            network.add_edge(Vertex::In(i), Vertex::Out(i), capacity);
        }

        for &(u, v) in graph.edges() {
            if u == anchor {
                continue;
            }
            network.add_edge(Vertex::Out(u), Vertex::In(v), graph.nodes()[u].spend);
        }

        let sources = eligible_sources(graph)
            .filter(|&s| network.contains_node(s))
            .collect::<Vec<_>>();
        for &s in &sources {
            network.add_edge(Vertex::SuperSource, Vertex::In(s), self.unbounded);
        }

        SplitNetwork {
            network,
            source: Vertex::SuperSource,
            sink: Vertex::Out(anchor),
            sources,
        }
    }
}

/// Tier 3 and 4 nodes, input order. In-degree plays no part: a zero-capacity
/// decoy feeding a real supplier cannot take its place as the source.
pub fn eligible_sources(graph: &SupplyGraph) -> impl Iterator<Item = usize> + '_ {
    graph
        .non_anchor()
        .filter(move |&i| graph.nodes()[i].tier.is_source_eligible())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphOptions;
    use crate::types::{DependencyRecord, SupplierRecord};

    fn chain() -> SupplyGraph {
        let nodes = vec![
            SupplierRecord::new("Shell", "2", 0.0),
            SupplierRecord::new("S", "3", 100.0),
            SupplierRecord::new("P", "2", 100.0),
            SupplierRecord::new("A", "Anchor", 0.0),
        ];
        let deps = vec![
            DependencyRecord::new("Shell", "S"),
            DependencyRecord::new("S", "P"),
            DependencyRecord::new("P", "A"),
            DependencyRecord::new("A", "P"),
        ];
        SupplyGraph::build(&nodes, &deps, 200.0, &GraphOptions::default()).unwrap()
    }

    #[test]
    fn test_vertex_indexing() {
        let mut network = FlowNetwork::new(3);
        assert_eq!(network.vertex_count(), 7);
        assert_eq!(network.vertex_index(Vertex::In(1)), Some(3));
        assert_eq!(network.vertex_index(Vertex::Out(1)), Some(4));

        network.remove_node(1);
        assert_eq!(network.vertex_index(Vertex::In(1)), None);
        assert_eq!(network.vertex_index(Vertex::Out(7)), None);
    }

    #[test]
    fn test_sources_ignore_in_degree() {
        let graph = chain();
        let split = FlowNetworkBuilder::new(&graph, 200.0).build();

        assert_eq!(split.sources, vec![1]);
        assert_eq!(split.sink, Vertex::Out(3));
    }

    #[test]
    fn test_unbounded_capacity_exceeds_supply() {
        let graph = chain();
        let builder = FlowNetworkBuilder::new(&graph, 200.0);
        assert_eq!(builder.unbounded_capacity(), 2.0 * (200.0 + 200.0) + 1.0);
    }

    #[test]
    fn test_anchor_out_edges_and_zero_capacity_dropped() {
        let graph = chain();
        let split = FlowNetworkBuilder::new(&graph, 200.0).build();

        // Shell split edge and Shell -> S carry zero capacity; A -> P is skipped.
        // Left: S split, P split, A split, S -> P, P -> A, source -> S.
        assert_eq!(split.network.edges().len(), 2 * 6);
    }

    #[test]
    fn test_removed_node_disconnects() {
        let graph = chain();
        let split = FlowNetworkBuilder::new(&graph, 200.0).build_without(&[1]);

        assert!(split.sources.is_empty());
        assert!(!split.network.contains_node(1));
    }
}
