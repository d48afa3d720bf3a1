//! Exact maximum flow (Dinic).
//!
//! Level graph by BFS, blocking flow by DFS with per-vertex edge cursors.
//! Residual capacities are f64; anything at or below [`FLOW_EPSILON`] is
//! treated as saturated. Supplier capacities are currency amounts, and sums
//! of such values stay exact, so the result is exact for audit inputs.

use std::collections::VecDeque;

use super::network::{FlowNetwork, Vertex};

/// Residual capacity at or below this is zero.
pub const FLOW_EPSILON: f64 = 1e-9;

struct Dinic<'a> {
    network: &'a FlowNetwork,
    residual: Vec<f64>,
    level: Vec<usize>,
    cursor: Vec<usize>,
}

const UNREACHED: usize = usize::MAX;

impl<'a> Dinic<'a> {
    fn new(network: &'a FlowNetwork) -> Self {
        Self {
            network,
            residual: network.edges().iter().map(|e| e.capacity).collect(),
            level: vec![UNREACHED; network.vertex_count()],
            cursor: vec![0; network.vertex_count()],
        }
    }

    fn build_levels(&mut self, source: usize, sink: usize) -> bool {
        self.level.fill(UNREACHED);
        self.level[source] = 0;
        let mut queue = VecDeque::from([source]);

        while let Some(u) = queue.pop_front() {
            for &e in self.network.outgoing(u) {
                let v = self.network.edges()[e].to;
                if self.level[v] == UNREACHED && self.residual[e] > FLOW_EPSILON {
                    self.level[v] = self.level[u] + 1;
                    queue.push_back(v);
                }
            }
        }

        self.level[sink] != UNREACHED
    }

    fn push(&mut self, u: usize, sink: usize, limit: f64) -> f64 {
        if u == sink {
            return limit;
        }

        while self.cursor[u] < self.network.outgoing(u).len() {
            let e = self.network.outgoing(u)[self.cursor[u]];
            let v = self.network.edges()[e].to;

            if self.residual[e] > FLOW_EPSILON && self.level[v] == self.level[u] + 1 {
                let pushed = self.push(v, sink, limit.min(self.residual[e]));
                if pushed > FLOW_EPSILON {
                    self.residual[e] -= pushed;
                    self.residual[e ^ 1] += pushed;
                    return pushed;
                }
            }
            self.cursor[u] += 1;
        }

        0.0
    }

    fn run(&mut self, source: usize, sink: usize) -> f64 {
        let mut total = 0.0;
        while self.build_levels(source, sink) {
            self.cursor.fill(0);
            loop {
                let pushed = self.push(source, sink, f64::INFINITY);
                if pushed <= FLOW_EPSILON {
                    break;
                }
                total += pushed;
            }
        }
        total
    }
}

/// Maximum flow from `source` to `sink`.
///
/// Returns 0 when either terminal is absent or they coincide.
pub fn max_flow(network: &FlowNetwork, source: Vertex, sink: Vertex) -> f64 {
    let (Some(s), Some(t)) = (network.vertex_index(source), network.vertex_index(sink)) else {
        return 0.0;
    };
    if s == t {
        return 0.0;
    }
    Dinic::new(network).run(s, t)
}
