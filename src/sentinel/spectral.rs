//! Spectral fallback for tiny graphs.
//!
//! With one or two nodes there are no meaningful pair contingencies, so
//! resilience is read from the leading eigenvector of the symmetrized
//! adjacency matrix instead. A node carrying most of the eigenvector mass
//! is a concentration point; its share of the mass is the vulnerability.
//!
//! The leading eigenpair comes from power iteration on `A + I`. The shift
//! keeps bipartite graphs (where `λ` and `-λ` tie) from oscillating.
//! The starting vector is uniform, so the result is deterministic.

use super::{ContingencyAbort, ResilienceAssessment, ResilienceStrategy};
use crate::graph::SupplyGraph;
use crate::types::AnalysisKind;

const MAX_ITERATIONS: usize = 1_000;
const CONVERGENCE: f64 = 1e-12;

/// Eigenvector-concentration strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralAnalyzer {
    top_fraction: f64,
}

impl SpectralAnalyzer {
    /// Analyzer flagging the top `top_fraction` of nodes (at least one).
    pub fn new(top_fraction: f64) -> Self {
        Self {
            top_fraction: top_fraction.clamp(0.0, 1.0),
        }
    }

    /// Leading eigenvalue of the adjacency matrix and its unit eigenvector.
    pub fn leading_eigenpair(&self, graph: &SupplyGraph) -> (f64, Vec<f64>) {
        let n = graph.len();
        if n == 0 {
            return (0.0, Vec::new());
        }

        let mut neighbors = vec![Vec::new(); n];
        for &(u, v) in graph.edges() {
            if u != v && !neighbors[u].contains(&v) {
                neighbors[u].push(v);
                neighbors[v].push(u);
            }
        }
        let multiply = |x: &[f64]| -> Vec<f64> {
            (0..n)
                .map(|i| neighbors[i].iter().map(|&j| x[j]).sum::<f64>())
                .collect()
        };

        let mut x = vec![1.0 / (n as f64).sqrt(); n];
        for _ in 0..MAX_ITERATIONS {
            let ax = multiply(&x);
            let shifted: Vec<f64> = ax.iter().zip(&x).map(|(a, b)| a + b).collect();
            let norm = shifted.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm <= CONVERGENCE {
                break;
            }
            let next: Vec<f64> = shifted.iter().map(|v| v / norm).collect();
            let delta: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
            x = next;
            if delta < CONVERGENCE {
                break;
            }
        }

        let lambda: f64 = multiply(&x).iter().zip(&x).map(|(a, b)| a * b).sum();
        (lambda.max(0.0), x)
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new(crate::policy::thresholds::DEFAULT_SPECTRAL_TOP_FRACTION)
    }
}

impl ResilienceStrategy for SpectralAnalyzer {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::SpectralFallback
    }

    fn assess(
        &self,
        graph: &SupplyGraph,
        _baseline_flow: f64,
    ) -> Result<ResilienceAssessment, ContingencyAbort> {
        let (lambda, u) = self.leading_eigenpair(graph);

        // node score 2λu²; ranking by u² is equivalent
        let mut ranked: Vec<usize> = graph.non_anchor().collect();
        ranked.sort_by(|&a, &b| (u[b] * u[b]).total_cmp(&(u[a] * u[a])).then(a.cmp(&b)));

        let k = ((graph.len() as f64 * self.top_fraction).floor() as usize).max(1);
        ranked.truncate(k);

        let vulnerability = if lambda <= CONVERGENCE {
            1.0
        } else {
            ranked.iter().map(|&i| u[i] * u[i]).sum::<f64>().clamp(0.0, 1.0)
        };

        tracing::debug!(lambda, vulnerability, "Spectral fallback assessed");

        Ok(ResilienceAssessment {
            strategy: AnalysisKind::SpectralFallback,
            resilience: 1.0 - vulnerability,
            relative_drop: vulnerability,
            worst_case_flow: None,
            critical_nodes: ranked.iter().map(|&i| graph.id(i).to_string()).collect(),
            worst_pair: None,
        })
    }
}
