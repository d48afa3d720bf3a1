//! Flow Sentinel: exhaustive N-1 / N-2 contingency search.
//!
//! ## Procedure
//!
//! 1. Zero baseline → abort (`FAILED_ZERO_FLOW`)
//! 2. N-1: remove each non-anchor node, measure the flow drop
//! 3. Critical: drop > `criticality_threshold` × baseline
//! 4. More critical nodes than `max_critical_nodes` → abort
//!    (`FAILED_COMPLEXITY_CAP`) before any pair trial
//! 5. Candidates: the critical set, plus the top `capacity_fallback` nodes
//!    by capacity when fewer than `pairing_floor` are critical
//! 6. N-2: remove every unordered candidate pair
//! 7. resilience = clamp(1 − max drop / baseline, 0, 1)
//!
//! Step 5 closes the dilution loophole: a network whose single failures
//! are all absorbed can still hide a fatal pair among its largest nodes.
//!
//! ## Determinism
//!
//! Trials run on rayon's pool, each on its own freshly built network.
//! Results are collected in enumeration order and reduced sequentially:
//! the maximum drop wins, ties go to the lowest input-order index.

use rayon::prelude::*;

use super::{ContingencyAbort, ResilienceAssessment, ResilienceStrategy};
use crate::flow::{FlowNetworkBuilder, FLOW_EPSILON};
use crate::graph::SupplyGraph;
use crate::policy::AuditThresholds;
use crate::types::AnalysisKind;

/// Full result of a completed stress test. Node references are indices
/// into the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyReport {
    /// Flow of the intact network.
    pub baseline_flow: f64,
    /// Drop per removed node, input order (anchor excluded).
    pub single_drops: Vec<(usize, f64)>,
    /// Critical nodes with their drop, drop descending then input order.
    pub critical: Vec<(usize, f64)>,
    /// Nodes paired in the N-2 phase, input order.
    pub candidates: Vec<usize>,
    /// Most damaging single node.
    pub worst_single: Option<(usize, f64)>,
    /// Most damaging pair.
    pub worst_pair: Option<((usize, usize), f64)>,
    /// Largest drop of either phase.
    pub max_drop: f64,
    /// Flow retained under the worst contingency, in [0, 1].
    pub resilience: f64,
    /// Max-flow runs performed (baseline excluded).
    pub trials: usize,
}

impl ContingencyReport {
    /// Flow left under the worst contingency.
    pub fn worst_case_flow(&self) -> f64 {
        (self.baseline_flow - self.max_drop).max(0.0)
    }

    /// Worst relative loss, in [0, 1].
    pub fn relative_drop(&self) -> f64 {
        1.0 - self.resilience
    }

    fn into_assessment(self, graph: &SupplyGraph) -> ResilienceAssessment {
        ResilienceAssessment {
            strategy: AnalysisKind::FlowContingency,
            resilience: self.resilience,
            relative_drop: self.relative_drop(),
            worst_case_flow: Some(self.worst_case_flow()),
            critical_nodes: self
                .critical
                .iter()
                .map(|&(i, _)| graph.id(i).to_string())
                .collect(),
            worst_pair: self
                .worst_pair
                .map(|((a, b), _)| (graph.id(a).to_string(), graph.id(b).to_string())),
        }
    }
}

/// Contingency tester over one graph.
#[derive(Debug, Clone)]
pub struct FlowSentinel<'g> {
    graph: &'g SupplyGraph,
    builder: FlowNetworkBuilder<'g>,
    thresholds: AuditThresholds,
}

impl<'g> FlowSentinel<'g> {
    /// Sentinel for a validated graph.
    pub fn new(graph: &'g SupplyGraph, thresholds: &AuditThresholds) -> Self {
        Self {
            graph,
            builder: FlowNetworkBuilder::new(graph, graph.total_exposure()),
            thresholds: thresholds.clone(),
        }
    }

    /// Flow of the intact network.
    pub fn baseline_flow(&self) -> f64 {
        self.builder.build().max_flow()
    }

    /// Flow with the given nodes removed.
    pub fn flow_without(&self, removed: &[usize]) -> f64 {
        self.builder.build_without(removed).max_flow()
    }

    fn drop_without(&self, baseline_flow: f64, removed: &[usize]) -> f64 {
        let drop = baseline_flow - self.flow_without(removed);
        if drop <= FLOW_EPSILON {
            0.0
        } else {
            drop
        }
    }

    /// Run the N-1 / N-2 search.
    pub fn stress_test(&self, baseline_flow: f64) -> Result<ContingencyReport, ContingencyAbort> {
        if baseline_flow <= FLOW_EPSILON {
            return Err(ContingencyAbort::ZeroFlow);
        }

        let nodes: Vec<usize> = self.graph.non_anchor().collect();
        let single_drops: Vec<(usize, f64)> = nodes
            .par_iter()
            .map(|&i| (i, self.drop_without(baseline_flow, &[i])))
            .collect();

        let threshold = self.thresholds.criticality_threshold * baseline_flow;
        let mut critical: Vec<(usize, f64)> = single_drops
            .iter()
            .copied()
            .filter(|&(_, drop)| drop > threshold)
            .collect();
        critical.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let worst_single = first_max(single_drops.iter().copied());

        tracing::debug!(
            trials = single_drops.len(),
            critical = critical.len(),
            "N-1 contingency pass complete"
        );

        if critical.len() > self.thresholds.max_critical_nodes {
            return Err(ContingencyAbort::ComplexityCap {
                count: critical.len(),
                cap: self.thresholds.max_critical_nodes,
                critical_nodes: critical
                    .iter()
                    .map(|&(i, _)| self.graph.id(i).to_string())
                    .collect(),
                worst_single_drop: worst_single.map_or(0.0, |(_, drop)| drop),
            });
        }

        let candidates = self.pair_candidates(&critical);
        let pairs: Vec<(usize, usize)> = candidates
            .iter()
            .enumerate()
            .flat_map(|(k, &a)| candidates[k + 1..].iter().map(move |&b| (a, b)))
            .collect();
        let pair_drops: Vec<((usize, usize), f64)> = pairs
            .par_iter()
            .map(|&(a, b)| ((a, b), self.drop_without(baseline_flow, &[a, b])))
            .collect();
        let worst_pair = first_max(pair_drops.iter().copied());

        tracing::debug!(
            candidates = candidates.len(),
            trials = pair_drops.len(),
            "N-2 contingency pass complete"
        );

        let max_drop = worst_single
            .map_or(0.0, |(_, d)| d)
            .max(worst_pair.map_or(0.0, |(_, d)| d));
        let resilience = (1.0 - max_drop / baseline_flow).clamp(0.0, 1.0);

        Ok(ContingencyReport {
            baseline_flow,
            trials: single_drops.len() + pair_drops.len(),
            single_drops,
            critical,
            candidates,
            worst_single,
            worst_pair,
            max_drop,
            resilience,
        })
    }

    fn pair_candidates(&self, critical: &[(usize, f64)]) -> Vec<usize> {
        let mut candidates: Vec<usize> = critical.iter().map(|&(i, _)| i).collect();

        if critical.len() < self.thresholds.pairing_floor {
            let mut by_capacity: Vec<usize> = self.graph.non_anchor().collect();
            by_capacity.sort_by(|&a, &b| {
                let nodes = self.graph.nodes();
                nodes[b].spend.total_cmp(&nodes[a].spend).then(a.cmp(&b))
            });
            candidates.extend(by_capacity.into_iter().take(self.thresholds.capacity_fallback));
        }

        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }
}

/// First entry with the strictly largest drop.
fn first_max<K: Copy>(drops: impl Iterator<Item = (K, f64)>) -> Option<(K, f64)> {
    drops.fold(None, |best, (key, drop)| match best {
        Some((_, best_drop)) if drop <= best_drop => best,
        _ => Some((key, drop)),
    })
}

/// [`ResilienceStrategy`] backed by the Flow Sentinel.
#[derive(Debug, Clone, Default)]
pub struct FlowContingency {
    thresholds: AuditThresholds,
}

impl FlowContingency {
    /// Strategy with the given thresholds.
    pub fn new(thresholds: AuditThresholds) -> Self {
        Self { thresholds }
    }
}

impl ResilienceStrategy for FlowContingency {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::FlowContingency
    }

    fn assess(
        &self,
        graph: &SupplyGraph,
        baseline_flow: f64,
    ) -> Result<ResilienceAssessment, ContingencyAbort> {
        FlowSentinel::new(graph, &self.thresholds)
            .stress_test(baseline_flow)
            .map(|report| report.into_assessment(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphOptions;
    use crate::types::{DependencyRecord, SupplierRecord};

    fn build(nodes: &[(&str, &str, f64)], deps: &[(&str, &str)], exposure: f64) -> SupplyGraph {
        let nodes: Vec<_> = nodes
            .iter()
            .map(|&(id, tier, spend)| SupplierRecord::new(id, tier, spend))
            .collect();
        let deps: Vec<_> = deps.iter().map(|&d| DependencyRecord::from(d)).collect();
        SupplyGraph::build(&nodes, &deps, exposure, &GraphOptions::default()).unwrap()
    }

    fn chain() -> SupplyGraph {
        build(
            &[
                ("R", "4", 100.0),
                ("M", "3", 100.0),
                ("P", "2", 100.0),
                ("A", "Anchor", 0.0),
            ],
            &[("R", "M"), ("M", "P"), ("P", "A")],
            300.0,
        )
    }

    #[test]
    fn test_chain_has_zero_resilience() {
        let graph = chain();
        let sentinel = FlowSentinel::new(&graph, &AuditThresholds::default());
        let baseline = sentinel.baseline_flow();
        assert_eq!(baseline, 100.0);

        let report = sentinel.stress_test(baseline).unwrap();
        assert_eq!(report.critical, vec![(1, 100.0), (2, 100.0)]);
        assert_eq!(report.candidates, vec![0, 1, 2]);
        assert_eq!(report.resilience, 0.0);
        assert_eq!(report.worst_case_flow(), 0.0);
        // 3 singles + 3 pairs
        assert_eq!(report.trials, 6);
    }

    #[test]
    fn test_non_cut_leaf_has_zero_drop() {
        let graph = build(
            &[
                ("S1", "3", 100.0),
                ("S2", "3", 100.0),
                ("P", "1", 100.0),
                ("A", "Anchor", 0.0),
            ],
            &[("S1", "P"), ("S2", "P"), ("P", "A")],
            300.0,
        );
        let sentinel = FlowSentinel::new(&graph, &AuditThresholds::default());
        let report = sentinel.stress_test(sentinel.baseline_flow()).unwrap();

        assert_eq!(report.single_drops[0], (0, 0.0));
        assert_eq!(report.single_drops[1], (1, 0.0));
        assert_eq!(report.critical, vec![(2, 100.0)]);
        assert_eq!(report.worst_pair, Some(((0, 1), 100.0)));
    }

    #[test]
    fn test_zero_baseline_aborts() {
        let graph = chain();
        let sentinel = FlowSentinel::new(&graph, &AuditThresholds::default());
        assert_eq!(sentinel.stress_test(0.0), Err(ContingencyAbort::ZeroFlow));
    }

    #[test]
    fn test_complexity_cap_aborts_before_pairs() {
        let graph = chain();
        let thresholds = AuditThresholds::default().with_max_critical_nodes(1);
        let sentinel = FlowSentinel::new(&graph, &thresholds);

        match sentinel.stress_test(100.0) {
            Err(ContingencyAbort::ComplexityCap {
                count,
                cap,
                critical_nodes,
                worst_single_drop,
            }) => {
                assert_eq!((count, cap), (2, 1));
                assert_eq!(critical_nodes, vec!["M", "P"]);
                assert_eq!(worst_single_drop, 100.0);
            }
            other => panic!("expected complexity cap, got {:?}", other),
        }
    }

    #[test]
    fn test_first_max_prefers_lowest_index() {
        let drops = vec![(3, 5.0), (1, 7.0), (2, 7.0), (0, 1.0)];
        assert_eq!(first_max(drops.into_iter()), Some((1, 7.0)));
        assert_eq!(first_max(Vec::<(usize, f64)>::new().into_iter()), None);
    }

    #[test]
    fn test_strategy_reports_ids() {
        let graph = chain();
        let assessment = FlowContingency::default().assess(&graph, 100.0).unwrap();

        assert_eq!(assessment.strategy, AnalysisKind::FlowContingency);
        assert_eq!(assessment.critical_nodes, vec!["M", "P"]);
        assert_eq!(assessment.worst_pair, Some(("R".to_string(), "M".to_string())));
        assert_eq!(assessment.relative_drop, 1.0);
    }
}
