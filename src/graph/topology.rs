//! Illustrative dependency topology for exploratory calls.
//!
//! When a caller submits suppliers without dependencies, a plausible
//! scale-free wiring is substituted so baseline flow can still be shown.
//! The result is deterministic. It is never used for adversarial audits:
//! a stress test against invented edges would certify nothing.

use crate::graph::model::resolve_anchor;
use crate::types::{DependencyRecord, SupplierRecord, Tier};

/// Wire suppliers tier by tier toward the anchor.
///
/// - Tier 1 nodes feed the anchor.
/// - A tier k > 1 node feeds up to two nodes of the nearest shallower
///   populated tier: the current in-degree leader (preferential
///   attachment, ties by input order) and a round-robin partner.
/// - Without a shallower populated tier, the node feeds the anchor.
///
/// Nodes with an unparseable tier are left unwired.
pub fn scale_free_dependencies(suppliers: &[SupplierRecord]) -> Vec<DependencyRecord> {
    let Some((anchor, _)) = resolve_anchor(suppliers) else {
        return Vec::new();
    };

    // tiers[d - 1] holds the indices of tier d, input order
    let mut tiers: [Vec<usize>; 4] = Default::default();
    for (i, supplier) in suppliers.iter().enumerate() {
        if i == anchor {
            continue;
        }
        match Tier::parse(&supplier.tier) {
            Some(Tier::Anchor) | None => {}
            Some(tier) => tiers[usize::from(tier.depth()) - 1].push(i),
        }
    }

    let id = |i: usize| suppliers[i].id.trim().to_string();
    let anchor_id = id(anchor);
    let mut in_degree = vec![0usize; suppliers.len()];
    let mut round_robin = [0usize; 4];
    let mut dependencies = Vec::new();

    for &node in &tiers[0] {
        dependencies.push(DependencyRecord::new(id(node), anchor_id.clone()));
    }

    for depth in 1..4 {
        let Some(target_depth) = (0..depth).rev().find(|&d| !tiers[d].is_empty()) else {
            for &node in &tiers[depth] {
                dependencies.push(DependencyRecord::new(id(node), anchor_id.clone()));
            }
            continue;
        };
        let candidates = &tiers[target_depth];

        for &node in &tiers[depth] {
            let mut leader = candidates[0];
            for &c in candidates.iter().skip(1) {
                if in_degree[c] > in_degree[leader] {
                    leader = c;
                }
            }

            let slot = round_robin[target_depth];
            round_robin[target_depth] += 1;
            let mut partner = candidates[slot % candidates.len()];
            if partner == leader {
                partner = candidates[(slot + 1) % candidates.len()];
            }

            in_degree[leader] += 1;
            dependencies.push(DependencyRecord::new(id(node), id(leader)));
            if partner != leader {
                in_degree[partner] += 1;
                dependencies.push(DependencyRecord::new(id(node), id(partner)));
            }
        }
    }

    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppliers() -> Vec<SupplierRecord> {
        vec![
            SupplierRecord::new("A", "Anchor", 0.0),
            SupplierRecord::new("T1a", "1", 100.0),
            SupplierRecord::new("T1b", "1", 100.0),
            SupplierRecord::new("T3a", "3", 50.0),
            SupplierRecord::new("T3b", "3", 50.0),
            SupplierRecord::new("T3c", "3", 50.0),
        ]
    }

    #[test]
    fn test_tier_one_feeds_anchor() {
        let deps = scale_free_dependencies(&suppliers());
        assert!(deps.contains(&DependencyRecord::new("T1a", "A")));
        assert!(deps.contains(&DependencyRecord::new("T1b", "A")));
    }

    #[test]
    fn test_skips_empty_tiers_and_never_shortcuts() {
        let deps = scale_free_dependencies(&suppliers());

        // tier 2 is empty, so tier 3 feeds tier 1
        for dep in deps.iter().filter(|d| d.source.starts_with("T3")) {
            assert!(dep.target.starts_with("T1"), "unexpected edge {:?}", dep);
        }
        assert_eq!(deps.iter().filter(|d| d.source == "T3a").count(), 2);
    }

    #[test]
    fn test_preferential_attachment() {
        let deps = scale_free_dependencies(&suppliers());
        let into = |target: &str| deps.iter().filter(|d| d.target == target).count();

        // every tier-3 node picks both tier-1 nodes
        assert_eq!(into("T1a"), 3);
        assert_eq!(into("T1b"), 3);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            scale_free_dependencies(&suppliers()),
            scale_free_dependencies(&suppliers())
        );
        assert!(scale_free_dependencies(&[]).is_empty());
    }
}
