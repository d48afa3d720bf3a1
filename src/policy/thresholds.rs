//! Numeric thresholds of the audit pipeline.
//!
//! Every constant the governor, the hygiene checks and the flow sentinel
//! rely on lives here, with an environment override for operators.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::canonical::{canonical_hash_hex, quantize};

/// Maximum number of nodes accepted by the governor.
pub const DEFAULT_MAX_NODES: usize = 200;
/// Declared spend may not exceed this multiple of total exposure.
pub const DEFAULT_INFLATION_CAP: f64 = 1.5;
/// A node is critical when its removal drops flow by more than this
/// fraction of the baseline.
pub const DEFAULT_CRITICALITY_THRESHOLD: f64 = 0.005;
/// Critical-node count above which pair testing is refused.
pub const DEFAULT_MAX_CRITICAL_NODES: usize = 50;
/// Below this many critical nodes, candidates are supplemented by capacity.
pub const DEFAULT_PAIRING_FLOOR: usize = 5;
/// Number of top-capacity nodes used as supplementary pair candidates.
pub const DEFAULT_CAPACITY_FALLBACK: usize = 20;
/// Node count above which zero critical nodes raise a dilution advisory.
pub const DEFAULT_DILUTION_MIN_NODES: usize = 50;
/// Graphs up to this size use the spectral fallback.
pub const DEFAULT_SPECTRAL_MAX_NODES: usize = 2;
/// Fraction of nodes flagged critical by the spectral fallback.
pub const DEFAULT_SPECTRAL_TOP_FRACTION: f64 = 0.05;

/// Audit thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditThresholds {
    /// Maximum node count (default: 200).
    pub max_nodes: usize,
    /// Inflation cap on declared spend vs exposure (default: 1.5).
    pub inflation_cap: f64,
    /// Relative flow drop that makes a node critical (default: 0.005).
    pub criticality_threshold: f64,
    /// Complexity cap on critical nodes (default: 50).
    pub max_critical_nodes: usize,
    /// Minimum critical set size before capacity supplementation (default: 5).
    pub pairing_floor: usize,
    /// Top-capacity candidates added below the floor (default: 20).
    pub capacity_fallback: usize,
    /// Node count for the dilution advisory (default: 50).
    pub dilution_min_nodes: usize,
    /// Largest graph handled by the spectral fallback (default: 2).
    pub spectral_max_nodes: usize,
    /// Spectral critical fraction (default: 0.05).
    pub spectral_top_fraction: f64,
}

#[derive(Serialize)]
struct QuantizedThresholds {
    max_nodes: usize,
    inflation_cap: i64,
    criticality_threshold: i64,
    max_critical_nodes: usize,
    pairing_floor: usize,
    capacity_fallback: usize,
    dilution_min_nodes: usize,
    spectral_max_nodes: usize,
    spectral_top_fraction: i64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl AuditThresholds {
    /// Load thresholds from environment variables, defaulting each one.
    ///
    /// - `SENTINEL_MAX_NODES`
    /// - `SENTINEL_INFLATION_CAP`
    /// - `SENTINEL_CRITICALITY_THRESHOLD`
    /// - `SENTINEL_MAX_CRITICAL_NODES`
    /// - `SENTINEL_PAIRING_FLOOR`
    /// - `SENTINEL_CAPACITY_FALLBACK`
    /// - `SENTINEL_SPECTRAL_MAX_NODES`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_nodes: env_or("SENTINEL_MAX_NODES", defaults.max_nodes),
            inflation_cap: env_or("SENTINEL_INFLATION_CAP", defaults.inflation_cap),
            criticality_threshold: env_or(
                "SENTINEL_CRITICALITY_THRESHOLD",
                defaults.criticality_threshold,
            ),
            max_critical_nodes: env_or("SENTINEL_MAX_CRITICAL_NODES", defaults.max_critical_nodes),
            pairing_floor: env_or("SENTINEL_PAIRING_FLOOR", defaults.pairing_floor),
            capacity_fallback: env_or("SENTINEL_CAPACITY_FALLBACK", defaults.capacity_fallback),
            spectral_max_nodes: env_or("SENTINEL_SPECTRAL_MAX_NODES", defaults.spectral_max_nodes),
            ..defaults
        }
    }

    /// Override the node cap.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Override the complexity cap.
    pub fn with_max_critical_nodes(mut self, max_critical_nodes: usize) -> Self {
        self.max_critical_nodes = max_critical_nodes;
        self
    }

    /// Hash of the quantized thresholds.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&QuantizedThresholds {
            max_nodes: self.max_nodes,
            inflation_cap: quantize(self.inflation_cap),
            criticality_threshold: quantize(self.criticality_threshold),
            max_critical_nodes: self.max_critical_nodes,
            pairing_floor: self.pairing_floor,
            capacity_fallback: self.capacity_fallback,
            dilution_min_nodes: self.dilution_min_nodes,
            spectral_max_nodes: self.spectral_max_nodes,
            spectral_top_fraction: quantize(self.spectral_top_fraction),
        })
    }
}

impl Default for AuditThresholds {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            inflation_cap: DEFAULT_INFLATION_CAP,
            criticality_threshold: DEFAULT_CRITICALITY_THRESHOLD,
            max_critical_nodes: DEFAULT_MAX_CRITICAL_NODES,
            pairing_floor: DEFAULT_PAIRING_FLOOR,
            capacity_fallback: DEFAULT_CAPACITY_FALLBACK,
            dilution_min_nodes: DEFAULT_DILUTION_MIN_NODES,
            spectral_max_nodes: DEFAULT_SPECTRAL_MAX_NODES,
            spectral_top_fraction: DEFAULT_SPECTRAL_TOP_FRACTION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let thresholds = AuditThresholds::default();
        assert_eq!(thresholds.max_nodes, 200);
        assert_eq!(thresholds.inflation_cap, 1.5);
        assert_eq!(thresholds.max_critical_nodes, 50);
        assert_eq!(thresholds.pairing_floor, 5);
        assert_eq!(thresholds.capacity_fallback, 20);
    }

    #[test]
    fn test_env_override_and_fallback() {
        std::env::set_var("SENTINEL_TEST_ONLY_CAP", " 75 ");
        std::env::set_var("SENTINEL_TEST_ONLY_BAD", "many");

        assert_eq!(env_or("SENTINEL_TEST_ONLY_CAP", 200usize), 75);
        assert_eq!(env_or("SENTINEL_TEST_ONLY_BAD", 200usize), 200);
        assert_eq!(env_or("SENTINEL_TEST_ONLY_MISSING", 1.5f64), 1.5);
    }

    #[test]
    fn test_fingerprint_determinism() {
        let a = AuditThresholds::default();
        assert_eq!(a.fingerprint(), AuditThresholds::default().fingerprint());

        let b = AuditThresholds::default().with_max_critical_nodes(10);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
