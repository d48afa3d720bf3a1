//! Policy Bank: named regulatory parameter sets.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Policy parameters are quantized to i64 (× 1e6) before hashing, so the
//! same table always yields the same `params_hash` regardless of float
//! formatting.
//!
//! ## Tiers
//!
//! | Tier | PD floor | LGD floor | Recovery |
//! |------|----------|-----------|----------|
//! | `conservative` | 5% | 60% | 30% |
//! | `standard` | 3% | 45% | 40% |
//! | `aggressive` | 1% | 35% | 50% |
//!
//! All tiers pass at resilience > 0.8 and apply a 1.5× multiplier to
//! adverse outcomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::canonical::{canonical_hash_hex, quantize};
use crate::DEFAULT_POLICY_TIER;

/// Resilience a network must exceed to pass.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.8;

/// Risk multiplier applied to adverse outcomes.
pub const DEFAULT_ADVERSE_MULTIPLIER: f64 = 1.5;

/// One named parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Tier name (`standard`, ...).
    pub name: String,
    /// Probability-of-default floor.
    pub pd_floor: f64,
    /// Loss-given-default floor.
    pub lgd_floor: f64,
    /// Expected recovery rate on default.
    pub recovery_rate: f64,
    /// Resilience score a network must exceed to pass.
    pub pass_threshold: f64,
    /// Multiplier applied to adverse outcomes.
    pub adverse_multiplier: f64,
}

#[derive(Serialize)]
struct QuantizedPolicyParams<'a> {
    name: &'a str,
    pd_floor: i64,
    lgd_floor: i64,
    recovery_rate: i64,
    pass_threshold: i64,
    adverse_multiplier: i64,
}

impl RiskPolicy {
    /// Create a policy with the default pass threshold and multiplier.
    pub fn new(name: impl Into<String>, pd_floor: f64, lgd_floor: f64, recovery_rate: f64) -> Self {
        Self {
            name: name.into(),
            pd_floor: pd_floor.clamp(0.0, 1.0),
            lgd_floor: lgd_floor.clamp(0.0, 1.0),
            recovery_rate: recovery_rate.clamp(0.0, 1.0),
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            adverse_multiplier: DEFAULT_ADVERSE_MULTIPLIER,
        }
    }

    /// Override the pass threshold.
    pub fn with_pass_threshold(mut self, pass_threshold: f64) -> Self {
        self.pass_threshold = pass_threshold.clamp(0.0, 1.0);
        self
    }

    /// Override the adverse multiplier.
    pub fn with_adverse_multiplier(mut self, adverse_multiplier: f64) -> Self {
        self.adverse_multiplier = adverse_multiplier.max(1.0);
        self
    }

    /// Conservative tier.
    pub fn conservative() -> Self {
        Self::new("conservative", 0.05, 0.60, 0.30)
    }

    /// Standard tier (the default).
    pub fn standard() -> Self {
        Self::new("standard", 0.03, 0.45, 0.40)
    }

    /// Aggressive tier.
    pub fn aggressive() -> Self {
        Self::new("aggressive", 0.01, 0.35, 0.50)
    }

    /// Effective loss-given-default: `max(lgd_floor, 1 - recovery_rate)`.
    pub fn effective_lgd(&self) -> f64 {
        self.lgd_floor.max(1.0 - self.recovery_rate)
    }

    /// Whether a resilience score clears this policy.
    pub fn passes(&self, resilience: f64) -> bool {
        resilience > self.pass_threshold
    }

    /// Hash of the quantized parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&QuantizedPolicyParams {
            name: &self.name,
            pd_floor: quantize(self.pd_floor),
            lgd_floor: quantize(self.lgd_floor),
            recovery_rate: quantize(self.recovery_rate),
            pass_threshold: quantize(self.pass_threshold),
            adverse_multiplier: quantize(self.adverse_multiplier),
        })
    }
}

/// Normalize a tier name: trim, lowercase, `-` → `_`, drop a `bafin_` prefix.
///
/// ```rust
/// use contagion_sentinel::policy::normalize_tier_name;
///
/// assert_eq!(normalize_tier_name(" BaFin-Conservative "), "conservative");
/// ```
pub fn normalize_tier_name(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase().replace('-', "_");
    match lowered.strip_prefix("bafin_") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Immutable table of named policies.
///
/// The bank has a fingerprint over every `(name, params_hash)` entry; it
/// changes whenever a policy is added or altered.
#[derive(Debug, Clone)]
pub struct PolicyBank {
    policies: BTreeMap<String, RiskPolicy>,
    default_tier: String,
    bank_fingerprint: String,
}

impl PolicyBank {
    /// Create an empty bank with the given default tier name.
    pub fn new(default_tier: impl Into<String>) -> Self {
        let mut bank = Self {
            policies: BTreeMap::new(),
            default_tier: normalize_tier_name(&default_tier.into()),
            bank_fingerprint: String::new(),
        };
        bank.update_fingerprint();
        bank
    }

    /// Bank with the three standard tiers.
    pub fn with_defaults() -> Self {
        let mut bank = Self::new(DEFAULT_POLICY_TIER);
        bank.register(RiskPolicy::conservative());
        bank.register(RiskPolicy::standard());
        bank.register(RiskPolicy::aggressive());
        bank
    }

    /// Process-wide default bank, built once.
    pub fn global() -> &'static PolicyBank {
        static BANK: OnceLock<PolicyBank> = OnceLock::new();
        BANK.get_or_init(Self::with_defaults)
    }

    /// Register a policy under its normalized name, replacing any previous
    /// entry with the same name.
    pub fn register(&mut self, mut policy: RiskPolicy) {
        policy.name = normalize_tier_name(&policy.name);
        self.policies.insert(policy.name.clone(), policy);
        self.update_fingerprint();
    }

    /// Look up a tier by name.
    pub fn resolve(&self, tier: &str) -> Option<&RiskPolicy> {
        self.policies.get(&normalize_tier_name(tier))
    }

    /// Look up a tier, falling back to the default tier.
    ///
    /// Returns `None` only if the default tier itself is missing. The flag
    /// is `true` when the fallback was used.
    pub fn resolve_or_default(&self, tier: &str) -> Option<(&RiskPolicy, bool)> {
        match self.resolve(tier) {
            Some(policy) => Some((policy, false)),
            None => self.policies.get(&self.default_tier).map(|p| (p, true)),
        }
    }

    /// Default tier name.
    pub fn default_tier(&self) -> &str {
        &self.default_tier
    }

    /// Registered tier names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.policies.keys().map(String::as_str).collect()
    }

    /// Bank fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.bank_fingerprint
    }

    /// Number of registered tiers.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    fn update_fingerprint(&mut self) {
        let entries: Vec<(&str, String)> = self
            .policies
            .values()
            .map(|p| (p.name.as_str(), p.params_hash()))
            .collect();
        self.bank_fingerprint = canonical_hash_hex(&(&self.default_tier, entries));
    }
}

impl Default for PolicyBank {
    fn default() -> Self {
        Self::with_defaults()
    }
}
