//! Financial translator: flow loss to expected contagion loss.
//!
//! ```text
//! expected_loss = exposure × pd_floor × (1 + relative_drop) × risk_multiplier
//! ```
//!
//! `risk_multiplier` is the policy's adverse multiplier for `FAILED`,
//! `FAILED_ZERO_FLOW` and `FAILED_COMPLEXITY_CAP`, else 1.0.

use crate::policy::RiskPolicy;
use crate::types::AuditStatus;

/// Multiplier applied for a given outcome.
pub fn risk_multiplier(policy: &RiskPolicy, status: AuditStatus) -> f64 {
    if status.is_adverse() {
        policy.adverse_multiplier
    } else {
        1.0
    }
}

/// Expected contagion loss.
///
/// `relative_drop` is clamped into [0, 1]; a non-finite drop counts as a
/// total loss.
pub fn translate(
    total_exposure: f64,
    policy: &RiskPolicy,
    relative_drop: f64,
    status: AuditStatus,
) -> f64 {
    let drop = if relative_drop.is_finite() {
        relative_drop.clamp(0.0, 1.0)
    } else {
        1.0
    };
    total_exposure * policy.pd_floor * (1.0 + drop) * risk_multiplier(policy, status)
}
