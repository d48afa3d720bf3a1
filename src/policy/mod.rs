//! Risk policies and audit thresholds.

pub mod bank;
pub mod thresholds;

pub use bank::{normalize_tier_name, PolicyBank, RiskPolicy};
pub use thresholds::AuditThresholds;
