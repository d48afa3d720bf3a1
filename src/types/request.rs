//! Audit request: the boundary the transport layer deserializes into.

use serde::{Deserialize, Serialize};

use super::supplier::{DependencyRecord, SupplierRecord};
use crate::DEFAULT_POLICY_TIER;

/// Error raised when a request cannot be parsed at all.
///
/// Parseable-but-malformed input never surfaces here; it becomes a verdict.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Wrong field types or invalid JSON.
    #[error("Malformed audit request: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn default_policy_tier() -> String {
    DEFAULT_POLICY_TIER.to_string()
}

/// Arguments of one audit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRequest {
    /// Suppliers, in caller order.
    #[serde(alias = "nodes")]
    pub suppliers: Vec<SupplierRecord>,
    /// Total credit exposure. Defaults to the total declared spend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_exposure: Option<f64>,
    /// Policy Bank tier name.
    #[serde(default = "default_policy_tier")]
    pub policy_tier: String,
    /// Delivery relations. Absent means "substitute the fallback topology"
    /// for exploratory calls.
    #[serde(default, alias = "edges", skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyRecord>>,
    /// Run the N-1 / N-2 contingency test.
    #[serde(default)]
    pub run_adversarial_test: bool,
}

impl AuditRequest {
    /// Create an exploratory request against the default policy tier.
    pub fn new(suppliers: Vec<SupplierRecord>, total_exposure: f64) -> Self {
        Self {
            suppliers,
            total_exposure: Some(total_exposure),
            policy_tier: default_policy_tier(),
            dependencies: None,
            run_adversarial_test: false,
        }
    }

    /// Parse a request from JSON.
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the dependencies.
    pub fn with_dependencies<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DependencyRecord>,
    {
        self.dependencies = Some(dependencies.into_iter().map(Into::into).collect());
        self
    }

    /// Set the policy tier.
    pub fn with_policy_tier(mut self, policy_tier: impl Into<String>) -> Self {
        self.policy_tier = policy_tier.into();
        self
    }

    /// Request the contingency test.
    pub fn adversarial(mut self) -> Self {
        self.run_adversarial_test = true;
        self
    }

    /// Exposure used for the audit.
    pub fn effective_exposure(&self) -> f64 {
        self.total_exposure
            .unwrap_or_else(|| self.suppliers.iter().map(|s| s.spend).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_with_aliases() {
        let json = r#"{
            "nodes": [
                {"id": "S1", "tier": "3", "spend": 100.0},
                {"id": "BUYER", "tier": "Anchor", "spend": 900.0}
            ],
            "edges": [["S1", "BUYER"]],
            "run_adversarial_test": true
        }"#;

        let request = AuditRequest::from_json(json).unwrap();
        assert_eq!(request.suppliers.len(), 2);
        assert_eq!(request.policy_tier, DEFAULT_POLICY_TIER);
        assert_eq!(request.dependencies.as_ref().map(Vec::len), Some(1));
        assert!(request.run_adversarial_test);
    }

    #[test]
    fn test_exposure_defaults_to_supplier_spend() {
        let request = AuditRequest {
            total_exposure: None,
            ..AuditRequest::new(
                vec![
                    SupplierRecord::new("S1", "3", 100.0),
                    SupplierRecord::new("S2", "2", 50.0),
                    SupplierRecord::new("A", "Anchor", 10_000.0),
                ],
                0.0,
            )
        };

        assert_eq!(request.effective_exposure(), 10_150.0);

        // No declared anchor tier: the whitelisted id is the anchor, same total.
        let mut undeclared = request.clone();
        undeclared.suppliers[2] = SupplierRecord::new("buyer", "1", 10_000.0);
        assert_eq!(undeclared.effective_exposure(), 10_150.0);
    }

    #[test]
    fn test_wrong_field_type_is_structural_error() {
        let json = r#"{"suppliers": [{"id": "S1", "tier": "3", "spend": "lots"}]}"#;
        let err = AuditRequest::from_json(json).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }
}
