//! Canonical form of audit input.
//!
//! ## Purpose
//!
//! Identifiers are compared in canonical form so that cosmetic variants
//! (`" S1"` vs `"S1"`) cannot pass as distinct suppliers, and every request
//! gets a content fingerprint:
//!
//! ```text
//! input_fingerprint = SHA256(canonical_json(normalized request))
//! ```
//!
//! The fingerprint covers ids, tier labels, quantized spend, dependencies,
//! quantized exposure, policy tier and mode. Metadata is excluded: it never
//! influences the verdict.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical::{quantize, to_canonical_bytes};
use crate::types::AuditRequest;

/// Version of the canonical input format.
///
/// Changes to this version invalidate stored input fingerprints.
pub const CANONICAL_INPUT_VERSION: &str = "1.0.0";

/// Normalize an identifier: trim leading and trailing whitespace.
///
/// # Example
///
/// ```rust
/// use contagion_sentinel::canonical_input::normalize_id;
///
/// assert_eq!(normalize_id("  S1\n"), "S1");
/// ```
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_string()
}

/// Whether an identifier only uses printable ASCII.
///
/// Anything else (Cyrillic look-alikes, zero-width joiners, control
/// characters) can make two suppliers render identically while comparing
/// unequal.
pub fn is_canonical_identifier(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c == ' ' || c.is_ascii_graphic())
}

#[derive(Serialize)]
struct CanonicalSupplier<'a> {
    id: String,
    tier: &'a str,
    spend: i64,
}

#[derive(Serialize)]
struct CanonicalRequest<'a> {
    version: &'static str,
    suppliers: Vec<CanonicalSupplier<'a>>,
    dependencies: Option<Vec<(String, String)>>,
    total_exposure: Option<i64>,
    policy_tier: &'a str,
    run_adversarial_test: bool,
}

/// Compute the SHA-256 input fingerprint of a request as lowercase hex.
pub fn compute_input_fingerprint(request: &AuditRequest) -> String {
    let canonical = CanonicalRequest {
        version: CANONICAL_INPUT_VERSION,
        suppliers: request
            .suppliers
            .iter()
            .map(|s| CanonicalSupplier {
                id: normalize_id(&s.id),
                tier: s.tier.trim(),
                spend: quantize(s.spend),
            })
            .collect(),
        dependencies: request.dependencies.as_ref().map(|deps| {
            deps.iter()
                .map(|d| (normalize_id(&d.source), normalize_id(&d.target)))
                .collect()
        }),
        total_exposure: request.total_exposure.map(quantize),
        policy_tier: request.policy_tier.trim(),
        run_adversarial_test: request.run_adversarial_test,
    };

    let mut hasher = Sha256::new();
    hasher.update(to_canonical_bytes(&canonical));
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SupplierRecord;

    fn request() -> AuditRequest {
        AuditRequest::new(
            vec![
                SupplierRecord::new("S1", "3", 100.0),
                SupplierRecord::new("A", "Anchor", 0.0),
            ],
            500.0,
        )
        .with_dependencies([("S1", "A")])
    }

    #[test]
    fn test_canonical_identifier() {
        assert!(is_canonical_identifier("Supplier 17-B"));
        assert!(!is_canonical_identifier(""));
        // Cyrillic 'С' (U+0421) looks like Latin 'C'.
        assert!(!is_canonical_identifier("\u{0421}1"));
        assert!(!is_canonical_identifier("S1\u{200B}"));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fingerprint = compute_input_fingerprint(&request());
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_ignores_whitespace_and_metadata() {
        let mut padded = request();
        padded.suppliers[0].id = " S1 ".to_string();
        padded.suppliers[0] = padded.suppliers[0]
            .clone()
            .with_metadata("region", serde_json::json!("EU"));

        assert_eq!(
            compute_input_fingerprint(&request()),
            compute_input_fingerprint(&padded)
        );
    }

    #[test]
    fn test_fingerprint_tracks_mode_and_spend() {
        let base = compute_input_fingerprint(&request());
        assert_ne!(base, compute_input_fingerprint(&request().adversarial()));

        let mut changed = request();
        changed.suppliers[0].spend = 100.5;
        assert_ne!(base, compute_input_fingerprint(&changed));
    }
}
