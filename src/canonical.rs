//! Canonical serialization for deterministic fingerprints.
//!
//! Policies, thresholds and verdict inputs are fingerprinted so that two
//! audits can be compared without re-running them.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - No HashMap in hashed data: use BTreeMap
//! - Floats are quantized to i64 before hashing (see [`quantize`])

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Quantization factor for float normalization.
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Serialize a value to canonical JSON bytes.
///
/// Only crate types with string map keys reach this function, so
/// serialization cannot fail.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute the canonical xxh64 hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Compute the canonical hash as a 16-char hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Quantize a float for hashing: multiply by 1e6 and round.
///
/// Non-finite values map to sentinels so they still hash deterministically.
pub fn quantize(value: f64) -> i64 {
    if value.is_nan() {
        i64::MIN
    } else if value.is_infinite() {
        if value > 0.0 {
            i64::MAX
        } else {
            i64::MIN + 1
        }
    } else {
        (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        value: i64,
    }

    #[test]
    fn test_determinism() {
        let s = Sample {
            name: "standard".to_string(),
            value: quantize(0.03),
        };

        assert_eq!(canonical_hash(&s), canonical_hash(&s));
        assert_eq!(canonical_hash_hex(&s).len(), 16);
    }

    #[test]
    fn test_quantize_absorbs_float_noise() {
        assert_eq!(quantize(0.1 + 0.2), quantize(0.3));
        assert_ne!(quantize(0.3), quantize(0.300002));
    }

    #[test]
    fn test_quantize_non_finite() {
        assert_eq!(quantize(f64::NAN), i64::MIN);
        assert_eq!(quantize(f64::INFINITY), i64::MAX);
        assert_ne!(quantize(f64::NEG_INFINITY), quantize(f64::NAN));
    }
}
