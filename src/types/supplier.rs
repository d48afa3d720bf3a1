//! Supplier and dependency records.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Distance class of a supplier from the anchor.
///
/// Tier 1 delivers to the anchor directly; tier 4 is raw material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Direct supplier of the anchor.
    #[serde(rename = "1")]
    One,
    /// Second tier.
    #[serde(rename = "2")]
    Two,
    /// Third tier (eligible flow source).
    #[serde(rename = "3")]
    Three,
    /// Raw/deepest tier (eligible flow source).
    #[serde(rename = "4")]
    Four,
    /// The buying/aggregating sink.
    Anchor,
}

impl Tier {
    /// Parse a tier label after normalization.
    ///
    /// Accepts `"1"`..`"4"`, `"Anchor"` (any case) and the prefixed forms
    /// `"T3"`, `"tier 2"`, `"Tier_4"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered == "anchor" {
            return Some(Self::Anchor);
        }

        let digits = lowered
            .strip_prefix("tier")
            .or_else(|| lowered.strip_prefix('t'))
            .unwrap_or(lowered.as_str())
            .trim_start_matches(|c: char| c == ' ' || c == '_' || c == '-');

        match digits {
            "1" => Some(Self::One),
            "2" => Some(Self::Two),
            "3" => Some(Self::Three),
            "4" => Some(Self::Four),
            _ => None,
        }
    }

    /// Whether a raw label names the anchor tier.
    pub fn is_anchor_label(raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case("anchor")
    }

    /// Deep tiers (3 and 4) may not deliver to the anchor directly.
    pub fn is_deep(&self) -> bool {
        matches!(self, Self::Three | Self::Four)
    }

    /// Deep-tier nodes are the flow sources, whatever their in-degree.
    pub fn is_source_eligible(&self) -> bool {
        self.is_deep()
    }

    /// Numeric depth (0 for the anchor).
    pub fn depth(&self) -> u8 {
        match self {
            Self::Anchor => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "1"),
            Self::Two => write!(f, "2"),
            Self::Three => write!(f, "3"),
            Self::Four => write!(f, "4"),
            Self::Anchor => write!(f, "Anchor"),
        }
    }
}

/// A supplier as submitted by the caller.
///
/// The tier is kept as the raw label so that an illegal value can be
/// reported by the hygiene checks instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRecord {
    /// Unique supplier identifier.
    pub id: String,
    /// Raw tier label (string or integer on the wire).
    #[serde(deserialize_with = "tier_label")]
    pub tier: String,
    /// Declared spend, used as node capacity. Zero means no declared capacity.
    #[serde(default, alias = "capacity")]
    pub spend: f64,
    /// Free-form metadata carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SupplierRecord {
    /// Create a supplier record.
    pub fn new(id: impl Into<String>, tier: impl Into<String>, spend: f64) -> Self {
        Self {
            id: id.into(),
            tier: tier.into(),
            spend,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this record declares the anchor tier.
    pub fn is_anchor_tier(&self) -> bool {
        Tier::is_anchor_label(&self.tier)
    }
}

fn tier_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTier {
        Text(String),
        Number(i64),
    }

    Ok(match RawTier::deserialize(deserializer)? {
        RawTier::Text(label) => label,
        RawTier::Number(n) => n.to_string(),
    })
}

/// A delivery relation: `source` delivers to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyRecord {
    /// Delivering supplier.
    pub source: String,
    /// Receiving supplier or anchor.
    pub target: String,
}

impl DependencyRecord {
    /// Create a dependency record.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl<S: Into<String>, T: Into<String>> From<(S, T)> for DependencyRecord {
    fn from((source, target): (S, T)) -> Self {
        Self::new(source, target)
    }
}

// Accepts both `{"source": .., "target": ..}` and `[source, target]`.
impl<'de> Deserialize<'de> for DependencyRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDependency {
            Named { source: String, target: String },
            Pair(String, String),
        }

        Ok(match RawDependency::deserialize(deserializer)? {
            RawDependency::Named { source, target } => Self { source, target },
            RawDependency::Pair(source, target) => Self { source, target },
        })
    }
}
