//! Normalized scan metadata.
//!
//! Converts a raw artifact into [`ScanMetadata`], filling the three required
//! keys when they are absent. Explicit values are trusted; a `total_regions`
//! that disagrees with the region list is kept and reported through
//! [`NormalizationNote::TotalRegionsMismatch`].

use crate::artifact::RawArtifact;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

const REGIONS: &str = "regions";
const HAS_TUMOR: &str = "has_tumor";
const TOTAL_REGIONS: &str = "total_regions";

/// Metadata as stored on a scan-file record.
///
/// Region descriptors are opaque; any artifact keys beyond the required three
/// are carried through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub regions: Vec<Value>,
    pub has_tumor: bool,
    pub total_regions: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScanMetadata {
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// JSON form written into the record's `metadata` field.
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert(REGIONS.to_string(), Value::Array(self.regions.clone()));
        map.insert(HAS_TUMOR.to_string(), Value::Bool(self.has_tumor));
        map.insert(TOTAL_REGIONS.to_string(), Value::from(self.total_regions));
        Value::Object(map)
    }
}

/// Something the normalizer noticed but did not treat as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationNote {
    /// `total_regions` was given explicitly and differs from `len(regions)`.
    TotalRegionsMismatch { declared: u64, actual: usize },
    /// Field was present with the wrong type and was replaced by its default.
    ReplacedInvalid { field: &'static str, found: String },
}

impl fmt::Display for NormalizationNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationNote::TotalRegionsMismatch { declared, actual } => write!(
                f,
                "total_regions is {} but {} regions are listed; keeping declared value",
                declared, actual
            ),
            NormalizationNote::ReplacedInvalid { field, found } => {
                write!(f, "{} had unexpected value {}; using default", field, found)
            }
        }
    }
}

/// Result of normalizing one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub metadata: ScanMetadata,
    pub notes: Vec<NormalizationNote>,
}

/// Fill absent required fields with defaults.
///
/// Never fails: every field has a default, and wrong-typed values are
/// replaced and noted.
pub fn normalize(raw: RawArtifact) -> Normalized {
    let mut fields = raw.into_inner();
    let mut notes = Vec::new();

    let regions = match fields.remove(REGIONS) {
        None => Vec::new(),
        Some(Value::Array(regions)) => regions,
        Some(other) => {
            notes.push(replaced(REGIONS, &other));
            Vec::new()
        }
    };

    let has_tumor = match fields.remove(HAS_TUMOR) {
        None => false,
        Some(Value::Bool(flag)) => flag,
        Some(other) => {
            notes.push(replaced(HAS_TUMOR, &other));
            false
        }
    };

    let actual = regions.len();
    let total_regions = match fields.remove(TOTAL_REGIONS) {
        None => actual as u64,
        Some(value) => match value.as_u64() {
            Some(declared) => {
                if declared != actual as u64 {
                    notes.push(NormalizationNote::TotalRegionsMismatch { declared, actual });
                }
                declared
            }
            None => {
                notes.push(replaced(TOTAL_REGIONS, &value));
                actual as u64
            }
        },
    };

    Normalized {
        metadata: ScanMetadata {
            regions,
            has_tumor,
            total_regions,
            extra: fields,
        },
        notes,
    }
}

fn replaced(field: &'static str, found: &Value) -> NormalizationNote {
    NormalizationNote::ReplacedInvalid {
        field,
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawArtifact {
        match value {
            Value::Object(map) => RawArtifact(map),
            _ => panic!("test artifact must be an object"),
        }
    }

    #[test]
    fn test_empty_artifact_gets_all_defaults() {
        let normalized = normalize(raw(json!({})));
        assert!(normalized.notes.is_empty());
        assert_eq!(
            normalized.metadata.to_value(),
            json!({"regions": [], "has_tumor": false, "total_regions": 0})
        );
    }

    #[test]
    fn test_total_regions_derived_from_regions() {
        let normalized = normalize(raw(json!({"regions": [1, 2, 3]})));
        assert_eq!(
            normalized.metadata.to_value(),
            json!({"regions": [1, 2, 3], "has_tumor": false, "total_regions": 3})
        );
        assert_eq!(normalized.metadata.region_count(), 3);
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let normalized = normalize(raw(json!({
            "regions": [{"label": "edema"}],
            "has_tumor": true,
            "total_regions": 1
        })));
        assert!(normalized.notes.is_empty());
        assert!(normalized.metadata.has_tumor);
        assert_eq!(normalized.metadata.total_regions, 1);
    }

    #[test]
    fn test_mismatched_total_is_preserved_and_noted() {
        let normalized = normalize(raw(json!({"regions": [1, 2], "total_regions": 5})));
        assert_eq!(normalized.metadata.total_regions, 5);
        assert_eq!(
            normalized.notes,
            vec![NormalizationNote::TotalRegionsMismatch {
                declared: 5,
                actual: 2
            }]
        );
    }

    #[test]
    fn test_wrong_types_are_defaulted() {
        let normalized = normalize(raw(json!({
            "regions": "not-a-list",
            "has_tumor": "yes",
            "total_regions": -1
        })));
        assert_eq!(
            normalized.metadata.to_value(),
            json!({"regions": [], "has_tumor": false, "total_regions": 0})
        );
        assert_eq!(normalized.notes.len(), 3);
        assert!(normalized
            .notes
            .iter()
            .all(|n| matches!(n, NormalizationNote::ReplacedInvalid { .. })));
    }

    #[test]
    fn test_extra_keys_carried_through() {
        let normalized = normalize(raw(json!({
            "regions": [],
            "volumes": {"edema": 12.5},
            "model": "swin_unetr"
        })));
        let value = normalized.metadata.to_value();
        assert_eq!(value["volumes"], json!({"edema": 12.5}));
        assert_eq!(value["model"], json!("swin_unetr"));

        // Serde form matches the hand-built value.
        assert_eq!(serde_json::to_value(&normalized.metadata).unwrap(), value);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let input = json!({"regions": [1, {"a": 2}], "extra": null});
        let first = normalize(raw(input.clone()));
        let second = normalize(raw(input));
        assert_eq!(first, second);
    }
}
