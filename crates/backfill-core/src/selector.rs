//! Candidate selection.
//!
//! A record needs repair when it finished processing but its `metadata` has no
//! usable region list. The predicate is declared once in [`CandidateFilter`]
//! and rendered per backend (MongoDB filter document, SQLite `WHERE` clause).
//!
//! [`CandidateFilter::matches`] follows SQLite's JSON path rules. For
//! array-valued `metadata` these differ from MongoDB, whose dotted paths look
//! inside arrays: `metadata: [{"regions": [1]}]` is selected here but not by
//! MongoDB, and `metadata: {"regions": [[]]}` is selected by MongoDB only.

use crate::config::StoreConfig;
use crate::store::{ScanFileRecord, ScanFileStore};
use crate::Result;
use mongodb::bson::{doc, Bson, Document};
use serde_json::Value;
use tracing::{debug, info};

/// The ways a record's metadata can be missing its regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataGap {
    /// No `metadata` key at all.
    Missing,
    /// `metadata` is `{}`.
    Empty,
    /// `metadata` has no `regions` key (or is not an object).
    RegionsMissing,
    /// `metadata.regions` is `[]`.
    RegionsEmpty,
}

impl MetadataGap {
    pub const ALL: [MetadataGap; 4] = [
        MetadataGap::Missing,
        MetadataGap::Empty,
        MetadataGap::RegionsMissing,
        MetadataGap::RegionsEmpty,
    ];

    pub fn applies(&self, document: &Value) -> bool {
        let metadata = document.get("metadata");
        let regions = metadata.and_then(|m| m.get("regions"));
        match self {
            MetadataGap::Missing => metadata.is_none(),
            MetadataGap::Empty => {
                matches!(metadata, Some(Value::Object(map)) if map.is_empty())
            }
            MetadataGap::RegionsMissing => regions.is_none(),
            MetadataGap::RegionsEmpty => {
                matches!(regions, Some(Value::Array(items)) if items.is_empty())
            }
        }
    }

    fn mongo_clause(&self) -> Document {
        match self {
            MetadataGap::Missing => doc! { "metadata": { "$exists": false } },
            MetadataGap::Empty => doc! { "metadata": {} },
            MetadataGap::RegionsMissing => doc! { "metadata.regions": { "$exists": false } },
            MetadataGap::RegionsEmpty => doc! { "metadata.regions": [] },
        }
    }

    /// SQLite expression over a `document` JSON text column.
    fn sql_clause(&self) -> &'static str {
        match self {
            MetadataGap::Missing => "json_type(document, '$.metadata') IS NULL",
            MetadataGap::Empty => {
                "(json_type(document, '$.metadata') = 'object' \
                 AND json_extract(document, '$.metadata') = '{}')"
            }
            MetadataGap::RegionsMissing => "json_type(document, '$.metadata.regions') IS NULL",
            MetadataGap::RegionsEmpty => {
                "(json_type(document, '$.metadata.regions') = 'array' \
                 AND json_array_length(document, '$.metadata.regions') = 0)"
            }
        }
    }
}

/// Declarative backfill predicate: status equality AND any [`MetadataGap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    pub status: String,
}

impl CandidateFilter {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    /// Completed scans with missing or empty region metadata.
    pub fn completed() -> Self {
        Self::new(StoreConfig::COMPLETED_STATUS)
    }

    pub fn matches(&self, document: &Value) -> bool {
        let status = document.get("status").and_then(Value::as_str);
        status == Some(self.status.as_str())
            && MetadataGap::ALL.iter().any(|gap| gap.applies(document))
    }

    pub fn to_mongo_filter(&self) -> Document {
        let gaps: Vec<Bson> = MetadataGap::ALL
            .iter()
            .map(|gap| Bson::Document(gap.mongo_clause()))
            .collect();
        doc! {
            "status": self.status.as_str(),
            "$or": gaps,
        }
    }

    /// `WHERE` clause body; `?1` binds [`CandidateFilter::status`].
    pub fn to_sql_predicate(&self) -> String {
        let gaps: Vec<&str> = MetadataGap::ALL.iter().map(|gap| gap.sql_clause()).collect();
        format!(
            "json_extract(document, '$.status') = ?1 AND ({})",
            gaps.join(" OR ")
        )
    }
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self::completed()
    }
}

/// Fetch every record matching `filter`, in store order.
///
/// The whole set is materialized up front; records that start or stop
/// matching while the pass runs are not revisited.
pub async fn select_candidates(
    store: &dyn ScanFileStore,
    filter: &CandidateFilter,
) -> Result<Vec<ScanFileRecord>> {
    debug!("Selecting candidates with status {:?}", filter.status);
    let candidates = store.find_candidates(filter).await?;
    info!(
        "Found {} files that need metadata migration",
        candidates.len()
    );
    Ok(candidates)
}
