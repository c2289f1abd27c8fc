//! Reconciliation pass.
//!
//! One pass selects the candidate set once, then for each record loads the
//! artifact, normalizes it and sets `metadata` by `job_id`. Every candidate
//! ends in exactly one [`RecordOutcome`]; per-record failures never abort the
//! pass.

use crate::artifact::ArtifactStore;
use crate::config::BackfillConfig;
use crate::error::ArtifactError;
use crate::metadata::{normalize, Normalized};
use crate::report::MigrationSummary;
use crate::selector::{select_candidates, CandidateFilter};
use crate::store::{open_store, ScanFileRecord, ScanFileStore};
use crate::Result;
use std::fmt;
use tracing::{error, info, warn};

/// Why a candidate was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MetadataFileNotFound,
    NotModified,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MetadataFileNotFound => f.write_str("metadata file not found"),
            SkipReason::NotModified => f.write_str("not modified"),
        }
    }
}

/// Terminal state of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Migrated { regions: usize },
    Skipped(SkipReason),
    Error(String),
}

/// Drives a backfill pass against a store and an artifact directory.
pub struct Reconciler<'a> {
    store: &'a dyn ScanFileStore,
    artifacts: ArtifactStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn ScanFileStore, artifacts: ArtifactStore) -> Self {
        Self { store, artifacts }
    }

    /// Run one full pass. Only candidate selection can fail the run.
    pub async fn run(&self, filter: &CandidateFilter) -> Result<MigrationSummary> {
        info!("Starting metadata migration...");
        let candidates = select_candidates(self.store, filter).await?;

        let mut outcomes = Vec::with_capacity(candidates.len());
        for record in &candidates {
            let outcome = self.process(record).await;
            outcomes.push((record.job_id().map(str::to_string), outcome));
        }

        Ok(MigrationSummary::from_outcomes(outcomes))
    }

    /// Process a single candidate to its terminal outcome.
    pub async fn process(&self, record: &ScanFileRecord) -> RecordOutcome {
        let Some(job_id) = record.job_id() else {
            error!("Record has no string job_id: {}", record.document);
            return RecordOutcome::Error("record has no job_id".to_string());
        };

        info!("Processing {}...", job_id);

        let raw = match self.artifacts.load(job_id).await {
            Ok(raw) => raw,
            Err(ArtifactError::NotFound { path }) => {
                warn!("  Metadata file not found: {}", path.display());
                return RecordOutcome::Skipped(SkipReason::MetadataFileNotFound);
            }
            Err(e) => {
                error!("  Error: {}", e);
                return RecordOutcome::Error(e.to_string());
            }
        };

        let Normalized { metadata, notes } = normalize(raw);
        let regions = metadata.region_count();
        info!("  Loaded metadata with {} regions", regions);
        for note in &notes {
            warn!("  {}: {}", job_id, note);
        }

        match self.store.set_metadata(job_id, &metadata).await {
            Ok(modified) if modified > 0 => {
                info!("  Updated database record with {} regions", regions);
                RecordOutcome::Migrated { regions }
            }
            Ok(_) => {
                warn!("  Database record not modified");
                RecordOutcome::Skipped(SkipReason::NotModified)
            }
            Err(e) => {
                error!("  Error: {}", e);
                RecordOutcome::Error(e.to_string())
            }
        }
    }
}

/// Open the configured store, run one pass, and close the store.
///
/// The store is closed on every path once it has been opened, including when
/// candidate selection fails.
pub async fn run_backfill(config: &BackfillConfig) -> Result<MigrationSummary> {
    let store = open_store(config).await?;
    let reconciler = Reconciler::new(store.as_ref(), ArtifactStore::new(&config.metadata_dir));

    let result = reconciler.run(&CandidateFilter::completed()).await;
    let closed = store.close().await;

    let summary = result?;
    closed?;
    Ok(summary)
}
