//! MindView metadata backfill.
//!
//! Repairs completed scan-file records whose `metadata` is missing or has no
//! regions, using the per-job `{job_id}.json` artifacts left on disk by the
//! segmentation pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use mindview_backfill::{run_backfill, BackfillConfig};
//!
//! #[tokio::main]
//! async fn main() -> mindview_backfill::Result<()> {
//!     let config = BackfillConfig::new(
//!         "mongodb://localhost:27017",
//!         "mindview",
//!         "storage/metadata",
//!     );
//!
//!     let summary = run_backfill(&config).await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod report;
pub mod selector;
pub mod store;

pub use artifact::{ArtifactStore, RawArtifact};
pub use config::BackfillConfig;
pub use engine::{run_backfill, Reconciler, RecordOutcome, SkipReason};
pub use error::{ArtifactError, BackfillError, Result};
pub use metadata::{normalize, NormalizationNote, Normalized, ScanMetadata};
pub use report::{MigrationSummary, RecordReport};
pub use selector::{select_candidates, CandidateFilter, MetadataGap};
pub use store::{
    open_store, MongoScanFileStore, ScanFileRecord, ScanFileStore, SqliteScanFileStore,
};
