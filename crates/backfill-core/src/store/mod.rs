//! Document store access for scan-file records.
//!
//! The backfill needs two operations from the store: a filtered query that
//! returns whole documents, and a single-field `$set` matched by `job_id` that
//! reports whether anything changed. [`ScanFileStore`] captures exactly that.
//!
//! Backends:
//! - [`MongoScanFileStore`] for `mongodb://` and `mongodb+srv://` URIs
//! - [`SqliteScanFileStore`] for `sqlite://path` and `sqlite::memory:`

mod mongo;
mod sqlite;

pub use mongo::MongoScanFileStore;
pub use sqlite::SqliteScanFileStore;

use crate::config::BackfillConfig;
use crate::metadata::ScanMetadata;
use crate::selector::CandidateFilter;
use crate::{BackfillError, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// A scan-file document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFileRecord {
    job_id: Option<String>,
    pub document: Value,
}

impl ScanFileRecord {
    pub fn from_document(document: Value) -> Self {
        let job_id = document
            .get("job_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { job_id, document }
    }

    /// The record's job id, if it carries a string one.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.document.get("metadata")
    }
}

/// Operations the backfill needs from a document store.
#[async_trait]
pub trait ScanFileStore: Send + Sync {
    /// All records matching `filter`, in store order.
    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<ScanFileRecord>>;

    /// Replace the `metadata` field of the record with `job_id`.
    ///
    /// Returns the number of documents actually modified: 0 when no record
    /// matches or the stored value is already identical.
    async fn set_metadata(&self, job_id: &str, metadata: &ScanMetadata) -> Result<u64>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<()>;
}

/// Open the store named by `config.database_uri`.
pub async fn open_store(config: &BackfillConfig) -> Result<Box<dyn ScanFileStore>> {
    let uri = config.database_uri.as_str();

    if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
        info!("Connecting to MongoDB database {}", config.database_name);
        let store =
            MongoScanFileStore::connect(uri, &config.database_name, &config.collection).await?;
        return Ok(Box::new(store));
    }

    if uri == "sqlite::memory:" {
        return Ok(Box::new(SqliteScanFileStore::open_in_memory(
            &config.collection,
        )?));
    }

    if let Some(path) = uri.strip_prefix("sqlite://") {
        info!("Opening SQLite document store {}", path);
        return Ok(Box::new(SqliteScanFileStore::open(
            path,
            &config.collection,
        )?));
    }

    Err(BackfillError::UnsupportedUri {
        uri: uri.to_string(),
    })
}
