//! Configuration for the metadata backfill.
//!
//! Defaults mirror the MindView backend settings so the job can run with no
//! arguments against a local deployment.

use std::path::PathBuf;

/// Document store defaults.
pub struct StoreConfig;

impl StoreConfig {
    pub const DEFAULT_URI: &'static str = "mongodb://localhost:27017";
    pub const DEFAULT_DATABASE: &'static str = "mindview";
    pub const SCAN_FILES_COLLECTION: &'static str = "scan_files";
    pub const COMPLETED_STATUS: &'static str = "completed";
}

/// Artifact layout on disk.
pub struct PathsConfig;

impl PathsConfig {
    pub const DEFAULT_METADATA_DIR: &'static str = "storage/metadata";
    pub const ARTIFACT_EXTENSION: &'static str = "json";
}

/// Connection and layout parameters for one backfill run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillConfig {
    /// `mongodb://`, `mongodb+srv://` or `sqlite://` URI.
    pub database_uri: String,
    pub database_name: String,
    pub collection: String,
    /// Directory holding `{job_id}.json` artifacts.
    pub metadata_dir: PathBuf,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            database_uri: StoreConfig::DEFAULT_URI.to_string(),
            database_name: StoreConfig::DEFAULT_DATABASE.to_string(),
            collection: StoreConfig::SCAN_FILES_COLLECTION.to_string(),
            metadata_dir: PathBuf::from(PathsConfig::DEFAULT_METADATA_DIR),
        }
    }
}

impl BackfillConfig {
    pub fn new(
        database_uri: impl Into<String>,
        database_name: impl Into<String>,
        metadata_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            database_uri: database_uri.into(),
            database_name: database_name.into(),
            metadata_dir: metadata_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}
