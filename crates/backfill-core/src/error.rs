//! Error types for the metadata backfill.
//!
//! `BackfillError` covers run-level failures (store connectivity, candidate
//! selection, configuration). Record-level artifact problems use
//! [`ArtifactError`] so the engine can classify them without string matching.

use std::path::PathBuf;
use thiserror::Error;

/// Run-level error type for the backfill library.
#[derive(Debug, Error)]
pub enum BackfillError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported database URI: {uri}")]
    UnsupportedUri { uri: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for backfill operations.
pub type Result<T> = std::result::Result<T, BackfillError>;

impl From<std::io::Error> for BackfillError {
    fn from(err: std::io::Error) -> Self {
        BackfillError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BackfillError {
    fn from(err: serde_json::Error) -> Self {
        BackfillError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for BackfillError {
    fn from(err: rusqlite::Error) -> Self {
        BackfillError::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<mongodb::error::Error> for BackfillError {
    fn from(err: mongodb::error::Error) -> Self {
        BackfillError::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<mongodb::bson::ser::Error> for BackfillError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        BackfillError::Database {
            message: format!("Failed to encode BSON: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl BackfillError {
    /// Create a database error without an underlying source.
    pub fn database(message: impl Into<String>) -> Self {
        BackfillError::Database {
            message: message.into(),
            source: None,
        }
    }
}

/// Failure to load a single metadata artifact.
///
/// `NotFound` is an expected outcome for records whose artifact was never
/// written; the other variants indicate a damaged or unreadable artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Metadata file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Malformed metadata file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArtifactError::NotFound { .. })
    }

    /// Path the reader resolved for the artifact.
    pub fn path(&self) -> &PathBuf {
        match self {
            ArtifactError::NotFound { path }
            | ArtifactError::Malformed { path, .. }
            | ArtifactError::Io { path, .. } => path,
        }
    }
}
