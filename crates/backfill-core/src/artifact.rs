//! Per-job metadata artifacts on the filesystem.
//!
//! Each processed scan leaves a `{job_id}.json` file under the metadata root.
//! The reader only guarantees that the file parses as a JSON object; field
//! shapes are left to [`crate::metadata::normalize`].

use crate::config::PathsConfig;
use crate::error::ArtifactError;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A parsed artifact: the top-level JSON object, untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawArtifact(pub Map<String, Value>);

impl RawArtifact {
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Read-only view of the metadata artifact directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deterministic location of the artifact for `job_id`.
    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", job_id, PathsConfig::ARTIFACT_EXTENSION))
    }

    /// Load and parse the artifact for `job_id`.
    pub async fn load(&self, job_id: &str) -> Result<RawArtifact, ArtifactError> {
        let path = self.path_for(job_id);

        if !is_safe_job_id(job_id) {
            return Err(ArtifactError::Malformed {
                path,
                message: format!("job id {:?} is not a plain file name", job_id),
            });
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound { path });
            }
            Err(e) => return Err(ArtifactError::Io { path, source: e }),
        };

        debug!("Read {} bytes from {}", bytes.len(), path.display());
        parse_artifact(&path, &bytes)
    }
}

/// Parse artifact bytes, requiring UTF-8 JSON with an object at the top level.
pub fn parse_artifact(path: &Path, bytes: &[u8]) -> Result<RawArtifact, ArtifactError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ArtifactError::Malformed {
        path: path.to_path_buf(),
        message: format!("invalid UTF-8: {}", e),
    })?;

    let value: Value = serde_json::from_str(text).map_err(|e| ArtifactError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(RawArtifact(map)),
        other => Err(ArtifactError::Malformed {
            path: path.to_path_buf(),
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn is_safe_job_id(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id != "."
        && job_id != ".."
        && !job_id.contains(&['/', '\\', '\0'][..])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
