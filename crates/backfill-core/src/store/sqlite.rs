//! SQLite document-table backend.
//!
//! Each row holds one scan-file document as JSON text, with `job_id` lifted
//! into a unique column for matching. Candidate queries run through SQLite's
//! JSON functions so the predicate is evaluated by the database, as it is for
//! MongoDB.

use super::{ScanFileRecord, ScanFileStore};
use crate::metadata::ScanMetadata;
use crate::selector::CandidateFilter;
use crate::{BackfillError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Scan-file collection stored as a SQLite table of JSON documents.
pub struct SqliteScanFileStore {
    conn: Mutex<Option<Connection>>,
    table: String,
}

impl SqliteScanFileStore {
    /// Open an existing database file.
    pub fn open(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure_connection(&conn)?;
        Self::from_connection(conn, collection)
    }

    /// Open or create a database file.
    pub fn create(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| BackfillError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;
        Self::from_connection(conn, collection)
    }

    pub fn open_in_memory(collection: &str) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, collection)
    }

    fn from_connection(conn: Connection, collection: &str) -> Result<Self> {
        let table = validate_table_name(collection)?;
        Self::ensure_schema(&conn, &table)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            table,
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection, table: &str) -> Result<()> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    job_id TEXT UNIQUE,
                    document TEXT NOT NULL
                )"
            ),
            [],
        )?;
        Ok(())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| BackfillError::database("Failed to acquire connection lock"))?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| BackfillError::database("Connection is closed"))?;
        f(conn)
    }

    /// Insert a document. `job_id` is taken from the document when it is a string.
    pub fn insert_document(&self, document: &Value) -> Result<()> {
        let record = ScanFileRecord::from_document(document.clone());
        let text = serde_json::to_string(document)?;
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO {} (job_id, document) VALUES (?1, ?2)", self.table),
                params![record.job_id(), text],
            )?;
            Ok(())
        })
    }

    /// Fetch the document for `job_id`.
    pub fn get_document(&self, job_id: &str) -> Result<Option<Value>> {
        let text: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT document FROM {} WHERE job_id = ?1", self.table),
                    params![job_id],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match text {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// All documents in insertion order.
    pub fn all_documents(&self) -> Result<Vec<Value>> {
        let rows: Vec<String> = self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT document FROM {} ORDER BY id", self.table))?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })?;

        rows.iter()
            .map(|text| serde_json::from_str(text).map_err(BackfillError::from))
            .collect()
    }
}

#[async_trait]
impl ScanFileStore for SqliteScanFileStore {
    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<ScanFileRecord>> {
        let sql = format!(
            "SELECT document FROM {} WHERE {} ORDER BY id",
            self.table,
            filter.to_sql_predicate()
        );
        debug!("SQLite candidate query: {}", sql);

        let rows: Vec<String> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![filter.status], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })?;

        rows.iter()
            .map(|text| -> Result<ScanFileRecord> {
                let document: Value = serde_json::from_str(text)?;
                Ok(ScanFileRecord::from_document(document))
            })
            .collect()
    }

    async fn set_metadata(&self, job_id: &str, metadata: &ScanMetadata) -> Result<u64> {
        let new_metadata = metadata.to_value();

        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    &format!("SELECT document FROM {} WHERE job_id = ?1", self.table),
                    params![job_id],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(text) = existing else {
                return Ok(0);
            };

            let mut document: Value = serde_json::from_str(&text)?;
            let Value::Object(fields) = &mut document else {
                return Err(BackfillError::database(format!(
                    "Stored document for {} is not an object",
                    job_id
                )));
            };

            // Same semantics as MongoDB: an identical value is not a modification.
            if fields.get("metadata") == Some(&new_metadata) {
                return Ok(0);
            }
            fields.insert("metadata".to_string(), new_metadata);

            let changed = tx.execute(
                &format!("UPDATE {} SET document = ?1 WHERE job_id = ?2", self.table),
                params![serde_json::to_string(&document)?, job_id],
            )?;
            tx.commit()?;

            Ok(changed as u64)
        })
    }

    async fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| BackfillError::database("Failed to acquire connection lock"))?
            .take();

        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| BackfillError::from(e))?;
            debug!("SQLite connection closed");
        }
        Ok(())
    }
}

fn validate_table_name(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(name.to_string())
    } else {
        Err(BackfillError::Config {
            message: format!("Invalid collection name: {:?}", name),
        })
    }
}
