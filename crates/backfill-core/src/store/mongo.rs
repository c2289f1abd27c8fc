//! MongoDB backend.

use super::{ScanFileRecord, ScanFileStore};
use crate::metadata::ScanMetadata;
use crate::selector::CandidateFilter;
use crate::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Client, Collection};
use tracing::debug;

/// Scan-file collection in a MongoDB database.
pub struct MongoScanFileStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoScanFileStore {
    /// Connect and verify the server is reachable.
    ///
    /// Client construction is lazy in the driver, so a `ping` is issued here to
    /// surface connectivity problems before candidate selection starts.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        debug!("Connected to {}.{}", database, collection);

        Ok(Self {
            collection: db.collection::<Document>(collection),
            client,
        })
    }
}

#[async_trait]
impl ScanFileStore for MongoScanFileStore {
    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<ScanFileRecord>> {
        let query = filter.to_mongo_filter();
        debug!("MongoDB candidate query: {}", query);

        let documents: Vec<Document> = self.collection.find(query).await?.try_collect().await?;

        Ok(documents.into_iter().map(record_from_document).collect())
    }

    async fn set_metadata(&self, job_id: &str, metadata: &ScanMetadata) -> Result<u64> {
        let update = metadata_update(metadata)?;
        let result = self
            .collection
            .update_one(job_filter(job_id), update)
            .await?;
        Ok(result.modified_count)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        debug!("MongoDB client shut down");
        Ok(())
    }
}

/// Match a record by its job id, never by `_id`.
fn job_filter(job_id: &str) -> Document {
    doc! { "job_id": job_id }
}

/// `$set` of the `metadata` field alone; other fields are left as they are.
fn metadata_update(metadata: &ScanMetadata) -> Result<Document> {
    let value = bson::to_bson(metadata)?;
    Ok(doc! { "$set": { "metadata": value } })
}

fn record_from_document(document: Document) -> ScanFileRecord {
    ScanFileRecord::from_document(Bson::Document(document).into_relaxed_extjson())
}
