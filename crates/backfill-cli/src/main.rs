//! migrate-metadata - backfill scan-file metadata from on-disk artifacts.
//!
//! Finds completed scan-file records whose `metadata` is missing or has no
//! regions, loads `{metadata_dir}/{job_id}.json` for each, and writes the
//! normalized metadata back to the record. Runs once and exits.
//!
//! Every setting has a default, so the job runs with no arguments against a
//! local MindView deployment.

use anyhow::Result;
use clap::Parser;
use mindview_backfill::config::{PathsConfig, StoreConfig};
use mindview_backfill::{run_backfill, BackfillConfig};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "migrate-metadata")]
#[command(about = "Populate missing scan-file metadata from metadata JSON files")]
struct Args {
    /// Document store URI (mongodb://, mongodb+srv:// or sqlite://)
    #[arg(long, env = "MONGODB_URI", default_value = StoreConfig::DEFAULT_URI)]
    mongodb_uri: String,

    /// Database name
    #[arg(long, env = "DATABASE_NAME", default_value = StoreConfig::DEFAULT_DATABASE)]
    database: String,

    /// Collection holding scan-file records
    #[arg(long, default_value = StoreConfig::SCAN_FILES_COLLECTION)]
    collection: String,

    /// Directory containing {job_id}.json metadata files
    #[arg(long, env = "METADATA_DIR", default_value = PathsConfig::DEFAULT_METADATA_DIR)]
    metadata_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> BackfillConfig {
        BackfillConfig::new(self.mongodb_uri, self.database, self.metadata_dir)
            .with_collection(self.collection)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = args.into_config();
    info!("Metadata directory: {}", config.metadata_dir.display());
    if !config.metadata_dir.is_dir() {
        warn!(
            "Metadata directory {} does not exist; every candidate will be skipped",
            config.metadata_dir.display()
        );
    }

    let summary = run_backfill(&config).await?;

    // The summary is the job's report; logs go to stderr.
    println!("{}", summary);

    Ok(())
}
