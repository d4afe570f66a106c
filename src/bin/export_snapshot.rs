//! Snapshot export binary - fetches every schema table from Airtable and
//! writes the raw record sets to the snapshot file read at build time.
//!
//! Usage:
//!   cargo run --bin export-snapshot
//!
//! Required environment variables:
//! - AIRTABLE_API_KEY
//! - AIRTABLE_BASE_ID
//!
//! Optional:
//! - DATASET_SNAPSHOT_PATH (defaults to data/airtable-snapshot.json)
//! - DATASET_SCHEMA_PATH (defaults to the built-in schema)
//! - AIRTABLE_API_URL (defaults to https://api.airtable.com)
//! - AIRTABLE_VIEW
//! - AIRTABLE_TIMEOUT_SECS (defaults to 30)

use airtable_dataset::config::{Config, SourceKind};
use airtable_dataset::{source, BuildContext};
use anyhow::{Context, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("export_snapshot=info".parse()?)
                .add_directive("airtable_dataset=info".parse()?),
        )
        .init();

    info!("Starting Airtable snapshot export");

    // The export always talks to the API, whatever DATASET_SOURCE says
    let mut config = Config::from_env()?;
    config.source = SourceKind::Live;

    let schema = config.schema(None)?;
    let live = source::from_config(&config)?;
    let ctx = BuildContext::new("export-snapshot");

    let record_sets = live
        .fetch(&schema, &ctx)
        .await
        .context("Failed to fetch records from Airtable")?;

    source::export_snapshot(&record_sets, &config.snapshot_path)
        .await
        .with_context(|| format!("Failed to write snapshot to {}", config.snapshot_path))?;

    let record_count: usize = record_sets.iter().map(|set| set.records.len()).sum();
    info!(
        "✓ Exported {} tables ({} records) to {}",
        record_sets.len(),
        record_count,
        config.snapshot_path
    );

    Ok(())
}
