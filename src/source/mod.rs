//! Raw record fetching.
//!
//! Ownership model:
//! - `DataSource` is the pipeline-facing capability that returns raw
//!   record sets for a schema.
//! - `SnapshotSource` reads the JSON dump produced at build time.
//! - `LiveSource` queries the Airtable REST API.
//!
//! Which one runs is decided by the caller (see `from_config`), never by
//! the pipeline itself.

mod live;
mod snapshot;

use crate::config::{Config, SourceKind};
use crate::context::BuildContext;
use crate::errors::DatasetError;
use crate::schema::Schema;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use live::{LiveSource, LiveSourceConfig};
pub use snapshot::{export_snapshot, SnapshotSource};

/// One Airtable row, as returned by the list-records endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    pub created_time: DateTime<Utc>,
    /// Column name -> raw JSON value. Airtable omits empty cells.
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// All rows fetched from one Airtable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecordSet {
    /// Airtable table name.
    pub table: String,
    pub records: Vec<RawRecord>,
}

impl RawRecordSet {
    pub fn new(table: &str, records: Vec<RawRecord>) -> Self {
        Self {
            table: table.to_string(),
            records,
        }
    }
}

/// Pipeline-facing source of raw record sets.
///
/// For a fixed backend state, `fetch` must return the same record sets in
/// the same order.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Identifier used in logs and fetch errors.
    fn name(&self) -> &str;

    /// Fetch the raw record sets of every table in `schema`.
    ///
    /// Any failure is fatal for the build; implementations do not retry.
    /// Implementations emit their events through `ctx` (typically by
    /// driving their work with `BuildContext::run`), never through the
    /// ambient subscriber alone.
    async fn fetch(
        &self,
        schema: &Schema,
        ctx: &BuildContext,
    ) -> Result<Vec<RawRecordSet>, DatasetError>;
}

/// Build the data source selected by `config.source`.
pub fn from_config(config: &Config) -> Result<Box<dyn DataSource>, DatasetError> {
    match config.source {
        SourceKind::Snapshot => Ok(Box::new(SnapshotSource::from_path(&config.snapshot_path))),
        SourceKind::Live => {
            let api_key = config.airtable_api_key.clone().ok_or_else(|| {
                DatasetError::configuration("AIRTABLE_API_KEY is required for the live source")
            })?;
            let live_config = LiveSourceConfig {
                api_url: config.airtable_api_url.clone(),
                api_key,
                base_id: config.airtable_base_id.clone(),
                view: config.airtable_view.clone(),
                timeout: Duration::from_secs(config.airtable_timeout_secs),
                page_size: live::DEFAULT_PAGE_SIZE,
            };
            Ok(Box::new(LiveSource::new(live_config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_deserialization() {
        let json = r#"{
            "id": "recA1",
            "createdTime": "2024-01-15T10:30:00.000Z",
            "fields": { "label_EN": "Acme", "products": ["recP1"] }
        }"#;

        let record: RawRecord = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(record.id, "recA1");
        assert_eq!(record.created_time.to_rfc3339(), "2024-01-15T10:30:00+00:00");
        assert_eq!(record.fields["label_EN"], "Acme");
    }

    #[test]
    fn test_raw_record_without_fields() {
        let json = r#"{ "id": "recA1", "createdTime": "2024-01-15T10:30:00Z" }"#;
        let record: RawRecord = serde_json::from_str(json).expect("Should deserialize");
        assert!(record.fields.is_empty());
    }

    #[test]
    fn test_raw_record_preserves_field_order() {
        let json = r#"{ "id": "r", "createdTime": "2024-01-15T10:30:00Z", "fields": { "z": 1, "a": 2, "m": 3 } }"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        let keys: Vec<&String> = record.fields.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_from_config_snapshot() {
        let config = Config::for_snapshot("data/snapshot.json");
        let source = from_config(&config).expect("Should build");
        assert_eq!(source.name(), "snapshot");
    }

    #[test]
    fn test_from_config_live_requires_api_key() {
        let mut config = Config::for_snapshot("data/snapshot.json");
        config.source = SourceKind::Live;
        let err = from_config(&config).err().expect("Should fail");
        assert!(err.to_string().contains("AIRTABLE_API_KEY"));
    }

    #[test]
    fn test_from_config_live() {
        let mut config = Config::for_snapshot("data/snapshot.json");
        config.source = SourceKind::Live;
        config.airtable_api_key = Some("key".to_string());
        let source = from_config(&config).expect("Should build");
        assert_eq!(source.name(), "airtable");
    }
}
