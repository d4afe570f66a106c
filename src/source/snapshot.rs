use crate::context::BuildContext;
use crate::errors::DatasetError;
use crate::schema::Schema;
use crate::source::{DataSource, RawRecordSet};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SOURCE_NAME: &str = "snapshot";

#[derive(Debug, Clone)]
enum SnapshotOrigin {
    File(PathBuf),
    Inline(String),
}

/// Cached dump of raw record sets, written once per build.
///
/// The data is stale by construction: it reflects Airtable at the time the
/// dump was exported and never refreshes.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    origin: SnapshotOrigin,
}

impl SnapshotSource {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            origin: SnapshotOrigin::File(path.as_ref().to_path_buf()),
        }
    }

    /// Snapshot held in memory, e.g. embedded with `include_str!`.
    pub fn from_json(contents: impl Into<String>) -> Self {
        Self {
            origin: SnapshotOrigin::Inline(contents.into()),
        }
    }

    fn parse(contents: &str, origin: &str) -> Result<Vec<RawRecordSet>, DatasetError> {
        serde_json::from_str(contents).map_err(|e| {
            DatasetError::fetch(SOURCE_NAME, format!("Malformed snapshot {}: {}", origin, e))
        })
    }

    async fn load(&self, ctx: &BuildContext) -> Result<Vec<RawRecordSet>, DatasetError> {
        let record_sets = match &self.origin {
            SnapshotOrigin::File(path) => {
                debug!(parent: ctx.span(), "Reading snapshot {}", path.display());
                let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                    DatasetError::fetch(
                        SOURCE_NAME,
                        format!("Failed to read snapshot '{}': {}", path.display(), e),
                    )
                })?;
                Self::parse(&contents, &format!("'{}'", path.display()))?
            }
            SnapshotOrigin::Inline(contents) => Self::parse(contents, "(inline)")?,
        };

        let record_count: usize = record_sets.iter().map(|set| set.records.len()).sum();
        info!(
            parent: ctx.span(),
            "Loaded {} tables ({} records) from snapshot",
            record_sets.len(),
            record_count
        );

        Ok(record_sets)
    }
}

#[async_trait]
impl DataSource for SnapshotSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(
        &self,
        _schema: &Schema,
        ctx: &BuildContext,
    ) -> Result<Vec<RawRecordSet>, DatasetError> {
        ctx.run(self.load(ctx)).await
    }
}

/// Write `record_sets` where a `SnapshotSource` can read them back.
pub async fn export_snapshot(
    record_sets: &[RawRecordSet],
    path: impl AsRef<Path>,
) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(record_sets)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::get_schema;
    use crate::source::RawRecord;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_sets() -> Vec<RawRecordSet> {
        let mut fields = serde_json::Map::new();
        fields.insert("ref".to_string(), serde_json::json!("acme"));
        fields.insert("label_EN".to_string(), serde_json::json!("Acme"));

        vec![RawRecordSet::new(
            "Customer",
            vec![RawRecord {
                id: "recC1".to_string(),
                created_time: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
                fields,
            }],
        )]
    }

    #[tokio::test]
    async fn test_inline_snapshot() {
        let json = serde_json::to_string(&sample_sets()).unwrap();
        let source = SnapshotSource::from_json(json);
        let schema = get_schema(None).unwrap();

        let sets = source
            .fetch(&schema, &BuildContext::disabled())
            .await
            .expect("Should parse");
        assert_eq!(sets, sample_sets());
    }

    #[tokio::test]
    async fn test_export_then_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("snapshot.json");

        export_snapshot(&sample_sets(), &path)
            .await
            .expect("Should export");

        let source = SnapshotSource::from_path(&path);
        let sets = source
            .fetch(&get_schema(None).unwrap(), &BuildContext::disabled())
            .await
            .expect("Should read");
        assert_eq!(sets, sample_sets());
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = SnapshotSource::from_path(temp_dir.path().join("absent.json"));

        let err = source
            .fetch(&get_schema(None).unwrap(), &BuildContext::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, DatasetError::Fetch { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_fetch_error() {
        let source = SnapshotSource::from_json("[{\"table\": 3}]");
        let err = source
            .fetch(&get_schema(None).unwrap(), &BuildContext::disabled())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Malformed snapshot"));
    }
}
