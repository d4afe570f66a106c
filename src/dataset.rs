//! Entry points used by page-rendering code.

use crate::config::Config;
use crate::consolidate::{consolidate, ConsolidatedDataset};
use crate::context::BuildContext;
use crate::errors::DatasetError;
use crate::i18n::LocalePreferences;
use crate::record::{RecordRef, SanitizedRecord};
use crate::sanitize::sanitize_datasets;
use crate::schema::{get_schema, Schema, SchemaOverrides};
use crate::source::{self, DataSource, SnapshotSource};
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub const CUSTOMER_TYPENAME: &str = "Customer";

/// The customer record: the first `Customer` by insertion order.
///
/// Returns `None` when the dataset holds no customer; callers decide how
/// to render without one.
pub fn get_customer(dataset: &ConsolidatedDataset) -> Option<&SanitizedRecord> {
    dataset.find_first(CUSTOMER_TYPENAME)
}

/// Typed view over the customer record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub label: String,
    pub service_label: Option<String>,
    pub terms_description: Option<String>,
    pub privacy_description: Option<String>,
    pub products_title: Option<String>,
    pub available_languages: Vec<String>,
    pub products: Vec<RecordRef>,
    pub theme: Option<RecordRef>,
}

impl Customer {
    /// `None` unless `record` is a customer with its required fields.
    pub fn from_record(record: &SanitizedRecord) -> Option<Customer> {
        if record.typename != CUSTOMER_TYPENAME {
            return None;
        }

        let owned = |field: &str| record.text(field).map(String::from);

        Some(Customer {
            id: record.id.clone(),
            reference: owned("ref")?,
            label: owned("label")?,
            service_label: owned("serviceLabel"),
            terms_description: owned("termsDescription"),
            privacy_description: owned("privacyDescription"),
            products_title: owned("productsTitle"),
            available_languages: record
                .text("availableLanguages")
                .map(|langs| {
                    langs
                        .split(',')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            products: record.references("products").to_vec(),
            theme: record.references("theme").first().cloned(),
        })
    }
}

pub fn get_customer_view(dataset: &ConsolidatedDataset) -> Option<Customer> {
    get_customer(dataset).and_then(Customer::from_record)
}

/// Fetch, sanitize and consolidate with any data source.
pub async fn build_dataset(
    source: &dyn DataSource,
    schema: &Schema,
    preferences: &LocalePreferences,
    ctx: &BuildContext,
) -> Result<ConsolidatedDataset, DatasetError> {
    ctx.run(async {
        let locales: Vec<&str> = preferences.preferred().iter().map(|l| l.code()).collect();
        info!(
            "Building dataset from '{}' source for locales [{}]",
            source.name(),
            locales.join(", ")
        );

        let raw = source.fetch(schema, ctx).await?;
        let datasets = sanitize_datasets(&raw, schema, preferences, ctx)?;
        let dataset = consolidate(schema, &datasets, ctx)?;

        info!("Dataset ready: {} records", dataset.len());
        Ok::<_, DatasetError>(dataset)
    })
    .await
}

/// The dataset as of the last snapshot export.
///
/// This dataset is stale: it reflects Airtable when the snapshot was
/// written and never refreshes.
pub async fn get_static_dataset(
    snapshot: &SnapshotSource,
    preferences: &LocalePreferences,
    overrides: Option<&SchemaOverrides>,
    ctx: &BuildContext,
) -> Result<ConsolidatedDataset, DatasetError> {
    let schema = get_schema(overrides)?;
    build_dataset(snapshot, &schema, preferences, ctx).await
}

/// The dataset from whichever source `config.source` selects.
pub async fn get_dataset(
    config: &Config,
    preferences: &LocalePreferences,
    overrides: Option<&SchemaOverrides>,
    ctx: &BuildContext,
) -> Result<ConsolidatedDataset, DatasetError> {
    let schema = config.schema(overrides)?;
    let source = source::from_config(config)?;
    build_dataset(source.as_ref(), &schema, preferences, ctx).await
}

/// Write `dataset` as pretty JSON to `path`, creating missing parent
/// directories.
pub async fn write_dataset(
    dataset: &ConsolidatedDataset,
    path: impl AsRef<Path>,
) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(dataset)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;

    Ok(())
}
