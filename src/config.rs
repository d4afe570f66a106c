use crate::errors::DatasetError;
use crate::i18n::LocalePreferences;
use crate::schema::{provider, Schema, SchemaOverrides};
use anyhow::{bail, Context, Result};
use std::str::FromStr;

/// Where raw records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Cached build-time dump (stale by design).
    Snapshot,
    /// Airtable REST API.
    Live,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "snapshot" | "static" => Ok(SourceKind::Snapshot),
            "live" => Ok(SourceKind::Live),
            other => bail!("Unknown DATASET_SOURCE '{}' (expected 'snapshot' or 'live')", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Pipeline
    pub source: SourceKind,
    pub snapshot_path: String,
    pub locales: Vec<String>,
    pub default_locale: String,
    pub output_path: Option<String>,
    pub schema_path: Option<String>,

    // Airtable
    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    pub airtable_api_url: String,
    pub airtable_view: Option<String>,
    pub airtable_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Pipeline
            source: std::env::var("DATASET_SOURCE")
                .ok()
                .map(|v| v.parse::<SourceKind>())
                .transpose()?
                .unwrap_or(SourceKind::Snapshot),
            snapshot_path: std::env::var("DATASET_SNAPSHOT_PATH")
                .unwrap_or_else(|_| "data/airtable-snapshot.json".to_string()),
            locales: std::env::var("DATASET_LOCALES")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|_| vec!["en".to_string()]),
            default_locale: std::env::var("DATASET_DEFAULT_LOCALE")
                .unwrap_or_else(|_| "en".to_string()),
            output_path: non_empty_var("DATASET_OUTPUT_PATH"),
            schema_path: non_empty_var("DATASET_SCHEMA_PATH"),

            // Airtable
            airtable_api_key: non_empty_var("AIRTABLE_API_KEY"),
            airtable_base_id: non_empty_var("AIRTABLE_BASE_ID"),
            airtable_api_url: std::env::var("AIRTABLE_API_URL")
                .unwrap_or_else(|_| "https://api.airtable.com".to_string()),
            airtable_view: non_empty_var("AIRTABLE_VIEW"),
            airtable_timeout_secs: match std::env::var("AIRTABLE_TIMEOUT_SECS") {
                Ok(v) => v
                    .trim()
                    .parse()
                    .context("AIRTABLE_TIMEOUT_SECS must be a whole number of seconds")?,
                Err(_) => 30,
            },
        })
    }

    /// Defaults for reading a snapshot file, without touching the environment.
    pub fn for_snapshot(snapshot_path: &str) -> Self {
        Self {
            source: SourceKind::Snapshot,
            snapshot_path: snapshot_path.to_string(),
            locales: vec!["en".to_string()],
            default_locale: "en".to_string(),
            output_path: None,
            schema_path: None,
            airtable_api_key: None,
            airtable_base_id: None,
            airtable_api_url: "https://api.airtable.com".to_string(),
            airtable_view: None,
            airtable_timeout_secs: 30,
        }
    }

    pub fn preferences(&self) -> Result<LocalePreferences, DatasetError> {
        LocalePreferences::from_codes(&self.locales, &self.default_locale)
    }

    /// The schema to build with: the JSON file at `schema_path` when set,
    /// the built-in schema otherwise, with `overrides` applied on top.
    pub fn schema(&self, overrides: Option<&SchemaOverrides>) -> Result<Schema, DatasetError> {
        match &self.schema_path {
            Some(path) => {
                let schema = Schema::from_json_file(path)?;
                match overrides {
                    Some(overrides) => provider::apply_overrides(schema, overrides),
                    None => Ok(schema),
                }
            }
            None => provider::get_schema(overrides),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
