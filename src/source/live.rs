use crate::context::BuildContext;
use crate::errors::DatasetError;
use crate::schema::Schema;
use crate::source::{DataSource, RawRecord, RawRecordSet};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

const SOURCE_NAME: &str = "airtable";

/// Largest page the list-records endpoint serves.
pub(crate) const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct LiveSourceConfig {
    /// API root, e.g. `https://api.airtable.com`.
    pub api_url: String,
    pub api_key: String,
    /// Used when the schema carries no base id.
    pub base_id: Option<String>,
    pub view: Option<String>,
    pub timeout: Duration,
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    records: Vec<RawRecord>,
    offset: Option<String>,
}

/// Reads every schema table straight from the Airtable REST API.
#[derive(Debug, Clone)]
pub struct LiveSource {
    client: reqwest::Client,
    config: LiveSourceConfig,
}

impl LiveSource {
    pub fn new(config: LiveSourceConfig) -> Result<Self, DatasetError> {
        Url::parse(&config.api_url).map_err(|e| {
            DatasetError::configuration(format!("Invalid Airtable API URL '{}': {}", config.api_url, e))
        })?;
        if config.page_size == 0 || config.page_size > DEFAULT_PAGE_SIZE {
            return Err(DatasetError::configuration(format!(
                "Airtable page size must be between 1 and {}, got {}",
                DEFAULT_PAGE_SIZE, config.page_size
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DatasetError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn table_url(&self, base_id: &str, table: &str) -> Result<Url, DatasetError> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| DatasetError::configuration(format!("Invalid Airtable API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DatasetError::configuration("Airtable API URL cannot be a base"))?
            .pop_if_empty()
            .extend(["v0", base_id, table]);
        Ok(url)
    }

    async fn fetch_table(
        &self,
        base_id: &str,
        table: &str,
        ctx: &BuildContext,
    ) -> Result<Vec<RawRecord>, DatasetError> {
        let url = self.table_url(base_id, table)?;
        let page_size = self.config.page_size.to_string();
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        let mut seen_offsets: HashSet<String> = HashSet::new();

        // Follow the offset cursor until Airtable stops returning one
        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(&self.config.api_key)
                .query(&[("pageSize", page_size.as_str())]);

            if let Some(view) = &self.config.view {
                request = request.query(&[("view", view)]);
            }
            if let Some(token) = &offset {
                request = request.query(&[("offset", token)]);
            }

            let response = request.send().await.map_err(|e| {
                DatasetError::fetch(SOURCE_NAME, format!("Request for table '{}' failed: {}", table, e))
            })?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(DatasetError::fetch(
                    SOURCE_NAME,
                    format!("Airtable API error for table '{}' ({}): {}", table, status, body),
                ));
            }

            let page: ListRecordsResponse = response.json().await.map_err(|e| {
                DatasetError::fetch(
                    SOURCE_NAME,
                    format!("Failed to parse Airtable response for table '{}': {}", table, e),
                )
            })?;

            debug!(parent: ctx.span(), "Fetched {} records from '{}'", page.records.len(), table);
            records.extend(page.records);

            match page.offset {
                Some(next) if !seen_offsets.insert(next.clone()) => {
                    return Err(DatasetError::fetch(
                        SOURCE_NAME,
                        format!("Airtable repeated offset '{}' for table '{}'", next, table),
                    ));
                }
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn fetch_all(
        &self,
        schema: &Schema,
        ctx: &BuildContext,
    ) -> Result<Vec<RawRecordSet>, DatasetError> {
        let base_id = schema
            .base_id
            .as_deref()
            .or(self.config.base_id.as_deref())
            .ok_or_else(|| {
                DatasetError::configuration("No Airtable base id configured (AIRTABLE_BASE_ID)")
            })?;

        let mut record_sets = Vec::with_capacity(schema.tables.len());
        for table in &schema.tables {
            let records = self.fetch_table(base_id, &table.table, ctx).await?;
            info!(
                parent: ctx.span(),
                "Fetched {} records from Airtable table '{}'",
                records.len(),
                table.table
            );
            record_sets.push(RawRecordSet::new(&table.table, records));
        }

        Ok(record_sets)
    }
}

#[async_trait]
impl DataSource for LiveSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(
        &self,
        schema: &Schema,
        ctx: &BuildContext,
    ) -> Result<Vec<RawRecordSet>, DatasetError> {
        ctx.run(self.fetch_all(schema, ctx)).await
    }
}
