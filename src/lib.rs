//! Build-time Airtable dataset pipeline.
//!
//! Raw record sets are fetched once per build (from a cached snapshot or
//! the live API), sanitized against a schema for every preferred locale,
//! and consolidated into a single read-only dataset that page-rendering
//! code queries.
//!
//! ```rust,no_run
//! use airtable_dataset::{dataset, BuildContext, LocalePreferences, SnapshotSource};
//!
//! # async fn build() -> Result<(), airtable_dataset::DatasetError> {
//! let snapshot = SnapshotSource::from_path("data/airtable-snapshot.json");
//! let preferences = LocalePreferences::from_codes(&["fr", "en"], "en")?;
//! let ctx = BuildContext::new("site");
//!
//! let data = dataset::get_static_dataset(&snapshot, &preferences, None, &ctx).await?;
//! if let Some(customer) = dataset::get_customer(&data) {
//!     println!("{}", customer.text("label").unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consolidate;
pub mod context;
pub mod dataset;
pub mod errors;
pub mod i18n;
pub mod record;
pub mod sanitize;
pub mod schema;
pub mod source;

pub use consolidate::ConsolidatedDataset;
pub use context::BuildContext;
pub use errors::DatasetError;
pub use i18n::{Locale, LocalePreferences};
pub use record::{FieldValue, RecordRef, SanitizedDataset, SanitizedRecord};
pub use schema::{Schema, SchemaOverrides};
pub use source::{DataSource, LiveSource, RawRecordSet, SnapshotSource};
