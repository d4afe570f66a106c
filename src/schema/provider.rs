//! Schema provider: the built-in table layout and caller overrides.

use crate::errors::DatasetError;
use crate::schema::{FieldSchema, FieldType, Schema, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller-supplied adjustments to the built-in schema.
///
/// Overrides rename things on the Airtable side only; logical record types
/// and field names seen by pages never change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOverrides {
    #[serde(default)]
    pub base_id: Option<String>,
    /// Record type -> Airtable table name.
    #[serde(default)]
    pub tables: BTreeMap<String, String>,
    /// Record type -> (field name -> Airtable column name).
    #[serde(default)]
    pub fields: BTreeMap<String, BTreeMap<String, String>>,
}

impl SchemaOverrides {
    pub fn with_base_id(mut self, base_id: &str) -> Self {
        self.base_id = Some(base_id.to_string());
        self
    }

    pub fn with_table(mut self, typename: &str, table: &str) -> Self {
        self.tables.insert(typename.to_string(), table.to_string());
        self
    }

    pub fn with_field(mut self, typename: &str, field: &str, column: &str) -> Self {
        self.fields
            .entry(typename.to_string())
            .or_default()
            .insert(field.to_string(), column.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.base_id.is_none() && self.tables.is_empty() && self.fields.is_empty()
    }
}

/// Built-in schema of the marketing site's Airtable base.
pub fn default_schema() -> Schema {
    Schema {
        base_id: None,
        tables: vec![
            TableSchema::new(
                "Customer",
                vec![
                    FieldSchema::new("ref", FieldType::Text).required(),
                    FieldSchema::new("label", FieldType::Text).required().localized(),
                    FieldSchema::new("serviceLabel", FieldType::Text).localized(),
                    FieldSchema::new("termsDescription", FieldType::LongText).localized(),
                    FieldSchema::new("privacyDescription", FieldType::LongText).localized(),
                    FieldSchema::new("productsTitle", FieldType::Text).localized(),
                    FieldSchema::new("availableLanguages", FieldType::Text),
                    FieldSchema::link("products", "Product", true),
                    FieldSchema::link("theme", "Theme", false),
                ],
            ),
            TableSchema::new(
                "Product",
                vec![
                    FieldSchema::new("title", FieldType::Text).required().localized(),
                    FieldSchema::new("description", FieldType::LongText).localized(),
                    FieldSchema::new("price", FieldType::Number),
                    FieldSchema::new("images", FieldType::Attachments),
                    FieldSchema::link("customer", "Customer", false),
                ],
            ),
            TableSchema::new(
                "Theme",
                vec![
                    FieldSchema::new("primaryColor", FieldType::Text).required(),
                    FieldSchema::new("logo", FieldType::Attachments),
                    FieldSchema::new("logoTitle", FieldType::Text).localized(),
                    FieldSchema::link("customer", "Customer", false),
                ],
            ),
        ],
    }
}

/// Return the built-in schema with `overrides` applied.
///
/// # Errors
/// `DatasetError::Configuration` when an override names an unknown record
/// type or field, when a name is empty, or when the resulting schema is
/// structurally invalid.
pub fn get_schema(overrides: Option<&SchemaOverrides>) -> Result<Schema, DatasetError> {
    match overrides {
        Some(overrides) => apply_overrides(default_schema(), overrides),
        None => {
            let schema = default_schema();
            schema.validate()?;
            Ok(schema)
        }
    }
}

/// Apply `overrides` to any schema, built-in or loaded from JSON.
pub fn apply_overrides(
    mut schema: Schema,
    overrides: &SchemaOverrides,
) -> Result<Schema, DatasetError> {
    if let Some(base_id) = &overrides.base_id {
        if base_id.trim().is_empty() {
            return Err(DatasetError::configuration("Base id override is empty"));
        }
        schema.base_id = Some(base_id.clone());
    }

    for (typename, table) in &overrides.tables {
        if table.trim().is_empty() {
            return Err(DatasetError::configuration(format!(
                "Empty table name override for '{}'",
                typename
            )));
        }
        let target = find_table_mut(&mut schema, typename)?;
        target.table = table.clone();
    }

    for (typename, fields) in &overrides.fields {
        let target = find_table_mut(&mut schema, typename)?;
        for (name, column) in fields {
            if column.trim().is_empty() {
                return Err(DatasetError::configuration(format!(
                    "Empty column override for '{}.{}'",
                    typename, name
                )));
            }
            let field = target.field_mut(name).ok_or_else(|| {
                DatasetError::configuration(format!(
                    "Override for unknown field '{}.{}'",
                    typename, name
                ))
            })?;
            field.column = column.clone();
        }
    }

    schema.validate()?;
    Ok(schema)
}

fn find_table_mut<'a>(
    schema: &'a mut Schema,
    typename: &str,
) -> Result<&'a mut TableSchema, DatasetError> {
    schema
        .tables
        .iter_mut()
        .find(|table| table.typename == typename)
        .ok_or_else(|| {
            DatasetError::configuration(format!("Override for unknown record type '{}'", typename))
        })
}
