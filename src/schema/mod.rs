//! Description of the Airtable tables the site depends on.
//!
//! A `Schema` maps logical record types (`Customer`, `Product`, ...) to
//! Airtable tables, and logical field names to Airtable columns together
//! with their expected type and locale sensitivity. It is static
//! configuration: built once by the provider, never mutated afterwards.

pub mod provider;

use crate::errors::DatasetError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub use provider::{get_schema, SchemaOverrides};

/// Expected type of an Airtable column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldType {
    /// Single line text.
    Text,
    /// Long text, usually markdown.
    LongText,
    Number,
    Checkbox,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// RFC 3339 timestamp.
    DateTime,
    Url,
    /// Airtable attachment array.
    Attachments,
    /// Linked records of another record type.
    Link {
        /// Logical record type of the linked table.
        target: String,
        #[serde(default)]
        multiple: bool,
    },
}

impl FieldType {
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::LongText => "long text",
            FieldType::Number => "number",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::DateTime => "date-time",
            FieldType::Url => "url",
            FieldType::Attachments => "attachments",
            FieldType::Link { .. } => "link",
        }
    }
}

/// One field of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Logical field name exposed to pages.
    pub name: String,
    /// Airtable column name. Localized columns append `_<LOCALE>`.
    pub column: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub localized: bool,
}

impl FieldSchema {
    /// Optional, non-localized field whose column has the same name.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            column: name.to_string(),
            field_type,
            required: false,
            localized: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn link(name: &str, target: &str, multiple: bool) -> Self {
        Self::new(
            name,
            FieldType::Link {
                target: target.to_string(),
                multiple,
            },
        )
    }
}

/// One Airtable table and the record type it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Record type discriminant (`__typename`) of sanitized records.
    pub typename: String,
    /// Airtable table name.
    pub table: String,
    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn new(typename: &str, fields: Vec<FieldSchema>) -> Self {
        Self {
            typename: typename.to_string(),
            table: typename.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldSchema> {
        self.fields.iter_mut().find(|field| field.name == name)
    }
}

/// The full set of tables fetched for a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Airtable base holding the tables. Only the live source needs it.
    #[serde(default)]
    pub base_id: Option<String>,
    pub tables: Vec<TableSchema>,
}

impl Schema {
    /// Load a schema from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DatasetError::configuration(format!(
                "Failed to read schema file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, DatasetError> {
        let schema: Schema = serde_json::from_str(contents)
            .map_err(|e| DatasetError::configuration(format!("Malformed schema: {}", e)))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn table_by_typename(&self, typename: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|table| table.typename == typename)
    }

    pub fn table_by_name(&self, table: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Structural checks. Any failure is a configuration error.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.tables.is_empty() {
            return Err(DatasetError::configuration("Schema declares no tables"));
        }
        if let Some(base_id) = &self.base_id {
            if base_id.trim().is_empty() {
                return Err(DatasetError::configuration("Schema base id is empty"));
            }
        }

        let mut typenames = HashSet::new();
        let mut table_names = HashSet::new();

        for table in &self.tables {
            if table.typename.trim().is_empty() || table.table.trim().is_empty() {
                return Err(DatasetError::configuration(
                    "Table schema with an empty record type or table name",
                ));
            }
            if !typenames.insert(table.typename.as_str()) {
                return Err(DatasetError::configuration(format!(
                    "Record type '{}' declared twice",
                    table.typename
                )));
            }
            if !table_names.insert(table.table.as_str()) {
                return Err(DatasetError::configuration(format!(
                    "Airtable table '{}' is mapped to more than one record type",
                    table.table
                )));
            }

            let mut field_names = HashSet::new();
            let mut columns = HashSet::new();
            for field in &table.fields {
                if field.name.trim().is_empty() || field.column.trim().is_empty() {
                    return Err(DatasetError::configuration(format!(
                        "Table '{}' has a field with an empty name or column",
                        table.typename
                    )));
                }
                if !field_names.insert(field.name.as_str()) {
                    return Err(DatasetError::configuration(format!(
                        "Field '{}' declared twice in '{}'",
                        field.name, table.typename
                    )));
                }
                if !columns.insert(field.column.as_str()) {
                    return Err(DatasetError::configuration(format!(
                        "Column '{}' used by two fields of '{}'",
                        field.column, table.typename
                    )));
                }
            }
        }

        for table in &self.tables {
            for field in &table.fields {
                if let FieldType::Link { target, .. } = &field.field_type {
                    if self.table_by_typename(target).is_none() {
                        return Err(DatasetError::configuration(format!(
                            "Field '{}.{}' links to undeclared record type '{}'",
                            table.typename, field.name, target
                        )));
                    }
                    if field.localized {
                        return Err(DatasetError::configuration(format!(
                            "Link field '{}.{}' cannot be localized",
                            table.typename, field.name
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
