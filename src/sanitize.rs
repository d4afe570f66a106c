//! Turns raw Airtable rows into typed, locale-resolved records.
//!
//! One `SanitizedDataset` is produced per preferred locale. For the locale
//! at position `i` of the preference list, localized columns are looked up
//! following `LocalePreferences::resolution_order(i)`, so a value missing in
//! that locale falls back to the next preferred locales and finally to the
//! default locale.

use crate::context::BuildContext;
use crate::errors::DatasetError;
use crate::i18n::{Locale, LocalePreferences};
use crate::record::{Attachment, FieldValue, RecordRef, SanitizedDataset, SanitizedRecord};
use crate::schema::{FieldSchema, FieldType, Schema, TableSchema};
use crate::source::{RawRecord, RawRecordSet};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Record id -> record type, for every fetched row of a schema table.
///
/// Link fields resolve against this index, so a link is kept only when the
/// target row was actually fetched.
#[derive(Debug, Default)]
pub(crate) struct KnownRecords {
    types: HashMap<String, String>,
}

impl KnownRecords {
    pub(crate) fn collect(raw: &[RawRecordSet], schema: &Schema) -> Self {
        let mut types = HashMap::new();
        for set in raw {
            if let Some(table) = schema.table_by_name(&set.table) {
                for record in &set.records {
                    types
                        .entry(record.id.clone())
                        .or_insert_with(|| table.typename.clone());
                }
            }
        }
        Self { types }
    }

    pub(crate) fn typename_of(&self, id: &str) -> Option<&str> {
        self.types.get(id).map(String::as_str)
    }
}

/// Sanitize every raw record once per preferred locale.
///
/// # Returns
/// One dataset per entry of `preferences.preferred()`, in the same order.
///
/// # Errors
/// `DatasetError::Validation` when a record misses a required field, holds
/// a value of the wrong type, or shares its id with another record.
pub fn sanitize_datasets(
    raw: &[RawRecordSet],
    schema: &Schema,
    preferences: &LocalePreferences,
    ctx: &BuildContext,
) -> Result<Vec<SanitizedDataset>, DatasetError> {
    ctx.in_scope(|| sanitize_all(raw, schema, preferences, ctx))
}

fn sanitize_all(
    raw: &[RawRecordSet],
    schema: &Schema,
    preferences: &LocalePreferences,
    ctx: &BuildContext,
) -> Result<Vec<SanitizedDataset>, DatasetError> {
    let known = KnownRecords::collect(raw, schema);

    for set in raw {
        if schema.table_by_name(&set.table).is_none() {
            debug!(
                parent: ctx.span(),
                "Skipping table '{}' ({} records): not in schema",
                set.table,
                set.records.len()
            );
        }
    }

    preferences
        .preferred()
        .iter()
        .enumerate()
        .map(|(position, locale)| {
            let order = preferences.resolution_order(position);
            let dataset = sanitize_locale(raw, schema, locale, &order, &known, ctx)?;
            info!(
                parent: ctx.span(),
                "Sanitized {} records for locale '{}'",
                dataset.len(),
                locale
            );
            Ok::<_, DatasetError>(dataset)
        })
        .collect()
}

/// Sanitize all records for one locale, resolving localized fields in
/// `resolution_order`.
pub(crate) fn sanitize_locale(
    raw: &[RawRecordSet],
    schema: &Schema,
    locale: &Locale,
    resolution_order: &[Locale],
    known: &KnownRecords,
    ctx: &BuildContext,
) -> Result<SanitizedDataset, DatasetError> {
    let mut dataset = SanitizedDataset::new(locale.clone());

    for set in raw {
        let Some(table) = schema.table_by_name(&set.table) else {
            continue;
        };
        for record in &set.records {
            let sanitized = sanitize_record(record, table, locale, resolution_order, known, ctx)?;
            dataset.insert(sanitized)?;
        }
    }

    Ok(dataset)
}

pub(crate) fn sanitize_record(
    record: &RawRecord,
    table: &TableSchema,
    locale: &Locale,
    resolution_order: &[Locale],
    known: &KnownRecords,
    ctx: &BuildContext,
) -> Result<SanitizedRecord, DatasetError> {
    let mut fields = BTreeMap::new();

    for field in &table.fields {
        let value = match lookup(record, field, resolution_order) {
            Some(raw_value) => coerce(raw_value, field, record, table, known, ctx)?,
            None => None,
        };

        match value {
            Some(value) => {
                fields.insert(field.name.clone(), value);
            }
            None if field.required => {
                return Err(DatasetError::validation(
                    &table.typename,
                    &record.id,
                    format!(
                        "missing required field '{}' (column '{}')",
                        field.name, field.column
                    ),
                ));
            }
            None => {}
        }
    }

    Ok(SanitizedRecord {
        id: record.id.clone(),
        typename: table.typename.clone(),
        created_time: record.created_time,
        locale: locale.clone(),
        fields,
    })
}

/// Raw value of `field`: the first non-empty localized column in
/// `resolution_order`, then the plain column.
fn lookup<'a>(
    record: &'a RawRecord,
    field: &FieldSchema,
    resolution_order: &[Locale],
) -> Option<&'a Value> {
    let present = |column: &str| record.fields.get(column).filter(|v| !is_empty(v));

    if field.localized {
        let localized = resolution_order
            .iter()
            .find_map(|locale| present(&locale.localized_column(&field.column)));
        if localized.is_some() {
            return localized;
        }
    }

    present(&field.column)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Coerce a raw value to the declared type.
///
/// `Ok(None)` means the value carries nothing usable (e.g. a link whose
/// targets were not fetched) and the field is treated as absent.
fn coerce(
    value: &Value,
    field: &FieldSchema,
    record: &RawRecord,
    table: &TableSchema,
    known: &KnownRecords,
    ctx: &BuildContext,
) -> Result<Option<FieldValue>, DatasetError> {
    let mismatch = || {
        DatasetError::validation(
            &table.typename,
            &record.id,
            format!(
                "field '{}' expected {}, got {}",
                field.name,
                field.field_type.label(),
                describe(value)
            ),
        )
    };

    let coerced = match &field.field_type {
        FieldType::Text => match value {
            Value::String(s) => FieldValue::Text(s.trim().to_string()),
            _ => return Err(mismatch()),
        },
        FieldType::LongText => match value {
            Value::String(s) => FieldValue::Text(s.clone()),
            _ => return Err(mismatch()),
        },
        FieldType::Number => match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        // "NaN" and "inf" parse as f64 but cannot be written back as JSON
        .filter(|n| n.is_finite())
        .map(FieldValue::Number)
        .ok_or_else(mismatch)?,
        FieldType::Checkbox => match value {
            Value::Bool(b) => FieldValue::Bool(*b),
            _ => return Err(mismatch()),
        },
        FieldType::Date => match value {
            Value::String(s) => FieldValue::Date(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| mismatch())?,
            ),
            _ => return Err(mismatch()),
        },
        FieldType::DateTime => match value {
            Value::String(s) => FieldValue::DateTime(
                DateTime::parse_from_rfc3339(s.trim())
                    .map_err(|_| mismatch())?
                    .with_timezone(&Utc),
            ),
            _ => return Err(mismatch()),
        },
        FieldType::Url => match value {
            Value::String(s)
                if s.trim().starts_with("https://") || s.trim().starts_with("http://") =>
            {
                FieldValue::Text(s.trim().to_string())
            }
            _ => return Err(mismatch()),
        },
        FieldType::Attachments => {
            let attachments: Vec<Attachment> =
                serde_json::from_value(value.clone()).map_err(|_| mismatch())?;
            FieldValue::Attachments(attachments)
        }
        FieldType::Link { target, multiple } => {
            let ids = value.as_array().ok_or_else(mismatch)?;
            let mut references = Vec::with_capacity(ids.len());
            for id in ids {
                let id = id.as_str().ok_or_else(mismatch)?;
                match known.typename_of(id) {
                    Some(typename) if typename == target => references.push(RecordRef {
                        id: id.to_string(),
                        typename: typename.to_string(),
                    }),
                    _ => warn!(
                        parent: ctx.span(),
                        "{} '{}': dropping link '{}' to {} '{}' (record not fetched)",
                        table.typename,
                        record.id,
                        field.name,
                        target,
                        id
                    ),
                }
            }

            if *multiple {
                if references.is_empty() {
                    return Ok(None);
                }
                FieldValue::References(references)
            } else {
                if references.len() > 1 {
                    debug!(
                        parent: ctx.span(),
                        "{} '{}': single link '{}' has {} targets, keeping the first",
                        table.typename,
                        record.id,
                        field.name,
                        references.len()
                    );
                }
                match references.into_iter().next() {
                    Some(reference) => FieldValue::Reference(reference),
                    None => return Ok(None),
                }
            }
        }
    };

    // A text value that trims down to nothing is absent
    if matches!(&coerced, FieldValue::Text(s) if s.is_empty()) {
        return Ok(None);
    }

    Ok(Some(coerced))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
