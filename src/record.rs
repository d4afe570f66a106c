//! Sanitized, typed records and per-locale datasets.

use crate::errors::DatasetError;
use crate::i18n::Locale;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// File attached to an Airtable record, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub url: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Resolved link to another record of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: String,
    #[serde(rename = "__typename")]
    pub typename: String,
}

/// A field value coerced to the type declared in the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Attachments(Vec<Attachment>),
    Reference(RecordRef),
    References(Vec<RecordRef>),
}

/// Typed, locale-resolved projection of one Airtable record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedRecord {
    pub id: String,
    #[serde(rename = "__typename")]
    pub typename: String,
    pub created_time: DateTime<Utc>,
    /// Locale the record was sanitized for.
    pub locale: Locale,
    pub fields: BTreeMap<String, FieldValue>,
}

impl SanitizedRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field) {
            Some(FieldValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.fields.get(field) {
            Some(FieldValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn attachments(&self, field: &str) -> &[Attachment] {
        match self.fields.get(field) {
            Some(FieldValue::Attachments(values)) => values,
            _ => &[],
        }
    }

    /// Linked records of `field`, whether declared single or multiple.
    pub fn references(&self, field: &str) -> &[RecordRef] {
        match self.fields.get(field) {
            Some(FieldValue::Reference(value)) => std::slice::from_ref(value),
            Some(FieldValue::References(values)) => values,
            _ => &[],
        }
    }

    pub fn record_ref(&self) -> RecordRef {
        RecordRef {
            id: self.id.clone(),
            typename: self.typename.clone(),
        }
    }
}

/// Ordered collection of sanitized records for one locale.
///
/// Holds at most one record per id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedDataset {
    locale: Locale,
    records: Vec<SanitizedRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SanitizedDataset {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Append a record.
    ///
    /// # Errors
    /// `DatasetError::Validation` if a record with the same id is present.
    pub fn insert(&mut self, record: SanitizedRecord) -> Result<(), DatasetError> {
        if self.index.contains_key(&record.id) {
            return Err(DatasetError::validation(
                &record.typename,
                &record.id,
                format!("duplicate record id in the '{}' dataset", self.locale),
            ));
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut SanitizedRecord> {
        let position = *self.index.get(id)?;
        self.records.get_mut(position)
    }

    pub fn get(&self, id: &str) -> Option<&SanitizedRecord> {
        self.index.get(id).and_then(|&position| self.records.get(position))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn records(&self) -> &[SanitizedRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SanitizedRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record of type `typename`, by insertion order.
    pub fn find_first(&self, typename: &str) -> Option<&SanitizedRecord> {
        self.records.iter().find(|record| record.typename == typename)
    }

    pub fn filter_by_type<'a>(
        &'a self,
        typename: &'a str,
    ) -> impl Iterator<Item = &'a SanitizedRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| record.typename == typename)
    }

    pub fn resolve(&self, reference: &RecordRef) -> Option<&SanitizedRecord> {
        self.get(&reference.id)
            .filter(|record| record.typename == reference.typename)
    }

    /// Records linked from `record` through `field`, in link order.
    pub fn linked(&self, record: &SanitizedRecord, field: &str) -> Vec<&SanitizedRecord> {
        record
            .references(field)
            .iter()
            .filter_map(|reference| self.resolve(reference))
            .collect()
    }
}

impl<'a> IntoIterator for &'a SanitizedDataset {
    type Item = &'a SanitizedRecord;
    type IntoIter = std::slice::Iter<'a, SanitizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn record(id: &str, typename: &str, fields: Vec<(&str, FieldValue)>) -> SanitizedRecord {
        SanitizedRecord {
            id: id.to_string(),
            typename: typename.to_string(),
            created_time: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            locale: Locale::from_code("en").unwrap(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    pub fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_string())
    }

    pub fn link(id: &str, typename: &str) -> RecordRef {
        RecordRef {
            id: id.to_string(),
            typename: typename.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn dataset(records: Vec<SanitizedRecord>) -> SanitizedDataset {
        let mut dataset = SanitizedDataset::new(Locale::from_code("en").unwrap());
        for record in records {
            dataset.insert(record).expect("Should insert");
        }
        dataset
    }

    // ==================== Record Accessor Tests ====================

    #[test]
    fn test_typed_accessors() {
        let record = record(
            "rec1",
            "Product",
            vec![
                ("title", text("Shoes")),
                ("price", FieldValue::Number(49.5)),
                ("featured", FieldValue::Bool(true)),
            ],
        );

        assert_eq!(record.text("title"), Some("Shoes"));
        assert_eq!(record.number("price"), Some(49.5));
        assert_eq!(record.flag("featured"), Some(true));
        assert_eq!(record.text("price"), None);
        assert!(record.attachments("images").is_empty());
        assert!(!record.has("description"));
    }

    #[test]
    fn test_references_single_and_multiple() {
        let record = record(
            "rec1",
            "Customer",
            vec![
                ("theme", FieldValue::Reference(link("recT", "Theme"))),
                (
                    "products",
                    FieldValue::References(vec![link("recA", "Product"), link("recB", "Product")]),
                ),
            ],
        );

        assert_eq!(record.references("theme"), &[link("recT", "Theme")]);
        assert_eq!(record.references("products").len(), 2);
        assert!(record.references("missing").is_empty());
    }

    // ==================== Dataset Tests ====================

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut data = dataset(vec![record("rec1", "Product", vec![])]);
        let err = data.insert(record("rec1", "Product", vec![])).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_find_first_uses_insertion_order() {
        let data = dataset(vec![
            record("rec2", "Product", vec![]),
            record("rec1", "Customer", vec![("label", text("First"))]),
            record("rec3", "Customer", vec![("label", text("Second"))]),
        ]);

        assert_eq!(data.find_first("Customer").unwrap().id, "rec1");
        assert_eq!(data.filter_by_type("Customer").count(), 2);
        assert!(data.find_first("Theme").is_none());
    }

    #[test]
    fn test_resolve_checks_typename() {
        let data = dataset(vec![record("rec1", "Product", vec![])]);
        assert!(data.resolve(&link("rec1", "Product")).is_some());
        assert!(data.resolve(&link("rec1", "Theme")).is_none());
        assert!(data.resolve(&link("rec9", "Product")).is_none());
    }

    #[test]
    fn test_linked_records() {
        let customer = record(
            "recC",
            "Customer",
            vec![(
                "products",
                FieldValue::References(vec![link("recB", "Product"), link("recA", "Product")]),
            )],
        );
        let data = dataset(vec![
            customer.clone(),
            record("recA", "Product", vec![("title", text("A"))]),
            record("recB", "Product", vec![("title", text("B"))]),
        ]);

        let titles: Vec<&str> = data
            .linked(&customer, "products")
            .iter()
            .filter_map(|p| p.text("title"))
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    // ==================== Serialization Tests ====================

    #[test]
    fn test_record_serialization_shape() {
        let record = record(
            "rec1",
            "Customer",
            vec![
                ("label", text("Acme")),
                ("theme", FieldValue::Reference(link("recT", "Theme"))),
            ],
        );

        let json = serde_json::to_value(&record).expect("Should serialize");
        assert_eq!(json["__typename"], "Customer");
        assert_eq!(json["createdTime"], "2024-01-15T10:30:00Z");
        assert_eq!(json["locale"], "en");
        assert_eq!(json["fields"]["label"], "Acme");
        assert_eq!(json["fields"]["theme"]["id"], "recT");
        assert_eq!(json["fields"]["theme"]["__typename"], "Theme");
    }

    #[test]
    fn test_attachment_deserialization() {
        let json = r#"{ "id": "att1", "url": "https://dl.airtable.com/logo.png", "filename": "logo.png", "size": 1024, "type": "image/png", "width": 64, "height": 32, "thumbnails": {} }"#;
        let attachment: Attachment = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(attachment.mime_type.as_deref(), Some("image/png"));
        assert_eq!(attachment.width, Some(64));
    }
}
