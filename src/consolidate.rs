//! Merges per-locale datasets into the single dataset pages read.

use crate::context::BuildContext;
use crate::errors::DatasetError;
use crate::i18n::Locale;
use crate::record::{RecordRef, SanitizedDataset, SanitizedRecord};
use crate::schema::Schema;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

/// Final, read-only dataset of a build.
///
/// Records keep the order in which their id was first encountered. Fields
/// come from the most preferred locale that has them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedDataset {
    inner: SanitizedDataset,
}

impl ConsolidatedDataset {
    /// Locale of the most preferred dataset.
    pub fn locale(&self) -> &Locale {
        self.inner.locale()
    }

    pub fn records(&self) -> &[SanitizedRecord] {
        self.inner.records()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SanitizedRecord> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SanitizedRecord> {
        self.inner.get(id)
    }

    /// First record of type `typename` by insertion order, if any.
    pub fn find_first(&self, typename: &str) -> Option<&SanitizedRecord> {
        self.inner.find_first(typename)
    }

    pub fn filter_by_type<'a>(
        &'a self,
        typename: &'a str,
    ) -> impl Iterator<Item = &'a SanitizedRecord> + 'a {
        self.inner.filter_by_type(typename)
    }

    pub fn resolve(&self, reference: &RecordRef) -> Option<&SanitizedRecord> {
        self.inner.resolve(reference)
    }

    pub fn linked(&self, record: &SanitizedRecord, field: &str) -> Vec<&SanitizedRecord> {
        self.inner.linked(record, field)
    }

    /// View the consolidated records as a plain sanitized dataset, e.g. to
    /// feed them back into `consolidate`.
    pub fn as_sanitized(&self) -> &SanitizedDataset {
        &self.inner
    }

    pub fn into_sanitized(self) -> SanitizedDataset {
        self.inner
    }
}

impl Serialize for ConsolidatedDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.inner.records())
    }
}

/// Merge `datasets`, most preferred first, into one dataset.
///
/// The first occurrence of an id fixes its position and its field values;
/// later datasets only fill fields the kept record lacks. Records whose
/// type is not declared in `schema` are dropped.
///
/// # Errors
/// `DatasetError::Configuration` when `datasets` is empty, and
/// `DatasetError::Validation` when one id carries two record types.
pub fn consolidate(
    schema: &Schema,
    datasets: &[SanitizedDataset],
    ctx: &BuildContext,
) -> Result<ConsolidatedDataset, DatasetError> {
    ctx.in_scope(|| merge(schema, datasets, ctx))
}

fn merge(
    schema: &Schema,
    datasets: &[SanitizedDataset],
    ctx: &BuildContext,
) -> Result<ConsolidatedDataset, DatasetError> {
    let first = datasets
        .first()
        .ok_or_else(|| DatasetError::configuration("No sanitized dataset to consolidate"))?;
    let mut merged = SanitizedDataset::new(first.locale().clone());
    let mut filled = 0usize;

    for dataset in datasets {
        for record in dataset {
            if schema.table_by_typename(&record.typename).is_none() {
                warn!(
                    parent: ctx.span(),
                    "Dropping record '{}' of undeclared type '{}'",
                    record.id,
                    record.typename
                );
                continue;
            }

            match merged.get_mut(&record.id) {
                Some(existing) => {
                    if existing.typename != record.typename {
                        return Err(DatasetError::validation(
                            &record.typename,
                            &record.id,
                            format!("id already used by a '{}' record", existing.typename),
                        ));
                    }
                    for (name, value) in &record.fields {
                        if !existing.fields.contains_key(name) {
                            existing.fields.insert(name.clone(), value.clone());
                            filled += 1;
                        }
                    }
                }
                None => merged.insert(record.clone())?,
            }
        }
    }

    info!(
        parent: ctx.span(),
        "Consolidated {} datasets into {} records ({} fields filled from fallback locales)",
        datasets.len(),
        merged.len(),
        filled
    );

    Ok(ConsolidatedDataset { inner: merged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_support::{link, record, text};
    use crate::record::FieldValue;
    use crate::schema::get_schema;
    use proptest::prelude::*;

    fn dataset(locale: &str, records: Vec<SanitizedRecord>) -> SanitizedDataset {
        let locale = Locale::from_code(locale).unwrap();
        let mut dataset = SanitizedDataset::new(locale.clone());
        for mut record in records {
            record.locale = locale.clone();
            dataset.insert(record).unwrap();
        }
        dataset
    }

    fn run(datasets: &[SanitizedDataset]) -> ConsolidatedDataset {
        consolidate(&get_schema(None).unwrap(), datasets, &BuildContext::disabled())
            .expect("Should consolidate")
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_earlier_locale_wins() {
        let fr = dataset("fr", vec![record("recP1", "Product", vec![("title", text("Chaussures"))])]);
        let en = dataset("en", vec![record("recP1", "Product", vec![("title", text("Shoes"))])]);

        let merged = run(&[fr, en]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("recP1").unwrap().text("title"), Some("Chaussures"));
        assert_eq!(merged.locale().code(), "fr");
    }

    #[test]
    fn test_later_locale_fills_absent_fields() {
        let fr = dataset("fr", vec![record("recP1", "Product", vec![("title", text("Chaussures"))])]);
        let en = dataset(
            "en",
            vec![record(
                "recP1",
                "Product",
                vec![("title", text("Shoes")), ("description", text("Leather shoes"))],
            )],
        );

        let merged = run(&[fr, en]);
        let product = merged.get("recP1").unwrap();
        assert_eq!(product.text("title"), Some("Chaussures"));
        assert_eq!(product.text("description"), Some("Leather shoes"));
    }

    #[test]
    fn test_order_of_first_encounter() {
        let fr = dataset(
            "fr",
            vec![
                record("recB", "Product", vec![("title", text("B"))]),
                record("recA", "Product", vec![("title", text("A"))]),
            ],
        );
        let en = dataset(
            "en",
            vec![
                record("recC", "Customer", vec![("label", text("C"))]),
                record("recA", "Product", vec![("title", text("A"))]),
            ],
        );

        let merged = run(&[fr, en]);
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["recB", "recA", "recC"]);
    }

    #[test]
    fn test_undeclared_type_dropped() {
        let en = dataset(
            "en",
            vec![
                record("recX", "Invoice", vec![]),
                record("recP1", "Product", vec![("title", text("Shoes"))]),
            ],
        );
        let merged = run(&[en]);
        assert!(merged.get("recX").is_none());
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_conflicting_types_rejected() {
        let fr = dataset("fr", vec![record("rec1", "Product", vec![])]);
        let en = dataset("en", vec![record("rec1", "Theme", vec![])]);

        let result = consolidate(&get_schema(None).unwrap(), &[fr, en], &BuildContext::disabled());
        assert!(result.unwrap_err().is_validation());
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = consolidate(&get_schema(None).unwrap(), &[], &BuildContext::disabled());
        assert!(matches!(result, Err(DatasetError::Configuration(_))));
    }

    // ==================== Idempotence Tests ====================

    #[test]
    fn test_consolidation_is_idempotent() {
        let fr = dataset("fr", vec![record("recP1", "Product", vec![("title", text("Chaussures"))])]);
        let en = dataset(
            "en",
            vec![
                record("recP1", "Product", vec![("description", text("Leather"))]),
                record("recC1", "Customer", vec![("label", text("Acme"))]),
            ],
        );

        let once = run(&[fr, en]);
        let again = run(&[once.as_sanitized().clone(), once.as_sanitized().clone()]);
        assert_eq!(once, again);
    }

    // ==================== Serialization Tests ====================

    #[test]
    fn test_serializes_as_record_array() {
        let en = dataset(
            "en",
            vec![
                record(
                    "recC1",
                    "Customer",
                    vec![("theme", FieldValue::Reference(link("recT1", "Theme")))],
                ),
                record("recT1", "Theme", vec![("primaryColor", text("#000"))]),
            ],
        );
        let merged = run(&[en]);

        let json = serde_json::to_value(&merged).unwrap();
        let records = json.as_array().expect("Should be an array");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], "recC1");
        assert_eq!(records[0]["fields"]["theme"]["__typename"], "Theme");
        assert_eq!(records[1]["fields"]["primaryColor"], "#000");
    }

    // ==================== Property Tests ====================

    const TYPES: [&str; 3] = ["Customer", "Product", "Theme"];
    const FIELDS: [&str; 3] = ["label", "title", "description"];

    fn arb_dataset(locale: &'static str) -> impl Strategy<Value = SanitizedDataset> {
        prop::collection::vec(
            (0usize..12, prop::collection::vec((0usize..3, "[a-z]{1,6}"), 0..3)),
            0..10,
        )
        .prop_map(move |rows| {
            let mut records = Vec::new();
            let mut seen = std::collections::HashSet::new();
            for (id, fields) in rows {
                if !seen.insert(id) {
                    continue;
                }
                let fields = fields
                    .iter()
                    .map(|(field, value)| (FIELDS[*field], text(value)))
                    .collect();
                // The type follows from the id so every locale agrees on it
                records.push(record(&format!("rec{}", id), TYPES[id % 3], fields));
            }
            dataset(locale, records)
        })
    }

    proptest! {
        #[test]
        fn prop_consolidation_idempotent(fr in arb_dataset("fr"), en in arb_dataset("en")) {
            let once = run(&[fr, en]);
            let again = run(&[once.as_sanitized().clone(), once.as_sanitized().clone()]);
            prop_assert_eq!(once, again);
        }

        #[test]
        fn prop_ids_unique_and_first_encounter_ordered(fr in arb_dataset("fr"), en in arb_dataset("en")) {
            let mut expected: Vec<String> = Vec::new();
            for record in fr.iter().chain(en.iter()) {
                if !expected.contains(&record.id) {
                    expected.push(record.id.clone());
                }
            }

            let merged = run(&[fr, en]);
            let ids: Vec<String> = merged.iter().map(|r| r.id.clone()).collect();
            prop_assert_eq!(ids, expected);
        }

        #[test]
        fn prop_consolidation_deterministic(fr in arb_dataset("fr"), en in arb_dataset("en")) {
            let first = serde_json::to_string(&run(&[fr.clone(), en.clone()])).unwrap();
            let second = serde_json::to_string(&run(&[fr, en])).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
