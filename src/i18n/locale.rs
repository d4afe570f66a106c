//! Locale type: validated, normalized locale representation.
//!
//! Airtable has no notion of locales. Localized content lives in sibling
//! columns named after the field plus an upper-case locale suffix
//! (`label_EN`, `label_FR`, `label_FR-FR`). This module owns the mapping
//! between a locale code and that suffix.

use crate::errors::DatasetError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

static LOCALE_REGEX: OnceLock<Regex> = OnceLock::new();

/// A validated locale code such as `en`, `fr-FR` or `zh-Hant-TW`.
///
/// Codes are normalized on construction: `_` becomes `-`, the language
/// subtag is lower-cased, two-letter region subtags are upper-cased and
/// four-letter script subtags are title-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    code: String,
}

impl Locale {
    /// Create a Locale from a locale or language code.
    ///
    /// # Arguments
    /// * `code` - A BCP 47 style code (e.g., "en", "fr-FR", "pt_BR")
    ///
    /// # Returns
    /// * `Ok(Locale)` with the normalized code
    /// * `Err(DatasetError::Configuration)` if the code is malformed
    pub fn from_code(code: &str) -> Result<Locale, DatasetError> {
        let regex = LOCALE_REGEX.get_or_init(|| {
            Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})*$").unwrap()
        });

        let trimmed = code.trim();
        if !regex.is_match(trimmed) {
            return Err(DatasetError::configuration(format!(
                "Invalid locale code: '{}'",
                code
            )));
        }

        let normalized = trimmed
            .replace('_', "-")
            .split('-')
            .enumerate()
            .map(|(index, subtag)| normalize_subtag(index, subtag))
            .collect::<Vec<_>>()
            .join("-");

        Ok(Locale { code: normalized })
    }

    /// The normalized locale code (e.g., "fr-FR").
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The language subtag (e.g., "fr" for "fr-FR").
    pub fn language(&self) -> &str {
        self.code.split('-').next().unwrap_or(&self.code)
    }

    /// Whether the code carries more than a language subtag.
    pub fn has_region(&self) -> bool {
        self.code.contains('-')
    }

    /// The locale with its last subtag removed, or `None` for a bare
    /// language. `zh-Hant-TW` -> `zh-Hant` -> `zh`.
    pub fn parent(&self) -> Option<Locale> {
        self.code.rsplit_once('-').map(|(parent, _)| Locale {
            code: parent.to_string(),
        })
    }

    /// This locale followed by each successive parent, down to the bare
    /// language.
    pub fn fallback_chain(&self) -> Vec<Locale> {
        let mut chain = vec![self.clone()];
        while let Some(parent) = chain.last().and_then(Locale::parent) {
            chain.push(parent);
        }
        chain
    }

    /// Suffix of the Airtable column holding this locale's value.
    pub fn field_suffix(&self) -> String {
        self.code.to_uppercase()
    }

    /// Name of the localized Airtable column for `column` (e.g., "label_FR").
    pub fn localized_column(&self, column: &str) -> String {
        format!("{}_{}", column, self.field_suffix())
    }
}

fn normalize_subtag(index: usize, subtag: &str) -> String {
    if index == 0 {
        return subtag.to_lowercase();
    }

    let is_alpha = subtag.chars().all(|c| c.is_ascii_alphabetic());
    match subtag.len() {
        2 if is_alpha => subtag.to_uppercase(),
        4 if is_alpha => {
            let lower = subtag.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => lower,
            }
        }
        _ => subtag.to_lowercase(),
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl TryFrom<String> for Locale {
    type Error = DatasetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Locale::from_code(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.code
    }
}
