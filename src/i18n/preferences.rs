//! Locale preference list.

use crate::errors::DatasetError;
use crate::i18n::Locale;

/// Ordered list of preferred locales plus the default locale used as the
/// last fallback when no preferred locale has a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePreferences {
    preferred: Vec<Locale>,
    default: Locale,
}

impl LocalePreferences {
    /// Build preferences from already validated locales.
    ///
    /// Duplicates are removed (first occurrence wins). An empty list falls
    /// back to the default locale alone.
    pub fn new(preferred: Vec<Locale>, default: Locale) -> Self {
        let mut unique: Vec<Locale> = Vec::with_capacity(preferred.len());
        for locale in preferred {
            if !unique.contains(&locale) {
                unique.push(locale);
            }
        }
        if unique.is_empty() {
            unique.push(default.clone());
        }

        Self {
            preferred: unique,
            default,
        }
    }

    /// Parse preferences from raw codes.
    ///
    /// # Arguments
    /// * `codes` - Preferred locale codes, most preferred first
    /// * `default` - Default locale code
    ///
    /// # Returns
    /// * `Err(DatasetError::Configuration)` if any code is malformed
    pub fn from_codes<S: AsRef<str>>(codes: &[S], default: &str) -> Result<Self, DatasetError> {
        let preferred = codes
            .iter()
            .map(|code| Locale::from_code(code.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let default = Locale::from_code(default)?;

        Ok(Self::new(preferred, default))
    }

    pub fn preferred(&self) -> &[Locale] {
        &self.preferred
    }

    pub fn default_locale(&self) -> &Locale {
        &self.default
    }

    /// The most preferred locale.
    pub fn primary(&self) -> &Locale {
        // `new` guarantees at least one entry
        &self.preferred[0]
    }

    /// Locales to try, in order, when resolving a localized field for the
    /// preferred locale at `start`.
    ///
    /// The locales from `start` onward are listed, each followed by its
    /// `fallback_chain` (`zh-Hant-TW`, `zh-Hant`, `zh`), and the default
    /// locale comes last. Duplicates are dropped. Earlier locales are never consulted,
    /// so the dataset for "en" in `["fr", "en"]` does not pick French values.
    pub fn resolution_order(&self, start: usize) -> Vec<Locale> {
        let mut order: Vec<Locale> = Vec::new();
        let mut push = |locale: Locale| {
            if !order.contains(&locale) {
                order.push(locale);
            }
        };

        for locale in self.preferred.iter().skip(start) {
            for fallback in locale.fallback_chain() {
                push(fallback);
            }
        }
        push(self.default.clone());

        order
    }
}
