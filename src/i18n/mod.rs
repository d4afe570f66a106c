//! Locale handling for localized Airtable columns.
//!
//! # Architecture
//!
//! - `locale`: validated, normalized locale code (`fr`, `fr-FR`) and the
//!   column suffix used by localized Airtable fields (`label_FR`)
//! - `preferences`: ordered locale preference list and the per-locale
//!   resolution order used by the sanitizer
//!
//! # Example
//!
//! ```rust
//! use airtable_dataset::i18n::{Locale, LocalePreferences};
//!
//! let preferences = LocalePreferences::from_codes(&["fr-FR", "en"], "en").unwrap();
//! let order: Vec<String> = preferences
//!     .resolution_order(0)
//!     .iter()
//!     .map(|locale| locale.code().to_string())
//!     .collect();
//! assert_eq!(order, vec!["fr-FR", "fr", "en"]);
//! assert_eq!(Locale::from_code("pt_br").unwrap().code(), "pt-BR");
//! ```

mod locale;
mod preferences;

pub use locale::Locale;
pub use preferences::LocalePreferences;
