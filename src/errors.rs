use std::io;

use thiserror::Error;

/// Error type for every stage of the dataset build.
///
/// All variants abort the build. A lookup miss is never an error: accessors
/// return `Option` instead.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("data source '{source_name}' failed: {reason}")]
    Fetch { source_name: String, reason: String },
    #[error("invalid record '{record_id}' in table '{table}': {reason}")]
    Validation {
        table: String,
        record_id: String,
        reason: String,
    },
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DatasetError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn fetch(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(
        table: impl Into<String>,
        record_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            table: table.into(),
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error comes from a record that does not match the schema.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
