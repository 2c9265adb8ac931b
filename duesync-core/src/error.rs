//! Error types for duesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from record store and props persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, including the sheet file path.
    #[error("failed to parse sheet at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON error while reading or writing `props.json`.
    #[error("props JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A row index outside the current sheet bounds.
    #[error("row {index} out of range for sheet '{sheet}' ({len} rows)")]
    RowOutOfRange {
        sheet: String,
        index: usize,
        len: usize,
    },

    /// The sheet to delete from does not exist.
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.duesync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Errors reading the settings source itself.
///
/// Individual keys that are missing or malformed never produce an error;
/// they fall back to defaults. Only an unreadable or unparsable file does.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// A row that cannot be decoded into an [`crate::types::AssignmentRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("unknown sync flag '{0}'")]
    UnknownFlag(String),

    /// The id and flag cells contradict each other.
    #[error("invalid state: flag {flag} {reason}")]
    InvalidState { flag: String, reason: &'static str },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
