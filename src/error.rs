//! Error types for the configuration and app state stores.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure while reading or writing a record.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// `dirs::config_dir()` returned `None`.
    #[error("cannot determine the user config directory")]
    ConfigDirNotFound,

    #[error("a tab named {0:?} already exists")]
    DuplicateTabName(String),

    #[error("no tab at index {index} (have {len})")]
    TabIndexOutOfRange { index: usize, len: usize },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
