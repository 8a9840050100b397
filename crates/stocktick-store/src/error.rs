use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the history store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file exists but cannot be parsed into a valid history.
    #[error("history file '{path}' is corrupt: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    /// Quarantine of a corrupt backing file failed; the original file is
    /// left in place untouched.
    #[error("failed to quarantine corrupt history file '{path}': {source}")]
    Quarantine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The atomic replace never committed; the previous snapshot survives.
    #[error("failed to replace history file '{path}': {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
