use thiserror::Error;

use stocktick_store::StoreError;

use crate::config::ConfigError;

/// Daemon-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Store(StoreError::Corrupt { .. } | StoreError::Quarantine { .. }) => 3,
            Self::Store(_) | Self::Io(_) => 10,
        }
    }
}
