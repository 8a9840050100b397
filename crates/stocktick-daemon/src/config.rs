//! Runtime configuration resolved from `DATA_FILE` and CLI flags.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use stocktick_core::{Symbol, ValidationError};
use stocktick_store::CorruptPolicy;

use crate::alerts::AlertThresholds;
use crate::cli::{Cli, OnCorrupt};

/// Environment variable naming the persisted history file.
pub const DATA_FILE_ENV: &str = "DATA_FILE";

/// Configuration errors. All of these prevent startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {DATA_FILE_ENV} must be set to the history file path")]
    DataFileUnset,

    #[error("{DATA_FILE_ENV} must be an absolute path: '{path}'")]
    DataFileNotAbsolute { path: PathBuf },

    #[error("{DATA_FILE_ENV} must name a file inside a directory: '{path}'")]
    DataFileHasNoParent { path: PathBuf },

    #[error("{DATA_FILE_ENV} parent directory '{dir}' is not writable: {source}")]
    ParentNotWritable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    InvalidSymbol(#[from] ValidationError),
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_file: PathBuf,
    pub symbols: Vec<Symbol>,
    pub interval: Duration,
    pub timeout_ms: u64,
    pub corrupt_policy: CorruptPolicy,
    pub alerts: AlertThresholds,
    pub csv_export: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let data_file = resolve_data_file()?;

        let symbols = cli
            .symbols
            .iter()
            .map(|raw| Symbol::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            data_file,
            symbols,
            interval: Duration::from_secs(cli.interval_secs.max(1)),
            timeout_ms: cli.timeout_ms,
            corrupt_policy: match cli.on_corrupt {
                OnCorrupt::Fail => CorruptPolicy::Fail,
                OnCorrupt::Quarantine => CorruptPolicy::Quarantine,
            },
            alerts: AlertThresholds {
                price: cli.price_alert,
                percent: cli.percent_alert,
            },
            csv_export: !cli.no_csv,
        })
    }
}

/// Read and validate `DATA_FILE`: required, absolute, writable parent.
///
/// Writability is probed by actually creating an unnamed temp file in the
/// parent directory, which also proves the directory exists.
fn resolve_data_file() -> Result<PathBuf, ConfigError> {
    let raw = env::var_os(DATA_FILE_ENV)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::DataFileUnset)?;

    let path = PathBuf::from(raw);
    if !path.is_absolute() {
        return Err(ConfigError::DataFileNotAbsolute { path });
    }

    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| ConfigError::DataFileHasNoParent { path: path.clone() })?;

    probe_writable(parent)?;

    Ok(path)
}

fn probe_writable(dir: &Path) -> Result<(), ConfigError> {
    tempfile::tempfile_in(dir).map_err(|source| ConfigError::ParentNotWritable {
        dir: dir.to_path_buf(),
        source,
    })?;
    Ok(())
}
