//! # Stocktick Daemon
//!
//! The polling process: wires a price source to the durable history
//! store, drives the fetch/persist cycle on a fixed interval, and maps
//! failures to the exit-code contract expected by the deployment
//! environment.

pub mod alerts;
pub mod cli;
pub mod config;
pub mod error;
pub mod poller;

pub use alerts::{AlertThresholds, PriceAlert};
pub use cli::Cli;
pub use config::{Config, ConfigError, DATA_FILE_ENV};
pub use error::DaemonError;
pub use poller::{CycleOutcome, CycleState, Poller};
