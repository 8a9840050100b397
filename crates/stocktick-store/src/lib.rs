//! # Stocktick Store
//!
//! Durable, restart-safe price history storage backed by a single JSON
//! file. The on-disk file is only ever replaced atomically, so a reader
//! (or a restarted process) always sees a complete snapshot of the last
//! committed append.

mod error;
mod history;
mod store;

pub use error::StoreError;
pub use history::{
    DropReason, History, HistoryViolation, PricePoint, PriceSummary, RecordOutcome, SymbolHistory,
};
pub use store::{AppendReport, CorruptPolicy, DroppedObservation, HistoryStore};
