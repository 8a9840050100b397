//! Canonical domain types for stocktick price history.
//!
//! All models validate their invariants at construction time and carry
//! full serde support so the persisted history file round-trips exactly.

mod observation;
mod symbol;
mod timestamp;

pub use observation::Observation;
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
