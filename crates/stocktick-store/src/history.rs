//! In-memory history model and append semantics.
//!
//! The serialized shape maps each symbol to its ordered observation
//! sequence:
//!
//! ```json
//! {
//!   "AAPL": {
//!     "history": [
//!       { "price": 178.5, "timestamp": "2026-02-20T15:30:00Z", "change": 1.25 }
//!     ]
//!   }
//! }
//! ```
//!
//! Invariants: per-symbol timestamps are strictly increasing (which also
//! rules out duplicate `(symbol, timestamp)` pairs) and prices are
//! non-negative. [`History::record`] enforces them at append time;
//! [`History::validate`] re-checks them when a file is loaded.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use stocktick_core::{Observation, Symbol, UtcDateTime};

/// One stored price point. The symbol lives in the enclosing map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub timestamp: UtcDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
}

impl From<&Observation> for PricePoint {
    fn from(observation: &Observation) -> Self {
        Self {
            price: observation.price,
            timestamp: observation.timestamp,
            change: observation.change,
            percent_change: observation.percent_change,
        }
    }
}

/// Ordered observation sequence for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolHistory {
    pub history: Vec<PricePoint>,
}

/// Why an observation was not appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// An observation with this exact timestamp is already recorded.
    DuplicateTimestamp,
    /// The observation is older than the last recorded one.
    OutOfOrder,
}

impl DropReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateTimestamp => "duplicate_timestamp",
            Self::OutOfOrder => "out_of_order",
        }
    }
}

impl Display for DropReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one [`History::record`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    Dropped(DropReason),
}

/// Violations found when validating a loaded history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryViolation {
    NegativePrice { symbol: Symbol, index: usize },
    NonFinitePrice { symbol: Symbol, index: usize },
    NonMonotonicTimestamp { symbol: Symbol, index: usize },
}

impl Display for HistoryViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativePrice { symbol, index } => {
                write!(f, "negative price for {symbol} at index {index}")
            }
            Self::NonFinitePrice { symbol, index } => {
                write!(f, "non-finite price for {symbol} at index {index}")
            }
            Self::NonMonotonicTimestamp { symbol, index } => {
                write!(f, "timestamps not strictly increasing for {symbol} at index {index}")
            }
        }
    }
}

/// Summary of the tracked range for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub symbol: Symbol,
    pub current_price: f64,
    pub first_price: f64,
    pub price_change: f64,
    pub percent_change: Option<f64>,
    pub min_price: f64,
    pub max_price: f64,
    pub observations: usize,
    pub first_recorded: UtcDateTime,
    pub last_recorded: UtcDateTime,
}

/// Full persisted state: symbol → ordered observation sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    symbols: BTreeMap<Symbol, SymbolHistory>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.values().all(|entry| entry.history.is_empty())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.keys()
    }

    pub fn points(&self, symbol: &Symbol) -> Option<&[PricePoint]> {
        self.symbols.get(symbol).map(|entry| entry.history.as_slice())
    }

    pub fn last_timestamp(&self, symbol: &Symbol) -> Option<UtcDateTime> {
        self.symbols
            .get(symbol)?
            .history
            .last()
            .map(|point| point.timestamp)
    }

    pub fn observation_count(&self) -> usize {
        self.symbols.values().map(|entry| entry.history.len()).sum()
    }

    /// Append one observation, enforcing the strictly-increasing-timestamp
    /// invariant for its symbol. Duplicates and out-of-order entries are
    /// dropped, never errors.
    pub fn record(&mut self, observation: Observation) -> RecordOutcome {
        let entry = self.symbols.entry(observation.symbol.clone()).or_default();

        if let Some(last) = entry.history.last() {
            if observation.timestamp == last.timestamp {
                return RecordOutcome::Dropped(DropReason::DuplicateTimestamp);
            }
            if observation.timestamp < last.timestamp {
                return RecordOutcome::Dropped(DropReason::OutOfOrder);
            }
        }

        entry.history.push(PricePoint::from(&observation));
        RecordOutcome::Recorded
    }

    /// Re-check the invariants on a loaded history.
    pub fn validate(&self) -> Result<(), HistoryViolation> {
        for (symbol, entry) in &self.symbols {
            let mut previous: Option<UtcDateTime> = None;
            for (index, point) in entry.history.iter().enumerate() {
                if !point.price.is_finite() {
                    return Err(HistoryViolation::NonFinitePrice {
                        symbol: symbol.clone(),
                        index,
                    });
                }
                if point.price < 0.0 {
                    return Err(HistoryViolation::NegativePrice {
                        symbol: symbol.clone(),
                        index,
                    });
                }
                if let Some(previous) = previous {
                    if point.timestamp <= previous {
                        return Err(HistoryViolation::NonMonotonicTimestamp {
                            symbol: symbol.clone(),
                            index,
                        });
                    }
                }
                previous = Some(point.timestamp);
            }
        }
        Ok(())
    }

    /// Tracked-range summary for one symbol, if anything is recorded.
    pub fn summary(&self, symbol: &Symbol) -> Option<PriceSummary> {
        let points = self.points(symbol)?;
        let first = points.first()?;
        let last = points.last()?;

        let min_price = points.iter().map(|p| p.price).fold(f64::INFINITY, f64::min);
        let max_price = points
            .iter()
            .map(|p| p.price)
            .fold(f64::NEG_INFINITY, f64::max);

        let price_change = last.price - first.price;
        let percent_change = if first.price != 0.0 {
            Some(price_change / first.price * 100.0)
        } else {
            None
        };

        Some(PriceSummary {
            symbol: symbol.clone(),
            current_price: last.price,
            first_price: first.price,
            price_change,
            percent_change,
            min_price,
            max_price,
            observations: points.len(),
            first_recorded: first.timestamp,
            last_recorded: last.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol is valid")
    }

    fn observation(sym: &str, price: f64, ts: &str) -> Observation {
        Observation::new(
            symbol(sym),
            price,
            UtcDateTime::parse(ts).expect("timestamp"),
            None,
            None,
        )
        .expect("valid observation")
    }

    #[test]
    fn records_in_timestamp_order() {
        let mut history = History::new();
        assert_eq!(
            history.record(observation("AAPL", 150.0, "2026-02-20T15:30:00Z")),
            RecordOutcome::Recorded
        );
        assert_eq!(
            history.record(observation("AAPL", 151.0, "2026-02-20T15:31:00Z")),
            RecordOutcome::Recorded
        );

        let points = history.points(&symbol("AAPL")).expect("points");
        assert_eq!(points.len(), 2);
        assert!(points[0].timestamp < points[1].timestamp);
    }

    #[test]
    fn drops_duplicate_and_out_of_order_timestamps() {
        let mut history = History::new();
        history.record(observation("AAPL", 150.0, "2026-02-20T15:31:00Z"));

        assert_eq!(
            history.record(observation("AAPL", 152.0, "2026-02-20T15:31:00Z")),
            RecordOutcome::Dropped(DropReason::DuplicateTimestamp)
        );
        assert_eq!(
            history.record(observation("AAPL", 149.0, "2026-02-20T15:30:00Z")),
            RecordOutcome::Dropped(DropReason::OutOfOrder)
        );

        let points = history.points(&symbol("AAPL")).expect("points");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].price, 150.0);
    }

    #[test]
    fn symbols_are_independent() {
        let mut history = History::new();
        history.record(observation("AAPL", 150.0, "2026-02-20T15:31:00Z"));

        // An older timestamp for a different symbol is fine.
        assert_eq!(
            history.record(observation("MSFT", 410.0, "2026-02-20T15:30:00Z")),
            RecordOutcome::Recorded
        );
    }

    #[test]
    fn json_round_trip_preserves_history() {
        let mut history = History::new();
        history.record(observation("AAPL", 150.0, "2026-02-20T15:30:00Z"));
        history.record(observation("AAPL", 151.5, "2026-02-20T15:31:00Z"));
        history.record(observation("MSFT", 410.0, "2026-02-20T15:30:00Z"));

        let json = serde_json::to_string_pretty(&history).expect("serialize");
        let back: History = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back, history);
        back.validate().expect("round-tripped history is valid");
    }

    #[test]
    fn serialized_shape_is_symbol_keyed() {
        let mut history = History::new();
        history.record(observation("AAPL", 150.0, "2026-02-20T15:30:00Z"));

        let value = serde_json::to_value(&history).expect("serialize");
        let points = value
            .get("AAPL")
            .and_then(|entry| entry.get("history"))
            .and_then(|points| points.as_array())
            .expect("AAPL.history array");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0]["price"], 150.0);
    }

    #[test]
    fn validate_rejects_non_monotonic_file() {
        let json = r#"{
            "AAPL": {
                "history": [
                    {"price": 151.0, "timestamp": "2026-02-20T15:31:00Z"},
                    {"price": 150.0, "timestamp": "2026-02-20T15:30:00Z"}
                ]
            }
        }"#;
        let history: History = serde_json::from_str(json).expect("parse");
        let violation = history.validate().expect_err("must reject");
        assert!(matches!(
            violation,
            HistoryViolation::NonMonotonicTimestamp { index: 1, .. }
        ));
    }

    #[test]
    fn validate_rejects_negative_price() {
        let json = r#"{
            "AAPL": {
                "history": [
                    {"price": -1.0, "timestamp": "2026-02-20T15:30:00Z"}
                ]
            }
        }"#;
        let history: History = serde_json::from_str(json).expect("parse");
        assert!(matches!(
            history.validate(),
            Err(HistoryViolation::NegativePrice { index: 0, .. })
        ));
    }

    #[test]
    fn summary_reports_tracked_range() {
        let mut history = History::new();
        history.record(observation("AAPL", 150.0, "2026-02-20T15:30:00Z"));
        history.record(observation("AAPL", 148.0, "2026-02-20T15:31:00Z"));
        history.record(observation("AAPL", 153.0, "2026-02-20T15:32:00Z"));

        let summary = history.summary(&symbol("AAPL")).expect("summary");
        assert_eq!(summary.current_price, 153.0);
        assert_eq!(summary.first_price, 150.0);
        assert_eq!(summary.price_change, 3.0);
        assert_eq!(summary.percent_change, Some(2.0));
        assert_eq!(summary.min_price, 148.0);
        assert_eq!(summary.max_price, 153.0);
        assert_eq!(summary.observations, 3);
    }

    #[test]
    fn summary_is_none_for_untracked_symbol() {
        let history = History::new();
        assert!(history.summary(&symbol("AAPL")).is_none());
    }
}
