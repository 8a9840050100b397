//! Quote provider adapters.

mod yahoo;

pub use yahoo::YahooQuoteSource;
