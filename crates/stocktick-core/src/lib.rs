//! # Stocktick Core
//!
//! Domain types and provider contracts for the stocktick price tracker.
//!
//! ## Overview
//!
//! This crate provides the foundational components for stocktick:
//!
//! - **Canonical domain models** for symbols, timestamps, and price
//!   observations
//! - **Price source trait** for quote provider adapters
//! - **HTTP client abstraction** so adapters stay testable offline
//! - **Clock abstraction** for deterministic time in tests
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo Finance) |
//! | [`clock`] | Injectable wall-clock |
//! | [`domain`] | Domain models (Symbol, UtcDateTime, Observation) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`price_source`] | Price source trait and fetch types |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stocktick_core::{FetchRequest, PriceSource, Symbol, YahooQuoteSource};
//!
//! async fn fetch(source: &YahooQuoteSource) -> Result<(), Box<dyn std::error::Error>> {
//!     let request = FetchRequest::new(vec![Symbol::parse("AAPL")?])?;
//!     let batch = source.fetch(request).await?;
//!
//!     for observation in &batch.observations {
//!         println!("{}: ${:.2}", observation.symbol, observation.price);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod clock;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod price_source;

pub use adapters::YahooQuoteSource;

pub use clock::{Clock, FixedClock, SystemClock};

pub use domain::{Observation, Symbol, UtcDateTime};

pub use error::ValidationError;

pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

pub use price_source::{
    FetchBatch, FetchRequest, MissReason, PriceSource, ProviderId, SourceError, SourceErrorKind,
    SymbolMiss,
};
