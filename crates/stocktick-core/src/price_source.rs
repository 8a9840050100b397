//! Price source trait and fetch request/response types.
//!
//! This module defines the adapter contract (`PriceSource`) that quote
//! provider implementations follow. A fetch is best-effort per symbol:
//! unknown or unpriced symbols are reported as misses inside the batch,
//! while a provider that cannot be reached at all fails the whole call
//! with a retryable `Unavailable` error.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{Observation, Symbol};

/// Canonical provider identifiers used in log lines and batch metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yahoo,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The provider cannot be reached at all (network, auth, timeout).
    Unavailable,
    InvalidRequest,
    Internal,
}

/// Structured source error carried across the poller's cycle boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for a fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbols: Vec<Symbol>,
}

impl FetchRequest {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "fetch request must include at least one symbol",
            ));
        }
        Ok(Self { symbols })
    }
}

/// Why a requested symbol produced no observation in this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// The provider does not know the symbol.
    SymbolNotFound,
    /// The provider returned the symbol without a usable price.
    MissingPrice,
    /// The provider payload for this symbol failed validation.
    InvalidPayload,
}

impl MissReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SymbolNotFound => "symbol_not_found",
            Self::MissingPrice => "missing_price",
            Self::InvalidPayload => "invalid_payload",
        }
    }
}

impl Display for MissReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-symbol fetch failure. Non-fatal: the rest of the batch stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMiss {
    pub symbol: Symbol,
    pub reason: MissReason,
}

/// Best-effort fetch result covering only symbols resolved in this call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchBatch {
    pub provider: ProviderId,
    pub observations: Vec<Observation>,
    pub misses: Vec<SymbolMiss>,
}

impl FetchBatch {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Quote provider contract.
///
/// Implementations must be `Send + Sync` and stateless across calls; the
/// only side effect of `fetch` is the outbound request itself.
pub trait PriceSource: Send + Sync {
    /// Returns the unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Fetches current prices for the requested symbols.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] with kind `Unavailable` when the provider
    /// cannot be reached at all. Per-symbol failures never error; they are
    /// reported as [`SymbolMiss`]es in the batch.
    fn fetch<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FetchBatch, SourceError>> + Send + 'a>>;
}
