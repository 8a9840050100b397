use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::clock::Clock;
use crate::http_client::{HttpClient, HttpRequest};
use crate::price_source::{
    FetchBatch, FetchRequest, MissReason, PriceSource, ProviderId, SourceError, SymbolMiss,
};
use crate::{Observation, Symbol, UtcDateTime, ValidationError};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const QUOTE_PATH: &str = "/v7/finance/quote";

// Yahoo rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Yahoo Finance quote adapter.
///
/// Fetches current prices for a batch of symbols in a single call against
/// the v7 quote endpoint. Unknown symbols are simply absent from the
/// response and surface as per-symbol misses rather than batch failures.
pub struct YahooQuoteSource {
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    base_url: String,
    timeout_ms: u64,
}

impl YahooQuoteSource {
    pub fn new(http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            clock,
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: 3_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn quote_url(&self, symbols: &[Symbol]) -> String {
        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}{}?symbols={}",
            self.base_url,
            QUOTE_PATH,
            urlencoding::encode(&joined)
        )
    }

    async fn fetch_inner(&self, req: FetchRequest) -> Result<FetchBatch, SourceError> {
        let request = HttpRequest::get(self.quote_url(&req.symbols))
            .with_header("user-agent", USER_AGENT)
            .with_timeout_ms(self.timeout_ms);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| SourceError::unavailable(format!("yahoo quote fetch failed: {e}")))?;

        if !response.is_success() {
            return Err(classify_status(response.status));
        }

        let envelope: YahooEnvelope = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::internal(format!("yahoo quote payload did not parse: {e}"))
        })?;

        let mut observations = Vec::with_capacity(req.symbols.len());
        let mut misses = Vec::new();
        let mut resolved = BTreeSet::new();

        for payload in envelope.quote_response.result {
            match normalize_quote(&payload, self.clock.as_ref()) {
                Ok(observation) => {
                    resolved.insert(observation.symbol.clone());
                    observations.push(observation);
                }
                Err(reason) => {
                    if let Ok(symbol) = Symbol::parse(&payload.symbol) {
                        resolved.insert(symbol.clone());
                        misses.push(SymbolMiss { symbol, reason });
                    }
                }
            }
        }

        // Symbols dropped from the response entirely are unknown tickers.
        for symbol in &req.symbols {
            if !resolved.contains(symbol) {
                misses.push(SymbolMiss {
                    symbol: symbol.clone(),
                    reason: MissReason::SymbolNotFound,
                });
            }
        }

        Ok(FetchBatch {
            provider: ProviderId::Yahoo,
            observations,
            misses,
        })
    }
}

impl PriceSource for YahooQuoteSource {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FetchBatch, SourceError>> + Send + 'a>> {
        Box::pin(self.fetch_inner(req))
    }
}

#[derive(Debug, Deserialize)]
struct YahooEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResponse,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(default)]
    result: Vec<YahooQuotePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuotePayload {
    symbol: String,
    regular_market_price: Option<f64>,
    regular_market_time: Option<i64>,
    regular_market_change: Option<f64>,
    regular_market_change_percent: Option<f64>,
    regular_market_previous_close: Option<f64>,
}

fn normalize_quote(payload: &YahooQuotePayload, clock: &dyn Clock) -> Result<Observation, MissReason> {
    let symbol = Symbol::parse(&payload.symbol).map_err(|_| MissReason::InvalidPayload)?;

    let price = payload
        .regular_market_price
        .ok_or(MissReason::MissingPrice)?;

    let timestamp = match payload.regular_market_time {
        Some(epoch) => {
            UtcDateTime::from_unix_timestamp(epoch).map_err(|_| MissReason::InvalidPayload)?
        }
        None => clock.now(),
    };

    // Prefer the provider's change figures; otherwise derive them from the
    // previous close the way the quote endpoint itself would.
    let change = payload.regular_market_change.or_else(|| {
        payload
            .regular_market_previous_close
            .map(|previous| price - previous)
    });
    let percent_change = payload.regular_market_change_percent.or_else(|| {
        payload
            .regular_market_previous_close
            .filter(|previous| *previous != 0.0)
            .map(|previous| (price - previous) / previous * 100.0)
    });

    Observation::new(symbol, price, timestamp, change, percent_change)
        .map_err(validation_to_miss)
}

fn validation_to_miss(error: ValidationError) -> MissReason {
    match error {
        ValidationError::NegativeValue { field: "price" } => MissReason::MissingPrice,
        _ => MissReason::InvalidPayload,
    }
}

fn classify_status(status: u16) -> SourceError {
    if status == 429 || status >= 500 {
        SourceError::unavailable(format!("yahoo quote endpoint returned status {status}"))
    } else {
        SourceError::internal(format!("yahoo quote endpoint returned status {status}"))
    }
}
