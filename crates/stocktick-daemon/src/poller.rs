//! The fetch/persist cycle driver.
//!
//! One poll cycle moves through `Idle → Fetching → Merging → Idle`. The
//! poller owns the history store and the in-memory history outright; no
//! other writer exists. Cycles never overlap: the run loop awaits each
//! cycle to completion and skips timer ticks that fire while a cycle is
//! still in flight.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use stocktick_core::{FetchRequest, PriceSource, SourceErrorKind, Symbol};
use stocktick_store::{History, HistoryStore};

use crate::alerts::{self, AlertThresholds};

/// Poll cycle state. Terminal only on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Merging,
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The batch was merged; counts cover this cycle only.
    Merged { appended: usize, dropped: usize },
    /// The provider could not be reached; history untouched, the next
    /// tick retries naturally.
    SourceUnavailable,
    /// The fetch resolved no symbols at all this cycle.
    Empty,
    /// The atomic replace did not commit; the previous snapshot survives
    /// and the next cycle re-persists.
    WriteFailed,
}

/// Drives the price source and history store on a fixed interval.
pub struct Poller {
    source: Arc<dyn PriceSource>,
    store: HistoryStore,
    history: History,
    symbols: Vec<Symbol>,
    thresholds: AlertThresholds,
    state: CycleState,
}

impl Poller {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: HistoryStore,
        history: History,
        symbols: Vec<Symbol>,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            source,
            store,
            history,
            symbols,
            thresholds,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run one fetch-then-merge cycle.
    ///
    /// All recoverable failures are contained here: the method never
    /// errors, it reports what happened and returns the poller to Idle.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state = CycleState::Fetching;

        let request = match FetchRequest::new(self.symbols.clone()) {
            Ok(request) => request,
            Err(error) => {
                // Config guarantees a non-empty symbol set; this is a bug.
                tracing::error!(%error, "invalid fetch request, skipping cycle");
                self.state = CycleState::Idle;
                return CycleOutcome::Empty;
            }
        };

        let batch = match self.source.fetch(request).await {
            Ok(batch) => batch,
            Err(error) => {
                if error.kind() == SourceErrorKind::Unavailable {
                    tracing::warn!(
                        provider = %self.source.id(),
                        %error,
                        "price source unavailable, skipping cycle"
                    );
                } else {
                    tracing::error!(provider = %self.source.id(), %error, "fetch failed");
                }
                self.state = CycleState::Idle;
                return CycleOutcome::SourceUnavailable;
            }
        };

        for miss in &batch.misses {
            tracing::warn!(
                symbol = %miss.symbol,
                reason = %miss.reason,
                "symbol not resolved this cycle"
            );
        }

        if batch.observations.is_empty() {
            self.state = CycleState::Idle;
            return CycleOutcome::Empty;
        }

        for observation in &batch.observations {
            tracing::info!(
                symbol = %observation.symbol,
                price = observation.price,
                change = observation.change,
                "observed price"
            );
        }

        self.state = CycleState::Merging;
        let fetched: Vec<Symbol> = batch
            .observations
            .iter()
            .map(|observation| observation.symbol.clone())
            .collect();

        let outcome = match self.store.append(&mut self.history, batch.observations) {
            Ok(report) => {
                for dropped in &report.dropped {
                    tracing::warn!(
                        symbol = %dropped.symbol,
                        timestamp = %dropped.timestamp,
                        reason = %dropped.reason,
                        "observation dropped"
                    );
                }

                let dropped_symbols: BTreeSet<&Symbol> =
                    report.dropped.iter().map(|d| &d.symbol).collect();
                for symbol in fetched.iter().filter(|s| !dropped_symbols.contains(s)) {
                    if let Some(alert) = alerts::check(&self.history, symbol, &self.thresholds) {
                        tracing::info!(
                            symbol = %alert.symbol,
                            from = alert.previous_price,
                            to = alert.current_price,
                            change = alert.change,
                            percent = alert.percent_change,
                            "price alert: {} has {}",
                            alert.symbol,
                            alert.direction()
                        );
                    }
                }

                CycleOutcome::Merged {
                    appended: report.appended,
                    dropped: report.dropped.len(),
                }
            }
            Err(error) => {
                tracing::error!(%error, "history write failed, cycle abandoned");
                CycleOutcome::WriteFailed
            }
        };

        self.state = CycleState::Idle;
        outcome
    }

    /// Poll until `shutdown` resolves.
    ///
    /// The first cycle runs immediately; later cycles fire on the
    /// interval, with missed ticks skipped so a slow cycle is never
    /// followed by a burst. Shutdown only prevents the next cycle from
    /// starting; a cycle already underway always finishes its merge.
    pub async fn run(&mut self, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        // The interval's first tick completes immediately.
        ticker.tick().await;
        self.run_cycle().await;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping poller");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        self.log_summaries();
    }

    fn log_summaries(&self) {
        for symbol in &self.symbols {
            match self.history.summary(symbol) {
                Some(summary) => tracing::info!(
                    symbol = %summary.symbol,
                    current = summary.current_price,
                    change = summary.price_change,
                    percent = summary.percent_change,
                    min = summary.min_price,
                    max = summary.max_price,
                    observations = summary.observations,
                    "tracking summary"
                ),
                None => tracing::info!(symbol = %symbol, "tracking summary: no data recorded"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::Mutex;

    use stocktick_core::{
        FetchBatch, Observation, ProviderId, SourceError, UtcDateTime,
    };
    use stocktick_store::CorruptPolicy;
    use tempfile::tempdir;

    struct ScriptedSource {
        script: Mutex<Vec<Result<FetchBatch, SourceError>>>,
    }

    impl ScriptedSource {
        fn new(mut responses: Vec<Result<FetchBatch, SourceError>>) -> Self {
            responses.reverse();
            Self {
                script: Mutex::new(responses),
            }
        }
    }

    impl PriceSource for ScriptedSource {
        fn id(&self) -> ProviderId {
            ProviderId::Yahoo
        }

        fn fetch<'a>(
            &'a self,
            _req: FetchRequest,
        ) -> Pin<Box<dyn Future<Output = Result<FetchBatch, SourceError>> + Send + 'a>> {
            let next = self
                .script
                .lock()
                .expect("script lock")
                .pop()
                .unwrap_or_else(|| Err(SourceError::unavailable("script exhausted")));
            Box::pin(async move { next })
        }
    }

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol")
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

    fn batch(observations: Vec<Observation>) -> Result<FetchBatch, SourceError> {
        Ok(FetchBatch {
            provider: ProviderId::Yahoo,
            observations,
            misses: Vec::new(),
        })
    }

    fn poller_with(script: Vec<Result<FetchBatch, SourceError>>) -> (Poller, tempfile::TempDir) {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("history.json");
        let (store, history) = HistoryStore::open(path, CorruptPolicy::Fail).expect("open");
        let poller = Poller::new(
            Arc::new(ScriptedSource::new(script)),
            store.with_csv_export(false),
            history,
            vec![symbol("AAPL")],
            AlertThresholds::default(),
        );
        (poller, temp)
    }

    #[tokio::test]
    async fn merged_cycle_appends_observations() {
        let (mut poller, _temp) = poller_with(vec![batch(vec![observation(
            "AAPL",
            150.0,
            "2026-02-20T15:30:00Z",
        )])]);

        let outcome = poller.run_cycle().await;
        assert_eq!(
            outcome,
            CycleOutcome::Merged {
                appended: 1,
                dropped: 0
            }
        );
        assert_eq!(poller.state(), CycleState::Idle);
        assert_eq!(poller.history().observation_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_source_leaves_history_untouched() {
        let (mut poller, _temp) = poller_with(vec![
            Err(SourceError::unavailable("connection refused")),
            batch(vec![observation("AAPL", 150.0, "2026-02-20T15:30:00Z")]),
        ]);

        assert_eq!(poller.run_cycle().await, CycleOutcome::SourceUnavailable);
        assert!(poller.history().is_empty());

        // The next tick proceeds normally.
        let outcome = poller.run_cycle().await;
        assert_eq!(
            outcome,
            CycleOutcome::Merged {
                appended: 1,
                dropped: 0
            }
        );
    }

    #[tokio::test]
    async fn duplicate_batch_is_reported_not_fatal() {
        let same = observation("AAPL", 150.0, "2026-02-20T15:30:00Z");
        let (mut poller, _temp) = poller_with(vec![
            batch(vec![same.clone()]),
            batch(vec![same]),
        ]);

        poller.run_cycle().await;
        let outcome = poller.run_cycle().await;
        assert_eq!(
            outcome,
            CycleOutcome::Merged {
                appended: 0,
                dropped: 1
            }
        );
        assert_eq!(poller.history().observation_count(), 1);
    }

    #[tokio::test]
    async fn empty_fetch_result_is_a_noop() {
        let (mut poller, _temp) = poller_with(vec![batch(Vec::new())]);
        assert_eq!(poller.run_cycle().await, CycleOutcome::Empty);
        assert!(poller.history().is_empty());
    }

    #[tokio::test]
    async fn run_executes_first_cycle_immediately_and_stops_on_shutdown() {
        let (mut poller, _temp) = poller_with(vec![batch(vec![observation(
            "AAPL",
            150.0,
            "2026-02-20T15:30:00Z",
        )])]);

        // Shutdown resolves right away: only the immediate first tick runs.
        poller
            .run(Duration::from_secs(3600), std::future::ready(()))
            .await;
        assert_eq!(poller.history().observation_count(), 1);
    }
}
