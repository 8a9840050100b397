use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stocktick_core::{ReqwestHttpClient, SystemClock, YahooQuoteSource};
use stocktick_daemon::{Cli, Config, DaemonError, Poller};
use stocktick_store::HistoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run().await {
        tracing::error!(%error, "stocktick exiting");
        std::process::exit(error.exit_code());
    }
}

async fn run() -> Result<(), DaemonError> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;

    tracing::info!(
        data_file = %config.data_file.display(),
        symbols = ?config.symbols.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        interval_secs = config.interval.as_secs(),
        "starting stock tracker"
    );

    let (store, history) = HistoryStore::open(&config.data_file, config.corrupt_policy)?;
    let store = store.with_csv_export(config.csv_export);

    if !history.is_empty() {
        tracing::info!(
            observations = history.observation_count(),
            "resumed existing history"
        );
    }

    let source = YahooQuoteSource::new(Arc::new(ReqwestHttpClient::new()), Arc::new(SystemClock))
        .with_timeout_ms(config.timeout_ms);

    let mut poller = Poller::new(
        Arc::new(source),
        store,
        history,
        config.symbols.clone(),
        config.alerts,
    );

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    poller.run(config.interval, shutdown).await;

    tracing::info!("clean shutdown");
    Ok(())
}
