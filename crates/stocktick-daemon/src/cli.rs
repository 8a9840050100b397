//! CLI argument definitions for the stocktick daemon.
//!
//! The history file path is deliberately NOT a flag: the deployment
//! contract injects it through the `DATA_FILE` environment variable and
//! the process reads no other configuration from the environment.

use clap::{Parser, ValueEnum};

/// Periodic stock price tracker with durable, restart-safe history.
///
/// Polls current prices for the given symbols on a fixed interval and
/// appends them to the JSON history file named by `DATA_FILE`.
#[derive(Debug, Parser)]
#[command(name = "stocktick", version, about)]
pub struct Cli {
    /// Ticker symbols to track (e.g. AAPL MSFT).
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Seconds between poll cycles.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Outbound request timeout budget in milliseconds.
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,

    /// What to do when the history file exists but cannot be parsed.
    #[arg(long, value_enum, default_value_t = OnCorrupt::Fail)]
    pub on_corrupt: OnCorrupt,

    /// Log a price alert when a symbol moves by at least this many
    /// dollars between consecutive polls.
    #[arg(long, default_value_t = 1.0)]
    pub price_alert: f64,

    /// Log a price alert when a symbol moves by at least this percent
    /// between consecutive polls.
    #[arg(long, default_value_t = 2.0)]
    pub percent_alert: f64,

    /// Disable the CSV sibling export next to the JSON history file.
    #[arg(long, default_value_t = false)]
    pub no_csv: bool,
}

/// Corrupt-file startup policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnCorrupt {
    /// Refuse startup and exit non-zero.
    Fail,
    /// Archive the bad file and continue with an empty history.
    Quarantine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbols_and_defaults() {
        let cli = Cli::try_parse_from(["stocktick", "AAPL", "MSFT"]).expect("must parse");
        assert_eq!(cli.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(cli.interval_secs, 60);
        assert_eq!(cli.timeout_ms, 3000);
        assert_eq!(cli.on_corrupt, OnCorrupt::Fail);
        assert!(!cli.no_csv);
    }

    #[test]
    fn requires_at_least_one_symbol() {
        assert!(Cli::try_parse_from(["stocktick"]).is_err());
    }

    #[test]
    fn accepts_corrupt_policy_flag() {
        let cli = Cli::try_parse_from(["stocktick", "AAPL", "--on-corrupt", "quarantine"])
            .expect("must parse");
        assert_eq!(cli.on_corrupt, OnCorrupt::Quarantine);
    }
}
