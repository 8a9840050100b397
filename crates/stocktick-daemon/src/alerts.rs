//! Price-move alerts between consecutive polls.

use stocktick_core::Symbol;
use stocktick_store::History;

/// Thresholds that trigger an alert log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Absolute move in the quote currency.
    pub price: f64,
    /// Absolute move in percent of the previous price.
    pub percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            price: 1.0,
            percent: 2.0,
        }
    }
}

/// A threshold-crossing move between the last two recorded points.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub symbol: Symbol,
    pub previous_price: f64,
    pub current_price: f64,
    pub change: f64,
    pub percent_change: Option<f64>,
}

impl PriceAlert {
    pub fn direction(&self) -> &'static str {
        if self.change >= 0.0 {
            "increased"
        } else {
            "decreased"
        }
    }
}

/// Compare the last two recorded points for `symbol` against the
/// thresholds. Returns `None` with fewer than two points.
pub fn check(
    history: &History,
    symbol: &Symbol,
    thresholds: &AlertThresholds,
) -> Option<PriceAlert> {
    let points = history.points(symbol)?;
    if points.len() < 2 {
        return None;
    }

    let previous = &points[points.len() - 2];
    let current = &points[points.len() - 1];

    let change = current.price - previous.price;
    let percent_change = if previous.price != 0.0 {
        Some(change / previous.price * 100.0)
    } else {
        None
    };

    let crosses_price = change.abs() >= thresholds.price;
    let crosses_percent = percent_change
        .map(|percent| percent.abs() >= thresholds.percent)
        .unwrap_or(false);

    if crosses_price || crosses_percent {
        Some(PriceAlert {
            symbol: symbol.clone(),
            previous_price: previous.price,
            current_price: current.price,
            change,
            percent_change,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocktick_core::{Observation, UtcDateTime};

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol")
    }

    fn history_with_prices(prices: &[f64]) -> History {
        let mut history = History::new();
        for (index, price) in prices.iter().enumerate() {
            let ts = UtcDateTime::from_unix_timestamp(1_771_601_400 + index as i64 * 60)
                .expect("timestamp");
            let observation =
                Observation::new(symbol("AAPL"), *price, ts, None, None).expect("valid");
            history.record(observation);
        }
        history
    }

    #[test]
    fn no_alert_with_fewer_than_two_points() {
        let history = history_with_prices(&[150.0]);
        assert!(check(&history, &symbol("AAPL"), &AlertThresholds::default()).is_none());
    }

    #[test]
    fn dollar_move_crosses_threshold() {
        let history = history_with_prices(&[150.0, 151.5]);
        let alert = check(&history, &symbol("AAPL"), &AlertThresholds::default())
            .expect("alert expected");
        assert_eq!(alert.change, 1.5);
        assert_eq!(alert.direction(), "increased");
    }

    #[test]
    fn percent_move_crosses_threshold() {
        // 0.75 dollars is below the 1.0 price threshold, but 2.5% of 30.
        let history = history_with_prices(&[30.0, 29.25]);
        let alert = check(&history, &symbol("AAPL"), &AlertThresholds::default())
            .expect("alert expected");
        assert_eq!(alert.direction(), "decreased");
        assert_eq!(alert.percent_change, Some(-2.5));
    }

    #[test]
    fn small_move_stays_quiet() {
        let history = history_with_prices(&[150.0, 150.2]);
        assert!(check(&history, &symbol("AAPL"), &AlertThresholds::default()).is_none());
    }
}
