use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// One observed price point for a symbol.
///
/// Immutable once constructed. The optional `change` and `percent_change`
/// fields are carried through when the provider reports a previous close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub symbol: Symbol,
    pub price: f64,
    pub timestamp: UtcDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
}

impl Observation {
    pub fn new(
        symbol: Symbol,
        price: f64,
        timestamp: UtcDateTime,
        change: Option<f64>,
        percent_change: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_optional_finite("change", change)?;
        validate_optional_finite("percent_change", percent_change)?;

        Ok(Self {
            symbol,
            price,
            timestamp,
            change,
            percent_change,
        })
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol is valid")
    }

    #[test]
    fn accepts_valid_observation() {
        let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("timestamp");
        let observation =
            Observation::new(symbol("AAPL"), 150.0, ts, Some(1.25), Some(0.84)).expect("valid");
        assert_eq!(observation.symbol.as_str(), "AAPL");
        assert_eq!(observation.price, 150.0);
    }

    #[test]
    fn rejects_negative_price() {
        let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("timestamp");
        let err = Observation::new(symbol("AAPL"), -0.01, ts, None, None).expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "price" }));
    }

    #[test]
    fn rejects_non_finite_change() {
        let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("timestamp");
        let err = Observation::new(symbol("AAPL"), 150.0, ts, Some(f64::NAN), None)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { field: "change" }));
    }
}
