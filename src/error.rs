//! Error taxonomy for the rebalancing engine.
//!
//! Configuration problems are fatal at startup. Exchange and calculation
//! failures are local to one rebalance cycle and end up in its `TradeRecord`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Missing or invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {key}")]
    Missing { key: &'static str },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("unsupported schedule '{expr}': {reason}")]
    Schedule { expr: String, reason: String },
}

/// Failure talking to the exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Network failure or request timeout.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx HTTP status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body carried a non-"0" code.
    #[error("API error {code}: {msg}")]
    Api { code: String, msg: String },

    #[error("response missing field {0}")]
    MissingField(&'static str),

    #[error("could not parse {field} from '{value}'")]
    Parse { field: &'static str, value: String },

    #[error("request signing failed: {0}")]
    Auth(String),

    #[error("order size rounds to zero contracts")]
    OrderTooSmall,
}

/// Failure inside the position calculator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),
}

/// Anything that can abort a single rebalance cycle.
#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Calculation(#[from] CalculationError),
}

/// Coarse error category stored alongside failed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Exchange,
    Calculation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Exchange => "exchange",
            ErrorKind::Calculation => "calculation",
        }
    }
}

impl RebalanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RebalanceError::Exchange(_) => ErrorKind::Exchange,
            RebalanceError::Calculation(_) => ErrorKind::Calculation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_kind_follows_variant() {
        let err: RebalanceError = CalculationError::NonPositivePrice(dec!(0)).into();
        assert_eq!(err.kind(), ErrorKind::Calculation);
        assert_eq!(err.to_string(), "price must be positive, got 0");

        let err: RebalanceError = ExchangeError::Api {
            code: "50113".to_string(),
            msg: "Invalid Sign".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Exchange);
        assert_eq!(err.to_string(), "API error 50113: Invalid Sign");
    }
}
