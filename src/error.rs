use thiserror::Error;

use crate::domain::id::{OrderId, PairId, PositionId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors reported by, or while talking to, the exchange.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Kraken API error: {}", .0.join(", "))]
    Api(Vec<String>),

    #[error("Kraken API credentials not configured")]
    MissingCredentials,

    #[error("invalid response for {endpoint}: {reason}")]
    InvalidResponse {
        endpoint: &'static str,
        reason: String,
    },

    #[error("failed to sign request: {0}")]
    Signing(String),
}

/// Order and position management errors.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("crypto pair not found: {0}")]
    PairNotFound(PairId),

    #[error("order size {amount} below minimum {minimum}")]
    BelowMinimum {
        amount: rust_decimal::Decimal,
        minimum: rust_decimal::Decimal,
    },

    #[error("position not found or already closed: {0}")]
    PositionNotFound(PositionId),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("order rejected: {0}")]
    Rejected(String),
}

/// Risk management errors.
#[derive(Error, Debug, Clone)]
pub enum RiskError {
    #[error("trading is disabled")]
    TradingDisabled,

    #[error("risk status is high: {alerts} active alert(s)")]
    HighRisk { alerts: usize },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_are_joined() {
        let err = ExchangeError::Api(vec![
            "EGeneral:Invalid arguments".into(),
            "EOrder:Insufficient funds".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Kraken API error: EGeneral:Invalid arguments, EOrder:Insufficient funds"
        );
    }

    #[test]
    fn sub_errors_convert_transparently() {
        let err: Error = ExchangeError::MissingCredentials.into();
        assert_eq!(err.to_string(), "Kraken API credentials not configured");
        assert!(matches!(err, Error::Exchange(ExchangeError::MissingCredentials)));
    }
}
