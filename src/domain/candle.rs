//! OHLC market data with attached technical indicators.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CandleId, PairId};
use super::money::{Price, Volume};

/// Technical indicators computed for a candle.
///
/// All fields are optional: an indicator is absent until enough history
/// exists to compute it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

/// One OHLC bar for a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub id: CandleId,
    pub pair_id: PairId,
    /// Bar open time.
    pub timestamp: DateTime<Utc>,
    pub open_price: Price,
    pub high_price: Price,
    pub low_price: Price,
    pub close_price: Price,
    pub volume: Volume,
    pub indicators: Indicators,
    pub created_at: DateTime<Utc>,
}

impl MarketData {
    /// Create a candle without indicators.
    #[must_use]
    pub fn new(
        pair_id: PairId,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            id: CandleId::new(),
            pair_id,
            timestamp,
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
            volume,
            indicators: Indicators::default(),
            created_at: Utc::now(),
        }
    }
}
