//! Candle fixtures with precomputed indicators.

use chrono::Duration;
use krakenbot::domain::{Indicators, MarketData, PairId};
use krakenbot::testkit::domain::{d, epoch};

/// Oversold RSI, MACD above its signal line and price above a rising
/// average: every indicator votes to buy.
pub fn bullish() -> Indicators {
    Indicators {
        rsi_14: Some(25.0),
        macd: Some(1.0),
        macd_signal: Some(0.5),
        macd_histogram: Some(0.5),
        sma_20: Some(95.0),
        sma_50: Some(90.0),
        ..Default::default()
    }
}

/// Overbought RSI, MACD below its signal line and price below a falling
/// average.
pub fn bearish() -> Indicators {
    Indicators {
        rsi_14: Some(80.0),
        macd: Some(-1.0),
        macd_signal: Some(-0.5),
        macd_histogram: Some(-0.5),
        sma_20: Some(105.0),
        sma_50: Some(110.0),
        ..Default::default()
    }
}

/// `count` flat one-minute candles closing at `close`, each already
/// analyzed with `indicators`.
///
/// Highs and lows sit 20% away from the close so support and resistance
/// never cap the trade levels.
pub fn analyzed(pair_id: PairId, count: usize, close: f64, indicators: &Indicators) -> Vec<MarketData> {
    (0..count)
        .map(|i| {
            let minutes = i64::try_from(i).unwrap_or_default();
            let mut candle = MarketData::new(
                pair_id,
                epoch() + Duration::minutes(minutes),
                d(close),
                d(close * 1.2),
                d(close * 0.8),
                d(close),
                d(10.0),
            );
            candle.indicators = indicators.clone();
            candle
        })
        .collect()
}
