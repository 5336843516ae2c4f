//! Market analysis service.
//!
//! Computes technical indicators over stored candles and turns the latest
//! readings into trading signals.

pub mod indicator;
pub mod signal;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::money::{from_f64, to_f64};
use crate::domain::{
    CryptoPair, Indicators, MarketData, PairId, SignalId, SignalType, StrategyType, TradingSignal,
};
use crate::error::Result;
use crate::infrastructure::config::analysis::AnalysisConfig;
use crate::port::outbound::store::TradingStore;

/// Candles loaded when refreshing indicators.
const INDICATOR_HISTORY: usize = 100;
/// Analyzed candles loaded when generating a signal.
const SIGNAL_HISTORY: usize = 50;
/// Window for trend, volatility, volume and support/resistance.
const LOOKBACK: usize = 20;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_K: f64 = 2.0;
const MA_PERIODS: [usize; 4] = [12, 20, 26, 50];

/// Compute every indicator for the last price of `closes` (oldest first).
#[must_use]
pub fn compute_indicators(closes: &[f64]) -> Indicators {
    let (macd, macd_signal, macd_histogram) =
        match indicator::macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL) {
            Some((m, s, h)) => (Some(m), Some(s), Some(h)),
            None => (None, None, None),
        };
    let (bollinger_upper, bollinger_middle, bollinger_lower) =
        match indicator::bollinger(closes, BOLLINGER_PERIOD, BOLLINGER_K) {
            Some((u, m, l)) => (Some(u), Some(m), Some(l)),
            None => (None, None, None),
        };

    let averages = indicator::moving_averages(closes, &MA_PERIODS);
    let average = |period: usize| averages.iter().find(|a| a.period == period);

    Indicators {
        rsi_14: indicator::rsi(closes, RSI_PERIOD),
        macd,
        macd_signal,
        macd_histogram,
        sma_20: average(20).map(|a| a.sma),
        sma_50: average(50).map(|a| a.sma),
        ema_12: average(12).map(|a| a.ema),
        ema_26: average(26).map(|a| a.ema),
        bollinger_upper,
        bollinger_middle,
        bollinger_lower,
    }
}

/// Indicator and signal generation over the candle store.
pub struct MarketAnalyzer {
    store: Arc<dyn TradingStore>,
    config: AnalysisConfig,
}

impl MarketAnalyzer {
    pub fn new(store: Arc<dyn TradingStore>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    /// Recompute indicators and store them on the pair's newest candle.
    ///
    /// Returns `false` when there is not enough history yet.
    pub async fn update_indicators(&self, pair_id: PairId) -> Result<bool> {
        let mut candles = self.store.recent_candles(pair_id, INDICATOR_HISTORY).await?;
        if candles.len() < self.config.min_data_points {
            debug!(
                pair_id = %pair_id,
                candles = candles.len(),
                required = self.config.min_data_points,
                "Not enough candles for indicators"
            );
            return Ok(false);
        }
        candles.reverse();

        let closes: Vec<f64> = candles.iter().map(|c| to_f64(c.close_price)).collect();
        let indicators = compute_indicators(&closes);

        let Some(latest) = candles.last() else {
            return Ok(false);
        };
        self.store.update_indicators(latest.id, &indicators).await?;
        debug!(pair_id = %pair_id, rsi = ?indicators.rsi_14, "Indicators updated");
        Ok(true)
    }

    /// Analyze the pair's recent candles and persist a signal when the
    /// indicators agree strongly enough.
    pub async fn generate_signal(&self, pair: &CryptoPair) -> Result<Option<TradingSignal>> {
        let mut rows = self
            .store
            .recent_analyzed_candles(pair.id, SIGNAL_HISTORY)
            .await?;
        if rows.len() < self.config.min_signal_rows {
            debug!(pair = %pair.symbol, rows = rows.len(), "Not enough analyzed candles");
            return Ok(None);
        }
        rows.reverse();

        let Some(signal) = self.evaluate(pair, &rows) else {
            return Ok(None);
        };

        self.store.save_signal(&signal).await?;
        info!(
            pair = %pair.symbol,
            signal = %signal.signal_type,
            confidence = signal.confidence,
            entry = %signal.entry_price,
            target = %signal.target_price,
            stop = %signal.stop_loss_price,
            "Signal generated"
        );
        Ok(Some(signal))
    }

    /// Build a signal from analyzed candles ordered oldest first.
    fn evaluate(&self, pair: &CryptoPair, rows: &[MarketData]) -> Option<TradingSignal> {
        let latest = rows.last()?;
        let closes: Vec<f64> = rows.iter().map(|c| to_f64(c.close_price)).collect();
        let highs: Vec<f64> = rows.iter().map(|c| to_f64(c.high_price)).collect();
        let lows: Vec<f64> = rows.iter().map(|c| to_f64(c.low_price)).collect();
        let volumes: Vec<f64> = rows.iter().map(|c| to_f64(c.volume)).collect();

        let trend = indicator::trend_strength(&closes, LOOKBACK);
        let Some(volatility) = indicator::volatility(&closes, LOOKBACK) else {
            debug!(pair = %pair.symbol, "Volatility unavailable");
            return None;
        };
        let volume_profile = indicator::volume_profile(&volumes, LOOKBACK);
        let levels = indicator::support_resistance(&highs, &lows, LOOKBACK);
        let (support, resistance) = levels.unzip();

        let close = to_f64(latest.close_price);
        let decision = signal::decide(&latest.indicators, close, trend, volume_profile);
        if decision.signal_type == SignalType::Hold
            || decision.confidence < self.config.min_confidence
        {
            debug!(
                pair = %pair.symbol,
                signal = %decision.signal_type,
                score = decision.score,
                "No actionable signal"
            );
            return None;
        }

        let buy = decision.signal_type.is_buy();
        let trade = signal::trade_levels(close, buy, volatility, support, resistance);
        let price = |value: f64| from_f64(value).map(|p| pair.round_price(p));
        let (Some(target_price), Some(stop_loss_price)) = (price(trade.target), price(trade.stop_loss))
        else {
            warn!(pair = %pair.symbol, "Trade levels are not finite");
            return None;
        };

        let now = Utc::now();
        Some(TradingSignal {
            id: SignalId::new(),
            pair_id: pair.id,
            signal_type: decision.signal_type,
            confidence: decision.confidence,
            entry_price: latest.close_price,
            target_price,
            stop_loss_price,
            trend_strength: trend,
            volatility,
            volume_profile,
            support_level: support.and_then(price),
            resistance_level: resistance.and_then(price),
            strategy_type: StrategyType::Scalp,
            position_size_recommendation: signal::position_size_pct(decision.confidence, volatility),
            time_horizon_minutes: self.config.time_horizon_minutes,
            is_active: true,
            analysis_data: json!({
                "score": decision.score,
                "votes": decision.votes,
                "indicators": latest.indicators,
                "candle_timestamp": latest.timestamp,
            }),
            created_at: now,
            expires_at: Some(now + Duration::minutes(self.config.signal_ttl_minutes)),
        })
    }
}
