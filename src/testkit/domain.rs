//! Builders for domain values used across tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::money::from_f64;
use crate::domain::{
    CryptoPair, MarketData, PairId, SignalId, SignalType, StrategyType, TradingSignal,
    VolumeProfile,
};
use crate::port::outbound::exchange::{AssetPairInfo, Candle};

/// Fixed start time for generated candle series.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Convert a test float to a decimal rounded to 8 places.
pub fn d(value: f64) -> Decimal {
    from_f64(value).unwrap_or_default().round_dp(8)
}

/// An active USD pair with 2 price decimals and 8 lot decimals.
pub fn pair(symbol: &str) -> CryptoPair {
    let base = symbol.trim_end_matches("USD");
    CryptoPair::new(symbol, base, "ZUSD", dec!(0.001), 2, 8)
}

/// One-minute candles closing at `closes`, oldest first.
pub fn candle_series(pair_id: PairId, closes: &[f64]) -> Vec<MarketData> {
    let start = epoch();
    let mut previous = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .zip(0_i64..)
        .map(|(&close, minute)| {
            let open = previous;
            previous = close;
            MarketData::new(
                pair_id,
                start + Duration::minutes(minute),
                d(open),
                d(open.max(close) * 1.001),
                d(open.min(close) * 0.999),
                d(close),
                dec!(10),
            )
        })
        .collect()
}

/// Exchange OHLC bars closing at `closes`, oldest first.
pub fn exchange_candles(closes: &[f64]) -> Vec<Candle> {
    let start = epoch();
    closes
        .iter()
        .zip(0_i64..)
        .map(|(&close, minute)| Candle {
            time: start + Duration::minutes(minute),
            open: d(close),
            high: d(close * 1.001),
            low: d(close * 0.999),
            close: d(close),
            vwap: d(close),
            volume: dec!(10),
            count: 5,
        })
        .collect()
}

/// Kraken-style pair description, e.g. `asset_pair("XXBTZUSD", "XBTUSD")`.
pub fn asset_pair(name: &str, altname: &str) -> AssetPairInfo {
    let base = altname.trim_end_matches("USD");
    AssetPairInfo {
        name: name.to_string(),
        altname: altname.to_string(),
        wsname: Some(format!("{base}/USD")),
        base: base.to_string(),
        quote: "ZUSD".into(),
        ordermin: Some(dec!(0.0001)),
        pair_decimals: Some(1),
        lot_decimals: Some(8),
        raw: serde_json::json!({ "altname": altname }),
    }
}

/// An active signal with the given prices.
pub fn signal(
    pair_id: PairId,
    signal_type: SignalType,
    entry: Decimal,
    target: Decimal,
    stop: Decimal,
) -> TradingSignal {
    let now = Utc::now();
    TradingSignal {
        id: SignalId::new(),
        pair_id,
        signal_type,
        confidence: 0.8,
        entry_price: entry,
        target_price: target,
        stop_loss_price: stop,
        trend_strength: 0.5,
        volatility: 1.0,
        volume_profile: VolumeProfile::Medium,
        support_level: None,
        resistance_level: None,
        strategy_type: StrategyType::Scalp,
        position_size_recommendation: 2.0,
        time_horizon_minutes: 60,
        is_active: true,
        analysis_data: serde_json::Value::Null,
        created_at: now,
        expires_at: Some(now + Duration::hours(2)),
    }
}
