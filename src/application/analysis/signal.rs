//! Weighted indicator vote and trade level derivation.

use serde::Serialize;

use crate::domain::{Indicators, SignalType, VolumeProfile};

/// Score beyond which a vote becomes a directional signal.
const SIGNAL_THRESHOLD: f64 = 0.3;
/// Score beyond which a directional signal is strong.
const STRONG_THRESHOLD: f64 = 0.6;
/// Trend strength above which the trend reinforces the vote.
const STRONG_TREND: f64 = 0.7;

/// One indicator's opinion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vote {
    pub source: &'static str,
    /// -1 bearish, 0 neutral, +1 bullish.
    pub direction: i8,
    pub weight: f64,
}

/// Outcome of the vote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub signal_type: SignalType,
    /// Weighted mean of the votes, in `[-1, 1]`.
    pub score: f64,
    pub confidence: f64,
    pub votes: Vec<Vote>,
}

/// Entry, target and stop prices for a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeLevels {
    pub entry: f64,
    pub target: f64,
    pub stop_loss: f64,
}

/// Combine the latest indicators into a signal.
#[must_use]
pub fn decide(
    indicators: &Indicators,
    close: f64,
    trend_strength: f64,
    volume: VolumeProfile,
) -> Decision {
    let mut votes = Vec::with_capacity(5);
    let mut push = |votes: &mut Vec<Vote>, source, direction, weight| {
        votes.push(Vote {
            source,
            direction,
            weight,
        });
    };

    if let Some(rsi) = indicators.rsi_14 {
        match rsi {
            r if r < 30.0 => push(&mut votes, "rsi", 1, 0.3),
            r if r > 70.0 => push(&mut votes, "rsi", -1, 0.3),
            _ => push(&mut votes, "rsi", 0, 0.1),
        }
    }

    // A MACD or signal line of exactly zero counts as absent.
    let nonzero = |v: Option<f64>| v.filter(|x| *x != 0.0);
    let macd = (nonzero(indicators.macd), nonzero(indicators.macd_signal));
    if let (Some(macd), Some(signal)) = macd {
        let direction = if macd > signal { 1 } else { -1 };
        push(&mut votes, "macd", direction, 0.25);
    }

    if let (Some(sma_20), Some(sma_50)) = (indicators.sma_20, indicators.sma_50) {
        if sma_20 > sma_50 && close > sma_20 {
            push(&mut votes, "moving_average", 1, 0.2);
        } else if sma_20 < sma_50 && close < sma_20 {
            push(&mut votes, "moving_average", -1, 0.2);
        } else {
            push(&mut votes, "moving_average", 0, 0.1);
        }
    }

    let running = |votes: &[Vote]| {
        if votes.iter().map(|v| i32::from(v.direction)).sum::<i32>() > 0 {
            1
        } else {
            -1
        }
    };
    if trend_strength > STRONG_TREND {
        let direction = running(&votes);
        push(&mut votes, "trend", direction, 0.15);
    }
    if volume == VolumeProfile::High {
        let direction = running(&votes);
        push(&mut votes, "volume", direction, 0.1);
    }

    if votes.is_empty() {
        return Decision {
            signal_type: SignalType::Hold,
            score: 0.0,
            confidence: 0.0,
            votes,
        };
    }

    let total_weight: f64 = votes.iter().map(|v| v.weight).sum();
    let score = votes
        .iter()
        .map(|v| f64::from(v.direction) * v.weight)
        .sum::<f64>()
        / total_weight;

    let signal_type = if score > SIGNAL_THRESHOLD {
        if score > STRONG_THRESHOLD {
            SignalType::StrongBuy
        } else {
            SignalType::Buy
        }
    } else if score < -SIGNAL_THRESHOLD {
        if score < -STRONG_THRESHOLD {
            SignalType::StrongSell
        } else {
            SignalType::Sell
        }
    } else {
        SignalType::Hold
    };

    Decision {
        signal_type,
        score,
        confidence: score.abs().min(1.0),
        votes,
    }
}

/// Target and stop around `entry`, scaled by volatility and bounded by
/// the opposing support or resistance level.
#[must_use]
pub fn trade_levels(
    entry: f64,
    buy: bool,
    volatility: f64,
    support: Option<f64>,
    resistance: Option<f64>,
) -> TradeLevels {
    let factor = (volatility / 100.0).clamp(0.005, 0.05);

    if buy {
        let mut target = entry * (1.0 + 2.0 * factor);
        if let Some(resistance) = resistance.filter(|r| *r > entry) {
            target = target.min(resistance * 0.99);
        }
        TradeLevels {
            entry,
            target,
            stop_loss: entry * (1.0 - factor),
        }
    } else {
        let mut target = entry * (1.0 - 2.0 * factor);
        if let Some(support) = support.filter(|s| *s < entry) {
            target = target.max(support * 1.01);
        }
        TradeLevels {
            entry,
            target,
            stop_loss: entry * (1.0 + factor),
        }
    }
}

/// Recommended position size as a percent of the portfolio, capped at 5.
#[must_use]
pub fn position_size_pct(confidence: f64, volatility: f64) -> f64 {
    let volatility_factor = (1.0 - volatility / 10.0).max(0.5);
    (2.0 * confidence * volatility_factor).min(5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicators(rsi: f64, macd: f64, macd_signal: f64, sma_20: f64, sma_50: f64) -> Indicators {
        Indicators {
            rsi_14: Some(rsi),
            macd: Some(macd),
            macd_signal: Some(macd_signal),
            sma_20: Some(sma_20),
            sma_50: Some(sma_50),
            ..Default::default()
        }
    }

    #[test]
    fn unanimous_bullish_vote_is_strong_buy() {
        let decision = decide(
            &indicators(25.0, 1.0, 0.5, 105.0, 100.0),
            110.0,
            0.9,
            VolumeProfile::High,
        );
        assert_eq!(decision.signal_type, SignalType::StrongBuy);
        assert!((decision.score - 1.0).abs() < 1e-12);
        assert!((decision.confidence - 1.0).abs() < 1e-12);
        assert_eq!(decision.votes.len(), 5);
    }

    #[test]
    fn bearish_macd_outweighs_neutral_votes() {
        // rsi neutral (0, .1), macd bearish (-1, .25), ma neutral (0, .1)
        let decision = decide(
            &indicators(50.0, 0.5, 1.0, 100.0, 100.0),
            100.0,
            0.1,
            VolumeProfile::Medium,
        );
        let expected = -0.25 / 0.45;
        assert!((decision.score - expected).abs() < 1e-12);
        assert_eq!(decision.signal_type, SignalType::Sell);
        assert!(decision.confidence < 0.6);
    }

    #[test]
    fn neutral_votes_hold() {
        // rsi neutral (0, .1), ma neutral (0, .1), flat macd casts no vote
        let decision = decide(
            &indicators(50.0, 0.0, 0.1, 100.0, 100.0),
            100.0,
            0.1,
            VolumeProfile::Medium,
        );
        assert_eq!(decision.signal_type, SignalType::Hold);
        assert_eq!(decision.score, 0.0);
        assert!(decision.votes.iter().all(|v| v.source != "macd"));
    }

    #[test]
    fn zero_signal_line_skips_macd_vote() {
        let decision = decide(
            &indicators(50.0, 0.4, 0.0, 100.0, 100.0),
            100.0,
            0.1,
            VolumeProfile::Medium,
        );
        assert_eq!(decision.votes.len(), 2);
        assert_eq!(decision.signal_type, SignalType::Hold);
    }

    #[test]
    fn trend_follows_running_sum() {
        // rsi overbought (-1), macd bearish (-1), ma downtrend (-1), strong trend
        let decision = decide(
            &indicators(80.0, 0.5, 1.0, 95.0, 100.0),
            90.0,
            0.8,
            VolumeProfile::Low,
        );
        assert_eq!(decision.votes.last().unwrap().source, "trend");
        assert_eq!(decision.votes.last().unwrap().direction, -1);
        assert_eq!(decision.signal_type, SignalType::StrongSell);
    }

    #[test]
    fn zero_sum_trend_vote_is_bearish() {
        let only_rsi = Indicators {
            rsi_14: Some(50.0),
            ..Default::default()
        };
        let decision = decide(&only_rsi, 1.0, 0.9, VolumeProfile::Unknown);
        assert_eq!(decision.votes[1].direction, -1);
    }

    #[test]
    fn no_indicators_is_hold() {
        let decision = decide(&Indicators::default(), 1.0, 0.0, VolumeProfile::Low);
        assert_eq!(decision.signal_type, SignalType::Hold);
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn buy_levels_respect_resistance() {
        let levels = trade_levels(100.0, true, 2.0, None, Some(101.0));
        assert!((levels.stop_loss - 98.0).abs() < 1e-9);
        assert!((levels.target - 99.99).abs() < 1e-9);

        let open_sky = trade_levels(100.0, true, 2.0, None, Some(99.0));
        assert!((open_sky.target - 104.0).abs() < 1e-9);
    }

    #[test]
    fn sell_levels_respect_support() {
        let levels = trade_levels(100.0, false, 2.0, Some(98.0), None);
        assert!((levels.stop_loss - 102.0).abs() < 1e-9);
        assert!((levels.target - 98.98).abs() < 1e-9);
    }

    #[test]
    fn volatility_factor_is_clamped() {
        let calm = trade_levels(100.0, true, 0.0, None, None);
        assert!((calm.stop_loss - 99.5).abs() < 1e-9);
        let wild = trade_levels(100.0, true, 50.0, None, None);
        assert!((wild.stop_loss - 95.0).abs() < 1e-9);
        assert!((wild.target - 110.0).abs() < 1e-9);
    }

    #[test]
    fn position_size_shrinks_with_volatility() {
        assert!((position_size_pct(0.8, 0.0) - 1.6).abs() < 1e-12);
        assert!((position_size_pct(0.8, 20.0) - 0.8).abs() < 1e-12);
        assert!((position_size_pct(1.0, 2.0) - 1.6).abs() < 1e-12);
    }
}
