//! Technical indicators over price series.
//!
//! All series are ordered oldest first. Functions return `None` when the
//! series is too short for the requested window.

use crate::domain::VolumeProfile;

/// Hours in a year, used to annualize hourly volatility.
const PERIODS_PER_YEAR: f64 = 365.0 * 24.0;

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Relative strength index using simple averages of the last `period`
/// gains and losses.
#[must_use]
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }
    let (gains, losses) = tail(prices, period + 1)
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

/// Exponentially weighted mean with bias-adjusted weights.
///
/// `α = 2 / (span + 1)`; each output is `Σ (1-α)^i x[t-i] / Σ (1-α)^i`.
#[must_use]
pub fn ema_series(prices: &[f64], span: usize) -> Vec<f64> {
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    prices
        .iter()
        .map(|price| {
            numerator = price + decay * numerator;
            denominator = 1.0 + decay * denominator;
            numerator / denominator
        })
        .collect()
}

/// Last value of the MACD line, its signal line, and the histogram.
#[must_use]
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<(f64, f64, f64)> {
    if prices.len() < slow + signal {
        return None;
    }
    let fast_ema = ema_series(prices, fast);
    let slow_ema = ema_series(prices, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema_series(&line, signal);

    let macd = *line.last()?;
    let signal = *signal_line.last()?;
    Some((macd, signal, macd - signal))
}

/// Bollinger bands `(upper, middle, lower)` over the last `period` prices,
/// using the sample standard deviation.
#[must_use]
pub fn bollinger(prices: &[f64], period: usize, k: f64) -> Option<(f64, f64, f64)> {
    if period < 2 || prices.len() < period {
        return None;
    }
    let window = tail(prices, period);
    let middle = mean(window);
    let variance =
        window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / (period as f64 - 1.0);
    let band = variance.sqrt() * k;
    Some((middle + band, middle, middle - band))
}

/// Simple moving average of the last `period` prices.
#[must_use]
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    (period > 0 && prices.len() >= period).then(|| mean(tail(prices, period)))
}

/// Last value of the exponentially weighted mean, when at least `period`
/// prices exist.
#[must_use]
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    ema_series(prices, period).last().copied()
}

/// Simple and exponential averages over one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingAverage {
    pub period: usize,
    pub sma: f64,
    pub ema: f64,
}

/// SMA and EMA for each of `periods` that has enough prices.
#[must_use]
pub fn moving_averages(prices: &[f64], periods: &[usize]) -> Vec<MovingAverage> {
    periods
        .iter()
        .filter_map(|&period| {
            Some(MovingAverage {
                period,
                sma: sma(prices, period)?,
                ema: ema(prices, period)?,
            })
        })
        .collect()
}

/// Annualized volatility: population standard deviation of the log returns
/// of the last `period + 1` prices.
#[must_use]
pub fn volatility(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }
    let window = tail(prices, period + 1);
    if window.iter().any(|p| *p <= 0.0) {
        return None;
    }
    let returns: Vec<f64> = window.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let avg = mean(&returns);
    let variance = returns.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / returns.len() as f64;
    Some(variance.sqrt() * PERIODS_PER_YEAR.sqrt())
}

/// `(support, resistance)`: lowest low and highest high of the lookback.
#[must_use]
pub fn support_resistance(highs: &[f64], lows: &[f64], lookback: usize) -> Option<(f64, f64)> {
    if lookback == 0 || highs.len() < lookback || lows.len() < lookback {
        return None;
    }
    let support = tail(lows, lookback).iter().copied().fold(f64::INFINITY, f64::min);
    let resistance = tail(highs, lookback)
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    Some((support, resistance))
}

/// Trend strength in `[0, 1]` from the least-squares slope of the last
/// `period` prices, normalized by their mean.
#[must_use]
pub fn trend_strength(prices: &[f64], period: usize) -> f64 {
    if period < 2 || prices.len() < period {
        return 0.0;
    }
    let window = tail(prices, period);
    let n = window.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(window);
    if y_mean == 0.0 {
        return 0.0;
    }

    let (cov, var) = window
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (i, y)| {
            let dx = i as f64 - x_mean;
            (cov + dx * (y - y_mean), var + dx * dx)
        });
    let slope = cov / var;
    ((slope / y_mean).abs() * 1000.0).min(1.0)
}

/// Classify the latest volume against the mean of the last `period`.
#[must_use]
pub fn volume_profile(volumes: &[f64], period: usize) -> VolumeProfile {
    if period == 0 || volumes.len() < period {
        return VolumeProfile::Unknown;
    }
    let avg = mean(tail(volumes, period));
    let Some(current) = volumes.last() else {
        return VolumeProfile::Unknown;
    };
    if avg <= 0.0 {
        return VolumeProfile::Low;
    }
    let ratio = current / avg;
    if ratio > 1.5 {
        VolumeProfile::High
    } else if ratio > 0.8 {
        VolumeProfile::Medium
    } else {
        VolumeProfile::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rsi_needs_period_plus_one() {
        assert_eq!(rsi(&[1.0; 14], 14), None);
        assert!(rsi(&[1.0; 15], 14).is_some());
    }

    #[test]
    fn rsi_is_100_without_losses() {
        let prices: Vec<f64> = (0..20).map(f64::from).collect();
        assert_eq!(rsi(&prices, 14), Some(100.0));
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        let prices: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        assert!(close(rsi(&prices, 14).unwrap(), 50.0));
    }

    #[test]
    fn rsi_only_uses_last_period() {
        let mut prices: Vec<f64> = (0..30).rev().map(f64::from).collect();
        prices.extend((0..15).map(|i| 100.0 + f64::from(i)));
        assert_eq!(rsi(&prices, 14), Some(100.0));
    }

    #[test]
    fn ema_series_is_bias_adjusted() {
        let ema = ema_series(&[1.0, 2.0], 3);
        assert!(close(ema[0], 1.0));
        assert!(close(ema[1], 2.5 / 1.5));
    }

    #[test]
    fn ema_of_constant_is_constant() {
        assert!(close(ema(&[7.0; 30], 12).unwrap(), 7.0));
        assert_eq!(ema(&[7.0; 5], 12), None);
    }

    #[test]
    fn macd_requires_slow_plus_signal() {
        assert_eq!(macd(&[1.0; 34], 12, 26, 9), None);
        let (line, signal, hist) = macd(&[5.0; 35], 12, 26, 9).unwrap();
        assert!(close(line, 0.0) && close(signal, 0.0) && close(hist, 0.0));
    }

    #[test]
    fn macd_is_positive_in_uptrend() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + f64::from(i)).collect();
        let (line, signal, hist) = macd(&prices, 12, 26, 9).unwrap();
        assert!(line > 0.0);
        assert!(close(hist, line - signal));
    }

    #[test]
    fn bollinger_uses_sample_stdev() {
        let mut prices = vec![0.0; 10];
        prices.extend([1.0, 3.0]);
        let (upper, middle, lower) = bollinger(&prices, 2, 2.0).unwrap();
        assert!(close(middle, 2.0));
        assert!(close(upper, 2.0 + 2.0 * 2f64.sqrt()));
        assert!(close(lower, 2.0 - 2.0 * 2f64.sqrt()));
    }

    #[test]
    fn moving_averages_skip_short_windows() {
        let prices: Vec<f64> = (1..=25).map(f64::from).collect();
        let averages = moving_averages(&prices, &[5, 20, 50]);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].period, 5);
        assert!(close(averages[0].sma, 23.0));
        assert!(averages[0].ema > averages[0].sma - 1.0);
        assert!(close(averages[1].sma, 15.5));
    }

    #[test]
    fn volatility_of_constant_prices_is_zero() {
        assert_eq!(volatility(&[10.0; 21], 20), Some(0.0));
        assert_eq!(volatility(&[10.0; 20], 20), None);
    }

    #[test]
    fn volatility_is_annualized() {
        let prices = [100.0, 110.0, 100.0];
        let r = (1.1f64).ln();
        let expected = r * (365.0f64 * 24.0).sqrt();
        assert!(close(volatility(&prices, 2).unwrap(), expected));
    }

    #[test]
    fn support_and_resistance_from_lookback() {
        let highs = [50.0, 12.0, 13.0, 11.0];
        let lows = [1.0, 9.0, 8.0, 10.0];
        assert_eq!(support_resistance(&highs, &lows, 3), Some((8.0, 13.0)));
        assert_eq!(support_resistance(&highs, &lows, 5), None);
    }

    #[test]
    fn trend_strength_saturates_and_flattens() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + f64::from(i)).collect();
        assert!(close(trend_strength(&rising, 20), 1.0));
        assert_eq!(trend_strength(&[100.0; 20], 20), 0.0);
        assert_eq!(trend_strength(&rising[..10], 20), 0.0);
    }

    #[test]
    fn trend_strength_scales_gentle_slope() {
        let prices: Vec<f64> = (0..20).map(|i| 1000.0 + 0.1 * f64::from(i)).collect();
        let expected = 0.1 / (1000.0 + 0.95) * 1000.0;
        assert!((trend_strength(&prices, 20) - expected).abs() < 1e-6);
    }

    #[test]
    fn volume_profile_thresholds() {
        let mut volumes = vec![1.0; 19];
        volumes.push(5.0);
        assert_eq!(volume_profile(&volumes, 20), VolumeProfile::High);
        assert_eq!(volume_profile(&[1.0; 20], 20), VolumeProfile::Medium);
        let mut quiet = vec![1.0; 19];
        quiet.push(0.1);
        assert_eq!(volume_profile(&quiet, 20), VolumeProfile::Low);
        assert_eq!(volume_profile(&[1.0; 5], 20), VolumeProfile::Unknown);
        assert_eq!(volume_profile(&[0.0; 20], 20), VolumeProfile::Low);
    }
}
