//! Technical analysis thresholds.

use serde::Deserialize;

/// Analysis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Candles required before indicators are computed.
    #[serde(default = "default_min_data_points")]
    pub min_data_points: usize,
    /// Analyzed candles required before a signal is considered.
    #[serde(default = "default_min_signal_rows")]
    pub min_signal_rows: usize,
    /// Signals below this confidence are discarded.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_time_horizon_minutes")]
    pub time_horizon_minutes: u32,
    /// Lifetime of a stored signal.
    #[serde(default = "default_signal_ttl_minutes")]
    pub signal_ttl_minutes: i64,
}

const fn default_min_data_points() -> usize {
    50
}

const fn default_min_signal_rows() -> usize {
    20
}

const fn default_min_confidence() -> f64 {
    0.6
}

const fn default_time_horizon_minutes() -> u32 {
    60
}

const fn default_signal_ttl_minutes() -> i64 {
    120
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_data_points: default_min_data_points(),
            min_signal_rows: default_min_signal_rows(),
            min_confidence: default_min_confidence(),
            time_horizon_minutes: default_time_horizon_minutes(),
            signal_ttl_minutes: default_signal_ttl_minutes(),
        }
    }
}
