//! Trading cycle cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often each step of the trading cycle runs, and the pauses between
/// per-pair requests that keep the bot inside exchange rate limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_market_data_secs")]
    pub market_data_secs: u64,
    #[serde(default = "default_signal_generation_secs")]
    pub signal_generation_secs: u64,
    #[serde(default = "default_order_monitoring_secs")]
    pub order_monitoring_secs: u64,
    #[serde(default = "default_portfolio_update_secs")]
    pub portfolio_update_secs: u64,
    /// Delay between two cycles of the run loop.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_pair_pause_ms")]
    pub pair_pause_ms: u64,
    #[serde(default = "default_signal_pause_ms")]
    pub signal_pause_ms: u64,
    #[serde(default = "default_order_pause_ms")]
    pub order_pause_ms: u64,
}

const fn default_market_data_secs() -> u64 {
    60
}

const fn default_signal_generation_secs() -> u64 {
    300
}

const fn default_order_monitoring_secs() -> u64 {
    30
}

const fn default_portfolio_update_secs() -> u64 {
    180
}

const fn default_tick_secs() -> u64 {
    30
}

const fn default_pair_pause_ms() -> u64 {
    500
}

const fn default_signal_pause_ms() -> u64 {
    100
}

const fn default_order_pause_ms() -> u64 {
    1_000
}

impl ScheduleConfig {
    #[must_use]
    pub const fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    #[must_use]
    pub const fn pair_pause(&self) -> Duration {
        Duration::from_millis(self.pair_pause_ms)
    }

    #[must_use]
    pub const fn signal_pause(&self) -> Duration {
        Duration::from_millis(self.signal_pause_ms)
    }

    #[must_use]
    pub const fn order_pause(&self) -> Duration {
        Duration::from_millis(self.order_pause_ms)
    }

    /// Schedule with every pause removed, for tests and one-shot runs.
    #[must_use]
    pub fn without_pauses(mut self) -> Self {
        self.pair_pause_ms = 0;
        self.signal_pause_ms = 0;
        self.order_pause_ms = 0;
        self
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            market_data_secs: default_market_data_secs(),
            signal_generation_secs: default_signal_generation_secs(),
            order_monitoring_secs: default_order_monitoring_secs(),
            portfolio_update_secs: default_portfolio_update_secs(),
            tick_secs: default_tick_secs(),
            pair_pause_ms: default_pair_pause_ms(),
            signal_pause_ms: default_signal_pause_ms(),
            order_pause_ms: default_order_pause_ms(),
        }
    }
}
