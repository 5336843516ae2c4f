//! Trading universe and order sizing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Trading configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Pairs synchronized from the exchange and traded by the bot.
    #[serde(default = "default_target_pairs")]
    pub target_pairs: Vec<String>,
    /// OHLC interval in minutes.
    #[serde(default = "default_ohlc_interval")]
    pub ohlc_interval: u32,
    /// Newest candles stored per market data update.
    #[serde(default = "default_candles_per_update")]
    pub candles_per_update: usize,
    /// Signals executed per cycle, best confidence first.
    #[serde(default = "default_max_signals_per_cycle")]
    pub max_signals_per_cycle: usize,
    /// Smallest position the bot will open, in USD.
    #[serde(default = "default_min_position_usd")]
    pub min_position_usd: Decimal,
    /// Balance asset used for the portfolio total.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    /// Route orders to the paper exchange instead of Kraken.
    #[serde(default)]
    pub dry_run: bool,
    /// Starting quote balance of the paper exchange.
    #[serde(default = "default_paper_balance")]
    pub paper_balance: Decimal,
}

fn default_target_pairs() -> Vec<String> {
    [
        "BTCUSD", "ETHUSD", "ADAUSD", "SOLUSD", "DOTUSD", "MATICUSD", "LINKUSD", "UNIUSD",
        "AAVEUSD", "ALGOUSD",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

const fn default_ohlc_interval() -> u32 {
    1
}

const fn default_candles_per_update() -> usize {
    10
}

const fn default_max_signals_per_cycle() -> usize {
    3
}

fn default_min_position_usd() -> Decimal {
    dec!(50)
}

fn default_quote_asset() -> String {
    "ZUSD".into()
}

fn default_paper_balance() -> Decimal {
    dec!(10000)
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            target_pairs: default_target_pairs(),
            ohlc_interval: default_ohlc_interval(),
            candles_per_update: default_candles_per_update(),
            max_signals_per_cycle: default_max_signals_per_cycle(),
            min_position_usd: default_min_position_usd(),
            quote_asset: default_quote_asset(),
            dry_run: false,
            paper_balance: default_paper_balance(),
        }
    }
}
