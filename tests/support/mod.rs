#![allow(dead_code)]

pub mod market;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use krakenbot::adapter::outbound::memory::MemoryStore;
use krakenbot::application::bot::TradingBot;
use krakenbot::infrastructure::config::settings::Config;
use krakenbot::testkit::config;
use krakenbot::testkit::domain::asset_pair;
use krakenbot::testkit::exchange::ScriptedExchange;
use rust_decimal_macros::dec;

/// A bot over a scripted exchange and an in-memory store.
pub struct Harness {
    pub exchange: Arc<ScriptedExchange>,
    pub store: Arc<MemoryStore>,
    pub bot: TradingBot,
}

impl Harness {
    /// Bot trading `BTCUSD` with a funded account and Kraken's bitcoin pair
    /// listed.
    pub fn new(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = config::fast();
        config.trading.target_pairs = vec!["BTCUSD".into()];
        configure(&mut config);

        let exchange = Arc::new(ScriptedExchange::new());
        exchange.add_pair(asset_pair("XXBTZUSD", "XBTUSD"));
        exchange.set_balance("ZUSD", dec!(10000));
        exchange.set_trade_balance(dec!(10000));

        let store = Arc::new(MemoryStore::new());
        let bot = TradingBot::new(exchange.clone(), store.clone(), &config);
        Self {
            exchange,
            store,
            bot,
        }
    }
}

/// Write a config file under `dir` that stores data in `dir/bot.db`.
pub fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let db = dir.join("bot.db");
    let contents = format!(
        "[database]\nurl = \"{}\"\npool_size = 2\n\n[logging]\nlevel = \"warn\"\n\n{extra}",
        db.display()
    );
    let path = dir.join("config.toml");
    std::fs::write(&path, contents).expect("write config");
    path
}
