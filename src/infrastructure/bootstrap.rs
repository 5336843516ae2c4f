//! Composition root: builds the exchange, store and bot from configuration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::outbound::kraken::KrakenClient;
use crate::adapter::outbound::memory::MemoryStore;
use crate::adapter::outbound::paper::PaperExchange;
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::application::bot::TradingBot;
use crate::error::Result;
use crate::infrastructure::config::database::StoreBackend;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::exchange::Exchange;
use crate::port::outbound::store::TradingStore;

/// Build the exchange: Kraken, wrapped in a paper exchange for dry runs.
pub fn build_exchange(config: &Config) -> Arc<dyn Exchange> {
    let kraken = KrakenClient::from_config(&config.kraken);
    if config.trading.dry_run {
        info!(
            balance = %config.trading.paper_balance,
            quote = %config.trading.quote_asset,
            "Dry run: orders are simulated"
        );
        return Arc::new(PaperExchange::new(
            Arc::new(kraken),
            config.trading.quote_asset.clone(),
            config.trading.paper_balance,
        ));
    }
    if !kraken.has_credentials() {
        warn!("Kraken credentials not set; private endpoints will fail");
    }
    Arc::new(kraken)
}

/// Open the configured store, applying migrations for SQLite.
pub fn build_store(config: &Config) -> Result<Arc<dyn TradingStore>> {
    match config.database.backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.database.url, config.database.pool_size)?;
            info!(database = %config.database.url, "Database initialized");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Wire a bot over the configured exchange and store.
pub fn build_bot(config: &Config) -> Result<TradingBot> {
    let store = build_store(config)?;
    let exchange = build_exchange(config);
    Ok(TradingBot::new(exchange, store, config))
}
