//! Handlers for `pairs sync` and `pairs list`.

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::domain::CryptoPair;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct PairRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Min Order")]
    min_order: String,
    #[tabled(rename = "Price dp")]
    price_precision: u32,
    #[tabled(rename = "Volume dp")]
    volume_precision: u32,
}

impl From<&CryptoPair> for PairRow {
    fn from(pair: &CryptoPair) -> Self {
        Self {
            symbol: pair.symbol.clone(),
            name: pair.display_name.clone(),
            min_order: pair.min_order_size.to_string(),
            price_precision: pair.price_precision,
            volume_precision: pair.volume_precision,
        }
    }
}

/// Register configured pairs listed on the exchange.
pub async fn sync(config: Config) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let added = bot.initialize_pairs().await?;

    if output::is_json() {
        output::json_output(json!({ "command": "pairs_sync", "added": added }));
        return Ok(());
    }
    if added == 0 {
        output::note("All configured pairs are already registered");
    } else {
        output::success(&format!("Registered {added} pair(s)"));
    }
    Ok(())
}

/// List stored active pairs.
pub async fn list(config: Config) -> Result<()> {
    let store = bootstrap::build_store(&config)?;
    let pairs = store.active_pairs().await?;

    if output::is_json() {
        output::json_output(serde_json::to_value(&pairs)?);
        return Ok(());
    }
    if pairs.is_empty() {
        output::note("No pairs registered");
        output::hint("run `krakenbot pairs sync` to fetch the configured pairs");
        return Ok(());
    }

    let rows: Vec<PairRow> = pairs.iter().map(PairRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}
