//! Handlers for `positions list|close|stop`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::domain::{PairId, Position, PositionId, Price};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Pair")]
    pair: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Stop")]
    stop: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "P&L")]
    pnl: String,
    #[tabled(rename = "State")]
    state: String,
}

fn row(position: &Position, symbol: &str) -> PositionRow {
    let dash = || "-".to_string();
    let pnl = if position.is_open {
        position.unrealized_pnl
    } else {
        position.realized_pnl
    };
    PositionRow {
        id: position.id.to_string(),
        pair: symbol.to_string(),
        side: position.side.to_string(),
        amount: position.remaining_amount.to_string(),
        entry: position.entry_price.to_string(),
        current: position.current_price.map_or_else(dash, |p| p.to_string()),
        stop: position.stop_loss_price.map_or_else(dash, |p| p.to_string()),
        target: position.take_profit_price.map_or_else(dash, |p| p.to_string()),
        pnl: output::pnl(pnl),
        state: if position.is_open { "open" } else { "closed" }.to_string(),
    }
}

/// List open positions, or every position with `all`.
pub async fn list(config: Config, all: bool) -> Result<()> {
    let store = bootstrap::build_store(&config)?;
    let positions = if all {
        store.all_positions().await?
    } else {
        store.open_positions().await?
    };

    let mut symbols: HashMap<PairId, String> = HashMap::new();
    for position in &positions {
        if !symbols.contains_key(&position.pair_id) {
            let symbol = store
                .pair(position.pair_id)
                .await?
                .map_or_else(|| position.pair_id.to_string(), |pair| pair.symbol);
            symbols.insert(position.pair_id, symbol);
        }
    }

    if output::is_json() {
        let items: Vec<_> = positions
            .iter()
            .map(|p| json!({ "symbol": symbols.get(&p.pair_id), "position": p }))
            .collect();
        output::json_output(json!(items));
        return Ok(());
    }
    if positions.is_empty() {
        output::note(if all { "No positions" } else { "No open positions" });
        return Ok(());
    }

    let rows: Vec<PositionRow> = positions
        .iter()
        .map(|p| row(p, symbols.get(&p.pair_id).map_or("", String::as_str)))
        .collect();
    output::lines(&Table::new(rows).to_string());

    let unrealized: Decimal = positions
        .iter()
        .filter(|p| p.is_open)
        .map(|p| p.unrealized_pnl)
        .sum();
    output::field("Unrealized", output::pnl(unrealized));
    Ok(())
}

/// Close an open position at market.
pub async fn close(config: Config, id: PositionId, reason: &str) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let position = bot.orders().close_position(id, reason).await?;

    if output::is_json() {
        output::json_output(json!({ "command": "positions_close", "position": position }));
        return Ok(());
    }
    output::success(&format!("Closed position {}", output::highlight(position.id)));
    output::field("Realized", output::pnl(position.realized_pnl));
    Ok(())
}

/// Move the stop-loss of an open position.
pub async fn stop(config: Config, id: PositionId, price: Price) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let adjusted = bot.orders().adjust_stop_loss(id, price).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "positions_stop",
            "position_id": id,
            "stop_loss_price": price,
            "adjusted": adjusted,
        }));
        return Ok(());
    }
    if adjusted {
        output::success(&format!("Stop-loss moved to {price}"));
    } else {
        output::warning(&format!("Position {id} is not open or its entry has not filled"));
    }
    Ok(())
}
