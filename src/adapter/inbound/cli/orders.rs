//! Handlers for `orders open`, `orders closed` and `orders cancel-all`.

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::domain::Order;
use crate::port::outbound::exchange::ExchangeOrder;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Txid")]
    txid: String,
    #[tabled(rename = "Type")]
    order_type: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Role")]
    role: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        let role = if order.is_bracket_order {
            "entry"
        } else if order.parent_order_id.is_some() {
            "protective"
        } else {
            "-"
        };
        Self {
            id: order.id.to_string(),
            txid: order.exchange_order_id.clone().unwrap_or_default(),
            order_type: order.order_type.to_string(),
            side: order.side.to_string(),
            amount: order.amount.to_string(),
            price: order.price.map_or_else(|| "market".into(), |p| p.to_string()),
            role: role.into(),
        }
    }
}

/// List orders still open on the exchange.
pub async fn open(config: Config) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let orders = bot.orders().open_orders().await?;

    if output::is_json() {
        output::json_output(serde_json::to_value(&orders)?);
        return Ok(());
    }
    if orders.is_empty() {
        output::note("No open orders");
        return Ok(());
    }

    let rows: Vec<OrderRow> = orders.iter().map(OrderRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}

#[derive(Tabled)]
struct ClosedRow {
    #[tabled(rename = "Txid")]
    txid: String,
    #[tabled(rename = "Pair")]
    pair: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Filled")]
    filled: String,
    #[tabled(rename = "Avg Price")]
    price: String,
}

impl From<&ExchangeOrder> for ClosedRow {
    fn from(order: &ExchangeOrder) -> Self {
        Self {
            txid: order.txid.clone(),
            pair: order.pair.clone().unwrap_or_default(),
            side: order.side.map(|s| s.to_string()).unwrap_or_default(),
            status: order.status.clone(),
            filled: format!("{}/{}", order.volume_executed, order.volume),
            price: order.price.map_or_else(|| "-".into(), |p| p.to_string()),
        }
    }
}

/// List orders the exchange reports as no longer working.
pub async fn closed(config: Config) -> Result<()> {
    let exchange = bootstrap::build_exchange(&config);
    let orders = exchange.closed_orders().await?;

    if output::is_json() {
        let rows: Vec<_> = orders
            .iter()
            .map(|o| {
                json!({
                    "txid": o.txid,
                    "pair": o.pair,
                    "side": o.side,
                    "status": o.status,
                    "volume": o.volume,
                    "volume_executed": o.volume_executed,
                    "price": o.price,
                    "fee": o.fee,
                })
            })
            .collect();
        output::json_output(json!({ "orders": rows }));
        return Ok(());
    }
    if orders.is_empty() {
        output::note("No closed orders");
        return Ok(());
    }

    let rows: Vec<ClosedRow> = orders.iter().map(ClosedRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}

/// Cancel every open order on the exchange.
pub async fn cancel_all(config: Config) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let cancelled = bot.orders().cancel_all().await?;

    if output::is_json() {
        output::json_output(json!({ "command": "orders_cancel_all", "cancelled": cancelled }));
        return Ok(());
    }
    output::success(&format!("Cancelled {cancelled} order(s)"));
    Ok(())
}
