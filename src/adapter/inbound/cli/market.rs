//! Handlers for `market book` and `market trades`.

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::exchange::{BookLevel, OrderBook, Trade};

#[derive(Tabled)]
struct BookRow {
    #[tabled(rename = "Bid Vol")]
    bid_volume: String,
    #[tabled(rename = "Bid")]
    bid: String,
    #[tabled(rename = "Ask")]
    ask: String,
    #[tabled(rename = "Ask Vol")]
    ask_volume: String,
}

#[derive(Tabled)]
struct TradeRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Volume")]
    volume: String,
    #[tabled(rename = "Kind")]
    kind: String,
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        Self {
            time: trade.time.format("%H:%M:%S").to_string(),
            side: trade.side.to_string(),
            price: trade.price.to_string(),
            volume: trade.volume.to_string(),
            kind: if trade.market { "market" } else { "limit" }.into(),
        }
    }
}

/// The newest `limit` trades, newest first.
fn latest(trades: &[Trade], limit: usize) -> Vec<&Trade> {
    trades.iter().rev().take(limit).collect()
}

fn cell(level: Option<&BookLevel>, f: impl Fn(&BookLevel) -> String) -> String {
    level.map_or_else(String::new, f)
}

fn rows(book: &OrderBook) -> Vec<BookRow> {
    let depth = book.bids.len().max(book.asks.len());
    (0..depth)
        .map(|i| {
            let bid = book.bids.get(i);
            let ask = book.asks.get(i);
            BookRow {
                bid_volume: cell(bid, |l| l.volume.to_string()),
                bid: cell(bid, |l| l.price.to_string()),
                ask: cell(ask, |l| l.price.to_string()),
                ask_volume: cell(ask, |l| l.volume.to_string()),
            }
        })
        .collect()
}

fn level_json(levels: &[BookLevel]) -> serde_json::Value {
    levels
        .iter()
        .map(|l| json!({ "price": l.price, "volume": l.volume }))
        .collect()
}

/// Print the order book for one pair.
pub async fn book(config: Config, pair: &str, count: u32) -> Result<()> {
    let exchange = bootstrap::build_exchange(&config);
    let book = exchange.order_book(pair, count).await?;

    if output::is_json() {
        output::json_output(json!({
            "pair": pair,
            "bids": level_json(&book.bids),
            "asks": level_json(&book.asks),
        }));
        return Ok(());
    }

    output::section(&format!("{pair} order book"));
    if let (Some(bid), Some(ask)) = (book.bids.first(), book.asks.first()) {
        output::field("Spread", ask.price - bid.price);
    }
    if book.bids.is_empty() && book.asks.is_empty() {
        output::note("Order book is empty");
        return Ok(());
    }
    output::lines(&Table::new(rows(&book)).to_string());
    Ok(())
}

/// Print the most recent public trades for one pair.
pub async fn trades(config: Config, pair: &str, limit: usize) -> Result<()> {
    let exchange = bootstrap::build_exchange(&config);
    let trades = exchange.recent_trades(pair, None).await?;
    let shown = latest(&trades, limit);

    if output::is_json() {
        let rows: Vec<_> = shown
            .iter()
            .map(|t| {
                json!({
                    "time": t.time,
                    "side": t.side,
                    "price": t.price,
                    "volume": t.volume,
                    "market": t.market,
                })
            })
            .collect();
        output::json_output(json!({ "pair": pair, "trades": rows }));
        return Ok(());
    }

    output::section(&format!("{pair} recent trades"));
    if shown.is_empty() {
        output::note("No recent trades");
        return Ok(());
    }
    let rows: Vec<TradeRow> = shown.into_iter().map(TradeRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: rust_decimal::Decimal, volume: rust_decimal::Decimal) -> BookLevel {
        BookLevel { price, volume }
    }

    #[test]
    fn rows_pad_the_shorter_side() {
        let book = OrderBook {
            bids: vec![level(dec!(99), dec!(1)), level(dec!(98), dec!(2))],
            asks: vec![level(dec!(101), dec!(0.5))],
        };

        let rows = rows(&book);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ask, "101");
        assert_eq!(rows[1].bid, "98");
        assert!(rows[1].ask.is_empty());
    }

    #[test]
    fn latest_trades_come_newest_first() {
        let trades: Vec<Trade> = (1..=5)
            .map(|i| Trade {
                price: rust_decimal::Decimal::from(100 + i),
                volume: dec!(1),
                time: chrono::DateTime::from_timestamp(1_700_000_000 + i, 0).unwrap(),
                side: crate::domain::OrderSide::Buy,
                market: i % 2 == 0,
            })
            .collect();

        let shown = latest(&trades, 2);

        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].price, dec!(105));
        assert_eq!(TradeRow::from(shown[1]).kind, "market");
    }
}
