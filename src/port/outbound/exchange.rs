//! Exchange port for market data and order execution.
//!
//! This module defines the trait the trading services use to talk to an
//! exchange. The Kraken REST client and the paper-trading decorator are the
//! two implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{OrderSide, OrderType, Price, Volume};
use crate::error::Result;

/// Tradable pair description from the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPairInfo {
    /// Canonical pair name, e.g. `XXBTZUSD`.
    pub name: String,
    /// Alternate name, e.g. `XBTUSD`.
    pub altname: String,
    /// Websocket name, e.g. `XBT/USD`.
    pub wsname: Option<String>,
    pub base: String,
    pub quote: String,
    pub ordermin: Option<Volume>,
    pub pair_decimals: Option<u32>,
    pub lot_decimals: Option<u32>,
    /// Raw JSON description, stored as pair metadata.
    pub raw: serde_json::Value,
}

impl AssetPairInfo {
    /// True when `symbol` names this pair under any of its aliases.
    ///
    /// Kraken spells bitcoin `XBT` and dogecoin `XDG`, so `BTCUSD` matches
    /// `XBTUSD`.
    #[must_use]
    pub fn matches(&self, symbol: &str) -> bool {
        let wanted = normalize_symbol(symbol);
        let ws = self.wsname.as_deref().map(|w| w.replace('/', ""));
        let matched = [Some(self.name.as_str()), Some(self.altname.as_str()), ws.as_deref()]
            .into_iter()
            .flatten()
            .any(|alias| normalize_symbol(alias) == wanted);
        matched
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol
        .to_ascii_uppercase()
        .replace("XBT", "BTC")
        .replace("XDG", "DOGE")
}

/// Snapshot of a pair's top of book and last trade.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub last: Price,
    pub bid: Option<Price>,
    pub ask: Option<Price>,
}

/// One OHLC bar as reported by the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub vwap: Price,
    pub volume: Volume,
    pub count: u64,
}

/// One public trade from the exchange's recent trade history.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub price: Price,
    pub volume: Volume,
    pub time: DateTime<Utc>,
    /// Taker side.
    pub side: OrderSide,
    /// True when the taker sent a market order.
    pub market: bool,
}

/// A price level in the order book.
#[derive(Debug, Clone, PartialEq)]
pub struct BookLevel {
    pub price: Price,
    pub volume: Volume,
}

/// Bids (best first) and asks (best first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Margin-account summary in one asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeBalance {
    /// Equivalent balance (all assets).
    pub equivalent_balance: Decimal,
    /// Trade balance (equity available for trading).
    pub trade_balance: Decimal,
}

/// Parameters for a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Exchange pair symbol.
    pub pair: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub volume: Volume,
    /// Limit or trigger price. Ignored for market orders.
    pub price: Option<Price>,
    /// Secondary price for order types that take one.
    pub price2: Option<Price>,
    /// Additional exchange parameters passed through verbatim.
    pub extra: Vec<(String, String)>,
}

impl OrderRequest {
    /// Build a request without secondary price or extra parameters.
    pub fn new(
        pair: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        volume: Volume,
        price: Option<Price>,
    ) -> Self {
        Self {
            pair: pair.into(),
            side,
            order_type,
            volume,
            price,
            price2: None,
            extra: Vec::new(),
        }
    }
}

/// Acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlacement {
    /// Transaction ids assigned by the exchange.
    pub txids: Vec<String>,
    /// Raw response, stored as order metadata.
    pub raw: serde_json::Value,
}

impl OrderPlacement {
    /// First transaction id, if any.
    #[must_use]
    pub fn txid(&self) -> Option<&str> {
        self.txids.first().map(String::as_str)
    }
}

/// Exchange-side view of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeOrder {
    pub txid: String,
    /// Raw status: pending, open, closed, canceled or expired.
    pub status: String,
    pub pair: Option<String>,
    pub side: Option<OrderSide>,
    pub volume: Volume,
    pub volume_executed: Volume,
    /// Average fill price; absent or zero before any fill.
    pub price: Option<Price>,
    pub fee: Decimal,
    pub cost: Decimal,
}

/// Access to a spot exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// All tradable pairs keyed by canonical pair name.
    async fn asset_pairs(&self) -> Result<HashMap<String, AssetPairInfo>>;

    /// Ticker data keyed by requested symbol. Entries that cannot be matched
    /// to a requested symbol keep the exchange's key.
    async fn ticker(&self, pairs: &[String]) -> Result<HashMap<String, Ticker>>;

    /// OHLC bars for one pair, oldest first.
    async fn ohlc(&self, pair: &str, interval: u32, since: Option<i64>) -> Result<Vec<Candle>>;

    /// Recent public trades for one pair, oldest first.
    ///
    /// `since` is the exchange's trade cursor; `None` returns the latest
    /// trades.
    async fn recent_trades(&self, pair: &str, since: Option<i64>) -> Result<Vec<Trade>>;

    /// Order book for one pair.
    async fn order_book(&self, pair: &str, count: u32) -> Result<OrderBook>;

    /// Account balances keyed by asset code.
    async fn balance(&self) -> Result<HashMap<String, Decimal>>;

    /// Trade balance expressed in `asset`.
    async fn trade_balance(&self, asset: &str) -> Result<TradeBalance>;

    /// Orders still working on the exchange.
    async fn open_orders(&self) -> Result<Vec<ExchangeOrder>>;

    /// Orders that are no longer working: filled, cancelled or expired.
    async fn closed_orders(&self) -> Result<Vec<ExchangeOrder>>;

    /// Submit a new order.
    async fn add_order(&self, request: &OrderRequest) -> Result<OrderPlacement>;

    /// Cancel one order by transaction id.
    async fn cancel_order(&self, txid: &str) -> Result<()>;

    /// Cancel every open order. Returns how many were cancelled.
    async fn cancel_all(&self) -> Result<u32>;

    /// Query orders by transaction id, keyed by txid.
    async fn query_orders(&self, txids: &[String]) -> Result<HashMap<String, ExchangeOrder>>;

    /// Exchange name for logging.
    fn exchange_name(&self) -> &'static str;
}
