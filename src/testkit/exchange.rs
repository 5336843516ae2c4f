//! In-memory [`Exchange`] with scripted market data and order fills.
//!
//! Orders submitted to [`ScriptedExchange`] stay `open` until a test fills,
//! cancels or expires them through the control methods.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{OrderType, Price};
use crate::error::{ExchangeError, Result};
use crate::port::outbound::exchange::{
    AssetPairInfo, Candle, Exchange, ExchangeOrder, OrderBook, OrderPlacement, OrderRequest,
    Ticker, Trade, TradeBalance,
};

#[derive(Default)]
struct State {
    prices: HashMap<String, Price>,
    candles: HashMap<String, Vec<Candle>>,
    trades: HashMap<String, Vec<Trade>>,
    pairs: HashMap<String, AssetPairInfo>,
    books: HashMap<String, OrderBook>,
    balances: HashMap<String, Decimal>,
    trade_balance: TradeBalance,
    orders: HashMap<String, ExchangeOrder>,
    placed: Vec<OrderRequest>,
    cancelled: Vec<String>,
    reject_orders: bool,
    reject_type: Option<OrderType>,
    fail_market_data: bool,
}

/// Scripted exchange for unit and integration tests.
#[derive(Default)]
pub struct ScriptedExchange {
    state: Mutex<State>,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, pair: &str, price: Price) {
        self.state.lock().prices.insert(pair.to_string(), price);
    }

    pub fn set_candles(&self, pair: &str, candles: Vec<Candle>) {
        self.state.lock().candles.insert(pair.to_string(), candles);
    }

    pub fn set_trades(&self, pair: &str, trades: Vec<Trade>) {
        self.state.lock().trades.insert(pair.to_string(), trades);
    }

    pub fn set_order_book(&self, pair: &str, book: OrderBook) {
        self.state.lock().books.insert(pair.to_string(), book);
    }

    /// Register a tradable pair under its canonical name.
    pub fn add_pair(&self, info: AssetPairInfo) {
        self.state.lock().pairs.insert(info.name.clone(), info);
    }

    pub fn set_balance(&self, asset: &str, amount: Decimal) {
        self.state.lock().balances.insert(asset.to_string(), amount);
    }

    pub fn set_trade_balance(&self, trade_balance: Decimal) {
        let mut state = self.state.lock();
        state.trade_balance = TradeBalance {
            equivalent_balance: trade_balance,
            trade_balance,
        };
    }

    /// Make every subsequent `add_order` fail with an API error.
    pub fn reject_orders(&self, reject: bool) {
        self.state.lock().reject_orders = reject;
    }

    /// Reject only orders of `order_type`; `None` accepts every type again.
    pub fn reject_order_type(&self, order_type: Option<OrderType>) {
        self.state.lock().reject_type = order_type;
    }

    /// Make ticker and OHLC requests fail.
    pub fn fail_market_data(&self, fail: bool) {
        self.state.lock().fail_market_data = fail;
    }

    /// Mark an order fully filled at `price`.
    pub fn fill(&self, txid: &str, price: Price) {
        let mut state = self.state.lock();
        if let Some(order) = state.orders.get_mut(txid) {
            order.status = "closed".into();
            order.volume_executed = order.volume;
            order.price = Some(price);
            order.cost = price * order.volume;
        }
    }

    pub fn set_status(&self, txid: &str, status: &str) {
        if let Some(order) = self.state.lock().orders.get_mut(txid) {
            order.status = status.to_string();
        }
    }

    /// Requests accepted so far, in submission order.
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().placed.clone()
    }

    /// Transaction id assigned to the `n`th accepted request.
    pub fn txid(n: usize) -> String {
        format!("OTEST-{:05}", n + 1)
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().cancelled.clone()
    }

    fn market_data_guard(state: &State) -> Result<()> {
        if state.fail_market_data {
            return Err(ExchangeError::Api(vec!["EService:Unavailable".into()]).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn asset_pairs(&self) -> Result<HashMap<String, AssetPairInfo>> {
        Ok(self.state.lock().pairs.clone())
    }

    async fn ticker(&self, pairs: &[String]) -> Result<HashMap<String, Ticker>> {
        let state = self.state.lock();
        Self::market_data_guard(&state)?;
        Ok(state
            .prices
            .iter()
            .filter(|(pair, _)| pairs.is_empty() || pairs.contains(pair))
            .map(|(pair, price)| {
                (
                    pair.clone(),
                    Ticker {
                        last: *price,
                        bid: None,
                        ask: None,
                    },
                )
            })
            .collect())
    }

    async fn ohlc(&self, pair: &str, _interval: u32, _since: Option<i64>) -> Result<Vec<Candle>> {
        let state = self.state.lock();
        Self::market_data_guard(&state)?;
        Ok(state.candles.get(pair).cloned().unwrap_or_default())
    }

    async fn recent_trades(&self, pair: &str, _since: Option<i64>) -> Result<Vec<Trade>> {
        let state = self.state.lock();
        Self::market_data_guard(&state)?;
        Ok(state.trades.get(pair).cloned().unwrap_or_default())
    }

    async fn order_book(&self, pair: &str, count: u32) -> Result<OrderBook> {
        let state = self.state.lock();
        let mut book = state.books.get(pair).cloned().unwrap_or_default();
        book.bids.truncate(count as usize);
        book.asks.truncate(count as usize);
        Ok(book)
    }

    async fn balance(&self) -> Result<HashMap<String, Decimal>> {
        Ok(self.state.lock().balances.clone())
    }

    async fn trade_balance(&self, _asset: &str) -> Result<TradeBalance> {
        Ok(self.state.lock().trade_balance.clone())
    }

    async fn open_orders(&self) -> Result<Vec<ExchangeOrder>> {
        Ok(self
            .state
            .lock()
            .orders
            .values()
            .filter(|o| o.status == "open")
            .cloned()
            .collect())
    }

    async fn closed_orders(&self) -> Result<Vec<ExchangeOrder>> {
        Ok(self
            .state
            .lock()
            .orders
            .values()
            .filter(|o| !matches!(o.status.as_str(), "open" | "pending"))
            .cloned()
            .collect())
    }

    async fn add_order(&self, request: &OrderRequest) -> Result<OrderPlacement> {
        let mut state = self.state.lock();
        if state.reject_orders || state.reject_type == Some(request.order_type) {
            return Err(ExchangeError::Api(vec!["EOrder:Insufficient funds".into()]).into());
        }
        let txid = Self::txid(state.placed.len());
        state.placed.push(request.clone());
        state.orders.insert(
            txid.clone(),
            ExchangeOrder {
                txid: txid.clone(),
                status: "open".into(),
                pair: Some(request.pair.clone()),
                side: Some(request.side),
                volume: request.volume,
                volume_executed: Decimal::ZERO,
                price: None,
                fee: Decimal::ZERO,
                cost: Decimal::ZERO,
            },
        );
        Ok(OrderPlacement {
            txids: vec![txid.clone()],
            raw: serde_json::json!({ "txid": [txid] }),
        })
    }

    async fn cancel_order(&self, txid: &str) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(order) = state.orders.get_mut(txid) {
            order.status = "canceled".into();
        }
        state.cancelled.push(txid.to_string());
        Ok(())
    }

    async fn cancel_all(&self) -> Result<u32> {
        let mut state = self.state.lock();
        let open: Vec<String> = state
            .orders
            .values()
            .filter(|o| o.status == "open")
            .map(|o| o.txid.clone())
            .collect();
        for txid in &open {
            if let Some(order) = state.orders.get_mut(txid) {
                order.status = "canceled".into();
            }
        }
        state.cancelled.extend(open.iter().cloned());
        Ok(u32::try_from(open.len()).unwrap_or(u32::MAX))
    }

    async fn query_orders(&self, txids: &[String]) -> Result<HashMap<String, ExchangeOrder>> {
        let state = self.state.lock();
        Ok(txids
            .iter()
            .filter_map(|txid| state.orders.get(txid).map(|o| (txid.clone(), o.clone())))
            .collect())
    }

    fn exchange_name(&self) -> &'static str {
        "Scripted"
    }
}
