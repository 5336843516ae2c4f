//! Persistence port for pairs, market data, signals, orders, positions and
//! the portfolio.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    CandleId, CryptoPair, Indicators, MarketData, Order, OrderId, PairId, Portfolio, Position,
    PositionId, TradingSignal,
};
use crate::error::Result;

/// Storage operations used by the trading services.
///
/// `save_*` methods insert or replace by primary key. List methods that take
/// a `limit` return the newest records first.
#[async_trait]
pub trait TradingStore: Send + Sync {
    // Pairs

    async fn save_pair(&self, pair: &CryptoPair) -> Result<()>;

    async fn pair(&self, id: PairId) -> Result<Option<CryptoPair>>;

    async fn pair_by_symbol(&self, symbol: &str) -> Result<Option<CryptoPair>>;

    async fn active_pairs(&self) -> Result<Vec<CryptoPair>>;

    // Market data

    /// Insert a candle unless one already exists for its pair and timestamp.
    /// Returns whether a row was inserted.
    async fn insert_candle(&self, candle: &MarketData) -> Result<bool>;

    async fn recent_candles(&self, pair: PairId, limit: usize) -> Result<Vec<MarketData>>;

    /// Newest candles that already carry an RSI value.
    async fn recent_analyzed_candles(&self, pair: PairId, limit: usize)
        -> Result<Vec<MarketData>>;

    async fn update_indicators(&self, candle: CandleId, indicators: &Indicators) -> Result<()>;

    // Signals

    async fn save_signal(&self, signal: &TradingSignal) -> Result<()>;

    async fn signals_since(&self, since: DateTime<Utc>, limit: usize)
        -> Result<Vec<TradingSignal>>;

    // Orders

    async fn save_order(&self, order: &Order) -> Result<()>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Open orders that were acknowledged by the exchange.
    async fn open_exchange_orders(&self) -> Result<Vec<Order>>;

    async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>>;

    /// Protective orders attached to an entry order.
    async fn child_orders(&self, parent: OrderId) -> Result<Vec<Order>>;

    // Positions

    async fn save_position(&self, position: &Position) -> Result<()>;

    async fn position(&self, id: PositionId) -> Result<Option<Position>>;

    async fn position_by_entry_order(&self, entry: OrderId) -> Result<Option<Position>>;

    async fn open_positions(&self) -> Result<Vec<Position>>;

    /// Every position, newest first.
    async fn all_positions(&self) -> Result<Vec<Position>>;

    async fn recent_positions(&self, limit: usize) -> Result<Vec<Position>>;

    // Portfolio

    async fn latest_portfolio(&self) -> Result<Option<Portfolio>>;

    async fn save_portfolio(&self, portfolio: &Portfolio) -> Result<()>;
}
