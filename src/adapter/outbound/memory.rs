//! In-memory [`TradingStore`] backed by maps behind a lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    CandleId, CryptoPair, Indicators, MarketData, Order, OrderId, OrderStatus, PairId, Portfolio,
    Position, PositionId, TradingSignal,
};
use crate::error::Result;
use crate::port::outbound::store::TradingStore;

#[derive(Default)]
struct Tables {
    pairs: HashMap<PairId, CryptoPair>,
    candles: Vec<MarketData>,
    signals: Vec<TradingSignal>,
    orders: HashMap<OrderId, Order>,
    positions: HashMap<PositionId, Position>,
    portfolios: Vec<Portfolio>,
}

/// Store that keeps everything in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest<T: Clone>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> DateTime<Utc>,
    limit: usize,
) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items.truncate(limit);
    items
}

#[async_trait]
impl TradingStore for MemoryStore {
    async fn save_pair(&self, pair: &CryptoPair) -> Result<()> {
        self.tables.write().pairs.insert(pair.id, pair.clone());
        Ok(())
    }

    async fn pair(&self, id: PairId) -> Result<Option<CryptoPair>> {
        Ok(self.tables.read().pairs.get(&id).cloned())
    }

    async fn pair_by_symbol(&self, symbol: &str) -> Result<Option<CryptoPair>> {
        Ok(self
            .tables
            .read()
            .pairs
            .values()
            .find(|p| p.symbol == symbol)
            .cloned())
    }

    async fn active_pairs(&self) -> Result<Vec<CryptoPair>> {
        let mut pairs: Vec<CryptoPair> = self
            .tables
            .read()
            .pairs
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        pairs.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(pairs)
    }

    async fn insert_candle(&self, candle: &MarketData) -> Result<bool> {
        let mut tables = self.tables.write();
        let exists = tables
            .candles
            .iter()
            .any(|c| c.pair_id == candle.pair_id && c.timestamp == candle.timestamp);
        if !exists {
            tables.candles.push(candle.clone());
        }
        Ok(!exists)
    }

    async fn recent_candles(&self, pair: PairId, limit: usize) -> Result<Vec<MarketData>> {
        let tables = self.tables.read();
        Ok(newest(
            tables.candles.iter().filter(|c| c.pair_id == pair).cloned(),
            |c| c.timestamp,
            limit,
        ))
    }

    async fn recent_analyzed_candles(
        &self,
        pair: PairId,
        limit: usize,
    ) -> Result<Vec<MarketData>> {
        let tables = self.tables.read();
        Ok(newest(
            tables
                .candles
                .iter()
                .filter(|c| c.pair_id == pair && c.indicators.rsi_14.is_some())
                .cloned(),
            |c| c.timestamp,
            limit,
        ))
    }

    async fn update_indicators(&self, candle: CandleId, indicators: &Indicators) -> Result<()> {
        let mut tables = self.tables.write();
        if let Some(row) = tables.candles.iter_mut().find(|c| c.id == candle) {
            row.indicators = indicators.clone();
        }
        Ok(())
    }

    async fn save_signal(&self, signal: &TradingSignal) -> Result<()> {
        let mut tables = self.tables.write();
        tables.signals.retain(|s| s.id != signal.id);
        tables.signals.push(signal.clone());
        Ok(())
    }

    async fn signals_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TradingSignal>> {
        let tables = self.tables.read();
        Ok(newest(
            tables
                .signals
                .iter()
                .filter(|s| s.created_at >= since)
                .cloned(),
            |s| s.created_at,
            limit,
        ))
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        self.tables.write().orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().orders.get(&id).cloned())
    }

    async fn open_exchange_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read();
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Open && o.exchange_order_id.is_some())
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>> {
        let tables = self.tables.read();
        Ok(newest(tables.orders.values().cloned(), |o| o.created_at, limit))
    }

    async fn child_orders(&self, parent: OrderId) -> Result<Vec<Order>> {
        let tables = self.tables.read();
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.parent_order_id == Some(parent))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        self.tables
            .write()
            .positions
            .insert(position.id, position.clone());
        Ok(())
    }

    async fn position(&self, id: PositionId) -> Result<Option<Position>> {
        Ok(self.tables.read().positions.get(&id).cloned())
    }

    async fn position_by_entry_order(&self, entry: OrderId) -> Result<Option<Position>> {
        Ok(self
            .tables
            .read()
            .positions
            .values()
            .find(|p| p.entry_order_id == entry)
            .cloned())
    }

    async fn open_positions(&self) -> Result<Vec<Position>> {
        let tables = self.tables.read();
        let mut positions: Vec<Position> = tables
            .positions
            .values()
            .filter(|p| p.is_open)
            .cloned()
            .collect();
        positions.sort_by_key(|p| p.opened_at);
        Ok(positions)
    }

    async fn all_positions(&self) -> Result<Vec<Position>> {
        let tables = self.tables.read();
        Ok(newest(
            tables.positions.values().cloned(),
            |p| p.opened_at,
            usize::MAX,
        ))
    }

    async fn recent_positions(&self, limit: usize) -> Result<Vec<Position>> {
        let tables = self.tables.read();
        Ok(newest(tables.positions.values().cloned(), |p| p.opened_at, limit))
    }

    async fn latest_portfolio(&self) -> Result<Option<Portfolio>> {
        Ok(self.tables.read().portfolios.last().cloned())
    }

    async fn save_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        let mut tables = self.tables.write();
        match tables.portfolios.iter_mut().find(|p| p.id == portfolio.id) {
            Some(existing) => *existing = portfolio.clone(),
            None => tables.portfolios.push(portfolio.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn candle(pair: PairId, minutes: i64) -> MarketData {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::minutes(minutes);
        MarketData::new(pair, ts, dec!(1), dec!(1), dec!(1), dec!(1), dec!(1))
    }

    #[tokio::test]
    async fn duplicate_candles_are_ignored() {
        let store = MemoryStore::new();
        let pair = PairId::new();
        assert!(store.insert_candle(&candle(pair, 0)).await.unwrap());
        assert!(!store.insert_candle(&candle(pair, 0)).await.unwrap());
        assert_eq!(store.recent_candles(pair, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_candles_are_newest_first() {
        let store = MemoryStore::new();
        let pair = PairId::new();
        for minute in [2, 0, 1] {
            store.insert_candle(&candle(pair, minute)).await.unwrap();
        }
        let recent = store.recent_candles(pair, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].timestamp > recent[1].timestamp);
    }

    #[tokio::test]
    async fn analyzed_candles_require_rsi() {
        let store = MemoryStore::new();
        let pair = PairId::new();
        let first = candle(pair, 0);
        store.insert_candle(&first).await.unwrap();
        store.insert_candle(&candle(pair, 1)).await.unwrap();

        let indicators = Indicators {
            rsi_14: Some(55.0),
            ..Default::default()
        };
        store.update_indicators(first.id, &indicators).await.unwrap();

        let analyzed = store.recent_analyzed_candles(pair, 10).await.unwrap();
        assert_eq!(analyzed.len(), 1);
        assert_eq!(analyzed[0].id, first.id);
    }

    #[tokio::test]
    async fn portfolio_save_replaces_by_id() {
        let store = MemoryStore::new();
        let mut portfolio = Portfolio::default();
        store.save_portfolio(&portfolio).await.unwrap();
        portfolio.is_trading_enabled = false;
        store.save_portfolio(&portfolio).await.unwrap();

        let latest = store.latest_portfolio().await.unwrap().unwrap();
        assert!(!latest.is_trading_enabled);
    }
}
