//! SQLite trading store implementation.
//!
//! Persists pairs, candles, signals, orders, positions and portfolio
//! snapshots using Diesel over an r2d2 pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

use super::database::connection::{create_pool, run_migrations, DbPool};
use super::database::model::{
    ts, CryptoPairRow, IndicatorChangeset, MarketDataRow, OrderRow, PortfolioRow, PositionRow,
    SignalRow,
};
use super::database::schema::{
    crypto_pairs, market_data, orders, portfolio, positions, trading_signals,
};
use crate::domain::{
    CandleId, CryptoPair, Indicators, MarketData, Order, OrderId, OrderStatus, PairId, Portfolio,
    Position, PositionId, TradingSignal,
};
use crate::error::{Error, Result};
use crate::port::outbound::store::TradingStore;

type Conn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// SQLite-backed [`TradingStore`].
pub struct SqliteStore {
    pool: DbPool,
}

fn db(e: diesel::result::Error) -> Error {
    Error::Database(e.to_string())
}

fn limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

impl SqliteStore {
    /// Wrap an existing pool. Migrations must already have run.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database at `url` and apply migrations.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created or migrations fail.
    pub fn open(url: &str, pool_size: u32) -> Result<Self> {
        let pool = create_pool(url, pool_size)?;
        run_migrations(&pool)?;
        Ok(Self::new(pool))
    }

    fn conn(&self) -> Result<Conn> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }
}

#[async_trait]
impl TradingStore for SqliteStore {
    async fn save_pair(&self, pair: &CryptoPair) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(crypto_pairs::table)
            .values(CryptoPairRow::from(pair))
            .execute(&mut conn)
            .map_err(db)?;
        Ok(())
    }

    async fn pair(&self, id: PairId) -> Result<Option<CryptoPair>> {
        let mut conn = self.conn()?;
        let row: Option<CryptoPairRow> = crypto_pairs::table
            .find(id.to_string())
            .select(CryptoPairRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db)?;
        row.map(CryptoPair::try_from).transpose()
    }

    async fn pair_by_symbol(&self, symbol: &str) -> Result<Option<CryptoPair>> {
        let mut conn = self.conn()?;
        let row: Option<CryptoPairRow> = crypto_pairs::table
            .filter(crypto_pairs::symbol.eq(symbol))
            .select(CryptoPairRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db)?;
        row.map(CryptoPair::try_from).transpose()
    }

    async fn active_pairs(&self) -> Result<Vec<CryptoPair>> {
        let mut conn = self.conn()?;
        let rows: Vec<CryptoPairRow> = crypto_pairs::table
            .filter(crypto_pairs::is_active.eq(true))
            .order(crypto_pairs::symbol.asc())
            .select(CryptoPairRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn insert_candle(&self, candle: &MarketData) -> Result<bool> {
        let mut conn = self.conn()?;
        let inserted = diesel::insert_or_ignore_into(market_data::table)
            .values(MarketDataRow::from(candle))
            .execute(&mut conn)
            .map_err(db)?;
        Ok(inserted > 0)
    }

    async fn recent_candles(&self, pair: PairId, n: usize) -> Result<Vec<MarketData>> {
        let mut conn = self.conn()?;
        let rows: Vec<MarketDataRow> = market_data::table
            .filter(market_data::pair_id.eq(pair.to_string()))
            .order(market_data::timestamp.desc())
            .limit(limit(n))
            .select(MarketDataRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn recent_analyzed_candles(&self, pair: PairId, n: usize) -> Result<Vec<MarketData>> {
        let mut conn = self.conn()?;
        let rows: Vec<MarketDataRow> = market_data::table
            .filter(market_data::pair_id.eq(pair.to_string()))
            .filter(market_data::rsi_14.is_not_null())
            .order(market_data::timestamp.desc())
            .limit(limit(n))
            .select(MarketDataRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn update_indicators(&self, candle: CandleId, indicators: &Indicators) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::update(market_data::table.find(candle.to_string()))
            .set(IndicatorChangeset::from(indicators))
            .execute(&mut conn)
            .map_err(db)?;
        Ok(())
    }

    async fn save_signal(&self, signal: &TradingSignal) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(trading_signals::table)
            .values(SignalRow::from(signal))
            .execute(&mut conn)
            .map_err(db)?;
        Ok(())
    }

    async fn signals_since(&self, since: DateTime<Utc>, n: usize) -> Result<Vec<TradingSignal>> {
        let mut conn = self.conn()?;
        let rows: Vec<SignalRow> = trading_signals::table
            .filter(trading_signals::created_at.ge(ts(since)))
            .order(trading_signals::created_at.desc())
            .limit(limit(n))
            .select(SignalRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(orders::table)
            .values(OrderRow::from(order))
            .execute(&mut conn)
            .map_err(db)?;
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.conn()?;
        let row: Option<OrderRow> = orders::table
            .find(id.to_string())
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db)?;
        row.map(Order::try_from).transpose()
    }

    async fn open_exchange_orders(&self) -> Result<Vec<Order>> {
        let mut conn = self.conn()?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::status.eq(OrderStatus::Open.as_str()))
            .filter(orders::exchange_order_id.is_not_null())
            .order(orders::created_at.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn recent_orders(&self, n: usize) -> Result<Vec<Order>> {
        let mut conn = self.conn()?;
        let rows: Vec<OrderRow> = orders::table
            .order(orders::created_at.desc())
            .limit(limit(n))
            .select(OrderRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn child_orders(&self, parent: OrderId) -> Result<Vec<Order>> {
        let mut conn = self.conn()?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::parent_order_id.eq(parent.to_string()))
            .order(orders::created_at.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn save_position(&self, position: &Position) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(positions::table)
            .values(PositionRow::from(position))
            .execute(&mut conn)
            .map_err(db)?;
        Ok(())
    }

    async fn position(&self, id: PositionId) -> Result<Option<Position>> {
        let mut conn = self.conn()?;
        let row: Option<PositionRow> = positions::table
            .find(id.to_string())
            .select(PositionRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db)?;
        row.map(Position::try_from).transpose()
    }

    async fn position_by_entry_order(&self, entry: OrderId) -> Result<Option<Position>> {
        let mut conn = self.conn()?;
        let row: Option<PositionRow> = positions::table
            .filter(positions::entry_order_id.eq(entry.to_string()))
            .select(PositionRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db)?;
        row.map(Position::try_from).transpose()
    }

    async fn open_positions(&self) -> Result<Vec<Position>> {
        let mut conn = self.conn()?;
        let rows: Vec<PositionRow> = positions::table
            .filter(positions::is_open.eq(true))
            .order(positions::opened_at.asc())
            .select(PositionRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn all_positions(&self) -> Result<Vec<Position>> {
        let mut conn = self.conn()?;
        let rows: Vec<PositionRow> = positions::table
            .order(positions::opened_at.desc())
            .select(PositionRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn recent_positions(&self, n: usize) -> Result<Vec<Position>> {
        let mut conn = self.conn()?;
        let rows: Vec<PositionRow> = positions::table
            .order(positions::opened_at.desc())
            .limit(limit(n))
            .select(PositionRow::as_select())
            .load(&mut conn)
            .map_err(db)?;
        convert(rows)
    }

    async fn latest_portfolio(&self) -> Result<Option<Portfolio>> {
        let mut conn = self.conn()?;
        let row: Option<PortfolioRow> = portfolio::table
            .order(portfolio::last_updated.desc())
            .select(PortfolioRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db)?;
        row.map(Portfolio::try_from).transpose()
    }

    async fn save_portfolio(&self, snapshot: &Portfolio) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(portfolio::table)
            .values(PortfolioRow::from(snapshot))
            .execute(&mut conn)
            .map_err(db)?;
        Ok(())
    }
}
