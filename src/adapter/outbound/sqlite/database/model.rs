//! Database row types for Diesel ORM and their domain conversions.
//!
//! Money is stored as decimal text, timestamps as RFC 3339 text with
//! microsecond precision (so they sort lexicographically), and JSON blobs
//! as text.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{crypto_pairs, market_data, orders, portfolio, positions, trading_signals};
use crate::domain::{
    CryptoPair, Indicators, MarketData, Order, Portfolio, Position, TradingSignal,
};
use crate::error::{Error, Result};

/// Format a timestamp for storage.
pub fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| Error::Parse(format!("timestamp {raw:?}: {e}")))?
        .with_timezone(&Utc))
}

fn parse<T>(field: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| Error::Parse(format!("{field} {raw:?}: {e}")))
}

fn parse_opt<T>(field: &str, raw: Option<&str>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|r| parse(field, r)).transpose()
}

fn json(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| Error::Parse(e.to_string()))
}

fn count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn uncount(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

fn dec(value: Decimal) -> String {
    value.normalize().to_string()
}

fn dec_opt(value: Option<Decimal>) -> Option<String> {
    value.map(dec)
}

/// Database row for a crypto pair.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = crypto_pairs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CryptoPairRow {
    pub id: String,
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub display_name: String,
    pub is_active: bool,
    pub min_order_size: String,
    pub price_precision: i32,
    pub volume_precision: i32,
    pub metadata: String,
    pub created_at: String,
    pub last_updated: String,
}

impl From<&CryptoPair> for CryptoPairRow {
    fn from(pair: &CryptoPair) -> Self {
        Self {
            id: pair.id.to_string(),
            symbol: pair.symbol.clone(),
            base_asset: pair.base_asset.clone(),
            quote_asset: pair.quote_asset.clone(),
            display_name: pair.display_name.clone(),
            is_active: pair.is_active,
            min_order_size: dec(pair.min_order_size),
            price_precision: count(pair.price_precision),
            volume_precision: count(pair.volume_precision),
            metadata: pair.metadata.to_string(),
            created_at: ts(pair.created_at),
            last_updated: ts(pair.last_updated),
        }
    }
}

impl TryFrom<CryptoPairRow> for CryptoPair {
    type Error = Error;

    fn try_from(row: CryptoPairRow) -> Result<Self> {
        Ok(Self {
            id: parse("id", &row.id)?,
            symbol: row.symbol,
            base_asset: row.base_asset,
            quote_asset: row.quote_asset,
            display_name: row.display_name,
            is_active: row.is_active,
            min_order_size: parse("min_order_size", &row.min_order_size)?,
            price_precision: uncount(row.price_precision),
            volume_precision: uncount(row.volume_precision),
            metadata: json(&row.metadata)?,
            created_at: parse_ts(&row.created_at)?,
            last_updated: parse_ts(&row.last_updated)?,
        })
    }
}

/// Database row for a candle and its indicators.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = market_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketDataRow {
    pub id: String,
    pub pair_id: String,
    pub timestamp: String,
    pub open_price: String,
    pub high_price: String,
    pub low_price: String,
    pub close_price: String,
    pub volume: String,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub created_at: String,
}

/// Indicator columns, for updating an existing candle.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = market_data)]
#[diesel(treat_none_as_null = true)]
pub struct IndicatorChangeset {
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

impl From<&Indicators> for IndicatorChangeset {
    fn from(i: &Indicators) -> Self {
        Self {
            rsi_14: i.rsi_14,
            macd: i.macd,
            macd_signal: i.macd_signal,
            macd_histogram: i.macd_histogram,
            sma_20: i.sma_20,
            sma_50: i.sma_50,
            ema_12: i.ema_12,
            ema_26: i.ema_26,
            bollinger_upper: i.bollinger_upper,
            bollinger_middle: i.bollinger_middle,
            bollinger_lower: i.bollinger_lower,
        }
    }
}

impl From<&MarketData> for MarketDataRow {
    fn from(candle: &MarketData) -> Self {
        let i = &candle.indicators;
        Self {
            id: candle.id.to_string(),
            pair_id: candle.pair_id.to_string(),
            timestamp: ts(candle.timestamp),
            open_price: dec(candle.open_price),
            high_price: dec(candle.high_price),
            low_price: dec(candle.low_price),
            close_price: dec(candle.close_price),
            volume: dec(candle.volume),
            rsi_14: i.rsi_14,
            macd: i.macd,
            macd_signal: i.macd_signal,
            macd_histogram: i.macd_histogram,
            sma_20: i.sma_20,
            sma_50: i.sma_50,
            ema_12: i.ema_12,
            ema_26: i.ema_26,
            bollinger_upper: i.bollinger_upper,
            bollinger_middle: i.bollinger_middle,
            bollinger_lower: i.bollinger_lower,
            created_at: ts(candle.created_at),
        }
    }
}

impl TryFrom<MarketDataRow> for MarketData {
    type Error = Error;

    fn try_from(row: MarketDataRow) -> Result<Self> {
        Ok(Self {
            id: parse("id", &row.id)?,
            pair_id: parse("pair_id", &row.pair_id)?,
            timestamp: parse_ts(&row.timestamp)?,
            open_price: parse("open_price", &row.open_price)?,
            high_price: parse("high_price", &row.high_price)?,
            low_price: parse("low_price", &row.low_price)?,
            close_price: parse("close_price", &row.close_price)?,
            volume: parse("volume", &row.volume)?,
            indicators: Indicators {
                rsi_14: row.rsi_14,
                macd: row.macd,
                macd_signal: row.macd_signal,
                macd_histogram: row.macd_histogram,
                sma_20: row.sma_20,
                sma_50: row.sma_50,
                ema_12: row.ema_12,
                ema_26: row.ema_26,
                bollinger_upper: row.bollinger_upper,
                bollinger_middle: row.bollinger_middle,
                bollinger_lower: row.bollinger_lower,
            },
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

/// Database row for a trading signal.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = trading_signals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SignalRow {
    pub id: String,
    pub pair_id: String,
    pub signal_type: String,
    pub confidence: f64,
    pub entry_price: String,
    pub target_price: String,
    pub stop_loss_price: String,
    pub trend_strength: f64,
    pub volatility: f64,
    pub volume_profile: String,
    pub support_level: Option<String>,
    pub resistance_level: Option<String>,
    pub strategy_type: String,
    pub position_size_recommendation: f64,
    pub time_horizon_minutes: i32,
    pub is_active: bool,
    pub analysis_data: String,
    pub created_at: String,
    pub expires_at: Option<String>,
}

impl From<&TradingSignal> for SignalRow {
    fn from(s: &TradingSignal) -> Self {
        Self {
            id: s.id.to_string(),
            pair_id: s.pair_id.to_string(),
            signal_type: s.signal_type.to_string(),
            confidence: s.confidence,
            entry_price: dec(s.entry_price),
            target_price: dec(s.target_price),
            stop_loss_price: dec(s.stop_loss_price),
            trend_strength: s.trend_strength,
            volatility: s.volatility,
            volume_profile: s.volume_profile.to_string(),
            support_level: dec_opt(s.support_level),
            resistance_level: dec_opt(s.resistance_level),
            strategy_type: s.strategy_type.to_string(),
            position_size_recommendation: s.position_size_recommendation,
            time_horizon_minutes: count(s.time_horizon_minutes),
            is_active: s.is_active,
            analysis_data: s.analysis_data.to_string(),
            created_at: ts(s.created_at),
            expires_at: s.expires_at.map(ts),
        }
    }
}

impl TryFrom<SignalRow> for TradingSignal {
    type Error = Error;

    fn try_from(row: SignalRow) -> Result<Self> {
        Ok(Self {
            id: parse("id", &row.id)?,
            pair_id: parse("pair_id", &row.pair_id)?,
            signal_type: parse("signal_type", &row.signal_type)?,
            confidence: row.confidence,
            entry_price: parse("entry_price", &row.entry_price)?,
            target_price: parse("target_price", &row.target_price)?,
            stop_loss_price: parse("stop_loss_price", &row.stop_loss_price)?,
            trend_strength: row.trend_strength,
            volatility: row.volatility,
            volume_profile: parse("volume_profile", &row.volume_profile)?,
            support_level: parse_opt("support_level", row.support_level.as_deref())?,
            resistance_level: parse_opt("resistance_level", row.resistance_level.as_deref())?,
            strategy_type: parse("strategy_type", &row.strategy_type)?,
            position_size_recommendation: row.position_size_recommendation,
            time_horizon_minutes: uncount(row.time_horizon_minutes),
            is_active: row.is_active,
            analysis_data: json(&row.analysis_data)?,
            created_at: parse_ts(&row.created_at)?,
            expires_at: row.expires_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

/// Database row for an order.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub id: String,
    pub exchange_order_id: Option<String>,
    pub pair_id: String,
    pub signal_id: Option<String>,
    pub order_type: String,
    pub side: String,
    pub amount: String,
    pub price: Option<String>,
    pub status: String,
    pub filled_amount: String,
    pub average_price: Option<String>,
    pub is_bracket_order: bool,
    pub parent_order_id: Option<String>,
    pub stop_loss_order_id: Option<String>,
    pub take_profit_order_id: Option<String>,
    pub fee: Option<String>,
    pub total_cost: Option<String>,
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
    pub filled_at: Option<String>,
}

impl From<&Order> for OrderRow {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id.to_string(),
            exchange_order_id: o.exchange_order_id.clone(),
            pair_id: o.pair_id.to_string(),
            signal_id: o.signal_id.map(|id| id.to_string()),
            order_type: o.order_type.to_string(),
            side: o.side.to_string(),
            amount: dec(o.amount),
            price: dec_opt(o.price),
            status: o.status.to_string(),
            filled_amount: dec(o.filled_amount),
            average_price: dec_opt(o.average_price),
            is_bracket_order: o.is_bracket_order,
            parent_order_id: o.parent_order_id.map(|id| id.to_string()),
            stop_loss_order_id: o.stop_loss_order_id.map(|id| id.to_string()),
            take_profit_order_id: o.take_profit_order_id.map(|id| id.to_string()),
            fee: dec_opt(o.fee),
            total_cost: dec_opt(o.total_cost),
            metadata: o.metadata.to_string(),
            created_at: ts(o.created_at),
            updated_at: ts(o.updated_at),
            filled_at: o.filled_at.map(ts),
        }
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = Error;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Self {
            id: parse("id", &row.id)?,
            exchange_order_id: row.exchange_order_id,
            pair_id: parse("pair_id", &row.pair_id)?,
            signal_id: parse_opt("signal_id", row.signal_id.as_deref())?,
            order_type: parse("order_type", &row.order_type)?,
            side: parse("side", &row.side)?,
            amount: parse("amount", &row.amount)?,
            price: parse_opt("price", row.price.as_deref())?,
            status: parse("status", &row.status)?,
            filled_amount: parse("filled_amount", &row.filled_amount)?,
            average_price: parse_opt("average_price", row.average_price.as_deref())?,
            is_bracket_order: row.is_bracket_order,
            parent_order_id: parse_opt("parent_order_id", row.parent_order_id.as_deref())?,
            stop_loss_order_id: parse_opt("stop_loss_order_id", row.stop_loss_order_id.as_deref())?,
            take_profit_order_id: parse_opt(
                "take_profit_order_id",
                row.take_profit_order_id.as_deref(),
            )?,
            fee: parse_opt("fee", row.fee.as_deref())?,
            total_cost: parse_opt("total_cost", row.total_cost.as_deref())?,
            metadata: json(&row.metadata)?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
            filled_at: row.filled_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

/// Database row for a position.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionRow {
    pub id: String,
    pub pair_id: String,
    pub entry_order_id: String,
    pub signal_id: Option<String>,
    pub side: String,
    pub amount: String,
    pub entry_price: String,
    pub current_price: Option<String>,
    pub unrealized_pnl: String,
    pub realized_pnl: String,
    pub total_fees: String,
    pub stop_loss_price: Option<String>,
    pub take_profit_price: Option<String>,
    pub trailing_stop_distance: Option<String>,
    pub is_open: bool,
    pub partial_fills: i32,
    pub remaining_amount: String,
    pub strategy_type: String,
    pub max_unrealized_pnl: String,
    pub max_unrealized_loss: String,
    pub metadata: String,
    pub opened_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
}

impl From<&Position> for PositionRow {
    fn from(p: &Position) -> Self {
        Self {
            id: p.id.to_string(),
            pair_id: p.pair_id.to_string(),
            entry_order_id: p.entry_order_id.to_string(),
            signal_id: p.signal_id.map(|id| id.to_string()),
            side: p.side.to_string(),
            amount: dec(p.amount),
            entry_price: dec(p.entry_price),
            current_price: dec_opt(p.current_price),
            unrealized_pnl: dec(p.unrealized_pnl),
            realized_pnl: dec(p.realized_pnl),
            total_fees: dec(p.total_fees),
            stop_loss_price: dec_opt(p.stop_loss_price),
            take_profit_price: dec_opt(p.take_profit_price),
            trailing_stop_distance: dec_opt(p.trailing_stop_distance),
            is_open: p.is_open,
            partial_fills: count(p.partial_fills),
            remaining_amount: dec(p.remaining_amount),
            strategy_type: p.strategy_type.to_string(),
            max_unrealized_pnl: dec(p.max_unrealized_pnl),
            max_unrealized_loss: dec(p.max_unrealized_loss),
            metadata: p.metadata.to_string(),
            opened_at: ts(p.opened_at),
            updated_at: ts(p.updated_at),
            closed_at: p.closed_at.map(ts),
        }
    }
}

impl TryFrom<PositionRow> for Position {
    type Error = Error;

    fn try_from(row: PositionRow) -> Result<Self> {
        Ok(Self {
            id: parse("id", &row.id)?,
            pair_id: parse("pair_id", &row.pair_id)?,
            entry_order_id: parse("entry_order_id", &row.entry_order_id)?,
            signal_id: parse_opt("signal_id", row.signal_id.as_deref())?,
            side: parse("side", &row.side)?,
            amount: parse("amount", &row.amount)?,
            entry_price: parse("entry_price", &row.entry_price)?,
            current_price: parse_opt("current_price", row.current_price.as_deref())?,
            unrealized_pnl: parse("unrealized_pnl", &row.unrealized_pnl)?,
            realized_pnl: parse("realized_pnl", &row.realized_pnl)?,
            total_fees: parse("total_fees", &row.total_fees)?,
            stop_loss_price: parse_opt("stop_loss_price", row.stop_loss_price.as_deref())?,
            take_profit_price: parse_opt("take_profit_price", row.take_profit_price.as_deref())?,
            trailing_stop_distance: parse_opt(
                "trailing_stop_distance",
                row.trailing_stop_distance.as_deref(),
            )?,
            is_open: row.is_open,
            partial_fills: uncount(row.partial_fills),
            remaining_amount: parse("remaining_amount", &row.remaining_amount)?,
            strategy_type: parse("strategy_type", &row.strategy_type)?,
            max_unrealized_pnl: parse("max_unrealized_pnl", &row.max_unrealized_pnl)?,
            max_unrealized_loss: parse("max_unrealized_loss", &row.max_unrealized_loss)?,
            metadata: json(&row.metadata)?,
            opened_at: parse_ts(&row.opened_at)?,
            updated_at: parse_ts(&row.updated_at)?,
            closed_at: row.closed_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

/// Database row for a portfolio snapshot.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = portfolio)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PortfolioRow {
    pub id: String,
    pub total_balance_usd: String,
    pub available_balance_usd: String,
    pub locked_balance_usd: String,
    pub total_pnl: String,
    pub daily_pnl: String,
    pub weekly_pnl: String,
    pub monthly_pnl: String,
    pub total_trades: i32,
    pub winning_trades: i32,
    pub losing_trades: i32,
    pub win_rate: String,
    pub average_win: String,
    pub average_loss: String,
    pub profit_factor: String,
    pub max_drawdown: String,
    pub current_drawdown: String,
    pub sharpe_ratio: Option<f64>,
    pub open_positions_count: i32,
    pub total_exposure_usd: String,
    pub max_position_size_pct: String,
    pub max_daily_loss_pct: String,
    pub is_trading_enabled: bool,
    pub last_updated: String,
    pub created_at: String,
}

impl From<&Portfolio> for PortfolioRow {
    fn from(p: &Portfolio) -> Self {
        Self {
            id: p.id.to_string(),
            total_balance_usd: dec(p.total_balance_usd),
            available_balance_usd: dec(p.available_balance_usd),
            locked_balance_usd: dec(p.locked_balance_usd),
            total_pnl: dec(p.total_pnl),
            daily_pnl: dec(p.daily_pnl),
            weekly_pnl: dec(p.weekly_pnl),
            monthly_pnl: dec(p.monthly_pnl),
            total_trades: count(p.total_trades),
            winning_trades: count(p.winning_trades),
            losing_trades: count(p.losing_trades),
            win_rate: dec(p.win_rate),
            average_win: dec(p.average_win),
            average_loss: dec(p.average_loss),
            profit_factor: dec(p.profit_factor),
            max_drawdown: dec(p.max_drawdown),
            current_drawdown: dec(p.current_drawdown),
            sharpe_ratio: p.sharpe_ratio,
            open_positions_count: count(p.open_positions_count),
            total_exposure_usd: dec(p.total_exposure_usd),
            max_position_size_pct: dec(p.max_position_size_pct),
            max_daily_loss_pct: dec(p.max_daily_loss_pct),
            is_trading_enabled: p.is_trading_enabled,
            last_updated: ts(p.last_updated),
            created_at: ts(p.created_at),
        }
    }
}

impl TryFrom<PortfolioRow> for Portfolio {
    type Error = Error;

    fn try_from(row: PortfolioRow) -> Result<Self> {
        Ok(Self {
            id: parse("id", &row.id)?,
            total_balance_usd: parse("total_balance_usd", &row.total_balance_usd)?,
            available_balance_usd: parse("available_balance_usd", &row.available_balance_usd)?,
            locked_balance_usd: parse("locked_balance_usd", &row.locked_balance_usd)?,
            total_pnl: parse("total_pnl", &row.total_pnl)?,
            daily_pnl: parse("daily_pnl", &row.daily_pnl)?,
            weekly_pnl: parse("weekly_pnl", &row.weekly_pnl)?,
            monthly_pnl: parse("monthly_pnl", &row.monthly_pnl)?,
            total_trades: uncount(row.total_trades),
            winning_trades: uncount(row.winning_trades),
            losing_trades: uncount(row.losing_trades),
            win_rate: parse("win_rate", &row.win_rate)?,
            average_win: parse("average_win", &row.average_win)?,
            average_loss: parse("average_loss", &row.average_loss)?,
            profit_factor: parse("profit_factor", &row.profit_factor)?,
            max_drawdown: parse("max_drawdown", &row.max_drawdown)?,
            current_drawdown: parse("current_drawdown", &row.current_drawdown)?,
            sharpe_ratio: row.sharpe_ratio,
            open_positions_count: uncount(row.open_positions_count),
            total_exposure_usd: parse("total_exposure_usd", &row.total_exposure_usd)?,
            max_position_size_pct: parse("max_position_size_pct", &row.max_position_size_pct)?,
            max_daily_loss_pct: parse("max_daily_loss_pct", &row.max_daily_loss_pct)?,
            is_trading_enabled: row.is_trading_enabled,
            last_updated: parse_ts(&row.last_updated)?,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderSide, OrderType, PairId};
    use rust_decimal_macros::dec;

    #[test]
    fn timestamps_sort_as_text() {
        let earlier = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let later = DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap();
        assert!(ts(earlier) < ts(later));
        assert_eq!(ts(earlier), "2023-11-14T22:13:20.000000Z");
    }

    #[test]
    fn order_row_keeps_optional_links() {
        let mut order = Order::new(
            PairId::new(),
            OrderType::StopLoss,
            OrderSide::Sell,
            dec!(0.5),
            Some(dec!(41000.00)),
        );
        order.parent_order_id = Some(crate::domain::OrderId::new());

        let row = OrderRow::from(&order);
        assert_eq!(row.order_type, "stop-loss");
        assert_eq!(row.price.as_deref(), Some("41000"));

        let back = Order::try_from(row).unwrap();
        assert_eq!(back.parent_order_id, order.parent_order_id);
        assert_eq!(back.price, Some(dec!(41000)));
    }
}
