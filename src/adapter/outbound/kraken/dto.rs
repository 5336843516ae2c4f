//! Kraken REST response types and their conversion into port types.
//!
//! Every response is wrapped in an envelope:
//! ```json
//! {"error": [], "result": {"XXBTZUSD": {...}}}
//! ```
//! Prices and volumes arrive as decimal strings.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::OrderSide;
use crate::error::{ExchangeError, Result};
use crate::port::outbound::exchange::{
    AssetPairInfo, BookLevel, Candle, ExchangeOrder, OrderBook, OrderPlacement, Ticker, Trade,
    TradeBalance,
};

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl Envelope {
    /// Unwrap the result, turning a non-empty error list into an API error.
    pub fn into_result(self) -> Result<Value> {
        if !self.error.is_empty() {
            return Err(ExchangeError::Api(self.error).into());
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
struct AssetPairDto {
    altname: String,
    #[serde(default)]
    wsname: Option<String>,
    base: String,
    quote: String,
    #[serde(default)]
    pair_decimals: Option<u32>,
    #[serde(default)]
    lot_decimals: Option<u32>,
    #[serde(default)]
    ordermin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerDto {
    c: Vec<String>,
    #[serde(default)]
    b: Vec<String>,
    #[serde(default)]
    a: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DepthDto {
    #[serde(default)]
    bids: Vec<Vec<Value>>,
    #[serde(default)]
    asks: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct TradeBalanceDto {
    #[serde(default)]
    eb: Option<String>,
    #[serde(default)]
    tb: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OrderDescrDto {
    #[serde(default)]
    pair: Option<String>,
    #[serde(default, rename = "type")]
    side: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderInfoDto {
    status: String,
    #[serde(default)]
    descr: OrderDescrDto,
    #[serde(default)]
    vol: Option<String>,
    #[serde(default)]
    vol_exec: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    fee: Option<String>,
    #[serde(default)]
    cost: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenOrdersDto {
    #[serde(default)]
    open: HashMap<String, OrderInfoDto>,
}

#[derive(Debug, Deserialize)]
struct ClosedOrdersDto {
    #[serde(default)]
    closed: HashMap<String, OrderInfoDto>,
}

#[derive(Debug, Deserialize)]
struct AddOrderDto {
    #[serde(default)]
    txid: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CountDto {
    #[serde(default)]
    count: u32,
}

fn invalid(endpoint: &'static str, reason: impl Into<String>) -> crate::error::Error {
    ExchangeError::InvalidResponse {
        endpoint,
        reason: reason.into(),
    }
    .into()
}

fn from_value<T: serde::de::DeserializeOwned>(endpoint: &'static str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| invalid(endpoint, e.to_string()))
}

/// Parse a decimal string as sent by Kraken.
pub fn parse_decimal(endpoint: &'static str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| invalid(endpoint, format!("bad decimal {raw:?}: {e}")))
}

fn parse_optional(endpoint: &'static str, raw: Option<&str>) -> Result<Option<Decimal>> {
    raw.map(|r| parse_decimal(endpoint, r)).transpose()
}

fn value_decimal(endpoint: &'static str, value: &Value) -> Result<Decimal> {
    match value {
        Value::String(s) => parse_decimal(endpoint, s),
        Value::Number(n) => parse_decimal(endpoint, &n.to_string()),
        other => Err(invalid(endpoint, format!("expected number, got {other}"))),
    }
}

fn value_timestamp(endpoint: &'static str, value: &Value) -> Result<DateTime<Utc>> {
    let secs = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| invalid(endpoint, format!("bad timestamp {value}")))?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| invalid(endpoint, "timestamp out of range"))
}

fn result_map(endpoint: &'static str, result: Value) -> Result<serde_json::Map<String, Value>> {
    match result {
        Value::Object(map) => Ok(map),
        other => Err(invalid(endpoint, format!("expected object, got {other}"))),
    }
}

/// Pick the entry for `symbol` from a result keyed by canonical pair name.
///
/// Falls back to the only entry when the key differs from the request.
pub fn entry_for<'a>(
    map: &'a serde_json::Map<String, Value>,
    symbol: &str,
) -> Option<(&'a String, &'a Value)> {
    map.get_key_value(symbol).or_else(|| {
        let mut pairs = map.iter().filter(|(k, _)| k.as_str() != "last");
        match (pairs.next(), pairs.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    })
}

pub fn asset_pairs(result: Value) -> Result<HashMap<String, AssetPairInfo>> {
    const ENDPOINT: &str = "AssetPairs";
    let map = result_map(ENDPOINT, result)?;
    let mut pairs = HashMap::with_capacity(map.len());
    for (name, raw) in map {
        let dto: AssetPairDto = from_value(ENDPOINT, raw.clone())?;
        let info = AssetPairInfo {
            name: name.clone(),
            altname: dto.altname,
            wsname: dto.wsname,
            base: dto.base,
            quote: dto.quote,
            ordermin: parse_optional(ENDPOINT, dto.ordermin.as_deref())?,
            pair_decimals: dto.pair_decimals,
            lot_decimals: dto.lot_decimals,
            raw,
        };
        pairs.insert(name, info);
    }
    Ok(pairs)
}

pub fn ticker(result: Value, requested: &[String]) -> Result<HashMap<String, Ticker>> {
    const ENDPOINT: &str = "Ticker";
    let map = result_map(ENDPOINT, result)?;

    let mut parsed = HashMap::with_capacity(map.len());
    for (key, raw) in &map {
        let dto: TickerDto = from_value(ENDPOINT, raw.clone())?;
        let last = dto
            .c
            .first()
            .ok_or_else(|| invalid(ENDPOINT, "missing last trade price"))?;
        let ticker = Ticker {
            last: parse_decimal(ENDPOINT, last)?,
            bid: parse_optional(ENDPOINT, dto.b.first().map(String::as_str))?,
            ask: parse_optional(ENDPOINT, dto.a.first().map(String::as_str))?,
        };
        parsed.insert(key.clone(), ticker);
    }

    for symbol in requested {
        if parsed.contains_key(symbol) {
            continue;
        }
        if let Some((key, _)) = entry_for(&map, symbol) {
            if let Some(ticker) = parsed.remove(key) {
                parsed.insert(symbol.clone(), ticker);
            }
        }
    }
    Ok(parsed)
}

pub fn ohlc(result: Value, pair: &str) -> Result<Vec<Candle>> {
    const ENDPOINT: &str = "OHLC";
    let map = result_map(ENDPOINT, result)?;
    let Some((_, rows)) = entry_for(&map, pair) else {
        return Ok(Vec::new());
    };
    let rows = rows
        .as_array()
        .ok_or_else(|| invalid(ENDPOINT, "candles are not an array"))?;

    rows.iter()
        .map(|row| {
            let cols = row
                .as_array()
                .filter(|c| c.len() >= 8)
                .ok_or_else(|| invalid(ENDPOINT, format!("malformed candle {row}")))?;
            Ok(Candle {
                time: value_timestamp(ENDPOINT, &cols[0])?,
                open: value_decimal(ENDPOINT, &cols[1])?,
                high: value_decimal(ENDPOINT, &cols[2])?,
                low: value_decimal(ENDPOINT, &cols[3])?,
                close: value_decimal(ENDPOINT, &cols[4])?,
                vwap: value_decimal(ENDPOINT, &cols[5])?,
                volume: value_decimal(ENDPOINT, &cols[6])?,
                count: cols[7].as_u64().unwrap_or_default(),
            })
        })
        .collect()
}

/// Trade rows are `[price, volume, time, "b"|"s", "m"|"l", misc, trade_id]`.
pub fn trades(result: Value, pair: &str) -> Result<Vec<Trade>> {
    const ENDPOINT: &str = "Trades";
    let map = result_map(ENDPOINT, result)?;
    let Some((_, rows)) = entry_for(&map, pair) else {
        return Ok(Vec::new());
    };
    let rows = rows
        .as_array()
        .ok_or_else(|| invalid(ENDPOINT, "trades are not an array"))?;

    rows.iter()
        .map(|row| {
            let cols = row
                .as_array()
                .filter(|c| c.len() >= 5)
                .ok_or_else(|| invalid(ENDPOINT, format!("malformed trade {row}")))?;
            let side = match cols[3].as_str() {
                Some("b") => OrderSide::Buy,
                Some("s") => OrderSide::Sell,
                _ => return Err(invalid(ENDPOINT, format!("bad trade side {}", cols[3]))),
            };
            Ok(Trade {
                price: value_decimal(ENDPOINT, &cols[0])?,
                volume: value_decimal(ENDPOINT, &cols[1])?,
                time: value_timestamp(ENDPOINT, &cols[2])?,
                side,
                market: cols[4].as_str() == Some("m"),
            })
        })
        .collect()
}

pub fn order_book(result: Value, pair: &str) -> Result<OrderBook> {
    const ENDPOINT: &str = "Depth";
    let map = result_map(ENDPOINT, result)?;
    let Some((_, raw)) = entry_for(&map, pair) else {
        return Ok(OrderBook::default());
    };
    let dto: DepthDto = from_value(ENDPOINT, raw.clone())?;

    let levels = |rows: &[Vec<Value>]| -> Result<Vec<BookLevel>> {
        rows.iter()
            .map(|row| match row.as_slice() {
                [price, volume, ..] => Ok(BookLevel {
                    price: value_decimal(ENDPOINT, price)?,
                    volume: value_decimal(ENDPOINT, volume)?,
                }),
                _ => Err(invalid(ENDPOINT, "malformed book level")),
            })
            .collect()
    };

    Ok(OrderBook {
        bids: levels(&dto.bids)?,
        asks: levels(&dto.asks)?,
    })
}

pub fn balance(result: Value) -> Result<HashMap<String, Decimal>> {
    const ENDPOINT: &str = "Balance";
    let raw: HashMap<String, String> = from_value(ENDPOINT, result)?;
    raw.into_iter()
        .map(|(asset, amount)| Ok((asset, parse_decimal(ENDPOINT, &amount)?)))
        .collect()
}

pub fn trade_balance(result: Value) -> Result<TradeBalance> {
    const ENDPOINT: &str = "TradeBalance";
    let dto: TradeBalanceDto = from_value(ENDPOINT, result)?;
    Ok(TradeBalance {
        equivalent_balance: parse_optional(ENDPOINT, dto.eb.as_deref())?.unwrap_or_default(),
        trade_balance: parse_optional(ENDPOINT, dto.tb.as_deref())?.unwrap_or_default(),
    })
}

fn exchange_order(endpoint: &'static str, txid: String, dto: OrderInfoDto) -> Result<ExchangeOrder> {
    let price = parse_optional(endpoint, dto.price.as_deref())?.filter(|p| !p.is_zero());
    Ok(ExchangeOrder {
        txid,
        status: dto.status,
        pair: dto.descr.pair,
        side: dto.descr.side.as_deref().and_then(|s| OrderSide::from_str(s).ok()),
        volume: parse_optional(endpoint, dto.vol.as_deref())?.unwrap_or_default(),
        volume_executed: parse_optional(endpoint, dto.vol_exec.as_deref())?.unwrap_or_default(),
        price,
        fee: parse_optional(endpoint, dto.fee.as_deref())?.unwrap_or_default(),
        cost: parse_optional(endpoint, dto.cost.as_deref())?.unwrap_or_default(),
    })
}

pub fn open_orders(result: Value) -> Result<Vec<ExchangeOrder>> {
    const ENDPOINT: &str = "OpenOrders";
    let dto: OpenOrdersDto = from_value(ENDPOINT, result)?;
    dto.open
        .into_iter()
        .map(|(txid, info)| exchange_order(ENDPOINT, txid, info))
        .collect()
}

pub fn closed_orders(result: Value) -> Result<Vec<ExchangeOrder>> {
    const ENDPOINT: &str = "ClosedOrders";
    let dto: ClosedOrdersDto = from_value(ENDPOINT, result)?;
    dto.closed
        .into_iter()
        .map(|(txid, info)| exchange_order(ENDPOINT, txid, info))
        .collect()
}

pub fn query_orders(result: Value) -> Result<HashMap<String, ExchangeOrder>> {
    const ENDPOINT: &str = "QueryOrders";
    let dto: HashMap<String, OrderInfoDto> = from_value(ENDPOINT, result)?;
    dto.into_iter()
        .map(|(txid, info)| Ok((txid.clone(), exchange_order(ENDPOINT, txid, info)?)))
        .collect()
}

pub fn add_order(result: Value) -> Result<OrderPlacement> {
    const ENDPOINT: &str = "AddOrder";
    let dto: AddOrderDto = from_value(ENDPOINT, result.clone())?;
    Ok(OrderPlacement {
        txids: dto.txid,
        raw: result,
    })
}

pub fn count(endpoint: &'static str, result: Value) -> Result<u32> {
    let dto: CountDto = from_value(endpoint, result)?;
    Ok(dto.count)
}
