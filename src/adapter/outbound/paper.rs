//! Paper trading exchange.
//!
//! Wraps a live exchange for market data and simulates order execution
//! locally. Market orders fill at the last traded price; limit, stop-loss
//! and take-profit orders stay open until the last price crosses their
//! trigger and then fill at the trigger price.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::domain::{OrderSide, OrderType, Price};
use crate::error::{ExchangeError, Result};
use crate::port::outbound::exchange::{
    AssetPairInfo, Candle, Exchange, ExchangeOrder, OrderBook, OrderPlacement, OrderRequest,
    Ticker, Trade, TradeBalance,
};

#[derive(Debug, Clone)]
struct PaperOrder {
    request: OrderRequest,
    status: &'static str,
    fill_price: Option<Price>,
}

impl PaperOrder {
    fn to_exchange(&self, txid: &str) -> ExchangeOrder {
        let filled = self.status == "closed";
        let executed = if filled {
            self.request.volume
        } else {
            Decimal::ZERO
        };
        ExchangeOrder {
            txid: txid.to_string(),
            status: self.status.to_string(),
            pair: Some(self.request.pair.clone()),
            side: Some(self.request.side),
            volume: self.request.volume,
            volume_executed: executed,
            price: self.fill_price,
            fee: Decimal::ZERO,
            cost: self.fill_price.map(|p| p * executed).unwrap_or_default(),
        }
    }
}

/// True when `last` has reached the order's trigger price.
fn crossed(order_type: OrderType, side: OrderSide, trigger: Price, last: Price) -> bool {
    match (order_type, side) {
        (OrderType::Market, _) => true,
        (OrderType::Limit | OrderType::TakeProfit, OrderSide::Buy)
        | (OrderType::StopLoss, OrderSide::Sell) => last <= trigger,
        (OrderType::Limit | OrderType::TakeProfit, OrderSide::Sell)
        | (OrderType::StopLoss, OrderSide::Buy) => last >= trigger,
    }
}

/// Dry-run exchange that never sends orders upstream.
pub struct PaperExchange {
    inner: Arc<dyn Exchange>,
    quote_asset: String,
    balance: Decimal,
    /// Simulated orders keyed by txid.
    book: Mutex<HashMap<String, PaperOrder>>,
}

impl PaperExchange {
    pub fn new(inner: Arc<dyn Exchange>, quote_asset: impl Into<String>, balance: Decimal) -> Self {
        Self {
            inner,
            quote_asset: quote_asset.into(),
            balance,
            book: Mutex::new(HashMap::new()),
        }
    }

    async fn last_price(&self, pair: &str) -> Result<Price> {
        let tickers = self.inner.ticker(&[pair.to_string()]).await?;
        tickers
            .get(pair)
            .map(|t| t.last)
            .ok_or_else(|| {
                ExchangeError::InvalidResponse {
                    endpoint: "Ticker",
                    reason: format!("no ticker for {pair}"),
                }
                .into()
            })
    }

    /// Fill every open order whose trigger the market has crossed.
    async fn settle(&self) -> Result<()> {
        let mut pairs: Vec<String> = {
            let book = self.book.lock();
            book.values()
                .filter(|o| o.status == "open")
                .map(|o| o.request.pair.clone())
                .collect()
        };
        pairs.sort();
        pairs.dedup();

        for pair in pairs {
            let last = self.last_price(&pair).await?;
            let mut book = self.book.lock();
            for (txid, order) in book.iter_mut() {
                if order.status != "open" || order.request.pair != pair {
                    continue;
                }
                let trigger = order.request.price.unwrap_or(last);
                if crossed(order.request.order_type, order.request.side, trigger, last) {
                    order.status = "closed";
                    order.fill_price = Some(trigger);
                    info!(txid = %txid, pair = %pair, price = %trigger, "Paper order filled");
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    async fn asset_pairs(&self) -> Result<HashMap<String, AssetPairInfo>> {
        self.inner.asset_pairs().await
    }

    async fn ticker(&self, pairs: &[String]) -> Result<HashMap<String, Ticker>> {
        self.inner.ticker(pairs).await
    }

    async fn ohlc(&self, pair: &str, interval: u32, since: Option<i64>) -> Result<Vec<Candle>> {
        self.inner.ohlc(pair, interval, since).await
    }

    async fn recent_trades(&self, pair: &str, since: Option<i64>) -> Result<Vec<Trade>> {
        self.inner.recent_trades(pair, since).await
    }

    async fn order_book(&self, pair: &str, count: u32) -> Result<OrderBook> {
        self.inner.order_book(pair, count).await
    }

    async fn balance(&self) -> Result<HashMap<String, Decimal>> {
        Ok(HashMap::from([(self.quote_asset.clone(), self.balance)]))
    }

    async fn trade_balance(&self, _asset: &str) -> Result<TradeBalance> {
        Ok(TradeBalance {
            equivalent_balance: self.balance,
            trade_balance: self.balance,
        })
    }

    async fn open_orders(&self) -> Result<Vec<ExchangeOrder>> {
        self.settle().await?;
        let book = self.book.lock();
        Ok(book
            .iter()
            .filter(|(_, o)| o.status == "open")
            .map(|(txid, o)| o.to_exchange(txid))
            .collect())
    }

    async fn closed_orders(&self) -> Result<Vec<ExchangeOrder>> {
        self.settle().await?;
        let book = self.book.lock();
        Ok(book
            .iter()
            .filter(|(_, o)| o.status != "open")
            .map(|(txid, o)| o.to_exchange(txid))
            .collect())
    }

    async fn add_order(&self, request: &OrderRequest) -> Result<OrderPlacement> {
        if request.order_type != OrderType::Market && request.price.is_none() {
            return Err(ExchangeError::Api(vec![
                "EGeneral:Invalid arguments:price".to_string()
            ])
            .into());
        }
        let fill_price = match request.order_type {
            OrderType::Market => Some(self.last_price(&request.pair).await?),
            _ => None,
        };

        // Unique across processes so stored orders never collide.
        let txid = format!("PAPER-{}", Uuid::new_v4().simple());
        self.book.lock().insert(
            txid.clone(),
            PaperOrder {
                request: request.clone(),
                status: if fill_price.is_some() { "closed" } else { "open" },
                fill_price,
            },
        );
        info!(
            txid = %txid,
            pair = %request.pair,
            side = %request.side,
            order_type = %request.order_type,
            volume = %request.volume,
            "Paper order accepted"
        );

        Ok(OrderPlacement {
            txids: vec![txid.clone()],
            raw: serde_json::json!({ "txid": [txid], "paper": true }),
        })
    }

    async fn cancel_order(&self, txid: &str) -> Result<()> {
        let mut book = self.book.lock();
        match book.get_mut(txid) {
            Some(order) if order.status == "open" => {
                order.status = "canceled";
                Ok(())
            }
            _ => Err(ExchangeError::Api(vec!["EOrder:Unknown order".to_string()]).into()),
        }
    }

    async fn cancel_all(&self) -> Result<u32> {
        let mut book = self.book.lock();
        let mut count = 0;
        for order in book.values_mut().filter(|o| o.status == "open") {
            order.status = "canceled";
            count += 1;
        }
        Ok(count)
    }

    async fn query_orders(&self, txids: &[String]) -> Result<HashMap<String, ExchangeOrder>> {
        self.settle().await?;
        let book = self.book.lock();
        Ok(txids
            .iter()
            .filter_map(|txid| {
                book.get(txid)
                    .map(|o| (txid.clone(), o.to_exchange(txid)))
            })
            .collect())
    }

    fn exchange_name(&self) -> &'static str {
        "Paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::outbound::exchange::BookLevel;
    use crate::testkit::exchange::ScriptedExchange;
    use rust_decimal_macros::dec;

    fn paper(market: &Arc<ScriptedExchange>) -> PaperExchange {
        PaperExchange::new(market.clone(), "ZUSD", dec!(10000))
    }

    #[test]
    fn trigger_directions() {
        assert!(crossed(OrderType::StopLoss, OrderSide::Sell, dec!(95), dec!(94)));
        assert!(!crossed(OrderType::StopLoss, OrderSide::Sell, dec!(95), dec!(96)));
        assert!(crossed(OrderType::TakeProfit, OrderSide::Sell, dec!(110), dec!(111)));
        assert!(crossed(OrderType::Limit, OrderSide::Buy, dec!(100), dec!(99)));
        assert!(!crossed(OrderType::Limit, OrderSide::Buy, dec!(100), dec!(101)));
        assert!(crossed(OrderType::StopLoss, OrderSide::Buy, dec!(105), dec!(106)));
    }

    #[tokio::test]
    async fn market_orders_fill_at_last_price() {
        let market = Arc::new(ScriptedExchange::new());
        market.set_price("BTCUSD", dec!(43000));
        let exchange = paper(&market);

        let placement = exchange
            .add_order(&OrderRequest::new(
                "BTCUSD",
                OrderSide::Buy,
                OrderType::Market,
                dec!(0.1),
                None,
            ))
            .await
            .unwrap();
        let txid = placement.txid().unwrap().to_string();

        let orders = exchange.query_orders(&[txid.clone()]).await.unwrap();
        assert_eq!(orders[&txid].status, "closed");
        assert_eq!(orders[&txid].price, Some(dec!(43000)));
        assert!(market.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn stop_loss_fills_once_price_crosses() {
        let market = Arc::new(ScriptedExchange::new());
        market.set_price("ETHUSD", dec!(2000));
        let exchange = paper(&market);

        let placement = exchange
            .add_order(&OrderRequest::new(
                "ETHUSD",
                OrderSide::Sell,
                OrderType::StopLoss,
                dec!(1),
                Some(dec!(1950)),
            ))
            .await
            .unwrap();
        let txid = placement.txid().unwrap().to_string();

        assert_eq!(exchange.open_orders().await.unwrap().len(), 1);

        market.set_price("ETHUSD", dec!(1940));
        let orders = exchange.query_orders(&[txid.clone()]).await.unwrap();
        assert_eq!(orders[&txid].status, "closed");
        assert_eq!(orders[&txid].price, Some(dec!(1950)));
        assert!(exchange.open_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_all_counts_open_orders() {
        let market = Arc::new(ScriptedExchange::new());
        market.set_price("SOLUSD", dec!(100));
        let exchange = paper(&market);
        for price in [dec!(90), dec!(80)] {
            exchange
                .add_order(&OrderRequest::new(
                    "SOLUSD",
                    OrderSide::Buy,
                    OrderType::Limit,
                    dec!(1),
                    Some(price),
                ))
                .await
                .unwrap();
        }
        assert_eq!(exchange.cancel_all().await.unwrap(), 2);
        assert_eq!(exchange.cancel_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn balance_reports_paper_funds() {
        let market = Arc::new(ScriptedExchange::new());
        let exchange = paper(&market);
        assert_eq!(exchange.balance().await.unwrap()["ZUSD"], dec!(10000));
        assert_eq!(
            exchange.trade_balance("ZUSD").await.unwrap().trade_balance,
            dec!(10000)
        );
    }

    #[tokio::test]
    async fn order_book_passes_through() {
        let market = Arc::new(ScriptedExchange::new());
        market.set_order_book(
            "BTCUSD",
            OrderBook {
                bids: vec![BookLevel { price: dec!(99.5), volume: dec!(1) }],
                asks: vec![BookLevel { price: dec!(100.5), volume: dec!(2) }],
            },
        );
        let book = paper(&market).order_book("BTCUSD", 10).await.unwrap();
        assert_eq!(book.bids[0].price, dec!(99.5));
        assert_eq!(book.asks[0].volume, dec!(2));
    }

    #[tokio::test]
    async fn txids_are_unique_across_instances() {
        let market = Arc::new(ScriptedExchange::new());
        let request =
            OrderRequest::new("BTCUSD", OrderSide::Buy, OrderType::Limit, dec!(1), Some(dec!(90)));

        let first = paper(&market).add_order(&request).await.unwrap();
        let second = paper(&market).add_order(&request).await.unwrap();

        let (first, second) = (first.txid().unwrap(), second.txid().unwrap());
        assert!(first.starts_with("PAPER-"));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn closed_orders_list_filled_and_cancelled() {
        let market = Arc::new(ScriptedExchange::new());
        market.set_price("BTCUSD", dec!(100));
        let exchange = paper(&market);
        let limit = |price| {
            OrderRequest::new("BTCUSD", OrderSide::Buy, OrderType::Limit, dec!(1), Some(price))
        };
        let filled = exchange.add_order(&limit(dec!(99))).await.unwrap();
        let cancelled = exchange.add_order(&limit(dec!(90))).await.unwrap();
        exchange.add_order(&limit(dec!(80))).await.unwrap();
        exchange.cancel_order(cancelled.txid().unwrap()).await.unwrap();
        assert_eq!(exchange.closed_orders().await.unwrap().len(), 1);

        market.set_price("BTCUSD", dec!(98.5));
        let closed = exchange.closed_orders().await.unwrap();
        assert_eq!(closed.len(), 2);
        let fill = closed
            .iter()
            .find(|o| o.txid == filled.txid().unwrap())
            .unwrap();
        assert_eq!(fill.status, "closed");
        assert_eq!(fill.price, Some(dec!(99)));
        assert_eq!(exchange.open_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_trades_pass_through() {
        let market = Arc::new(ScriptedExchange::new());
        market.set_trades(
            "ETHUSD",
            vec![Trade {
                price: dec!(2000),
                volume: dec!(0.5),
                time: chrono::Utc::now(),
                side: OrderSide::Sell,
                market: true,
            }],
        );
        let trades = paper(&market).recent_trades("ETHUSD", None).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, dec!(2000));
        assert!(market.placed_orders().is_empty());
    }
}
