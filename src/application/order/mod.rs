//! Order placement, bracket tracking and position exits.
//!
//! A bracket is an entry limit order plus two protective children placed
//! once the entry fills: a stop-loss and a take-profit limit on the opposite
//! side. The links live on the stored orders, so bracket state survives a
//! restart.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::domain::{
    CryptoPair, Order, OrderId, OrderSide, OrderStatus, OrderType, PairId, Position, PositionId,
    Price, SignalId, TradingSignal, Usd, Volume,
};
use crate::error::{OrderError, Result};
use crate::port::outbound::exchange::{Exchange, ExchangeOrder, OrderRequest};
use crate::port::outbound::store::TradingStore;

/// Status change observed while monitoring an order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub exchange_order_id: String,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub filled_amount: Volume,
    pub average_price: Option<Price>,
}

/// Places orders on the exchange and keeps the local order and position
/// records in step with them.
pub struct OrderManager {
    exchange: Arc<dyn Exchange>,
    store: Arc<dyn TradingStore>,
    /// Trailing-stop distance as a percent of the entry price.
    trailing_stop_pct: Option<Decimal>,
}

impl OrderManager {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        store: Arc<dyn TradingStore>,
        trailing_stop_pct: Option<Decimal>,
    ) -> Self {
        Self {
            exchange,
            store,
            trailing_stop_pct,
        }
    }

    /// Open a bracket position for `signal` worth `size_usd`.
    ///
    /// Places the entry limit order and records the position. Protective
    /// orders follow once the entry fills (see [`Self::monitor_orders`]).
    pub async fn create_bracket_order(
        &self,
        signal: &TradingSignal,
        size_usd: Usd,
    ) -> Result<Position> {
        let pair = self.pair(signal.pair_id).await?;
        if signal.entry_price <= Decimal::ZERO {
            return Err(OrderError::Rejected(format!(
                "entry price must be positive, got {}",
                signal.entry_price
            ))
            .into());
        }

        let amount = pair.round_volume(size_usd / signal.entry_price);
        if amount < pair.min_order_size {
            return Err(OrderError::BelowMinimum {
                amount,
                minimum: pair.min_order_size,
            }
            .into());
        }

        let side = if signal.signal_type.is_buy() {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };

        let mut entry = Order::new(
            pair.id,
            OrderType::Limit,
            side,
            amount,
            Some(signal.entry_price),
        );
        entry.signal_id = Some(signal.id);
        entry.is_bracket_order = true;
        let entry = self.submit(&pair, entry).await?;

        let mut position = Position::open(
            pair.id,
            entry.id,
            side.into(),
            amount,
            signal.entry_price,
            signal.strategy_type,
        );
        position.signal_id = Some(signal.id);
        position.stop_loss_price = Some(signal.stop_loss_price);
        position.take_profit_price = Some(signal.target_price);
        position.trailing_stop_distance = self
            .trailing_stop_pct
            .map(|pct| pair.round_price(signal.entry_price * pct / Decimal::ONE_HUNDRED));
        self.store.save_position(&position).await?;

        info!(
            pair = %pair.symbol,
            side = %side,
            amount = %amount,
            entry = %signal.entry_price,
            stop = %signal.stop_loss_price,
            target = %signal.target_price,
            position_id = %position.id,
            "Bracket order created"
        );
        Ok(position)
    }

    /// Submit an order for a stored pair and record it as open.
    pub async fn place_order(
        &self,
        pair_id: PairId,
        signal_id: Option<SignalId>,
        order_type: OrderType,
        side: OrderSide,
        amount: Volume,
        price: Option<Price>,
    ) -> Result<Order> {
        let pair = self.pair(pair_id).await?;
        let mut order = Order::new(pair.id, order_type, side, amount, price);
        order.signal_id = signal_id;
        self.submit(&pair, order).await
    }

    /// Reconcile open orders with the exchange.
    ///
    /// Filled bracket entries get their protective orders; a filled
    /// protective order closes its position and cancels its sibling.
    pub async fn monitor_orders(&self) -> Result<Vec<OrderUpdate>> {
        let open = self.store.open_exchange_orders().await?;
        if open.is_empty() {
            return Ok(Vec::new());
        }

        let txids: Vec<String> = open
            .iter()
            .filter_map(|o| o.exchange_order_id.clone())
            .collect();
        let remote = self.exchange.query_orders(&txids).await?;

        let mut updates = Vec::with_capacity(open.len());
        let mut settled: HashSet<OrderId> = HashSet::new();
        for mut order in open {
            if settled.contains(&order.id) {
                continue;
            }
            let Some(txid) = order.exchange_order_id.clone() else {
                continue;
            };
            let Some(state) = remote.get(&txid) else {
                debug!(txid = %txid, "Order missing from exchange response");
                continue;
            };

            let old_status = order.status;
            apply_exchange_state(&mut order, state);
            // A filled entry is stored as closed only once both protective
            // orders exist, so a failed placement is retried next pass.
            if !(order.status == OrderStatus::Closed && order.awaits_protection()) {
                self.store.save_order(&order).await?;
            }

            if order.status != old_status {
                info!(
                    txid = %txid,
                    old = %old_status,
                    new = %order.status,
                    filled = %order.filled_amount,
                    "Order status changed"
                );
            }

            updates.push(OrderUpdate {
                order_id: order.id,
                exchange_order_id: txid,
                old_status,
                new_status: order.status,
                filled_amount: order.filled_amount,
                average_price: order.average_price,
            });

            if let Err(e) = self.settle(&mut order, &mut settled).await {
                error!(order_id = %order.id, error = %e, "Failed to settle order");
            }
        }

        Ok(updates)
    }

    /// Follow-up work for an order whose state just changed.
    async fn settle(&self, order: &mut Order, settled: &mut HashSet<OrderId>) -> Result<()> {
        match order.status {
            OrderStatus::Closed if order.awaits_protection() => self.on_entry_fill(order).await,
            OrderStatus::Closed => {
                if let Some(parent) = order.parent_order_id {
                    if let Some(sibling) = self.on_protective_fill(order, parent).await? {
                        settled.insert(sibling);
                    }
                }
                Ok(())
            }
            OrderStatus::Canceled | OrderStatus::Expired if order.awaits_protection() => {
                self.on_entry_abandoned(order).await
            }
            _ => Ok(()),
        }
    }

    async fn on_entry_fill(&self, entry: &mut Order) -> Result<()> {
        let Some(mut position) = self.store.position_by_entry_order(entry.id).await? else {
            warn!(order_id = %entry.id, "Filled bracket entry has no position");
            return self.store.save_order(entry).await;
        };
        let pair = self.pair(entry.pair_id).await?;

        let fill_price = entry
            .average_price
            .or(entry.price)
            .unwrap_or(position.entry_price);
        let filled = if entry.filled_amount.is_zero() {
            entry.amount
        } else {
            entry.filled_amount
        };

        // Children from an earlier pass that failed halfway are reused.
        let children = self.store.child_orders(entry.id).await?;
        let existing = |order_type: OrderType| {
            children
                .iter()
                .find(|c| c.order_type == order_type && c.status.is_working())
                .map(|c| c.id)
        };
        let exit_side = position.side.exit_side();

        let stop_id = match existing(OrderType::StopLoss) {
            Some(id) => id,
            None => {
                let mut stop = Order::new(
                    pair.id,
                    OrderType::StopLoss,
                    exit_side,
                    filled,
                    position.stop_loss_price,
                );
                stop.parent_order_id = Some(entry.id);
                stop.signal_id = entry.signal_id;
                self.submit(&pair, stop).await?.id
            }
        };

        let take_profit_id = match existing(OrderType::Limit) {
            Some(id) => id,
            None => {
                let mut take_profit = Order::new(
                    pair.id,
                    OrderType::Limit,
                    exit_side,
                    filled,
                    position.take_profit_price,
                );
                take_profit.parent_order_id = Some(entry.id);
                take_profit.signal_id = entry.signal_id;
                self.submit(&pair, take_profit).await?.id
            }
        };

        position.entry_price = fill_price;
        position.current_price = Some(fill_price);
        position.remaining_amount = filled;
        position.total_fees += entry.fee.unwrap_or_default();
        position.updated_at = Utc::now();
        self.store.save_position(&position).await?;

        entry.stop_loss_order_id = Some(stop_id);
        entry.take_profit_order_id = Some(take_profit_id);
        entry.updated_at = Utc::now();
        self.store.save_order(entry).await?;

        info!(
            pair = %pair.symbol,
            position_id = %position.id,
            fill_price = %fill_price,
            amount = %filled,
            "Entry filled, protective orders placed"
        );
        Ok(())
    }

    /// Close the position behind a filled protective order. Returns the
    /// sibling order that was cancelled, if any.
    async fn on_protective_fill(&self, child: &Order, parent: OrderId) -> Result<Option<OrderId>> {
        let Some(mut position) = self
            .store
            .position_by_entry_order(parent)
            .await?
            .filter(|p| p.is_open)
        else {
            return Ok(None);
        };

        let exit_price = child
            .average_price
            .or(child.price)
            .or(position.current_price)
            .unwrap_or(position.entry_price);
        position.total_fees += child.fee.unwrap_or_default();
        position.close(exit_price);
        self.store.save_position(&position).await?;

        info!(
            position_id = %position.id,
            exit_price = %exit_price,
            realized_pnl = %position.realized_pnl,
            exit = %child.order_type,
            "Position closed by protective order"
        );

        let Some(entry) = self.store.order(parent).await? else {
            return Ok(None);
        };
        let sibling = if entry.stop_loss_order_id == Some(child.id) {
            entry.take_profit_order_id
        } else {
            entry.stop_loss_order_id
        };
        match sibling {
            Some(id) => Ok(self.cancel_local(id).await?.then_some(id)),
            None => Ok(None),
        }
    }

    /// A bracket entry that will never fill leaves nothing to protect.
    async fn on_entry_abandoned(&self, entry: &Order) -> Result<()> {
        if let Some(mut position) = self
            .store
            .position_by_entry_order(entry.id)
            .await?
            .filter(|p| p.is_open)
        {
            let price = position.entry_price;
            position.close(price);
            self.store.save_position(&position).await?;
            info!(
                position_id = %position.id,
                status = %entry.status,
                "Entry order ended unfilled, position closed"
            );
        }
        Ok(())
    }

    /// Replace the stop-loss order of an open position.
    ///
    /// Returns `false` when the position is not open or has no stop order
    /// yet (its entry has not filled).
    pub async fn adjust_stop_loss(&self, position_id: PositionId, new_stop: Price) -> Result<bool> {
        let Some(mut position) = self.store.position(position_id).await?.filter(|p| p.is_open)
        else {
            return Ok(false);
        };
        let mut entry = self
            .store
            .order(position.entry_order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(position.entry_order_id))?;
        let Some(current_stop) = entry.stop_loss_order_id else {
            return Ok(false);
        };
        let pair = self.pair(position.pair_id).await?;
        let new_stop = pair.round_price(new_stop);

        // The old stop stays in force until its replacement is accepted.
        let mut stop = Order::new(
            pair.id,
            OrderType::StopLoss,
            position.side.exit_side(),
            position.remaining_amount,
            Some(new_stop),
        );
        stop.parent_order_id = Some(entry.id);
        stop.signal_id = position.signal_id;
        let stop = self.submit(&pair, stop).await?;

        if let Some(mut current) = self.store.order(current_stop).await? {
            if let Some(txid) = current.exchange_order_id.as_deref() {
                if let Err(e) = self.exchange.cancel_order(txid).await {
                    warn!(txid, error = %e, "Failed to cancel old stop, withdrawing replacement");
                    self.cancel_local(stop.id).await?;
                    return Err(e);
                }
            }
            current.status = OrderStatus::Canceled;
            current.updated_at = Utc::now();
            self.store.save_order(&current).await?;
        }

        let previous = position.stop_loss_price;
        position.stop_loss_price = Some(new_stop);
        position.updated_at = Utc::now();
        self.store.save_position(&position).await?;

        entry.stop_loss_order_id = Some(stop.id);
        entry.updated_at = Utc::now();
        self.store.save_order(&entry).await?;

        info!(
            position_id = %position.id,
            old_stop = ?previous,
            new_stop = %new_stop,
            "Stop loss adjusted"
        );
        Ok(true)
    }

    /// Exit an open position with a market order.
    ///
    /// Protective orders are cancelled first. Realized P&L is taken at the
    /// last known price.
    pub async fn close_position(&self, position_id: PositionId, reason: &str) -> Result<Position> {
        let mut position = self
            .store
            .position(position_id)
            .await?
            .filter(|p| p.is_open)
            .ok_or(OrderError::PositionNotFound(position_id))?;
        let pair = self.pair(position.pair_id).await?;

        self.cancel_protective_orders(&position).await?;

        let exit = self
            .place_order(
                pair.id,
                position.signal_id,
                OrderType::Market,
                position.side.exit_side(),
                position.remaining_amount,
                None,
            )
            .await?;

        let exit_price = position.current_price.unwrap_or(position.entry_price);
        position.close(exit_price);
        let mut metadata = match position.metadata.take() {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        metadata.insert("close_reason".into(), json!(reason));
        metadata.insert("close_order_id".into(), json!(exit.id));
        position.metadata = serde_json::Value::Object(metadata);
        self.store.save_position(&position).await?;

        info!(
            pair = %pair.symbol,
            position_id = %position.id,
            reason,
            realized_pnl = %position.realized_pnl,
            "Position closed"
        );
        Ok(position)
    }

    /// Cancel every open order on the exchange and mark local open orders
    /// cancelled.
    pub async fn cancel_all(&self) -> Result<u32> {
        let cancelled = self.exchange.cancel_all().await?;
        for mut order in self.store.open_exchange_orders().await? {
            order.status = OrderStatus::Canceled;
            order.updated_at = Utc::now();
            self.store.save_order(&order).await?;
        }
        info!(cancelled, "Cancelled all open orders");
        Ok(cancelled)
    }

    /// Locally open orders acknowledged by the exchange.
    pub async fn open_orders(&self) -> Result<Vec<Order>> {
        self.store.open_exchange_orders().await
    }

    async fn cancel_protective_orders(&self, position: &Position) -> Result<()> {
        let Some(entry) = self.store.order(position.entry_order_id).await? else {
            return Ok(());
        };
        for id in [entry.stop_loss_order_id, entry.take_profit_order_id]
            .into_iter()
            .flatten()
        {
            self.cancel_local(id).await?;
        }
        Ok(())
    }

    /// Cancel a working order on the exchange and locally. Exchange errors
    /// are logged; returns whether the order was still working.
    async fn cancel_local(&self, id: OrderId) -> Result<bool> {
        let Some(mut order) = self.store.order(id).await? else {
            return Ok(false);
        };
        if !order.status.is_working() {
            return Ok(false);
        }
        if let Some(txid) = order.exchange_order_id.as_deref() {
            if let Err(e) = self.exchange.cancel_order(txid).await {
                warn!(txid, error = %e, "Failed to cancel order");
            }
        }
        order.status = OrderStatus::Canceled;
        order.updated_at = Utc::now();
        self.store.save_order(&order).await?;
        Ok(true)
    }

    async fn submit(&self, pair: &CryptoPair, mut order: Order) -> Result<Order> {
        let price = match order.order_type {
            OrderType::Market => None,
            _ => order.price.map(|p| pair.round_price(p)),
        };
        let request = OrderRequest::new(
            pair.symbol.clone(),
            order.side,
            order.order_type,
            order.amount,
            price,
        );
        let placement = self.exchange.add_order(&request).await.map_err(|e| {
            warn!(
                pair = %pair.symbol,
                order_type = %order.order_type,
                side = %order.side,
                error = %e,
                "Order rejected"
            );
            e
        })?;

        order.price = price;
        order.exchange_order_id = placement.txid().map(String::from);
        order.status = OrderStatus::Open;
        order.metadata = placement.raw;
        order.updated_at = Utc::now();
        self.store.save_order(&order).await?;

        debug!(
            pair = %pair.symbol,
            txid = ?order.exchange_order_id,
            order_type = %order.order_type,
            side = %order.side,
            amount = %order.amount,
            "Order placed"
        );
        Ok(order)
    }

    async fn pair(&self, id: PairId) -> Result<CryptoPair> {
        self.store
            .pair(id)
            .await?
            .ok_or_else(|| OrderError::PairNotFound(id).into())
    }
}

/// Copy the exchange's view of an order onto the local record.
fn apply_exchange_state(order: &mut Order, state: &ExchangeOrder) {
    let now = Utc::now();
    order.status = OrderStatus::from_exchange(&state.status);
    order.filled_amount = state.volume_executed;
    order.average_price = state.price;
    order.fee = Some(state.fee);
    order.total_cost = Some(state.cost);
    order.updated_at = now;
    if order.status == OrderStatus::Closed && order.filled_at.is_none() {
        order.filled_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::{PositionSide, SignalType};
    use crate::error::Error;
    use crate::testkit::domain::{pair, signal};
    use crate::testkit::exchange::ScriptedExchange;
    use rust_decimal_macros::dec;

    struct Harness {
        exchange: Arc<ScriptedExchange>,
        store: Arc<MemoryStore>,
        manager: OrderManager,
        pair: CryptoPair,
    }

    async fn harness(trailing: Option<Decimal>) -> Harness {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryStore::new());
        let pair = pair("BTCUSD");
        store.save_pair(&pair).await.unwrap();
        let manager = OrderManager::new(exchange.clone(), store.clone(), trailing);
        Harness {
            exchange,
            store,
            manager,
            pair,
        }
    }

    async fn open_long(h: &Harness) -> Position {
        let signal = signal(h.pair.id, SignalType::Buy, dec!(100), dec!(110), dec!(95));
        h.manager.create_bracket_order(&signal, dec!(1000)).await.unwrap()
    }

    async fn fill_entry(h: &Harness, price: Decimal) {
        h.exchange.fill(&ScriptedExchange::txid(0), price);
        h.manager.monitor_orders().await.unwrap();
    }

    #[tokio::test]
    async fn bracket_places_entry_and_opens_position() {
        let h = harness(Some(dec!(1))).await;
        let position = open_long(&h).await;

        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.amount, dec!(10));
        assert_eq!(position.stop_loss_price, Some(dec!(95)));
        assert_eq!(position.take_profit_price, Some(dec!(110)));
        assert_eq!(position.trailing_stop_distance, Some(dec!(1)));

        let placed = h.exchange.placed_orders();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].order_type, OrderType::Limit);
        assert_eq!(placed[0].side, OrderSide::Buy);
        assert_eq!(placed[0].price, Some(dec!(100)));

        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        assert!(entry.is_bracket_order);
        assert_eq!(entry.status, OrderStatus::Open);
        assert_eq!(entry.exchange_order_id, Some(ScriptedExchange::txid(0)));
    }

    #[tokio::test]
    async fn bracket_below_minimum_is_rejected() {
        let h = harness(None).await;
        let signal = signal(h.pair.id, SignalType::Buy, dec!(100), dec!(110), dec!(95));

        let err = h.manager.create_bracket_order(&signal, dec!(0.05)).await.unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::BelowMinimum { .. })));
        assert!(h.exchange.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn unknown_pair_is_rejected() {
        let h = harness(None).await;
        let signal = signal(PairId::new(), SignalType::Sell, dec!(100), dec!(90), dec!(105));

        let err = h.manager.create_bracket_order(&signal, dec!(1000)).await.unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::PairNotFound(_))));
    }

    #[tokio::test]
    async fn entry_fill_places_protective_orders() {
        let h = harness(None).await;
        let position = open_long(&h).await;

        h.exchange.fill(&ScriptedExchange::txid(0), dec!(99.5));
        let updates = h.manager.monitor_orders().await.unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].old_status, OrderStatus::Open);
        assert_eq!(updates[0].new_status, OrderStatus::Closed);
        assert_eq!(updates[0].average_price, Some(dec!(99.5)));

        let placed = h.exchange.placed_orders();
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[1].order_type, OrderType::StopLoss);
        assert_eq!(placed[1].side, OrderSide::Sell);
        assert_eq!(placed[1].price, Some(dec!(95)));
        assert_eq!(placed[2].order_type, OrderType::Limit);
        assert_eq!(placed[2].price, Some(dec!(110)));

        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert_eq!(position.entry_price, dec!(99.5));
        assert_eq!(position.remaining_amount, dec!(10));

        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        assert!(entry.filled_at.is_some());
        assert!(entry.stop_loss_order_id.is_some());
        assert!(entry.take_profit_order_id.is_some());
        assert_eq!(h.store.child_orders(entry.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn take_profit_fill_closes_position_and_cancels_stop() {
        let h = harness(None).await;
        let position = open_long(&h).await;
        fill_entry(&h, dec!(99.5)).await;

        h.exchange.fill(&ScriptedExchange::txid(2), dec!(110));
        h.manager.monitor_orders().await.unwrap();

        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert!(!position.is_open);
        assert_eq!(position.realized_pnl, dec!(105));
        assert_eq!(h.exchange.cancelled(), vec![ScriptedExchange::txid(1)]);

        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        let stop = h
            .store
            .order(entry.stop_loss_order_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stop.status, OrderStatus::Canceled);
        assert!(h.store.open_exchange_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_entry_closes_position_flat() {
        let h = harness(None).await;
        let position = open_long(&h).await;

        h.exchange.set_status(&ScriptedExchange::txid(0), "canceled");
        h.manager.monitor_orders().await.unwrap();

        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert!(!position.is_open);
        assert_eq!(position.realized_pnl, Decimal::ZERO);
        assert_eq!(h.exchange.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn adjust_stop_replaces_stop_order() {
        let h = harness(None).await;
        let position = open_long(&h).await;

        assert!(!h.manager.adjust_stop_loss(position.id, dec!(97)).await.unwrap());

        fill_entry(&h, dec!(100)).await;
        assert!(h.manager.adjust_stop_loss(position.id, dec!(97.004)).await.unwrap());

        assert_eq!(h.exchange.cancelled(), vec![ScriptedExchange::txid(1)]);
        let placed = h.exchange.placed_orders();
        assert_eq!(placed[3].order_type, OrderType::StopLoss);
        assert_eq!(placed[3].price, Some(dec!(97.00)));

        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert_eq!(position.stop_loss_price, Some(dec!(97.00)));
        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        let stop = h
            .store
            .order(entry.stop_loss_order_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stop.exchange_order_id, Some(ScriptedExchange::txid(3)));
    }

    #[tokio::test]
    async fn close_position_exits_at_market() {
        let h = harness(None).await;
        let position = open_long(&h).await;
        fill_entry(&h, dec!(100)).await;

        let mut marked = h.store.position(position.id).await.unwrap().unwrap();
        marked.mark(dec!(101.5));
        h.store.save_position(&marked).await.unwrap();

        let closed = h.manager.close_position(position.id, "manual").await.unwrap();
        assert!(!closed.is_open);
        assert_eq!(closed.realized_pnl, dec!(15));
        assert_eq!(closed.metadata["close_reason"], "manual");

        let placed = h.exchange.placed_orders();
        let exit = placed.last().unwrap();
        assert_eq!(exit.order_type, OrderType::Market);
        assert_eq!(exit.side, OrderSide::Sell);
        assert_eq!(exit.price, None);
        assert_eq!(h.exchange.cancelled().len(), 2);

        let err = h.manager.close_position(position.id, "again").await.unwrap_err();
        assert!(matches!(err, Error::Order(OrderError::PositionNotFound(_))));
    }

    #[tokio::test]
    async fn rejected_order_is_not_recorded() {
        let h = harness(None).await;
        h.exchange.reject_orders(true);

        let result = h
            .manager
            .place_order(h.pair.id, None, OrderType::Market, OrderSide::Buy, dec!(1), None)
            .await;
        assert!(result.is_err());
        assert!(h.store.recent_orders(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_all_marks_local_orders() {
        let h = harness(None).await;
        open_long(&h).await;

        assert_eq!(h.manager.cancel_all().await.unwrap(), 1);
        assert!(h.manager.open_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_fill_closes_position_and_cancels_take_profit() {
        let h = harness(None).await;
        let position = open_long(&h).await;
        fill_entry(&h, dec!(100)).await;

        h.exchange.fill(&ScriptedExchange::txid(1), dec!(95));
        let updates = h.manager.monitor_orders().await.unwrap();
        assert!(updates
            .iter()
            .any(|u| u.exchange_order_id == ScriptedExchange::txid(1)
                && u.new_status == OrderStatus::Closed));

        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert!(!position.is_open);
        assert_eq!(position.realized_pnl, dec!(-50));
        assert_eq!(position.current_price, Some(dec!(95)));
        assert_eq!(h.exchange.cancelled(), vec![ScriptedExchange::txid(2)]);

        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        let take_profit = h
            .store
            .order(entry.take_profit_order_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(take_profit.status, OrderStatus::Canceled);
        assert!(h.store.open_exchange_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_bracket_protects_from_above() {
        let h = harness(None).await;
        let signal = signal(h.pair.id, SignalType::Sell, dec!(100), dec!(90), dec!(105));
        let position = h.manager.create_bracket_order(&signal, dec!(1000)).await.unwrap();
        assert_eq!(position.side, PositionSide::Short);
        fill_entry(&h, dec!(100)).await;

        let placed = h.exchange.placed_orders();
        assert_eq!(placed[0].side, OrderSide::Sell);
        assert_eq!(placed[1].order_type, OrderType::StopLoss);
        assert_eq!(placed[1].side, OrderSide::Buy);
        assert_eq!(placed[1].price, Some(dec!(105)));
        assert_eq!(placed[2].order_type, OrderType::Limit);
        assert_eq!(placed[2].side, OrderSide::Buy);
        assert_eq!(placed[2].price, Some(dec!(90)));

        h.exchange.fill(&ScriptedExchange::txid(2), dec!(90));
        h.manager.monitor_orders().await.unwrap();

        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert!(!position.is_open);
        assert_eq!(position.realized_pnl, dec!(100));
        assert_eq!(h.exchange.cancelled(), vec![ScriptedExchange::txid(1)]);
    }

    #[tokio::test]
    async fn rejected_stop_is_retried_on_next_pass() {
        let h = harness(None).await;
        let position = open_long(&h).await;
        h.exchange.reject_order_type(Some(OrderType::StopLoss));

        h.exchange.fill(&ScriptedExchange::txid(0), dec!(99.5));
        h.manager.monitor_orders().await.unwrap();

        assert_eq!(h.exchange.placed_orders().len(), 1);
        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        assert_eq!(entry.status, OrderStatus::Open);
        assert!(entry.awaits_protection());

        h.exchange.reject_order_type(None);
        h.manager.monitor_orders().await.unwrap();

        let placed = h.exchange.placed_orders();
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[1].order_type, OrderType::StopLoss);
        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        assert_eq!(entry.status, OrderStatus::Closed);
        assert!(entry.stop_loss_order_id.is_some());
        assert!(entry.take_profit_order_id.is_some());
        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert_eq!(position.entry_price, dec!(99.5));
    }

    #[tokio::test]
    async fn rejected_take_profit_keeps_placed_stop() {
        let h = harness(None).await;
        let position = open_long(&h).await;
        h.exchange.reject_order_type(Some(OrderType::Limit));

        fill_entry(&h, dec!(100)).await;
        assert_eq!(h.exchange.placed_orders().len(), 2);
        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        assert_eq!(entry.status, OrderStatus::Open);

        h.exchange.reject_order_type(None);
        h.manager.monitor_orders().await.unwrap();

        let placed = h.exchange.placed_orders();
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[2].order_type, OrderType::Limit);
        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        let stop = h
            .store
            .order(entry.stop_loss_order_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stop.exchange_order_id, Some(ScriptedExchange::txid(1)));
        assert_eq!(h.store.child_orders(entry.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_stop_adjustment_keeps_old_stop() {
        let h = harness(None).await;
        let position = open_long(&h).await;
        fill_entry(&h, dec!(100)).await;
        h.exchange.reject_orders(true);

        assert!(h.manager.adjust_stop_loss(position.id, dec!(97)).await.is_err());

        assert!(h.exchange.cancelled().is_empty());
        let position = h.store.position(position.id).await.unwrap().unwrap();
        assert_eq!(position.stop_loss_price, Some(dec!(95)));
        let entry = h.store.order(position.entry_order_id).await.unwrap().unwrap();
        let stop = h
            .store
            .order(entry.stop_loss_order_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stop.status, OrderStatus::Open);
        assert_eq!(stop.exchange_order_id, Some(ScriptedExchange::txid(1)));
    }

    #[tokio::test]
    async fn paper_orders_from_separate_runs_stay_distinct() {
        use crate::adapter::outbound::paper::PaperExchange;

        let market = Arc::new(ScriptedExchange::new());
        market.set_price("BTCUSD", dec!(105));
        let store = Arc::new(MemoryStore::new());
        let pair = pair("BTCUSD");
        store.save_pair(&pair).await.unwrap();
        let run = || {
            let paper = Arc::new(PaperExchange::new(market.clone(), "ZUSD", dec!(10000)));
            OrderManager::new(paper, store.clone(), None)
        };
        let signal = signal(pair.id, SignalType::Buy, dec!(100), dec!(110), dec!(95));

        let first = run().create_bracket_order(&signal, dec!(1000)).await.unwrap();
        let second_run = run();
        let second = second_run.create_bracket_order(&signal, dec!(1000)).await.unwrap();

        let first_entry = store.order(first.entry_order_id).await.unwrap().unwrap();
        let second_entry = store.order(second.entry_order_id).await.unwrap().unwrap();
        assert_ne!(first_entry.exchange_order_id, second_entry.exchange_order_id);

        market.set_price("BTCUSD", dec!(99));
        second_run.monitor_orders().await.unwrap();

        let first_entry = store.order(first.entry_order_id).await.unwrap().unwrap();
        let second_entry = store.order(second.entry_order_id).await.unwrap().unwrap();
        assert_eq!(first_entry.status, OrderStatus::Open);
        assert_eq!(second_entry.status, OrderStatus::Closed);
        assert!(second_entry.stop_loss_order_id.is_some());
    }
}
