//! Orders placed on the exchange and their local bookkeeping.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, PairId, SignalId};
use super::money::{Price, Volume};

/// Kraken order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
}

impl OrderType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::StopLoss => "stop-loss",
            Self::TakeProfit => "take-profit",
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// The side that unwinds this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Open,
    Closed,
    Canceled,
    Expired,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }

    /// Map a Kraken order status string. Unknown values are treated as open.
    #[must_use]
    pub fn from_exchange(status: &str) -> Self {
        match status {
            "closed" => Self::Closed,
            "canceled" => Self::Canceled,
            "expired" => Self::Expired,
            _ => Self::Open,
        }
    }

    /// True while the order can still fill.
    #[must_use]
    pub const fn is_working(self) -> bool {
        matches!(self, Self::Pending | Self::Open)
    }
}

str_enum_parse!(OrderType, [Market, Limit, StopLoss, TakeProfit]);
str_enum_parse!(OrderSide, [Buy, Sell]);
str_enum_parse!(OrderStatus, [Pending, Open, Closed, Canceled, Expired]);

/// An order as tracked locally.
///
/// Bracket orders are modelled as an entry order plus two protective
/// children (stop-loss and take-profit) that reference the entry through
/// `parent_order_id`. The entry links back through `stop_loss_order_id` and
/// `take_profit_order_id` once they exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Exchange transaction id.
    pub exchange_order_id: Option<String>,
    pub pair_id: PairId,
    pub signal_id: Option<SignalId>,

    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: Volume,
    pub price: Option<Price>,

    pub status: OrderStatus,
    pub filled_amount: Volume,
    pub average_price: Option<Price>,

    pub is_bracket_order: bool,
    pub parent_order_id: Option<OrderId>,
    pub stop_loss_order_id: Option<OrderId>,
    pub take_profit_order_id: Option<OrderId>,

    pub fee: Option<Decimal>,
    pub total_cost: Option<Decimal>,

    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a pending order.
    #[must_use]
    pub fn new(
        pair_id: PairId,
        order_type: OrderType,
        side: OrderSide,
        amount: Volume,
        price: Option<Price>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            exchange_order_id: None,
            pair_id,
            signal_id: None,
            order_type,
            side,
            amount,
            price,
            status: OrderStatus::Pending,
            filled_amount: Decimal::ZERO,
            average_price: None,
            is_bracket_order: false,
            parent_order_id: None,
            stop_loss_order_id: None,
            take_profit_order_id: None,
            fee: None,
            total_cost: None,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
            filled_at: None,
        }
    }

    /// True for stop-loss and take-profit children of a bracket entry.
    #[must_use]
    pub const fn is_protective(&self) -> bool {
        self.parent_order_id.is_some()
    }

    /// True for a bracket entry whose protective orders are not yet placed.
    #[must_use]
    pub const fn awaits_protection(&self) -> bool {
        self.is_bracket_order && self.stop_loss_order_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn exchange_status_mapping() {
        assert_eq!(OrderStatus::from_exchange("pending"), OrderStatus::Open);
        assert_eq!(OrderStatus::from_exchange("open"), OrderStatus::Open);
        assert_eq!(OrderStatus::from_exchange("closed"), OrderStatus::Closed);
        assert_eq!(OrderStatus::from_exchange("canceled"), OrderStatus::Canceled);
        assert_eq!(OrderStatus::from_exchange("expired"), OrderStatus::Expired);
    }

    #[test]
    fn order_type_uses_kraken_names() {
        assert_eq!(OrderType::StopLoss.as_str(), "stop-loss");
        assert_eq!("take-profit".parse::<OrderType>().unwrap(), OrderType::TakeProfit);
    }

    #[test]
    fn new_order_is_pending_and_unfilled() {
        let order = Order::new(
            PairId::new(),
            OrderType::Limit,
            OrderSide::Buy,
            dec!(0.5),
            Some(dec!(100)),
        );
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.filled_amount, Decimal::ZERO);
        assert!(!order.is_protective());
        assert!(!order.awaits_protection());
    }

    #[test]
    fn opposite_side() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }
}
