//! Position tracking and P&L.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, PairId, PositionId, SignalId};
use super::money::{Price, Volume};
use super::order::OrderSide;
use super::signal::StrategyType;

/// Direction of exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    /// Side of the order that opens this position.
    #[must_use]
    pub const fn entry_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Side of the orders that reduce this position.
    #[must_use]
    pub const fn exit_side(self) -> OrderSide {
        self.entry_side().opposite()
    }
}

impl From<OrderSide> for PositionSide {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Long,
            OrderSide::Sell => Self::Short,
        }
    }
}

str_enum_parse!(PositionSide, [Long, Short]);

/// A position opened by a bracket entry order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub pair_id: PairId,
    pub entry_order_id: OrderId,
    pub signal_id: Option<SignalId>,

    pub side: PositionSide,
    pub amount: Volume,
    pub entry_price: Price,
    pub current_price: Option<Price>,

    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub total_fees: Decimal,

    pub stop_loss_price: Option<Price>,
    pub take_profit_price: Option<Price>,
    /// Absolute price distance the stop trails behind the market.
    pub trailing_stop_distance: Option<Price>,

    pub is_open: bool,
    pub partial_fills: u32,
    pub remaining_amount: Volume,

    pub strategy_type: StrategyType,
    pub max_unrealized_pnl: Decimal,
    pub max_unrealized_loss: Decimal,

    pub metadata: serde_json::Value,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Open a new position for the given entry order.
    #[must_use]
    pub fn open(
        pair_id: PairId,
        entry_order_id: OrderId,
        side: PositionSide,
        amount: Volume,
        entry_price: Price,
        strategy_type: StrategyType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PositionId::new(),
            pair_id,
            entry_order_id,
            signal_id: None,
            side,
            amount,
            entry_price,
            current_price: None,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            stop_loss_price: None,
            take_profit_price: None,
            trailing_stop_distance: None,
            is_open: true,
            partial_fills: 0,
            remaining_amount: amount,
            strategy_type,
            max_unrealized_pnl: Decimal::ZERO,
            max_unrealized_loss: Decimal::ZERO,
            metadata: serde_json::Value::Null,
            opened_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    /// P&L of the remaining amount if it were closed at `price`.
    #[must_use]
    pub fn pnl_at(&self, price: Price) -> Decimal {
        match self.side {
            PositionSide::Long => (price - self.entry_price) * self.remaining_amount,
            PositionSide::Short => (self.entry_price - price) * self.remaining_amount,
        }
    }

    /// Mark the position to `price`, tracking the best and worst excursion.
    pub fn mark(&mut self, price: Price) {
        let pnl = self.pnl_at(price);
        self.current_price = Some(price);
        self.unrealized_pnl = pnl;
        self.max_unrealized_pnl = self.max_unrealized_pnl.max(pnl);
        self.max_unrealized_loss = self.max_unrealized_loss.min(pnl);
        self.updated_at = Utc::now();
    }

    /// Market value of the remaining amount at the last known price.
    #[must_use]
    pub fn exposure(&self) -> Option<Decimal> {
        self.current_price.map(|p| p * self.remaining_amount)
    }

    /// Close the position at `exit_price`, realizing its P&L net of fees.
    pub fn close(&mut self, exit_price: Price) {
        let now = Utc::now();
        self.realized_pnl += self.pnl_at(exit_price) - self.total_fees;
        self.current_price = Some(exit_price);
        self.unrealized_pnl = Decimal::ZERO;
        self.is_open = false;
        self.closed_at = Some(now);
        self.updated_at = now;
    }

    /// Stop level that trails `price` by the configured distance.
    ///
    /// Returns `None` without a trailing distance or when the new level would
    /// not tighten the current stop.
    #[must_use]
    pub fn trailing_stop_at(&self, price: Price) -> Option<Price> {
        let distance = self.trailing_stop_distance?;
        let current = self.stop_loss_price?;
        match self.side {
            PositionSide::Long => {
                let candidate = price - distance;
                (candidate > current).then_some(candidate)
            }
            PositionSide::Short => {
                let candidate = price + distance;
                (candidate < current).then_some(candidate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long(entry: Decimal, amount: Decimal) -> Position {
        Position::open(
            PairId::new(),
            OrderId::new(),
            PositionSide::Long,
            amount,
            entry,
            StrategyType::Scalp,
        )
    }

    #[test]
    fn long_and_short_pnl() {
        let mut position = long(dec!(100), dec!(2));
        assert_eq!(position.pnl_at(dec!(110)), dec!(20));

        position.side = PositionSide::Short;
        assert_eq!(position.pnl_at(dec!(110)), dec!(-20));
    }

    #[test]
    fn mark_tracks_extremes() {
        let mut position = long(dec!(100), dec!(1));

        position.mark(dec!(105));
        position.mark(dec!(95));
        position.mark(dec!(101));

        assert_eq!(position.unrealized_pnl, dec!(1));
        assert_eq!(position.max_unrealized_pnl, dec!(5));
        assert_eq!(position.max_unrealized_loss, dec!(-5));
        assert_eq!(position.current_price, Some(dec!(101)));
    }

    #[test]
    fn close_realizes_pnl_net_of_fees() {
        let mut position = long(dec!(100), dec!(1));
        position.total_fees = dec!(0.5);
        position.mark(dec!(104));

        position.close(dec!(104));

        assert!(!position.is_open);
        assert_eq!(position.realized_pnl, dec!(3.5));
        assert_eq!(position.unrealized_pnl, Decimal::ZERO);
        assert!(position.closed_at.is_some());
    }

    #[test]
    fn trailing_stop_only_tightens() {
        let mut position = long(dec!(100), dec!(1));
        position.stop_loss_price = Some(dec!(98));
        position.trailing_stop_distance = Some(dec!(2));

        assert_eq!(position.trailing_stop_at(dec!(99)), None);
        assert_eq!(position.trailing_stop_at(dec!(103)), Some(dec!(101)));

        position.side = PositionSide::Short;
        position.stop_loss_price = Some(dec!(102));
        assert_eq!(position.trailing_stop_at(dec!(99)), Some(dec!(101)));
        assert_eq!(position.trailing_stop_at(dec!(101)), None);
    }

    #[test]
    fn trailing_stop_requires_distance() {
        let mut position = long(dec!(100), dec!(1));
        position.stop_loss_price = Some(dec!(98));
        assert_eq!(position.trailing_stop_at(dec!(150)), None);
    }

    #[test]
    fn exit_side_is_opposite_of_entry() {
        assert_eq!(PositionSide::Long.exit_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.exit_side(), OrderSide::Buy);
        assert_eq!(PositionSide::from(OrderSide::Sell), PositionSide::Short);
    }
}
