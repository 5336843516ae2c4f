//! Exchange-agnostic domain types.

/// Implements `FromStr` and `Display` for enums exposing `as_str`.
macro_rules! str_enum_parse {
    ($ty:ty, [$($variant:ident),+]) => {
        impl ::std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s == <$ty>::$variant.as_str() {
                    return Ok(<$ty>::$variant);
                })+
                Err(format!("unknown {}: {s}", stringify!($ty)))
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod candle;
pub mod id;
pub mod money;
pub mod order;
pub mod pair;
pub mod portfolio;
pub mod position;
pub mod signal;

pub use candle::{Indicators, MarketData};
pub use id::{CandleId, OrderId, PairId, PortfolioId, PositionId, SignalId};
pub use money::{Price, Usd, Volume};
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use pair::CryptoPair;
pub use portfolio::{
    Portfolio, PortfolioMetrics, RiskAlert, RiskAlertKind, RiskLevel, RiskReport,
};
pub use position::{Position, PositionSide};
pub use signal::{SignalType, StrategyType, TradingSignal, VolumeProfile};
