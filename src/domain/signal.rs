//! Trading signals produced by market analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{PairId, SignalId};
use super::money::Price;

/// Direction and strength of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl SignalType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        }
    }

    /// True for BUY and STRONG_BUY.
    #[must_use]
    pub const fn is_buy(self) -> bool {
        matches!(self, Self::Buy | Self::StrongBuy)
    }
}

/// Relative trading volume of the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeProfile {
    High,
    Medium,
    Low,
    Unknown,
}

impl VolumeProfile {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Trading style a signal or position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    Scalp,
    Swing,
    Momentum,
}

impl StrategyType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalp => "SCALP",
            Self::Swing => "SWING",
            Self::Momentum => "MOMENTUM",
        }
    }
}

str_enum_parse!(SignalType, [StrongBuy, Buy, Hold, Sell, StrongSell]);
str_enum_parse!(VolumeProfile, [High, Medium, Low, Unknown]);
str_enum_parse!(StrategyType, [Scalp, Swing, Momentum]);

/// An actionable recommendation for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: SignalId,
    pub pair_id: PairId,
    pub signal_type: SignalType,
    /// Agreement of the indicators, 0.0 to 1.0.
    pub confidence: f64,
    pub entry_price: Price,
    pub target_price: Price,
    pub stop_loss_price: Price,

    pub trend_strength: f64,
    pub volatility: f64,
    pub volume_profile: VolumeProfile,
    pub support_level: Option<Price>,
    pub resistance_level: Option<Price>,

    pub strategy_type: StrategyType,
    /// Suggested position size as a percentage of the portfolio.
    pub position_size_recommendation: f64,
    pub time_horizon_minutes: u32,

    pub is_active: bool,
    pub analysis_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TradingSignal {
    /// True once the expiry time has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_type_round_trips() {
        for ty in [
            SignalType::StrongBuy,
            SignalType::Buy,
            SignalType::Hold,
            SignalType::Sell,
            SignalType::StrongSell,
        ] {
            assert_eq!(ty.as_str().parse::<SignalType>().unwrap(), ty);
        }
        assert!("MAYBE".parse::<SignalType>().is_err());
    }

    #[test]
    fn only_buys_are_buy() {
        assert!(SignalType::Buy.is_buy());
        assert!(SignalType::StrongBuy.is_buy());
        assert!(!SignalType::Sell.is_buy());
        assert!(!SignalType::StrongSell.is_buy());
    }

    #[test]
    fn serde_uses_screaming_case() {
        let json = serde_json::to_string(&SignalType::StrongSell).unwrap();
        assert_eq!(json, "\"STRONG_SELL\"");
    }
}
