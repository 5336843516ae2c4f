//! Portfolio balances, performance metrics, and risk alerts.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::id::{PortfolioId, PositionId};
use super::money::Usd;

/// Account balances, aggregated performance and trading preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: PortfolioId,

    pub total_balance_usd: Usd,
    pub available_balance_usd: Usd,
    pub locked_balance_usd: Usd,

    pub total_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub weekly_pnl: Decimal,
    pub monthly_pnl: Decimal,

    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// Percentage of closed positions with positive P&L.
    pub win_rate: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub profit_factor: Decimal,

    pub max_drawdown: Decimal,
    pub current_drawdown: Decimal,
    pub sharpe_ratio: Option<f64>,

    pub open_positions_count: u32,
    pub total_exposure_usd: Usd,

    /// Max percent of the portfolio per position.
    pub max_position_size_pct: Decimal,
    /// Max daily loss as percent of the portfolio.
    pub max_daily_loss_pct: Decimal,
    pub is_trading_enabled: bool,

    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Default for Portfolio {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: PortfolioId::new(),
            total_balance_usd: Decimal::ZERO,
            available_balance_usd: Decimal::ZERO,
            locked_balance_usd: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            weekly_pnl: Decimal::ZERO,
            monthly_pnl: Decimal::ZERO,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: Decimal::ZERO,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            current_drawdown: Decimal::ZERO,
            sharpe_ratio: None,
            open_positions_count: 0,
            total_exposure_usd: Decimal::ZERO,
            max_position_size_pct: dec!(5.0),
            max_daily_loss_pct: dec!(2.0),
            is_trading_enabled: true,
            last_updated: now,
            created_at: now,
        }
    }
}

/// Performance snapshot computed from all positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub total_balance_usd: Usd,
    pub available_balance_usd: Usd,
    pub total_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub total_trades: u32,
    pub open_positions_count: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub profit_factor: Decimal,
    pub current_drawdown: Decimal,
    pub total_exposure_usd: Usd,
}

impl Portfolio {
    /// Copy computed metrics into the stored record.
    pub fn apply_metrics(&mut self, metrics: &PortfolioMetrics) {
        self.total_pnl = metrics.total_pnl;
        self.daily_pnl = metrics.daily_pnl;
        self.total_trades = metrics.total_trades;
        self.winning_trades = metrics.winning_trades;
        self.losing_trades = metrics.losing_trades;
        self.win_rate = metrics.win_rate;
        self.average_win = metrics.average_win;
        self.average_loss = metrics.average_loss;
        self.profit_factor = metrics.profit_factor;
        self.current_drawdown = metrics.current_drawdown;
        self.max_drawdown = self.max_drawdown.max(metrics.current_drawdown);
        self.open_positions_count = metrics.open_positions_count;
        self.total_exposure_usd = metrics.total_exposure_usd;
        self.last_updated = Utc::now();
    }
}

/// Which limit an alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskAlertKind {
    DailyLossLimit,
    PositionSizeLimit,
    TotalExposureLimit,
}

/// Ordered risk level. `Unknown` means the check itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single limit breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub kind: RiskAlertKind,
    pub message: String,
    pub severity: RiskLevel,
    pub position_id: Option<PositionId>,
}

/// Outcome of a risk-limit check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub alerts: Vec<RiskAlert>,
    pub status: RiskLevel,
}

impl RiskReport {
    /// Build a report, deriving the status from the alerts.
    #[must_use]
    pub fn from_alerts(alerts: Vec<RiskAlert>) -> Self {
        let status = if alerts.iter().any(|a| a.severity == RiskLevel::High) {
            RiskLevel::High
        } else if alerts.is_empty() {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };
        Self { alerts, status }
    }

    /// Report for a check that could not be performed.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            alerts: Vec::new(),
            status: RiskLevel::Unknown,
        }
    }
}
