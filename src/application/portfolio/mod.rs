//! Portfolio balances, performance metrics and risk limits.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{
    CryptoPair, Order, PairId, Portfolio, PortfolioMetrics, Position, PositionId, Price,
    RiskAlert, RiskAlertKind, RiskLevel, RiskReport,
};
use crate::error::Result;
use crate::port::outbound::exchange::Exchange;
use crate::port::outbound::store::TradingStore;

const RECENT_POSITIONS: usize = 10;
const RECENT_ORDERS: usize = 20;

/// A position joined with its pair.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub position: Position,
    pub symbol: String,
    pub display_name: String,
}

/// An order joined with its pair symbol.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub symbol: String,
}

/// Metrics plus recent activity.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub metrics: PortfolioMetrics,
    pub is_trading_enabled: bool,
    pub recent_positions: Vec<PositionView>,
    pub recent_orders: Vec<OrderView>,
    pub last_updated: DateTime<Utc>,
}

/// Compute performance metrics over every position.
///
/// `daily_pnl` counts closed positions opened on `today` (UTC).
#[must_use]
pub fn compute_metrics(
    positions: &[Position],
    portfolio: &Portfolio,
    today: NaiveDate,
) -> PortfolioMetrics {
    let (open, closed): (Vec<&Position>, Vec<&Position>) =
        positions.iter().partition(|p| p.is_open);

    let realized_pnl: Decimal = closed.iter().map(|p| p.realized_pnl).sum();
    let unrealized_pnl: Decimal = open
        .iter()
        .filter_map(|p| p.current_price.map(|price| p.pnl_at(price)))
        .sum();

    let wins: Vec<Decimal> = closed
        .iter()
        .map(|p| p.realized_pnl)
        .filter(|pnl| *pnl > Decimal::ZERO)
        .collect();
    let losses: Vec<Decimal> = closed
        .iter()
        .map(|p| p.realized_pnl)
        .filter(|pnl| *pnl < Decimal::ZERO)
        .collect();

    let win_rate = ratio(wins.len(), closed.len()) * Decimal::ONE_HUNDRED;
    let total_wins: Decimal = wins.iter().sum();
    let total_losses: Decimal = losses.iter().sum::<Decimal>().abs();
    let average_win = mean(total_wins, wins.len());
    let average_loss = mean(-total_losses, losses.len());
    let profit_factor = if total_losses > Decimal::ZERO {
        total_wins / total_losses
    } else {
        Decimal::ZERO
    };

    let total_pnl = realized_pnl + unrealized_pnl;
    let max_pnl = positions
        .iter()
        .map(|p| p.max_unrealized_pnl)
        .fold(Decimal::ZERO, Decimal::max);
    let current_drawdown = if max_pnl > Decimal::ZERO {
        (max_pnl - total_pnl).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let daily_pnl: Decimal = closed
        .iter()
        .filter(|p| p.opened_at.date_naive() == today)
        .map(|p| p.realized_pnl)
        .sum();

    let total_exposure_usd: Decimal = open.iter().filter_map(|p| p.exposure()).sum();

    PortfolioMetrics {
        total_balance_usd: portfolio.total_balance_usd,
        available_balance_usd: portfolio.available_balance_usd,
        total_pnl,
        realized_pnl,
        unrealized_pnl,
        daily_pnl,
        total_trades: count(positions.len()),
        open_positions_count: count(open.len()),
        winning_trades: count(wins.len()),
        losing_trades: count(losses.len()),
        win_rate: win_rate.round_dp(2),
        average_win,
        average_loss,
        profit_factor: profit_factor.round_dp(4),
        current_drawdown,
        total_exposure_usd,
    }
}

/// Evaluate the portfolio's limits against its open positions.
#[must_use]
pub fn evaluate_risk(
    portfolio: &Portfolio,
    open_positions: &[Position],
    max_exposure_pct: Decimal,
) -> RiskReport {
    let mut alerts = Vec::new();
    let balance = portfolio.total_balance_usd;

    let daily_loss_limit = balance * portfolio.max_daily_loss_pct / Decimal::ONE_HUNDRED;
    if portfolio.daily_pnl < -daily_loss_limit {
        alerts.push(RiskAlert {
            kind: RiskAlertKind::DailyLossLimit,
            message: format!(
                "Daily loss limit exceeded: {:.2} vs limit {:.2}",
                portfolio.daily_pnl, -daily_loss_limit
            ),
            severity: RiskLevel::High,
            position_id: None,
        });
    }

    if balance > Decimal::ZERO {
        for position in open_positions {
            let Some(value) = position.exposure() else {
                continue;
            };
            let pct = value / balance * Decimal::ONE_HUNDRED;
            if pct > portfolio.max_position_size_pct {
                alerts.push(RiskAlert {
                    kind: RiskAlertKind::PositionSizeLimit,
                    message: format!(
                        "Position size limit exceeded: {pct:.1}% vs limit {}%",
                        portfolio.max_position_size_pct
                    ),
                    severity: RiskLevel::Medium,
                    position_id: Some(position.id),
                });
            }
        }

        let exposure_pct = portfolio.total_exposure_usd / balance * Decimal::ONE_HUNDRED;
        if exposure_pct > max_exposure_pct {
            alerts.push(RiskAlert {
                kind: RiskAlertKind::TotalExposureLimit,
                message: format!("Total exposure too high: {exposure_pct:.1}%"),
                severity: RiskLevel::High,
                position_id: None,
            });
        }
    }

    RiskReport::from_alerts(alerts)
}

fn ratio(numerator: usize, denominator: usize) -> Decimal {
    if denominator == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(numerator) / Decimal::from(denominator)
    }
}

fn mean(total: Decimal, n: usize) -> Decimal {
    if n == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(n)
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Tracks the single portfolio record.
pub struct PortfolioService {
    exchange: Arc<dyn Exchange>,
    store: Arc<dyn TradingStore>,
    quote_asset: String,
    max_exposure_pct: Decimal,
}

impl PortfolioService {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        store: Arc<dyn TradingStore>,
        quote_asset: impl Into<String>,
        max_exposure_pct: Decimal,
    ) -> Self {
        Self {
            exchange,
            store,
            quote_asset: quote_asset.into(),
            max_exposure_pct,
        }
    }

    /// Newest stored portfolio, creating one with defaults if none exists.
    pub async fn init(&self) -> Result<Portfolio> {
        if let Some(portfolio) = self.store.latest_portfolio().await? {
            return Ok(portfolio);
        }
        let portfolio = Portfolio::default();
        self.store.save_portfolio(&portfolio).await?;
        info!(portfolio_id = %portfolio.id, "Portfolio created");
        Ok(portfolio)
    }

    /// Refresh balances from the exchange.
    pub async fn update_account_balance(&self) -> Result<Portfolio> {
        let mut portfolio = self.init().await?;
        let balances = self.exchange.balance().await?;
        let trade_balance = self.exchange.trade_balance(&self.quote_asset).await?;

        let total = balances.get(&self.quote_asset).copied().unwrap_or_default();
        portfolio.total_balance_usd = total;
        portfolio.available_balance_usd = trade_balance.trade_balance;
        portfolio.locked_balance_usd = total - trade_balance.trade_balance;
        portfolio.last_updated = Utc::now();
        self.store.save_portfolio(&portfolio).await?;

        info!(
            total = %portfolio.total_balance_usd,
            available = %portfolio.available_balance_usd,
            locked = %portfolio.locked_balance_usd,
            "Account balance updated"
        );
        Ok(portfolio)
    }

    /// Recompute metrics over all positions and persist them.
    pub async fn calculate_metrics(&self) -> Result<PortfolioMetrics> {
        let mut portfolio = self.init().await?;
        let positions = self.store.all_positions().await?;
        let metrics = compute_metrics(&positions, &portfolio, Utc::now().date_naive());
        portfolio.apply_metrics(&metrics);
        self.store.save_portfolio(&portfolio).await?;
        Ok(metrics)
    }

    /// Mark one position to `price`. Returns `false` if it does not exist.
    pub async fn update_position_pnl(&self, position_id: PositionId, price: Price) -> Result<bool> {
        let Some(mut position) = self.store.position(position_id).await? else {
            return Ok(false);
        };
        position.mark(price);
        self.store.save_position(&position).await?;
        Ok(true)
    }

    /// Fresh metrics with the most recent positions and orders.
    pub async fn summary(&self) -> Result<PortfolioSummary> {
        let metrics = self.calculate_metrics().await?;
        let portfolio = self.init().await?;
        let positions = self.store.recent_positions(RECENT_POSITIONS).await?;
        let orders = self.store.recent_orders(RECENT_ORDERS).await?;

        let mut pairs: HashMap<PairId, Option<CryptoPair>> = HashMap::new();
        for id in positions
            .iter()
            .map(|p| p.pair_id)
            .chain(orders.iter().map(|o| o.pair_id))
        {
            if !pairs.contains_key(&id) {
                let pair = self.store.pair(id).await?;
                pairs.insert(id, pair);
            }
        }
        let lookup = |id: &PairId| pairs.get(id).and_then(Option::as_ref);

        let recent_positions = positions
            .into_iter()
            .filter_map(|position| {
                let pair = lookup(&position.pair_id)?;
                Some(PositionView {
                    symbol: pair.symbol.clone(),
                    display_name: pair.display_name.clone(),
                    position,
                })
            })
            .collect();
        let recent_orders = orders
            .into_iter()
            .filter_map(|order| {
                let pair = lookup(&order.pair_id)?;
                Some(OrderView {
                    symbol: pair.symbol.clone(),
                    order,
                })
            })
            .collect();

        Ok(PortfolioSummary {
            metrics,
            is_trading_enabled: portfolio.is_trading_enabled,
            recent_positions,
            recent_orders,
            last_updated: Utc::now(),
        })
    }

    /// Check daily loss, per-position size and total exposure limits.
    ///
    /// A failure to load the data yields an `UNKNOWN` report.
    pub async fn check_risk_limits(&self) -> RiskReport {
        match self.load_risk_inputs().await {
            Ok((portfolio, open)) => {
                let report = evaluate_risk(&portfolio, &open, self.max_exposure_pct);
                if report.status != RiskLevel::Low {
                    warn!(
                        status = %report.status,
                        alerts = report.alerts.len(),
                        "Risk limits breached"
                    );
                }
                report
            }
            Err(e) => {
                error!(error = %e, "Risk check failed");
                RiskReport::unknown()
            }
        }
    }

    async fn load_risk_inputs(&self) -> Result<(Portfolio, Vec<Position>)> {
        let portfolio = self.init().await?;
        let open = self.store.open_positions().await?;
        Ok((portfolio, open))
    }

    pub async fn is_trading_enabled(&self) -> Result<bool> {
        Ok(self.init().await?.is_trading_enabled)
    }

    pub async fn set_trading_enabled(&self, enabled: bool) -> Result<Portfolio> {
        let mut portfolio = self.init().await?;
        portfolio.is_trading_enabled = enabled;
        portfolio.last_updated = Utc::now();
        self.store.save_portfolio(&portfolio).await?;
        info!(enabled, "Trading toggled");
        Ok(portfolio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::{OrderId, OrderSide, OrderType, PositionSide, StrategyType};
    use crate::testkit::domain::pair;
    use crate::testkit::exchange::ScriptedExchange;
    use rust_decimal_macros::dec;

    fn position(pair_id: PairId, entry: Decimal, amount: Decimal) -> Position {
        Position::open(
            pair_id,
            OrderId::new(),
            PositionSide::Long,
            amount,
            entry,
            StrategyType::Scalp,
        )
    }

    fn closed(pair_id: PairId, entry: Decimal, exit: Decimal) -> Position {
        let mut p = position(pair_id, entry, dec!(1));
        p.close(exit);
        p
    }

    #[test]
    fn metrics_over_mixed_positions() {
        let pair_id = PairId::new();
        let mut open = position(pair_id, dec!(100), dec!(2));
        open.mark(dec!(110));
        let positions = vec![
            closed(pair_id, dec!(100), dec!(130)),
            closed(pair_id, dec!(100), dec!(110)),
            closed(pair_id, dec!(100), dec!(80)),
            open,
        ];

        let today = Utc::now().date_naive();
        let m = compute_metrics(&positions, &Portfolio::default(), today);

        assert_eq!(m.total_trades, 4);
        assert_eq!(m.open_positions_count, 1);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 1);
        assert_eq!(m.realized_pnl, dec!(20));
        assert_eq!(m.unrealized_pnl, dec!(20));
        assert_eq!(m.total_pnl, dec!(40));
        assert_eq!(m.win_rate, dec!(66.67));
        assert_eq!(m.average_win, dec!(20));
        assert_eq!(m.average_loss, dec!(-20));
        assert_eq!(m.profit_factor, dec!(2));
        assert_eq!(m.daily_pnl, dec!(20));
        assert_eq!(m.total_exposure_usd, dec!(220));
        assert_eq!(m.current_drawdown, Decimal::ZERO);
    }

    #[test]
    fn no_losses_means_zero_profit_factor() {
        let pair_id = PairId::new();
        let positions = vec![closed(pair_id, dec!(100), dec!(105))];
        let m = compute_metrics(&positions, &Portfolio::default(), Utc::now().date_naive());
        assert_eq!(m.profit_factor, Decimal::ZERO);
        assert_eq!(m.win_rate, dec!(100));
    }

    #[test]
    fn drawdown_from_best_excursion() {
        let pair_id = PairId::new();
        let mut p = position(pair_id, dec!(100), dec!(1));
        p.mark(dec!(150));
        p.mark(dec!(120));
        let m = compute_metrics(&[p], &Portfolio::default(), Utc::now().date_naive());
        assert_eq!(m.current_drawdown, dec!(30));
    }

    #[test]
    fn daily_pnl_ignores_other_days() {
        let pair_id = PairId::new();
        let positions = vec![closed(pair_id, dec!(100), dec!(90))];
        let yesterday = Utc::now().date_naive().pred_opt().unwrap();
        let m = compute_metrics(&positions, &Portfolio::default(), yesterday);
        assert_eq!(m.daily_pnl, Decimal::ZERO);
    }

    #[test]
    fn risk_alerts_by_severity() {
        let pair_id = PairId::new();
        let mut portfolio = Portfolio {
            total_balance_usd: dec!(1000),
            ..Default::default()
        };

        let mut big = position(pair_id, dec!(100), dec!(1));
        big.mark(dec!(100));
        let report = evaluate_risk(&portfolio, &[big.clone()], dec!(50));
        assert_eq!(report.status, RiskLevel::Medium);
        assert_eq!(report.alerts[0].kind, RiskAlertKind::PositionSizeLimit);
        assert_eq!(report.alerts[0].position_id, Some(big.id));

        portfolio.daily_pnl = dec!(-25);
        portfolio.total_exposure_usd = dec!(600);
        let report = evaluate_risk(&portfolio, &[], dec!(50));
        assert_eq!(report.status, RiskLevel::High);
        let kinds: Vec<_> = report.alerts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![RiskAlertKind::DailyLossLimit, RiskAlertKind::TotalExposureLimit]
        );
    }

    #[test]
    fn zero_balance_skips_percentage_checks() {
        let mut p = position(PairId::new(), dec!(100), dec!(1));
        p.mark(dec!(100));
        let portfolio = Portfolio {
            total_exposure_usd: dec!(100),
            ..Default::default()
        };
        let report = evaluate_risk(&portfolio, &[p], dec!(50));
        assert_eq!(report.status, RiskLevel::Low);
    }

    #[tokio::test]
    async fn balance_comes_from_quote_asset() {
        let exchange = Arc::new(ScriptedExchange::new());
        exchange.set_balance("ZUSD", dec!(1000));
        exchange.set_balance("XXBT", dec!(1));
        exchange.set_trade_balance(dec!(800));
        let store = Arc::new(MemoryStore::new());
        let service = PortfolioService::new(exchange, store.clone(), "ZUSD", dec!(50));

        let portfolio = service.update_account_balance().await.unwrap();
        assert_eq!(portfolio.total_balance_usd, dec!(1000));
        assert_eq!(portfolio.available_balance_usd, dec!(800));
        assert_eq!(portfolio.locked_balance_usd, dec!(200));

        let stored = store.latest_portfolio().await.unwrap().unwrap();
        assert_eq!(stored.id, portfolio.id);
    }

    #[tokio::test]
    async fn summary_joins_pair_symbols() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryStore::new());
        let btc = pair("BTCUSD");
        store.save_pair(&btc).await.unwrap();
        store
            .save_position(&position(btc.id, dec!(100), dec!(1)))
            .await
            .unwrap();
        store
            .save_order(&Order::new(btc.id, OrderType::Limit, OrderSide::Buy, dec!(1), None))
            .await
            .unwrap();
        store
            .save_position(&position(PairId::new(), dec!(1), dec!(1)))
            .await
            .unwrap();

        let service = PortfolioService::new(exchange, store, "ZUSD", dec!(50));
        let summary = service.summary().await.unwrap();

        assert_eq!(summary.metrics.total_trades, 2);
        assert_eq!(summary.recent_positions.len(), 1);
        assert_eq!(summary.recent_positions[0].symbol, "BTCUSD");
        assert_eq!(summary.recent_orders[0].symbol, "BTCUSD");
        assert!(summary.is_trading_enabled);
    }

    #[tokio::test]
    async fn trading_toggle_persists() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryStore::new());
        let service = PortfolioService::new(exchange, store, "ZUSD", dec!(50));

        service.set_trading_enabled(false).await.unwrap();
        assert!(!service.is_trading_enabled().await.unwrap());
        assert_eq!(service.check_risk_limits().await.status, RiskLevel::Low);
    }
}
