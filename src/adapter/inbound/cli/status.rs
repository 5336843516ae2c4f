//! Handlers for `status`, `risk` and `trading`.

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::application::bot::{BotStatus, SignalView};
use crate::domain::{RiskLevel, RiskReport};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Pair")]
    pair: String,
    #[tabled(rename = "Signal")]
    signal: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Stop")]
    stop: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&SignalView> for SignalRow {
    fn from(view: &SignalView) -> Self {
        let signal = &view.signal;
        Self {
            pair: view.symbol.clone(),
            signal: signal.signal_type.to_string(),
            confidence: format!("{:.0}%", signal.confidence * 100.0),
            entry: signal.entry_price.to_string(),
            target: signal.target_price.to_string(),
            stop: signal.stop_loss_price.to_string(),
            created: signal.created_at.format("%H:%M:%S").to_string(),
        }
    }
}

/// Show portfolio metrics and the last day's signals.
pub async fn execute(config: Config) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let status = bot.status().await?;

    if output::is_json() {
        output::json_output(serde_json::to_value(&status)?);
        return Ok(());
    }
    print_status(&status);
    Ok(())
}

fn print_status(status: &BotStatus) {
    let metrics = &status.portfolio.metrics;

    output::header(env!("CARGO_PKG_VERSION"));
    output::field(
        "Trading",
        if status.portfolio.is_trading_enabled {
            output::positive("enabled")
        } else {
            output::negative("disabled")
        },
    );
    output::field("Balance", format!("{:.2}", metrics.total_balance_usd));
    output::field("Available", format!("{:.2}", metrics.available_balance_usd));
    output::field("Exposure", format!("{:.2}", metrics.total_exposure_usd));

    output::section("Performance");
    output::field("Total P&L", output::pnl(metrics.total_pnl));
    output::field("Realized", output::pnl(metrics.realized_pnl));
    output::field("Unrealized", output::pnl(metrics.unrealized_pnl));
    output::field("Today", output::pnl(metrics.daily_pnl));
    output::field(
        "Trades",
        format!(
            "{} closed, {} open ({} won / {} lost)",
            metrics.total_trades,
            metrics.open_positions_count,
            metrics.winning_trades,
            metrics.losing_trades
        ),
    );
    output::field("Win rate", format!("{}%", metrics.win_rate));
    output::field("Profit factor", metrics.profit_factor);
    output::field("Drawdown", format!("{}%", metrics.current_drawdown));

    output::section("Signals (24h)");
    if status.recent_signals.is_empty() {
        output::note("No signals generated in the last 24 hours");
    } else {
        let rows: Vec<SignalRow> = status.recent_signals.iter().map(SignalRow::from).collect();
        output::lines(&Table::new(rows).to_string());
    }
}

/// Evaluate risk limits against the stored portfolio.
pub async fn risk(config: Config) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let report = bot.portfolio().check_risk_limits().await;

    if output::is_json() {
        output::json_output(serde_json::to_value(&report)?);
        return Ok(());
    }
    print_risk(&report);
    Ok(())
}

fn print_risk(report: &RiskReport) {
    let status = match report.status {
        RiskLevel::Low => output::positive(report.status),
        RiskLevel::Medium => output::highlight(report.status),
        RiskLevel::High | RiskLevel::Unknown => output::negative(report.status),
    };
    output::field("Risk", status);

    if report.alerts.is_empty() {
        output::success("All risk limits respected");
        return;
    }
    for alert in &report.alerts {
        output::warning(&format!("[{}] {}", alert.severity, alert.message));
    }
}

/// Enable or disable opening new positions.
pub async fn set_trading(config: Config, enabled: bool) -> Result<()> {
    let bot = bootstrap::build_bot(&config)?;
    let portfolio = bot.portfolio().set_trading_enabled(enabled).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "trading",
            "is_trading_enabled": portfolio.is_trading_enabled,
        }));
        return Ok(());
    }
    if enabled {
        output::success("Trading enabled");
    } else {
        output::success("Trading disabled");
        output::hint("open positions are still monitored; use `positions close` to exit them");
    }
    Ok(())
}
